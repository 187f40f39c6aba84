//! Schema to tree construction and in-place re-resolution
//!
//! Building is a refresh of a tree holding only a root: every pass creates
//! the children a node is missing and frees the children it may no longer
//! have, so node identity survives across passes.

use super::node::{MemoryNode, NodeAddress, NodeId, NodeTree, NodeValue};
use super::resolver::{Frame, Pointee, Resolver};
use crate::codec::Codec;
use crate::core::types::{
    Address, DecodeError, MemoryError, MemoryResult, MemoryValue, NodeError, ValueKind,
};
use crate::memory::MemoryAccessor;
use crate::schema::{element_stride, FieldDescriptor, SchemaSource};
use std::sync::Arc;
use tracing::debug;

type Preread = Option<Result<MemoryValue, DecodeError>>;

/// Builds and refreshes node trees for one schema source and accessor
pub struct Refresher<'a, M: MemoryAccessor + ?Sized> {
    source: &'a dyn SchemaSource,
    resolver: Resolver<'a, M>,
    max_depth: usize,
}

impl<'a, M: MemoryAccessor + ?Sized> Refresher<'a, M> {
    pub fn new(
        source: &'a dyn SchemaSource,
        memory: &'a M,
        codec: Codec,
        max_depth: usize,
    ) -> Self {
        Refresher {
            source,
            resolver: Resolver::new(memory, codec),
            max_depth,
        }
    }

    /// Creates the root node for `schema` at `base` and runs the first pass
    pub fn build(&self, tree: &mut NodeTree, schema: &str, base: Address) -> MemoryResult<NodeId> {
        let root_schema = self
            .source
            .schema(schema)
            .ok_or_else(|| MemoryError::schema_inconsistent(schema, "schema is not known"))?;
        let field = FieldDescriptor::new(
            schema,
            ValueKind::nested(schema),
            0,
            root_schema.size,
        );
        let root = tree.insert(MemoryNode::new(Arc::new(field), None, 0));
        self.refresh(tree, root, base, 0);
        Ok(root)
    }

    /// Re-resolves and re-decodes every node under `root`
    pub fn refresh(&self, tree: &mut NodeTree, root: NodeId, base: Address, generation: u64) {
        let mut frames = Vec::new();
        self.visit(tree, root, Ok(base), None, &mut frames, generation);
    }

    /// Re-reads one node and its subtree in place
    ///
    /// The node's address is recomputed from its parent's last resolution, and
    /// the cycle guard sees the same open ancestors a full pass would.
    pub fn refresh_subtree(&self, tree: &mut NodeTree, id: NodeId, generation: u64) {
        let Some(node) = tree.get(id) else {
            return;
        };
        let Some(parent_id) = node.parent else {
            if let Some(base) = node.address.hint() {
                self.refresh(tree, id, base, generation);
            }
            return;
        };
        let offset = node.field.offset;
        let ancestors = tree.ancestors(id);

        let mut frames = Vec::new();
        for ancestor in ancestors.iter().rev() {
            if let Some(frame) = tree.get(*ancestor).and_then(open_frame) {
                frames.push(frame);
            }
        }
        let parent = tree.get(parent_id);
        let base = parent.and_then(|p| match (&p.field.kind, &p.value) {
            (ValueKind::Pointer { .. }, NodeValue::Scalar(MemoryValue::Pointer(target))) => {
                Some(*target)
            }
            (ValueKind::Pointer { .. }, _) => None,
            _ => p.address.resolved(),
        });
        let address = Resolver::<M>::member(base, offset);
        self.visit(tree, id, address, None, &mut frames, generation);
    }

    fn visit(
        &self,
        tree: &mut NodeTree,
        id: NodeId,
        address: Result<Address, NodeError>,
        preread: Preread,
        frames: &mut Vec<Frame>,
        generation: u64,
    ) {
        let Some(node) = tree.get(id) else {
            return;
        };
        let field = Arc::clone(&node.field);

        let address = match address {
            Ok(address) => address,
            Err(reason) => {
                self.unresolve(tree, id, reason, generation);
                return;
            }
        };
        if let Some(node) = tree.get_mut(id) {
            node.address = NodeAddress::Resolved(address);
            node.generation = generation;
        }

        match &field.kind {
            ValueKind::Primitive(_) | ValueKind::Bitfield { .. } => {
                let value = preread.unwrap_or_else(|| self.read_scalar(&field.kind, address));
                let value = match value {
                    Ok(value) => NodeValue::Scalar(value),
                    Err(reason) => NodeValue::Invalid(reason.into()),
                };
                set_value(tree, id, value);
            }
            ValueKind::Pointer { target } => {
                let slot = match preread {
                    Some(value) => Resolver::<M>::interpret(address, value),
                    None => self.resolver.deref(address),
                };
                self.visit_pointer(tree, id, target.as_deref(), slot, frames, generation);
            }
            ValueKind::NestedStruct { schema } => {
                if !self.within_depth(tree, id) {
                    return;
                }
                let Some(fields) = self.source.schema(schema).map(|s| s.fields.clone()) else {
                    tree.clear_children(id);
                    set_value(
                        tree,
                        id,
                        NodeValue::Invalid(DecodeError::MissingSchema(schema.clone()).into()),
                    );
                    return;
                };
                set_value(tree, id, NodeValue::Container);
                let children = self.ensure_children(tree, id, fields);
                frames.push(Frame::new(schema.clone(), address));
                for child in children {
                    self.visit_member(tree, child, address, frames, generation);
                }
                frames.pop();
            }
            ValueKind::FixedArray { element, count } => {
                if !self.within_depth(tree, id) {
                    return;
                }
                set_value(tree, id, NodeValue::Container);
                let stride = element_stride(&field);
                let elements = (0..*count)
                    .map(|i| {
                        Arc::new(FieldDescriptor::new(
                            format!("[{}]", i),
                            (**element).clone(),
                            Resolver::<M>::element_offset(i, *count, stride),
                            stride,
                        ))
                    })
                    .collect::<Vec<_>>();
                let children = self.ensure_children(tree, id, elements);

                match self.resolver.codec().scalar_width(element) {
                    Some(_) => {
                        // One read for the whole span, decoded element by element
                        let values = match self.resolver.memory().read(address, field.size) {
                            Ok(bytes) => self.resolver.codec().decode_array(
                                element, *count, stride, &bytes,
                            ),
                            Err(fault) => vec![Err(DecodeError::Fault(fault)); *count],
                        };
                        for (child, value) in children.into_iter().zip(values) {
                            let child_address = self.child_address(tree, child, address);
                            self.visit(tree, child, child_address, Some(value), frames, generation);
                        }
                    }
                    None => {
                        for child in children {
                            self.visit_member(tree, child, address, frames, generation);
                        }
                    }
                }
            }
        }
    }

    fn visit_member(
        &self,
        tree: &mut NodeTree,
        child: NodeId,
        base: Address,
        frames: &mut Vec<Frame>,
        generation: u64,
    ) {
        let address = self.child_address(tree, child, base);
        self.visit(tree, child, address, None, frames, generation);
    }

    fn child_address(
        &self,
        tree: &NodeTree,
        child: NodeId,
        base: Address,
    ) -> Result<Address, NodeError> {
        let offset = tree.get(child).map(|n| n.field.offset).unwrap_or_default();
        Resolver::<M>::member(Some(base), offset)
    }

    fn visit_pointer(
        &self,
        tree: &mut NodeTree,
        id: NodeId,
        target: Option<&str>,
        slot: Result<Pointee, NodeError>,
        frames: &mut Vec<Frame>,
        generation: u64,
    ) {
        let pointee = match slot {
            Ok(Pointee::Target(pointee)) => pointee,
            Ok(Pointee::Null) => {
                tree.clear_children(id);
                set_value(tree, id, NodeValue::Null);
                return;
            }
            Err(reason) => {
                // Children exist only while the pointer resolves, so the
                // pointee nodes come back with fresh ids once the slot is readable
                tree.clear_children(id);
                set_value(tree, id, NodeValue::Invalid(reason));
                return;
            }
        };

        let Some(schema) = target else {
            set_value(tree, id, NodeValue::Scalar(MemoryValue::Pointer(pointee)));
            return;
        };
        if Resolver::<M>::is_cyclic(frames, schema, pointee) {
            tree.clear_children(id);
            set_value(tree, id, NodeValue::Cyclic(pointee));
            return;
        }
        if !self.within_depth(tree, id) {
            return;
        }
        let Some(fields) = self.source.schema(schema).map(|s| s.fields.clone()) else {
            tree.clear_children(id);
            set_value(
                tree,
                id,
                NodeValue::Invalid(DecodeError::MissingSchema(schema.to_string()).into()),
            );
            return;
        };

        set_value(tree, id, NodeValue::Scalar(MemoryValue::Pointer(pointee)));
        let children = self.ensure_children(tree, id, fields);
        frames.push(Frame::new(schema, pointee));
        for child in children {
            self.visit_member(tree, child, pointee, frames, generation);
        }
        frames.pop();
    }

    /// Marks a node and its subtree unresolved, keeping address hints
    fn unresolve(&self, tree: &mut NodeTree, id: NodeId, reason: NodeError, generation: u64) {
        let Some(node) = tree.get_mut(id) else {
            return;
        };
        node.address = node.address.into_stale();
        node.generation = generation;
        let is_pointer = matches!(node.field.kind, ValueKind::Pointer { .. });
        let children = node.children.clone();
        set_value(tree, id, NodeValue::Invalid(reason));

        if is_pointer {
            tree.clear_children(id);
            return;
        }
        for child in children {
            self.unresolve(tree, child, NodeError::ParentUnresolved, generation);
        }
    }

    /// Fails the node if expanding it would exceed the depth limit
    fn within_depth(&self, tree: &mut NodeTree, id: NodeId) -> bool {
        let depth = tree.get(id).map(|n| n.depth).unwrap_or_default();
        if depth <= self.max_depth {
            return true;
        }
        tree.clear_children(id);
        set_value(
            tree,
            id,
            NodeValue::Invalid(
                DecodeError::DepthLimitExceeded {
                    limit: self.max_depth,
                }
                .into(),
            ),
        );
        false
    }

    /// Creates missing children for `fields`; existing children are reused
    fn ensure_children(
        &self,
        tree: &mut NodeTree,
        id: NodeId,
        fields: Vec<Arc<FieldDescriptor>>,
    ) -> Vec<NodeId> {
        let (existing, depth) = match tree.get(id) {
            Some(node) => (node.children.clone(), node.depth),
            None => return Vec::new(),
        };
        if existing.len() == fields.len() {
            return existing;
        }

        tree.clear_children(id);
        let children: Vec<NodeId> = fields
            .into_iter()
            .map(|field| tree.insert(MemoryNode::new(field, Some(id), depth + 1)))
            .collect();
        if let Some(node) = tree.get_mut(id) {
            node.children = children.clone();
        }
        children
    }

    fn read_scalar(&self, kind: &ValueKind, address: Address) -> Result<MemoryValue, DecodeError> {
        let width = self
            .resolver
            .codec()
            .scalar_width(kind)
            .ok_or_else(|| DecodeError::NotScalar(kind.to_string()))?;
        let bytes = self.resolver.memory().read(address, width)?;
        self.resolver.codec().decode_scalar(kind, &bytes)
    }
}

/// The (schema, address) pair a node keeps open for its descendants
fn open_frame(node: &MemoryNode) -> Option<Frame> {
    match (&node.field.kind, &node.value) {
        (ValueKind::NestedStruct { schema }, NodeValue::Container) => {
            node.address.resolved().map(|a| Frame::new(schema.clone(), a))
        }
        (
            ValueKind::Pointer {
                target: Some(schema),
            },
            NodeValue::Scalar(MemoryValue::Pointer(target)),
        ) => Some(Frame::new(schema.clone(), *target)),
        _ => None,
    }
}

fn set_value(tree: &mut NodeTree, id: NodeId, value: NodeValue) {
    let Some(node) = tree.get_mut(id) else {
        return;
    };
    if let NodeValue::Invalid(reason) = &value {
        if !node.value.is_invalid() {
            debug!(field = %node.field.name, address = %node.address, %reason, "node became invalid");
        }
    }
    node.value = value;
}
