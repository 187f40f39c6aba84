//! Binding orchestration
//!
//! A [`Binding`] ties one root schema to a base address in a target and owns
//! the node tree built for it. All operations are synchronous; callers drive
//! refreshes by calling [`Binding::tick`] at whatever rate suits them.

use crate::codec::Codec;
use crate::core::types::{
    Address, MemoryError, MemoryResult, MemoryValue, RejectReason, SchemaId, ValueKind,
};
use crate::memory::{read_exact, MemoryAccessor};
use crate::schema::{check_schema, SchemaSource};
use crate::tree::{MemoryNode, NodeId, NodeTree, NodeValue, Refresher};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// Per-binding engine settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingOptions {
    /// Deepest container expansion before a node is marked invalid
    pub max_depth: usize,
    /// Target pointer width in bytes (4 or 8)
    pub pointer_width: usize,
    /// Read written bytes back and compare
    pub verify_writes: bool,
}

impl Default for BindingOptions {
    fn default() -> Self {
        BindingOptions {
            max_depth: 16,
            pointer_width: 8,
            verify_writes: true,
        }
    }
}

impl BindingOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_pointer_width(mut self, pointer_width: usize) -> Self {
        self.pointer_width = pointer_width;
        self
    }

    pub fn with_verify_writes(mut self, verify_writes: bool) -> Self {
        self.verify_writes = verify_writes;
        self
    }
}

/// One live association between a schema, a base address and a target
pub struct Binding<'a, M: MemoryAccessor> {
    schemas: &'a dyn SchemaSource,
    memory: M,
    options: BindingOptions,
    codec: Codec,
    schema: SchemaId,
    base: Address,
    tree: NodeTree,
    root: NodeId,
    generation: u64,
}

impl<'a, M: MemoryAccessor> Binding<'a, M> {
    /// Checks the schema graph reachable from `schema` and builds the tree.
    ///
    /// Fails with [`MemoryError::SchemaInconsistent`] if any referenced schema
    /// is missing or declares a field that cannot be decoded.
    pub fn open(
        schemas: &'a dyn SchemaSource,
        schema: &str,
        base: Address,
        memory: M,
        options: BindingOptions,
    ) -> MemoryResult<Self> {
        if !matches!(options.pointer_width, 4 | 8) {
            return Err(MemoryError::schema_inconsistent(
                schema,
                format!("pointer width {} is not 4 or 8", options.pointer_width),
            ));
        }
        check_schema(schemas, schema, options.pointer_width)?;

        let codec = Codec::new(options.pointer_width);
        let mut tree = NodeTree::new();
        let root = Refresher::new(schemas, &memory, codec, options.max_depth)
            .build(&mut tree, schema, base)?;

        debug!(schema, base = %base, nodes = tree.len(), "binding opened");

        Ok(Binding {
            schemas,
            memory,
            options,
            codec,
            schema: schema.to_string(),
            base,
            tree,
            root,
            generation: 0,
        })
    }

    /// Runs one refresh pass over the whole tree and returns its generation
    pub fn tick(&mut self) -> u64 {
        self.generation += 1;
        Refresher::new(self.schemas, &self.memory, self.codec, self.options.max_depth).refresh(
            &mut self.tree,
            self.root,
            self.base,
            self.generation,
        );
        trace!(
            schema = %self.schema,
            generation = self.generation,
            nodes = self.tree.len(),
            "tick"
        );
        self.generation
    }

    /// Moves the binding to a new base address and refreshes in place
    pub fn rebase(&mut self, base: Address) -> u64 {
        debug!(schema = %self.schema, from = %self.base, to = %base, "binding rebased");
        self.base = base;
        self.tick()
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    /// Looks up a live node
    pub fn node(&self, id: NodeId) -> MemoryResult<&MemoryNode> {
        self.tree
            .get(id)
            .ok_or_else(|| MemoryError::StaleNode(id.to_string()))
    }

    pub fn children(&self, id: NodeId) -> MemoryResult<&[NodeId]> {
        self.node(id).map(|node| node.children())
    }

    /// Value decoded for the node on the last pass
    pub fn read_value(&self, id: NodeId) -> MemoryResult<&NodeValue> {
        self.node(id).map(|node| node.value())
    }

    /// Encodes `value` and writes it at the node's address, then re-reads the
    /// node in place.
    ///
    /// Containers and unresolved nodes are rejected without touching memory.
    /// Bitfields read their backing integer first so neighbouring bits are
    /// preserved.
    pub fn write_value(&mut self, id: NodeId, value: MemoryValue) -> MemoryResult<()> {
        let node = self.node(id)?;
        let kind = node.kind().clone();
        let name = node.name().to_string();

        if kind.is_container() {
            warn!(field = %name, "write rejected: container");
            return Err(MemoryError::write_rejected(RejectReason::Container(
                kind.to_string(),
            )));
        }
        let Some(address) = node.address().resolved() else {
            warn!(field = %name, "write rejected: unresolved address");
            return Err(MemoryError::write_rejected(RejectReason::Unresolved));
        };
        let width = self
            .codec
            .scalar_width(&kind)
            .ok_or_else(|| MemoryError::write_rejected(RejectReason::Container(kind.to_string())))?;

        let mut raw = match kind {
            ValueKind::Bitfield { .. } => {
                read_exact(&self.memory, address, width).map_err(|fault| {
                    warn!(field = %name, %fault, "write rejected: backing unreadable");
                    MemoryError::write_rejected(fault)
                })?
            }
            _ => vec![0u8; width],
        };
        self.codec.encode(&kind, &value, &mut raw)?;

        if let Err(fault) = self.memory.write(address, &raw) {
            warn!(field = %name, %fault, "write rejected by accessor");
            return Err(MemoryError::write_rejected(fault));
        }
        debug!(field = %name, address = %address, %value, "value written");

        let verified = if self.options.verify_writes {
            match read_exact(&self.memory, address, width) {
                Ok(bytes) if bytes == raw => Ok(()),
                Ok(_) => Err(MemoryError::VerificationFailed { address }),
                Err(fault) => Err(MemoryError::Fault(fault)),
            }
        } else {
            Ok(())
        };

        Refresher::new(self.schemas, &self.memory, self.codec, self.options.max_depth)
            .refresh_subtree(&mut self.tree, id, self.generation);
        verified
    }

    /// Parses operator text as the node's kind and writes it
    pub fn write_text(&mut self, id: NodeId, text: &str) -> MemoryResult<()> {
        let kind = self.node(id)?.kind().clone();
        if kind.is_container() {
            return Err(MemoryError::write_rejected(RejectReason::Container(
                kind.to_string(),
            )));
        }
        let value = self.codec.parse_value(&kind, text)?;
        self.write_value(id, value)
    }

    /// Finds a node by path relative to the root, e.g. `inventory[2].count`
    ///
    /// Pointer fields are walked through transparently: `next.val` names the
    /// `val` field of the struct `next` points at. The empty path is the root.
    pub fn find(&self, path: &str) -> MemoryResult<NodeId> {
        let not_found = || MemoryError::NodeNotFound(path.to_string());
        let mut current = self.root;

        for segment in path.split('.').filter(|s| !s.is_empty()) {
            let (name, indices) = split_indices(segment).ok_or_else(not_found)?;
            if !name.is_empty() {
                current = self
                    .children(current)?
                    .iter()
                    .copied()
                    .find(|child| self.tree.get(*child).map(|n| n.name()) == Some(name))
                    .ok_or_else(not_found)?;
            }
            for index in indices {
                current = *self
                    .children(current)?
                    .get(index)
                    .ok_or_else(not_found)?;
            }
        }
        Ok(current)
    }

    /// Generation of the last completed pass; the initial build is 0
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn base(&self) -> Address {
        self.base
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn options(&self) -> &BindingOptions {
        &self.options
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    /// Ends the session and hands the accessor back
    pub fn close(self) -> M {
        debug!(schema = %self.schema, base = %self.base, "binding closed");
        self.memory
    }
}

/// Splits `name[1][2]` into `("name", [1, 2])`
fn split_indices(segment: &str) -> Option<(&str, Vec<usize>)> {
    let (name, mut rest) = match segment.find('[') {
        Some(pos) => segment.split_at(pos),
        None => return Some((segment, Vec::new())),
    };
    let mut indices = Vec::new();
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let close = inner.find(']')?;
        indices.push(inner[..close].trim().parse().ok()?);
        rest = &inner[close + 1..];
    }
    Some((name, indices))
}
