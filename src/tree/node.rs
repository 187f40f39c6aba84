//! Bound memory nodes and the arena that owns them

use crate::core::types::{Address, MemoryValue, NodeError, ValueKind};
use crate::schema::FieldDescriptor;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Stable handle to a node in a [`NodeTree`]
///
/// The version distinguishes a live node from an earlier one that occupied
/// the same slot, so a handle kept by the presentation layer never silently
/// refers to a different node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId {
    index: u32,
    version: u32,
}

impl NodeId {
    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn version(&self) -> u32 {
        self.version
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.version)
    }
}

/// Where a node lives, as of its last resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeAddress {
    /// Never resolved
    Unresolved,
    Resolved(Address),
    /// Resolution failed; the last known address is kept as a display hint
    Stale(Address),
}

impl NodeAddress {
    /// The address, only if it resolved on the last pass
    pub fn resolved(&self) -> Option<Address> {
        match self {
            NodeAddress::Resolved(address) => Some(*address),
            _ => None,
        }
    }

    /// The current or last known address
    pub fn hint(&self) -> Option<Address> {
        match self {
            NodeAddress::Resolved(address) | NodeAddress::Stale(address) => Some(*address),
            NodeAddress::Unresolved => None,
        }
    }

    /// Demotes a resolved address to a stale hint
    pub(crate) fn into_stale(self) -> Self {
        match self {
            NodeAddress::Resolved(address) | NodeAddress::Stale(address) => {
                NodeAddress::Stale(address)
            }
            NodeAddress::Unresolved => NodeAddress::Unresolved,
        }
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeAddress::Unresolved => write!(f, "unresolved"),
            NodeAddress::Resolved(address) => write!(f, "{}", address),
            NodeAddress::Stale(address) => write!(f, "{}?", address),
        }
    }
}

/// What a node decoded to on its last pass
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    Scalar(MemoryValue),
    /// Struct or array; children carry the values
    Container,
    /// Pointer holding the null sentinel
    Null,
    /// Pointer back into an open ancestor at this address; not expanded
    Cyclic(Address),
    Invalid(NodeError),
}

impl NodeValue {
    pub fn is_invalid(&self) -> bool {
        matches!(self, NodeValue::Invalid(_))
    }

    pub fn scalar(&self) -> Option<MemoryValue> {
        match self {
            NodeValue::Scalar(value) => Some(*value),
            _ => None,
        }
    }

    /// Reason the node is invalid, if it is
    pub fn error(&self) -> Option<&NodeError> {
        match self {
            NodeValue::Invalid(reason) => Some(reason),
            _ => None,
        }
    }
}

/// One field instance bound to an address at a given generation
#[derive(Debug, Clone)]
pub struct MemoryNode {
    pub(crate) field: Arc<FieldDescriptor>,
    pub(crate) address: NodeAddress,
    pub(crate) value: NodeValue,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) depth: usize,
    pub(crate) generation: u64,
}

impl MemoryNode {
    pub(crate) fn new(field: Arc<FieldDescriptor>, parent: Option<NodeId>, depth: usize) -> Self {
        MemoryNode {
            field,
            address: NodeAddress::Unresolved,
            value: NodeValue::Invalid(NodeError::ParentUnresolved),
            children: Vec::new(),
            parent,
            depth,
            generation: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.field.name
    }

    pub fn field(&self) -> &FieldDescriptor {
        &self.field
    }

    pub fn kind(&self) -> &ValueKind {
        &self.field.kind
    }

    pub fn address(&self) -> NodeAddress {
        self.address
    }

    pub fn value(&self) -> &NodeValue {
        &self.value
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Number of container expansions between the root and this node
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Default)]
struct Slot {
    version: u32,
    node: Option<MemoryNode>,
}

/// Arena of nodes with reusable, versioned slots
#[derive(Debug, Clone, Default)]
pub struct NodeTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl NodeTree {
    pub fn new() -> Self {
        NodeTree::default()
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn get(&self, id: NodeId) -> Option<&MemoryNode> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.version == id.version)
            .and_then(|slot| slot.node.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut MemoryNode> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.version == id.version)
            .and_then(|slot| slot.node.as_mut())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn insert(&mut self, node: MemoryNode) -> NodeId {
        self.live += 1;
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                NodeId {
                    index,
                    version: slot.version,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    version: 0,
                    node: Some(node),
                });
                NodeId { index, version: 0 }
            }
        }
    }

    /// Frees a node and everything below it
    pub(crate) fn remove(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            let Some(slot) = self
                .slots
                .get_mut(next.index())
                .filter(|slot| slot.version == next.version)
            else {
                continue;
            };
            if let Some(node) = slot.node.take() {
                slot.version = slot.version.wrapping_add(1);
                self.free.push(next.index);
                self.live -= 1;
                pending.extend(node.children);
            }
        }
    }

    /// Frees the children of `id`, leaving the node itself in place
    pub(crate) fn clear_children(&mut self, id: NodeId) {
        let children = match self.get_mut(id) {
            Some(node) => std::mem::take(&mut node.children),
            None => return,
        };
        for child in children {
            self.remove(child);
        }
    }

    /// Iterates over live nodes in slot order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &MemoryNode)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.node.as_ref().map(|node| {
                (
                    NodeId {
                        index: index as u32,
                        version: slot.version,
                    },
                    node,
                )
            })
        })
    }

    /// Ancestors of `id`, nearest first
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.get(id).and_then(|n| n.parent);
        while let Some(parent) = cursor {
            out.push(parent);
            cursor = self.get(parent).and_then(|n| n.parent);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PrimitiveKind;

    fn leaf(name: &str) -> MemoryNode {
        let field = FieldDescriptor::new(name, ValueKind::primitive(PrimitiveKind::U8), 0, 1);
        MemoryNode::new(Arc::new(field), None, 0)
    }

    #[test]
    fn test_insert_and_get() {
        let mut tree = NodeTree::new();
        let a = tree.insert(leaf("a"));
        let b = tree.insert(leaf("b"));
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.get(a).map(|n| n.name()), Some("a"));
        assert_eq!(tree.get(b).map(|n| n.name()), Some("b"));
    }

    #[test]
    fn test_stale_ids_never_alias() {
        let mut tree = NodeTree::new();
        let old = tree.insert(leaf("old"));
        tree.remove(old);
        let new = tree.insert(leaf("new"));

        assert_eq!(old.index(), new.index());
        assert_ne!(old, new);
        assert!(tree.get(old).is_none());
        assert_eq!(tree.get(new).map(|n| n.name()), Some("new"));
    }

    #[test]
    fn test_remove_frees_subtree() {
        let mut tree = NodeTree::new();
        let root = tree.insert(leaf("root"));
        let child = tree.insert(leaf("child"));
        let grandchild = tree.insert(leaf("grandchild"));
        tree.get_mut(root).unwrap().children.push(child);
        tree.get_mut(child).unwrap().children.push(grandchild);

        tree.clear_children(root);
        assert_eq!(tree.len(), 1);
        assert!(tree.contains(root));
        assert!(!tree.contains(grandchild));
        assert!(tree.get(root).unwrap().children().is_empty());
    }

    #[test]
    fn test_ancestors() {
        let mut tree = NodeTree::new();
        let root = tree.insert(leaf("root"));
        let mut mid = leaf("mid");
        mid.parent = Some(root);
        let mid = tree.insert(mid);
        let mut tip = leaf("tip");
        tip.parent = Some(mid);
        let tip = tree.insert(tip);

        assert_eq!(tree.ancestors(tip), vec![mid, root]);
        assert!(tree.ancestors(root).is_empty());
    }

    #[test]
    fn test_address_hint() {
        let resolved = NodeAddress::Resolved(Address::new(0x10));
        assert_eq!(resolved.into_stale(), NodeAddress::Stale(Address::new(0x10)));
        assert_eq!(resolved.into_stale().hint(), Some(Address::new(0x10)));
        assert_eq!(resolved.into_stale().resolved(), None);
        assert_eq!(NodeAddress::Unresolved.into_stale(), NodeAddress::Unresolved);
        assert_eq!(NodeAddress::Stale(Address::new(0x10)).to_string(), "0x10?");
    }
}
