//! Plain-text rendering of a bound tree
//!
//! One line per node, indented by depth:
//!
//! ```text
//! Vec3: Vec3 @ 0x1000
//!   x: f32 @ 0x1000 = 1.0
//!   y: f32 @ 0x1004 = ??  (read failed: address 0x1004 is not mapped)
//! ```
//!
//! Invalid nodes always show `??` so a failed read is never mistaken for a
//! real zero.

use crate::binding::Binding;
use crate::core::types::{Address, Fault};
use crate::memory::MemoryAccessor;
use crate::tree::{NodeId, NodeTree, NodeValue};
use std::collections::HashSet;
use std::fmt::Write;

/// Presentation state kept by the caller across ticks
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Append the bytes currently in memory behind every scalar
    ///
    /// The column is read at render time, so between ticks it can differ
    /// from the value decoded by the last pass; it is labelled `live`.
    pub hex: bool,
    /// Nodes whose children are hidden
    pub collapsed: HashSet<NodeId>,
}

impl RenderOptions {
    pub fn with_hex(mut self, hex: bool) -> Self {
        self.hex = hex;
        self
    }

    /// Flips a node between expanded and collapsed
    pub fn toggle(&mut self, id: NodeId) {
        if !self.collapsed.remove(&id) {
            self.collapsed.insert(id);
        }
    }
}

/// Renders the whole tree of `binding`
pub fn render<M: MemoryAccessor>(binding: &Binding<'_, M>, options: &RenderOptions) -> String {
    let mut out = String::new();
    let memory = options.hex.then(|| binding.memory());
    render_node(
        &mut out,
        binding.tree(),
        binding.root(),
        0,
        options,
        memory,
        binding.codec().pointer_width(),
    );
    out
}

/// Renders the subtree at `root` without raw bytes
pub fn render_tree(tree: &NodeTree, root: NodeId, options: &RenderOptions) -> String {
    let mut out = String::new();
    render_node::<NoMemory>(&mut out, tree, root, 0, options, None, 8);
    out
}

/// The value column for a node
pub fn format_value(value: &NodeValue) -> String {
    match value {
        NodeValue::Scalar(value) => value.to_string(),
        NodeValue::Container => String::new(),
        NodeValue::Null => "null".to_string(),
        NodeValue::Cyclic(address) => format!("<cycle to {}>", address),
        NodeValue::Invalid(reason) => format!("??  ({})", reason),
    }
}

fn render_node<M: MemoryAccessor + ?Sized>(
    out: &mut String,
    tree: &NodeTree,
    id: NodeId,
    indent: usize,
    options: &RenderOptions,
    memory: Option<&M>,
    pointer_width: usize,
) {
    let Some(node) = tree.get(id) else {
        return;
    };

    let _ = write!(
        out,
        "{:indent$}{}: {} @ {}",
        "",
        node.name(),
        node.kind(),
        node.address(),
        indent = indent * 2
    );
    let value = format_value(node.value());
    if !value.is_empty() {
        let _ = write!(out, " = {}", value);
    }

    if let (Some(memory), NodeValue::Scalar(_), Some(address)) =
        (memory, node.value(), node.address().resolved())
    {
        if let Some(width) = node.kind().scalar_width(pointer_width) {
            if let Ok(bytes) = memory.read(address, width) {
                let _ = write!(out, "  live [{}]", hex::encode(bytes));
            }
        }
    }

    let collapsed = options.collapsed.contains(&id);
    if collapsed && !node.children().is_empty() {
        out.push_str(" [+]");
    }
    out.push('\n');

    if !collapsed {
        for child in node.children() {
            render_node(out, tree, *child, indent + 1, options, memory, pointer_width);
        }
    }
}

/// Stand-in accessor type for rendering without memory access
enum NoMemory {}

impl MemoryAccessor for NoMemory {
    fn read(&self, _address: Address, _length: usize) -> Result<Vec<u8>, Fault> {
        match *self {}
    }

    fn write(&self, _address: Address, _bytes: &[u8]) -> Result<(), Fault> {
        match *self {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{DecodeError, MemoryValue, NodeError, PrimitiveKind, ValueKind};
    use crate::schema::FieldDescriptor;
    use crate::tree::MemoryNode;
    use std::sync::Arc;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&NodeValue::Scalar(MemoryValue::F32(1.0))), "1.0");
        assert_eq!(format_value(&NodeValue::Null), "null");
        assert_eq!(
            format_value(&NodeValue::Cyclic(Address::new(0x10))),
            "<cycle to 0x10>"
        );
        assert_eq!(
            format_value(&NodeValue::Invalid(NodeError::Decode(DecodeError::Fault(
                Fault::Unmapped {
                    address: Address::new(0x20)
                }
            )))),
            "??  (read failed: address 0x20 is not mapped)"
        );
        assert_eq!(format_value(&NodeValue::Container), "");
    }

    #[test]
    fn test_toggle() {
        let mut tree = NodeTree::new();
        let field = FieldDescriptor::new("x", ValueKind::primitive(PrimitiveKind::U8), 0, 1);
        let id = tree.insert(MemoryNode::new(Arc::new(field), None, 0));

        let mut options = RenderOptions::default();
        options.toggle(id);
        assert!(options.collapsed.contains(&id));
        options.toggle(id);
        assert!(options.collapsed.is_empty());
    }
}
