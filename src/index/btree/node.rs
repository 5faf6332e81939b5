//! Node variants - what a block of an index file decodes to.
//!
//! Every block is exactly one of:
//! - [`MetaNode`] - block 0, holding the order and the root block id
//! - [`LeafNode`] - key entries plus sibling links
//! - [`InternalNode`] - separators plus child links
//!
//! The on-disk layouts carry no kind tag, so the kind is tracked by the
//! [`Node`] enum while the file is open and recovered from tree shape when
//! it is loaded.

use crate::common::{BlockId, Result};
use crate::index::btree::internal_node::InternalNode;
use crate::index::btree::key::Key;
use crate::index::btree::leaf_node::LeafNode;
use crate::storage::Block;

/// Discriminator for the three block kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Meta,
    Leaf,
    Internal,
}

/// Block 0 of an index file.
///
/// # Layout (4 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       2     order (big-endian)
/// 2       2     root_block_id (big-endian)
/// ```
#[derive(Debug)]
pub struct MetaNode {
    block: Block,
}

impl MetaNode {
    const OFFSET_ORDER: usize = 0;
    const OFFSET_ROOT: usize = 2;

    /// Size of the metadata fields.
    pub const SIZE: usize = 4;

    pub fn new(order: u16, root: BlockId) -> Self {
        let mut block = Block::new();
        block.write_u16(Self::OFFSET_ORDER, order);
        block.write_u16(Self::OFFSET_ROOT, root.0);
        Self { block }
    }

    /// Wrap a block that already holds metadata.
    pub fn from_block(block: Block) -> Self {
        Self { block }
    }

    #[inline]
    pub fn block(&self) -> &Block {
        &self.block
    }

    /// Maximum number of children per internal node.
    #[inline]
    pub fn order(&self) -> u16 {
        self.block.read_u16(Self::OFFSET_ORDER)
    }

    /// Current root block.
    #[inline]
    pub fn root(&self) -> BlockId {
        BlockId::new(self.block.read_u16(Self::OFFSET_ROOT))
    }

    pub fn set_root(&mut self, root: BlockId) {
        self.block.write_u16(Self::OFFSET_ROOT, root.0);
    }
}

/// A decoded block of an index file.
#[derive(Debug)]
pub enum Node {
    Meta(MetaNode),
    Leaf(LeafNode),
    Internal(InternalNode),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Meta(_) => NodeKind::Meta,
            Node::Leaf(_) => NodeKind::Leaf,
            Node::Internal(_) => NodeKind::Internal,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// The underlying block.
    pub fn block(&self) -> &Block {
        match self {
            Node::Meta(meta) => meta.block(),
            Node::Leaf(leaf) => leaf.block(),
            Node::Internal(internal) => internal.block(),
        }
    }

    /// Number of keys held (0 for the metadata block).
    pub fn num_keys(&self) -> usize {
        match self {
            Node::Meta(_) => 0,
            Node::Leaf(leaf) => leaf.num_keys(),
            Node::Internal(internal) => internal.num_keys(),
        }
    }

    /// Keys held, in stored order (empty for the metadata block).
    pub fn keys(&self) -> Result<Vec<Key>> {
        match self {
            Node::Meta(_) => Ok(Vec::new()),
            Node::Leaf(leaf) => leaf.keys(),
            Node::Internal(internal) => internal.keys(),
        }
    }

    /// In-memory parent link.
    pub fn parent(&self) -> Option<BlockId> {
        match self {
            Node::Meta(_) => None,
            Node::Leaf(leaf) => leaf.parent(),
            Node::Internal(internal) => internal.parent(),
        }
    }

    /// Set the in-memory parent link.
    ///
    /// # Panics
    /// Panics on the metadata block, which is never part of the tree.
    pub fn set_parent(&mut self, parent: Option<BlockId>) {
        match self {
            Node::Meta(_) => panic!("metadata block has no parent"),
            Node::Leaf(leaf) => leaf.set_parent(parent),
            Node::Internal(internal) => internal.set_parent(parent),
        }
    }

    pub fn as_leaf(&self) -> Option<&LeafNode> {
        match self {
            Node::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    pub fn as_internal(&self) -> Option<&InternalNode> {
        match self {
            Node::Internal(internal) => Some(internal),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::btree::KeyType;

    #[test]
    fn test_meta_layout() {
        let meta = MetaNode::new(4, BlockId::new(1));
        assert_eq!(meta.block().as_slice(), &[0, 4, 0, 1]);
        assert_eq!(meta.order(), 4);
        assert_eq!(meta.root(), BlockId::new(1));
    }

    #[test]
    fn test_meta_set_root() {
        let mut meta = MetaNode::new(300, BlockId::new(1));
        meta.set_root(BlockId::new(0x0203));
        assert_eq!(meta.block().as_slice(), &[0x01, 0x2C, 0x02, 0x03]);
        assert_eq!(meta.order(), 300);
    }

    #[test]
    fn test_node_kinds() {
        let meta = Node::Meta(MetaNode::new(4, BlockId::new(1)));
        let leaf = Node::Leaf(LeafNode::new(KeyType::Int32));
        let internal = Node::Internal(
            InternalNode::new(KeyType::Int32, &Key::from(1i32), BlockId::new(1), BlockId::new(2)).unwrap(),
        );

        assert_eq!(meta.kind(), NodeKind::Meta);
        assert_eq!(leaf.kind(), NodeKind::Leaf);
        assert_eq!(internal.kind(), NodeKind::Internal);
        assert!(leaf.is_leaf());
        assert!(leaf.as_leaf().is_some());
        assert!(leaf.as_internal().is_none());
        assert_eq!(internal.num_keys(), 1);
        assert_eq!(meta.keys().unwrap(), Vec::<Key>::new());
    }

    #[test]
    fn test_parent_links() {
        let mut leaf = Node::Leaf(LeafNode::new(KeyType::Int32));
        assert_eq!(leaf.parent(), None);
        leaf.set_parent(Some(BlockId::new(9)));
        assert_eq!(leaf.parent(), Some(BlockId::new(9)));
    }

    #[test]
    #[should_panic(expected = "metadata block has no parent")]
    fn test_meta_parent_panics() {
        let mut meta = Node::Meta(MetaNode::new(4, BlockId::new(1)));
        meta.set_parent(Some(BlockId::new(1)));
    }
}
