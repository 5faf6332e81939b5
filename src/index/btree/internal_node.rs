//! Internal node - separator keys and child block ids in one block.

use crate::common::{BlockId, Result};
use crate::index::btree::key::{Key, KeyType};
use crate::storage::Block;

/// A B+ tree internal node stored in a single block.
///
/// # Layout
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       2     num_keys
/// 2       2     free_offset (next unused byte)
/// 4       2     child_0 block id
/// 6       ...   key_len(2) | key bytes | child_{i+1}(2), repeated
/// ```
/// All fields are big-endian. A node with `n` keys has `n + 1` children;
/// child `i` holds keys below separator `i`, and child `i + 1` holds keys
/// from separator `i` up.
///
/// The parent block id lives only in memory; it is not part of the layout.
#[derive(Debug)]
pub struct InternalNode {
    block: Block,
    key_type: KeyType,
    parent: Option<BlockId>,
}

/// A separator located inside the block, not yet decoded.
struct RawSeparator<'a> {
    /// Offset of the `key_len` field.
    offset: usize,
    key: &'a [u8],
    right_child: BlockId,
}

impl InternalNode {
    const OFFSET_NUM_KEYS: usize = 0;
    const OFFSET_FREE: usize = 2;
    const OFFSET_FIRST_CHILD: usize = 4;

    /// Size of the fixed part; the first separator starts here.
    pub const HEADER_SIZE: usize = 6;

    /// Bytes per separator besides the key itself.
    pub const ENTRY_OVERHEAD: usize = 4;

    /// Create a node with one separator and two children.
    ///
    /// # Errors
    /// Returns `Error::KeyTypeMismatch` if `key` is not of type `key_type`.
    pub fn new(key_type: KeyType, key: &Key, left: BlockId, right: BlockId) -> Result<Self> {
        let mut block = Block::new();
        block.write_u16(Self::OFFSET_NUM_KEYS, 0);
        block.write_u16(Self::OFFSET_FREE, Self::HEADER_SIZE as u16);
        block.write_u16(Self::OFFSET_FIRST_CHILD, left.0);

        let mut node = Self {
            block,
            key_type,
            parent: None,
        };
        node.insert(key, right)?;
        Ok(node)
    }

    /// Wrap a block that already holds an internal node.
    pub fn from_block(block: Block, key_type: KeyType) -> Self {
        Self {
            block,
            key_type,
            parent: None,
        }
    }

    /// The underlying block.
    #[inline]
    pub fn block(&self) -> &Block {
        &self.block
    }

    /// Number of separator keys.
    #[inline]
    pub fn num_keys(&self) -> usize {
        usize::from(self.block.read_u16(Self::OFFSET_NUM_KEYS))
    }

    /// Offset of the first unused byte.
    #[inline]
    pub fn free_offset(&self) -> usize {
        usize::from(self.block.read_u16(Self::OFFSET_FREE))
    }

    /// Parent internal node, if known.
    #[inline]
    pub fn parent(&self) -> Option<BlockId> {
        self.parent
    }

    #[inline]
    pub fn set_parent(&mut self, parent: Option<BlockId>) {
        self.parent = parent;
    }

    /// Splice a separator and the child to its right into key order.
    ///
    /// The pair goes before the first separator strictly greater than
    /// `key`. The caller must make sure the node is not full.
    pub fn insert(&mut self, key: &Key, right_child: BlockId) -> Result<()> {
        let (slot, _) = self.search_slot(key)?;
        self.insert_at(slot, key, right_child)
    }

    /// Make `key` separator number `slot`, with `right_child` directly to
    /// its right.
    ///
    /// After a child at position `slot` splits, this places its new right
    /// sibling next to it even when neighbouring separators equal `key`.
    ///
    /// # Panics
    /// Panics if `slot` exceeds the number of separators.
    pub fn insert_at(&mut self, slot: usize, key: &Key, right_child: BlockId) -> Result<()> {
        let num = self.num_keys();
        assert!(slot <= num, "slot {} is past {} separators", slot, num);

        let key_bytes = self.key_type.encode(key)?;
        let free = self.free_offset();
        let offset = self.raw_separators().nth(slot).map_or(free, |sep| sep.offset);

        let entry_len = Self::ENTRY_OVERHEAD + key_bytes.len();
        self.block.shift_right(offset, free, entry_len);
        self.block.write_u16(offset, key_bytes.len() as u16);
        self.block.write_bytes(offset + 2, &key_bytes);
        self.block
            .write_bytes(offset + 2 + key_bytes.len(), &right_child.to_be_bytes());

        self.block.write_u16(Self::OFFSET_NUM_KEYS, (num + 1) as u16);
        self.block.write_u16(Self::OFFSET_FREE, (free + entry_len) as u16);
        Ok(())
    }

    /// Separator keys in stored (ascending) order.
    pub fn keys(&self) -> Result<Vec<Key>> {
        self.raw_separators()
            .map(|sep| self.key_type.decode(sep.key))
            .collect()
    }

    /// The `num_keys + 1` child block ids, left to right.
    pub fn children(&self) -> Vec<BlockId> {
        let first = BlockId::new(self.block.read_u16(Self::OFFSET_FIRST_CHILD));
        std::iter::once(first)
            .chain(self.raw_separators().map(|sep| sep.right_child))
            .collect()
    }

    /// Keep the first `n` separators and the first `n + 1` children.
    ///
    /// # Panics
    /// Panics if `n` exceeds the number of separators.
    pub fn remove_all_from(&mut self, n: usize) {
        let num = self.num_keys();
        assert!(n <= num, "cannot keep {} of {} separators", n, num);

        let cut = self
            .raw_separators()
            .nth(n)
            .map_or(self.free_offset(), |sep| sep.offset);
        let free = self.free_offset();

        self.block.zero(cut, free - cut);
        self.block.write_u16(Self::OFFSET_FREE, cut as u16);
        self.block.write_u16(Self::OFFSET_NUM_KEYS, n as u16);
    }

    /// Child to descend into for `key`: the child left of the first
    /// separator greater than `key`, or the last child.
    pub fn search(&self, key: &Key) -> Result<BlockId> {
        Ok(self.search_slot(key)?.1)
    }

    /// Like [`search`](Self::search), also returning the child's position.
    pub fn search_slot(&self, key: &Key) -> Result<(usize, BlockId)> {
        self.child_before(|sep| *key < *sep)
    }

    /// Child left of the first separator `>= key`.
    ///
    /// With duplicate keys spread over several leaves this reaches the
    /// leftmost leaf that can hold `key`.
    pub fn lower_bound_child(&self, key: &Key) -> Result<BlockId> {
        Ok(self.lower_bound_slot(key)?.1)
    }

    /// Like [`lower_bound_child`](Self::lower_bound_child), also returning
    /// the child's position.
    pub fn lower_bound_slot(&self, key: &Key) -> Result<(usize, BlockId)> {
        self.child_before(|sep| *key <= *sep)
    }

    fn child_before(&self, stop: impl Fn(&Key) -> bool) -> Result<(usize, BlockId)> {
        let mut slot = 0;
        let mut child = BlockId::new(self.block.read_u16(Self::OFFSET_FIRST_CHILD));
        for sep in self.raw_separators() {
            if stop(&self.key_type.decode(sep.key)?) {
                break;
            }
            slot += 1;
            child = sep.right_child;
        }
        Ok((slot, child))
    }

    fn raw_separators(&self) -> impl Iterator<Item = RawSeparator<'_>> + '_ {
        let mut offset = Self::HEADER_SIZE;
        (0..self.num_keys()).map(move |_| {
            let key_len = usize::from(self.block.read_u16(offset));
            let sep = RawSeparator {
                offset,
                key: self.block.read_bytes(offset + 2, key_len),
                right_child: BlockId::new(self.block.read_u16(offset + 2 + key_len)),
            };
            offset += Self::ENTRY_OVERHEAD + key_len;
            sep
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn bid(id: u16) -> BlockId {
        BlockId::new(id)
    }

    /// Node with separators 10, 20, 30 over children 1, 2, 3, 4.
    fn sample() -> InternalNode {
        let mut node = InternalNode::new(KeyType::Int32, &Key::from(20i32), bid(1), bid(3)).unwrap();
        node.insert(&Key::from(30i32), bid(4)).unwrap();
        // Inserting 10 with right child 2 lands before 20
        node.insert(&Key::from(10i32), bid(2)).unwrap();
        node
    }

    fn ints(keys: &[i32]) -> Vec<Key> {
        keys.iter().map(|&k| Key::from(k)).collect()
    }

    #[test]
    fn test_new_node_layout() {
        let node = InternalNode::new(KeyType::Int16, &Key::from(0x0506i16), bid(1), bid(2)).unwrap();

        assert_eq!(node.num_keys(), 1);
        assert_eq!(node.parent(), None);
        assert_eq!(
            node.block().as_slice(),
            &[
                0, 1, // num_keys
                0, 12, // free_offset
                0, 1, // child_0
                0, 2, // key_len
                0x05, 0x06, // key
                0, 2, // child_1
            ]
        );
    }

    #[test]
    fn test_insert_sorted_position() {
        let node = sample();
        assert_eq!(node.keys().unwrap(), ints(&[10, 20, 30]));
        assert_eq!(node.children(), vec![bid(1), bid(2), bid(3), bid(4)]);
        assert_eq!(node.free_offset(), 6 + 3 * 8);
    }

    #[test]
    fn test_search_upper_bound() {
        let node = sample();
        assert_eq!(node.search(&Key::from(5i32)).unwrap(), bid(1));
        assert_eq!(node.search(&Key::from(10i32)).unwrap(), bid(2));
        assert_eq!(node.search(&Key::from(15i32)).unwrap(), bid(2));
        assert_eq!(node.search(&Key::from(20i32)).unwrap(), bid(3));
        assert_eq!(node.search(&Key::from(30i32)).unwrap(), bid(4));
        assert_eq!(node.search(&Key::from(99i32)).unwrap(), bid(4));
    }

    #[test]
    fn test_lower_bound_child() {
        let node = sample();
        assert_eq!(node.lower_bound_child(&Key::from(10i32)).unwrap(), bid(1));
        assert_eq!(node.lower_bound_child(&Key::from(11i32)).unwrap(), bid(2));
        assert_eq!(node.lower_bound_child(&Key::from(30i32)).unwrap(), bid(3));
        assert_eq!(node.lower_bound_child(&Key::from(31i32)).unwrap(), bid(4));
    }

    #[test]
    fn test_search_slot_counts_separators_passed() {
        let node = sample();
        assert_eq!(node.search_slot(&Key::from(5i32)).unwrap(), (0, bid(1)));
        assert_eq!(node.search_slot(&Key::from(20i32)).unwrap(), (2, bid(3)));
        assert_eq!(node.lower_bound_slot(&Key::from(20i32)).unwrap(), (1, bid(2)));
        assert_eq!(node.search_slot(&Key::from(99i32)).unwrap(), (3, bid(4)));
    }

    #[test]
    fn test_insert_at_between_equal_separators() {
        // Separators 5 5 over children 1 2 3; child 1 splits off child 9
        let mut node = InternalNode::new(KeyType::Int32, &Key::from(5i32), bid(1), bid(2)).unwrap();
        node.insert(&Key::from(5i32), bid(3)).unwrap();
        node.insert_at(0, &Key::from(5i32), bid(9)).unwrap();

        assert_eq!(node.keys().unwrap(), ints(&[5, 5, 5]));
        assert_eq!(node.children(), vec![bid(1), bid(9), bid(2), bid(3)]);
        assert_eq!(node.free_offset(), 6 + 3 * 8);
    }

    #[test]
    fn test_insert_at_end() {
        let mut node = sample();
        node.remove_all_from(1);
        node.insert_at(1, &Key::from(40i32), bid(7)).unwrap();

        assert_eq!(node.keys().unwrap(), ints(&[10, 40]));
        assert_eq!(node.children(), vec![bid(1), bid(2), bid(7)]);
    }

    #[test]
    #[should_panic(expected = "slot 4 is past 3 separators")]
    fn test_insert_at_past_end_panics() {
        let mut node = sample();
        let _ = node.insert_at(4, &Key::from(1i32), bid(9));
    }

    #[test]
    fn test_remove_all_from() {
        let mut node = sample();
        node.remove_all_from(1);

        assert_eq!(node.keys().unwrap(), ints(&[10]));
        assert_eq!(node.children(), vec![bid(1), bid(2)]);
        assert_eq!(node.free_offset(), 6 + 8);

        let tail = node.block().as_slice()[node.free_offset()..].to_vec();
        assert!(tail.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_remove_all_from_zero_keeps_first_child() {
        let mut node = sample();
        node.remove_all_from(0);

        assert_eq!(node.num_keys(), 0);
        assert_eq!(node.children(), vec![bid(1)]);
        assert_eq!(node.free_offset(), 6);
    }

    #[test]
    fn test_text_separators() {
        let mut node = InternalNode::new(KeyType::Text, &Key::from("m"), bid(1), bid(2)).unwrap();
        node.insert(&Key::from("delta"), bid(3)).unwrap();
        node.insert(&Key::from("zulu"), bid(4)).unwrap();

        assert_eq!(
            node.keys().unwrap(),
            vec![Key::from("delta"), Key::from("m"), Key::from("zulu")]
        );
        assert_eq!(node.children(), vec![bid(1), bid(3), bid(2), bid(4)]);
        assert_eq!(node.search(&Key::from("alpha")).unwrap(), bid(1));
        assert_eq!(node.search(&Key::from("kilo")).unwrap(), bid(3));
        assert_eq!(node.search(&Key::from("zz")).unwrap(), bid(4));
    }

    #[test]
    fn test_new_with_wrong_type_fails() {
        assert!(InternalNode::new(KeyType::Int32, &Key::from(1i64), bid(1), bid(2)).is_err());
    }

    #[test]
    fn test_from_block_round_trip() {
        let node = sample();
        let copy = InternalNode::from_block(Block::from_bytes(&node.block().to_page()), KeyType::Int32);
        assert_eq!(copy.keys().unwrap(), node.keys().unwrap());
        assert_eq!(copy.children(), node.children());
    }
}
