//! Leaf node - sorted `(key, data_block_id)` entries in one block.

use crate::common::{BlockId, Result};
use crate::index::btree::key::{Key, KeyType};
use crate::storage::Block;

/// A B+ tree leaf stored in a single block.
///
/// # Layout
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       2     num_entries
/// 2       2     prev sibling block id (0 = none)
/// 4       2     next sibling block id (0 = none)
/// 6       2     free_offset (next unused byte)
/// 8       ...   entries: data_block_id(2) | key_len(2) | key bytes
/// ```
/// All fields are big-endian. Entries are packed back to back in key
/// order, so every access is a linear pass from offset 8.
///
/// The parent block id lives only in memory; it is not part of the layout.
#[derive(Debug)]
pub struct LeafNode {
    block: Block,
    key_type: KeyType,
    parent: Option<BlockId>,
}

/// An entry located inside the block, not yet decoded.
struct RawEntry<'a> {
    offset: usize,
    data_block_id: BlockId,
    key: &'a [u8],
}

impl LeafNode {
    const OFFSET_NUM_ENTRIES: usize = 0;
    const OFFSET_PREV: usize = 2;
    const OFFSET_NEXT: usize = 4;
    const OFFSET_FREE: usize = 6;

    /// Size of the header; the first entry starts here.
    pub const HEADER_SIZE: usize = 8;

    /// Bytes per entry besides the key itself.
    pub const ENTRY_OVERHEAD: usize = 4;

    /// Create an empty leaf with no siblings.
    pub fn new(key_type: KeyType) -> Self {
        let mut block = Block::new();
        block.write_u16(Self::OFFSET_NUM_ENTRIES, 0);
        block.write_u16(Self::OFFSET_PREV, 0);
        block.write_u16(Self::OFFSET_NEXT, 0);
        block.write_u16(Self::OFFSET_FREE, Self::HEADER_SIZE as u16);

        Self {
            block,
            key_type,
            parent: None,
        }
    }

    /// Wrap a block that already holds a leaf.
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

    /// Number of entries.
    #[inline]
    pub fn num_keys(&self) -> usize {
        usize::from(self.block.read_u16(Self::OFFSET_NUM_ENTRIES))
    }

    /// Offset of the first unused byte.
    #[inline]
    pub fn free_offset(&self) -> usize {
        usize::from(self.block.read_u16(Self::OFFSET_FREE))
    }

    /// Previous leaf in key order.
    #[inline]
    pub fn prev(&self) -> Option<BlockId> {
        BlockId::new(self.block.read_u16(Self::OFFSET_PREV)).as_link()
    }

    /// Next leaf in key order.
    #[inline]
    pub fn next(&self) -> Option<BlockId> {
        BlockId::new(self.block.read_u16(Self::OFFSET_NEXT)).as_link()
    }

    pub fn set_prev(&mut self, prev: Option<BlockId>) {
        let id = prev.unwrap_or(BlockId::METADATA);
        self.block.write_u16(Self::OFFSET_PREV, id.0);
    }

    pub fn set_next(&mut self, next: Option<BlockId>) {
        let id = next.unwrap_or(BlockId::METADATA);
        self.block.write_u16(Self::OFFSET_NEXT, id.0);
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

    /// Insert an entry in key order.
    ///
    /// The entry goes before the first stored key strictly greater than
    /// `key`, so existing equal keys stay ahead of it. The caller must make
    /// sure the node is not full.
    ///
    /// # Errors
    /// Returns `Error::KeyTypeMismatch` if `key` is not of the node's type,
    /// or `Error::MalformedKey` if a stored key cannot be decoded.
    pub fn insert(&mut self, key: &Key, data_block_id: BlockId) -> Result<()> {
        let key_bytes = self.key_type.encode(key)?;
        let free = self.free_offset();

        let mut offset = free;
        for entry in self.raw_entries() {
            if *key < self.key_type.decode(entry.key)? {
                offset = entry.offset;
                break;
            }
        }

        let entry_len = Self::ENTRY_OVERHEAD + key_bytes.len();
        self.block.shift_right(offset, free, entry_len);
        self.block.write_bytes(offset, &data_block_id.to_be_bytes());
        self.block.write_u16(offset + 2, key_bytes.len() as u16);
        self.block.write_bytes(offset + 4, &key_bytes);

        let num = self.num_keys() + 1;
        self.block.write_u16(Self::OFFSET_NUM_ENTRIES, num as u16);
        self.block.write_u16(Self::OFFSET_FREE, (free + entry_len) as u16);
        Ok(())
    }

    /// Keys in stored (ascending) order.
    pub fn keys(&self) -> Result<Vec<Key>> {
        self.raw_entries()
            .map(|entry| self.key_type.decode(entry.key))
            .collect()
    }

    /// Data block ids in stored order.
    pub fn block_ids(&self) -> Vec<BlockId> {
        self.raw_entries().map(|entry| entry.data_block_id).collect()
    }

    /// Decoded `(key, data_block_id)` pairs in stored order.
    pub fn entries(&self) -> Result<Vec<(Key, BlockId)>> {
        self.raw_entries()
            .map(|entry| Ok((self.key_type.decode(entry.key)?, entry.data_block_id)))
            .collect()
    }

    /// Keep only the first `n` entries.
    ///
    /// Freed bytes are zeroed and the free cursor moves back.
    ///
    /// # Panics
    /// Panics if `n` exceeds the number of entries.
    pub fn remove_all_from(&mut self, n: usize) {
        let num = self.num_keys();
        assert!(n <= num, "cannot keep {} of {} entries", n, num);

        let cut = self
            .raw_entries()
            .nth(n)
            .map_or(self.free_offset(), |entry| entry.offset);
        let free = self.free_offset();

        self.block.zero(cut, free - cut);
        self.block.write_u16(Self::OFFSET_FREE, cut as u16);
        self.block.write_u16(Self::OFFSET_NUM_ENTRIES, n as u16);
    }

    /// Data block id of the first entry whose key is `>= key`.
    ///
    /// This is positional; it does not confirm an exact match.
    pub fn search(&self, key: &Key) -> Result<Option<BlockId>> {
        for entry in self.raw_entries() {
            if *key <= self.key_type.decode(entry.key)? {
                return Ok(Some(entry.data_block_id));
            }
        }
        Ok(None)
    }

    /// Check for an entry whose key equals `key`.
    pub fn contains(&self, key: &Key) -> Result<bool> {
        for entry in self.raw_entries() {
            if *key == self.key_type.decode(entry.key)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn raw_entries(&self) -> impl Iterator<Item = RawEntry<'_>> + '_ {
        let mut offset = Self::HEADER_SIZE;
        (0..self.num_keys()).map(move |_| {
            let data_block_id = BlockId::new(self.block.read_u16(offset));
            let key_len = usize::from(self.block.read_u16(offset + 2));
            let entry = RawEntry {
                offset,
                data_block_id,
                key: self.block.read_bytes(offset + 4, key_len),
            };
            offset += Self::ENTRY_OVERHEAD + key_len;
            entry
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
