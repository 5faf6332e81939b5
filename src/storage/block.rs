//! Block - the fixed-capacity unit of storage for index nodes.
//!
//! A [`Block`] is a byte buffer of at most [`BLOCK_SIZE`] bytes. Its used
//! length grows as writes extend it, so a freshly created node only
//! carries the bytes it has actually written. On disk every block occupies
//! a full zero-padded page.

use std::fmt;

use crate::common::config::BLOCK_SIZE;

/// A growable byte buffer capped at [`BLOCK_SIZE`] bytes.
///
/// All multi-byte integers stored by the index are big-endian, so the
/// `u16` helpers here are big-endian too.
///
/// # Bounds
/// Reads must stay within the bytes written so far and writes must stay
/// within `BLOCK_SIZE`. Node code sizes keys up front (see
/// [`IndexConfig::max_key_len`](crate::common::config::IndexConfig::max_key_len)),
/// so crossing either bound is a bug and panics.
///
/// # Clone Implementation
/// `Block` does NOT implement `Clone` in production code; copying a node
/// should be explicit. A `#[cfg(test)]` Clone is provided for tests.
///
/// # Example
/// ```
/// use blockidx::storage::Block;
///
/// let mut block = Block::new();
/// block.write_u16(2, 0xABCD);
/// assert_eq!(block.len(), 4);
/// assert_eq!(block.read_u16(2), 0xABCD);
/// assert_eq!(block.read_bytes(0, 2), &[0, 0]);
/// ```
pub struct Block {
    data: Vec<u8>,
}

impl Block {
    /// Create a new empty block.
    #[inline]
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Create a block holding a copy of `bytes`.
    ///
    /// # Panics
    /// Panics if `bytes` is longer than `BLOCK_SIZE`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        assert!(bytes.len() <= BLOCK_SIZE, "block overflow");
        Self {
            data: bytes.to_vec(),
        }
    }

    /// Number of bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if nothing has been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the capacity of a block.
    #[inline]
    pub const fn capacity() -> usize {
        BLOCK_SIZE
    }

    /// Get immutable slice of the written bytes.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Read `len` bytes starting at `offset`.
    ///
    /// # Panics
    /// Panics if the range extends past the written bytes.
    #[inline]
    pub fn read_bytes(&self, offset: usize, len: usize) -> &[u8] {
        assert!(offset + len <= self.data.len(), "read past end of block");
        &self.data[offset..offset + len]
    }

    /// Write `bytes` at `offset`, growing the block if needed.
    ///
    /// # Panics
    /// Panics if the write would extend past `BLOCK_SIZE`.
    pub fn write_bytes(&mut self, offset: usize, bytes: &[u8]) {
        let end = offset + bytes.len();
        self.grow_to(end);
        self.data[offset..end].copy_from_slice(bytes);
    }

    /// Read a big-endian `u16`.
    #[inline]
    pub fn read_u16(&self, offset: usize) -> u16 {
        let bytes = self.read_bytes(offset, 2);
        u16::from_be_bytes([bytes[0], bytes[1]])
    }

    /// Write a big-endian `u16`.
    #[inline]
    pub fn write_u16(&mut self, offset: usize, value: u16) {
        self.write_bytes(offset, &value.to_be_bytes());
    }

    /// Move the bytes in `start..end` right by `by` bytes, opening a gap.
    ///
    /// The gap keeps its old contents until overwritten.
    pub fn shift_right(&mut self, start: usize, end: usize, by: usize) {
        assert!(start <= end && end <= self.data.len(), "shift past end of block");
        self.grow_to(end + by);
        self.data.copy_within(start..end, start + by);
    }

    /// Zero `len` bytes starting at `offset`.
    pub fn zero(&mut self, offset: usize, len: usize) {
        let end = (offset + len).min(self.data.len());
        if offset < end {
            self.data[offset..end].fill(0);
        }
    }

    /// Copy the block into a full zero-padded page for disk I/O.
    pub fn to_page(&self) -> [u8; BLOCK_SIZE] {
        let mut page = [0u8; BLOCK_SIZE];
        page[..self.data.len()].copy_from_slice(&self.data);
        page
    }

    fn grow_to(&mut self, end: usize) {
        assert!(end <= BLOCK_SIZE, "block overflow");
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
    }
}

impl Default for Block {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block").field("len", &self.data.len()).finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================
