//! Block identifier type.

use std::fmt;

/// Identifies a block within an index file (or a data file, when stored as
/// the payload of a leaf entry).
///
/// Using `u16` because every block reference in the on-disk node layouts
/// is a 2-byte big-endian field:
/// - 65,536 blocks × 4KB = 256MB maximum index file size
///
/// Block 0 is always the metadata block of an index file. No node can
/// point at it, so sibling links use 0 as their "none" marker.
///
/// # Example
/// ```
/// use blockidx::BlockId;
///
/// let block_id = BlockId::new(42);
/// assert!(!block_id.is_metadata());
/// assert_eq!(block_id.0, 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u16);

impl BlockId {
    /// The metadata block (order + root id).
    pub const METADATA: BlockId = BlockId(0);

    /// Create a new BlockId.
    #[inline]
    pub fn new(id: u16) -> Self {
        BlockId(id)
    }

    /// Check if this is the metadata block.
    #[inline]
    pub fn is_metadata(&self) -> bool {
        *self == Self::METADATA
    }

    /// Position of this block in the block sequence.
    #[inline]
    pub fn index(&self) -> usize {
        usize::from(self.0)
    }

    /// Big-endian bytes, as stored in node layouts.
    #[inline]
    pub fn to_be_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    /// Read a big-endian block id.
    #[inline]
    pub fn from_be_bytes(bytes: [u8; 2]) -> Self {
        BlockId(u16::from_be_bytes(bytes))
    }

    /// Interpret a stored sibling link, where 0 means "no sibling".
    #[inline]
    pub fn as_link(self) -> Option<BlockId> {
        if self.is_metadata() {
            None
        } else {
            Some(self)
        }
    }
}

impl From<u16> for BlockId {
    fn from(id: u16) -> Self {
        BlockId(id)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_metadata() {
            write!(f, "Block(META)")
        } else {
            write!(f, "Block({})", self.0)
        }
    }
}
