//! Configuration constants and per-index settings.

use crate::common::{Error, Result};
use crate::index::btree::KeyType;

/// Size of a block in bytes (4KB).
///
/// Every node of an index file lives in exactly one block, and the
/// [`DiskManager`](crate::storage::DiskManager) stores block `N` at file
/// offset `N × BLOCK_SIZE`.
pub const BLOCK_SIZE: usize = 4096;

/// Block ids are 2 bytes wide on disk, so an index file holds at most
/// 65,536 blocks (including the metadata block).
pub const MAX_BLOCKS: usize = (u16::MAX as usize) + 1;

/// Smallest order that still lets a split leave both halves non-empty.
pub const MIN_ORDER: u16 = 3;

/// Order used when the caller has no preference.
pub const DEFAULT_ORDER: u16 = 64;

/// Bytes taken by the leaf header (`num_entries | prev | next | free_offset`).
///
/// The leaf header is larger than the internal one, so it bounds the key
/// length for both node kinds.
const LEAF_HEADER_SIZE: usize = 8;

/// Per-entry overhead in a leaf (`data_block_id | key_len`).
const ENTRY_OVERHEAD: usize = 4;

/// Widest fixed-width key encoding (i64, f64, timestamp).
const WIDEST_FIXED_KEY: usize = 8;

/// Settings for a single B+ tree index.
///
/// # Example
/// ```
/// use blockidx::common::config::IndexConfig;
/// use blockidx::index::btree::KeyType;
///
/// let config = IndexConfig::new(4, KeyType::Int32);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.max_key_len(), 1358);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexConfig {
    /// Maximum number of children per internal node.
    pub order: u16,
    /// Type of every key stored in the index.
    pub key_type: KeyType,
}

impl IndexConfig {
    /// Create a config. Call [`validate`](Self::validate) before use.
    pub fn new(order: u16, key_type: KeyType) -> Self {
        Self { order, key_type }
    }

    /// Settings for `key_type` at [`DEFAULT_ORDER`].
    pub fn for_key_type(key_type: KeyType) -> Self {
        Self::new(DEFAULT_ORDER, key_type)
    }

    /// Maximum number of keys a node may hold.
    #[inline]
    pub fn max_keys(&self) -> usize {
        usize::from(self.order) - 1
    }

    /// Longest encoded key that still lets a full leaf fit in one block.
    pub fn max_key_len(&self) -> usize {
        let per_entry = (BLOCK_SIZE - LEAF_HEADER_SIZE) / self.max_keys().max(1);
        per_entry.saturating_sub(ENTRY_OVERHEAD)
    }

    /// Check that the order is usable.
    ///
    /// # Errors
    /// Returns `Error::InvalidOrder` if the order is below [`MIN_ORDER`] or
    /// so large that a full leaf of 8-byte keys would not fit in a block.
    pub fn validate(&self) -> Result<()> {
        if self.order < MIN_ORDER || self.max_key_len() < WIDEST_FIXED_KEY {
            return Err(Error::InvalidOrder(self.order));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_size_is_power_of_two() {
        assert!(BLOCK_SIZE.is_power_of_two());
        assert_eq!(BLOCK_SIZE, 4096);
    }

    #[test]
    fn test_max_blocks_matches_u16_ids() {
        assert_eq!(MAX_BLOCKS, 65536);
    }

    #[test]
    fn test_default_order_valid_for_every_key_type() {
        for key_type in KeyType::ALL {
            let config = IndexConfig::for_key_type(key_type);
            assert_eq!(config.order, DEFAULT_ORDER);
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn test_order_below_minimum_rejected() {
        for order in 0..MIN_ORDER {
            let config = IndexConfig::new(order, KeyType::Int64);
            assert!(matches!(config.validate(), Err(Error::InvalidOrder(o)) if o == order));
        }
    }

    #[test]
    fn test_huge_order_rejected() {
        // (4096 - 8) / 340 - 4 = 8 still fits an i64; 400 does not.
        assert!(IndexConfig::new(341, KeyType::Int64).validate().is_ok());
        assert!(IndexConfig::new(400, KeyType::Int64).validate().is_err());
    }

    #[test]
    fn test_max_key_len() {
        // order 3: two entries per leaf, (4088 / 2) - 4
        assert_eq!(IndexConfig::new(3, KeyType::Text).max_key_len(), 2040);
        assert_eq!(IndexConfig::new(4, KeyType::Text).max_key_len(), 1358);
    }
}
