//! Error types for blockidx.

use thiserror::Error;

use crate::index::btree::KeyType;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All recoverable errors in blockidx.
///
/// A search that finds nothing is not an error (it returns `None`), and
/// broken internal invariants (descending into the metadata block,
/// overflowing a block) panic instead of surfacing here.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested block does not exist on disk.
    #[error("Block {0} not found")]
    BlockNotFound(u16),

    /// A column type name or tag that no key codec exists for.
    #[error("Unsupported key type: {0}")]
    UnsupportedKeyType(String),

    /// A key whose type differs from the type the index was created with.
    #[error("Key type mismatch: index holds {expected} keys, got {actual}")]
    KeyTypeMismatch { expected: KeyType, actual: KeyType },

    /// Stored key bytes that cannot be decoded as the declared type.
    #[error("Malformed {key_type} key ({len} bytes)")]
    MalformedKey { key_type: KeyType, len: usize },

    /// Encoded key longer than a full node can hold.
    #[error("Key of {len} bytes exceeds maximum of {max} bytes")]
    KeyTooLarge { len: usize, max: usize },

    /// The tree order is outside the usable range.
    #[error("Invalid order: {0}")]
    InvalidOrder(u16),

    /// Every 2-byte block id is in use.
    #[error("Index file is full")]
    IndexFull,

    /// Operation the engine does not implement.
    #[error("Operation not implemented: {0}")]
    Unimplemented(&'static str),

    /// An index already exists for this column.
    #[error("Index on {table}.{column} already exists")]
    IndexExists { table: String, column: String },

    /// No index exists for this column.
    #[error("Index on {table}.{column} not found")]
    IndexNotFound { table: String, column: String },

    /// A structural check over the tree failed.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}
