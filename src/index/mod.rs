//! Index structures.
//!
//! - [`btree`] - the block-resident B+ tree
//! - [`IndexRegistry`] - indexes keyed by `(table, column)`

pub mod btree;
mod registry;

pub use registry::IndexRegistry;
