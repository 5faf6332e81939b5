//! blockidx - a block-resident B+ tree index engine.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            blockidx                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │            Index Layer (index/)                          │   │
//! │  │   IndexRegistry → IndexFile (insert / search / split)   │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │            Node Layer (index/btree/)                     │   │
//! │  │    MetaNode | LeafNode | InternalNode  +  Key codec      │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │            Storage Layer (storage/)                      │   │
//! │  │          Block (≤ 4 KB byte buffer) + DiskManager        │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (BlockId, Error, config)
//! - [`storage`] - Blocks and the file they are saved to
//! - [`index`] - The B+ tree and the per-column registry
//!
//! # Quick Start
//! ```no_run
//! use blockidx::{BlockId, IndexFile, Key, KeyType};
//!
//! let mut index = IndexFile::new(64, KeyType::Int32).unwrap();
//! index.insert(&Key::from(42), BlockId::new(7)).unwrap();
//! assert!(index.search(&Key::from(42)).unwrap().is_some());
//!
//! index.save_to("users_age.idx").unwrap();
//! let reopened = IndexFile::open("users_age.idx", KeyType::Int32).unwrap();
//! assert_eq!(reopened.len(), 1);
//! ```

pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::{IndexConfig, BLOCK_SIZE};
pub use common::{BlockId, Error, Result};

pub use index::btree::{IndexFile, Key, KeyType};
pub use index::IndexRegistry;
pub use storage::{Block, DiskManager};
