//! Block-resident B+ tree.
//!
//! # Structure
//! ```text
//!                     ┌─────────────┐
//!                     │  internal   │  separators + child block ids
//!                     └──────┬──────┘
//!            ┌───────────────┼───────────────┐
//!            ▼               ▼               ▼
//!      ┌──────────┐    ┌──────────┐    ┌──────────┐
//!      │   leaf   │◄──►│   leaf   │◄──►│   leaf   │  (key, data block id)
//!      └──────────┘    └──────────┘    └──────────┘
//! ```
//! Every node occupies exactly one block. Leaves are doubly linked for
//! ordered scans. Block 0 of the file holds the order and the root id.
//!
//! - [`key`] - typed keys and their byte encoding
//! - [`LeafNode`] / [`InternalNode`] - node layouts over a [`Block`](crate::storage::Block)
//! - [`IndexFile`] - insert, search and splitting across the whole tree

mod index_file;
mod internal_node;
pub mod key;
mod leaf_node;
mod node;

pub use index_file::IndexFile;
pub use internal_node::InternalNode;
pub use key::{Key, KeyType};
pub use leaf_node::LeafNode;
pub use node::{MetaNode, Node, NodeKind};
