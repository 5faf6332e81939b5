//! Storage layer - blocks and disk I/O.
//!
//! This module handles the raw bytes under the index:
//! - [`Block`] - Fixed-capacity byte buffer holding one node
//! - [`DiskManager`] - Low-level file I/O for saving and reopening indexes

mod block;
mod disk_manager;

pub use block::Block;
pub use disk_manager::DiskManager;
