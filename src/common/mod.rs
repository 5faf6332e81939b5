//! Common types and utilities shared across blockidx.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants and [`IndexConfig`](config::IndexConfig)
//! - Error types
//! - Identifiers ([`BlockId`])

mod block_id;
pub mod config;
pub mod error;

pub use block_id::BlockId;
pub use error::{Error, Result};
