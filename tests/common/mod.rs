//! Shared helpers for the integration tests.
//!
//! Call [`init_tracing`] at the top of a test to see split and persistence
//! events. Filter with `RUST_LOG`, e.g. `RUST_LOG=blockidx=debug`.

#![allow(dead_code)]

use blockidx::{BlockId, IndexFile, Key, KeyType};
use tracing_subscriber::EnvFilter;

/// Install a test-friendly subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// An `Int32` index with every key pointing at the block of the same number.
pub fn int_index(order: u16, keys: impl IntoIterator<Item = i32>) -> IndexFile {
    let mut index = IndexFile::new(order, KeyType::Int32).unwrap();
    for k in keys {
        index.insert(&Key::from(k), data_block(k)).unwrap();
    }
    index
}

pub fn data_block(k: i32) -> BlockId {
    BlockId::new(k.rem_euclid(1 << 16) as u16)
}

pub fn ints(keys: &[i32]) -> Vec<Key> {
    keys.iter().map(|&k| Key::from(k)).collect()
}

/// Keys of every entry, in leaf-chain order.
pub fn chain_keys(index: &IndexFile) -> Vec<Key> {
    index.entries().unwrap().into_iter().map(|(k, _)| k).collect()
}
