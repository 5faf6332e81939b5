//! Saving an index to disk and opening it again.

mod common;

use blockidx::index::btree::{IndexFile, Key, KeyType, NodeKind};
use blockidx::{BlockId, DiskManager, Error, BLOCK_SIZE};
use common::{chain_keys, init_tracing, int_index};
use tempfile::tempdir;

#[test]
fn test_save_and_open_round_trip() {
    init_tracing();
    let dir = tempdir().unwrap();
    let path = dir.path().join("age.idx");

    let index = int_index(4, (0..300).map(|k| (k * 37) % 300));
    index.save_to(&path).unwrap();

    let file_len = std::fs::metadata(&path).unwrap().len();
    assert_eq!(file_len, (index.block_count() * BLOCK_SIZE) as u64);

    let reopened = IndexFile::open(&path, KeyType::Int32).unwrap();
    assert_eq!(reopened.order(), 4);
    assert_eq!(reopened.root_id(), index.root_id());
    assert_eq!(reopened.height(), index.height());
    assert_eq!(reopened.bfs_levels().unwrap(), index.bfs_levels().unwrap());
    assert_eq!(reopened.entries().unwrap(), index.entries().unwrap());

    for id in 1..index.block_count() {
        let id = BlockId::new(id as u16);
        assert_eq!(reopened.kind_of(id), index.kind_of(id));
        assert_eq!(reopened.parent_of(id), index.parent_of(id));
    }
}

/// A reopened index keeps growing and can be saved over the same file.
#[test]
fn test_insert_after_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("grow.idx");

    int_index(5, 0..50).save_to(&path).unwrap();

    let mut index = IndexFile::open(&path, KeyType::Int32).unwrap();
    for k in 50..400 {
        index.insert(&Key::from(k), BlockId::new(k as u16)).unwrap();
    }
    index.validate().unwrap();
    index.save_to(&path).unwrap();

    let reopened = IndexFile::open(&path, KeyType::Int32).unwrap();
    assert_eq!(reopened.len(), 400);
    assert_eq!(chain_keys(&reopened), chain_keys(&index));
    for k in [0, 49, 50, 399] {
        assert!(reopened.search(&Key::from(k)).unwrap().is_some());
    }
}

#[test]
fn test_single_leaf_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("small.idx");

    let mut index = IndexFile::new(8, KeyType::Text).unwrap();
    index.insert(&Key::from("b"), BlockId::new(2)).unwrap();
    index.insert(&Key::from("a"), BlockId::new(1)).unwrap();
    index.save_to(&path).unwrap();

    let reopened = IndexFile::open(&path, KeyType::Text).unwrap();
    assert_eq!(reopened.kind_of(reopened.root_id()), Some(NodeKind::Leaf));
    assert_eq!(
        reopened.entries().unwrap(),
        vec![(Key::from("a"), BlockId::new(1)), (Key::from("b"), BlockId::new(2))]
    );
}

#[test]
fn test_empty_index_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.idx");

    IndexFile::new(4, KeyType::Float32).unwrap().save_to(&path).unwrap();
    let reopened = IndexFile::open(&path, KeyType::Float32).unwrap();
    assert!(reopened.is_empty());
    assert_eq!(reopened.block_count(), 2);
}

#[test]
fn test_open_missing_file_fails() {
    let dir = tempdir().unwrap();
    let result = IndexFile::open(dir.path().join("nope.idx"), KeyType::Int32);
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn test_open_truncated_file_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("short.idx");

    let mut dm = DiskManager::create(&path).unwrap();
    dm.allocate_block().unwrap();
    dm.sync().unwrap();

    let result = IndexFile::open(&path, KeyType::Int32);
    assert!(matches!(result, Err(Error::InvariantViolation(_))));
}

#[test]
fn test_save_into_larger_file_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("big.idx");

    int_index(4, 0..100).save_to(&path).unwrap();
    let result = int_index(4, 0..3).save_to(&path);
    assert!(matches!(result, Err(Error::InvariantViolation(_))));
}
