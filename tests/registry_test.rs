//! Integration tests for the per-column index registry.

mod common;

use blockidx::{BlockId, Error, IndexRegistry, Key, KeyType};
use common::init_tracing;
use tempfile::tempdir;

/// Several columns of one table, each with its own key type.
#[test]
fn test_indexes_per_column() {
    init_tracing();
    let mut registry = IndexRegistry::new();
    registry.create_index("orders", "id", 8, KeyType::Int64).unwrap();
    registry.create_index("orders", "customer", 4, KeyType::Text).unwrap();
    registry.create_index("orders", "placed", 16, KeyType::Timestamp).unwrap();

    let rows = [(1i64, "ada", 1_700_000_000_000i64), (2, "bob", 1_700_000_500_000), (3, "ada", 1_700_001_000_000)];
    for (block, (id, customer, placed)) in rows.iter().enumerate() {
        let block = BlockId::new(block as u16 + 1);
        registry.insert("orders", "id", &Key::from(*id), block).unwrap();
        registry.insert("orders", "customer", &Key::from(*customer), block).unwrap();
        registry.insert("orders", "placed", &Key::Timestamp(*placed), block).unwrap();
    }

    let customers = registry.get("orders", "customer").unwrap();
    assert_eq!(customers.lookup(&Key::from("ada")).unwrap(), vec![BlockId::new(1), BlockId::new(3)]);
    assert!(registry.search("orders", "id", &Key::from(2i64)).unwrap().is_some());

    // Each index only accepts its own key type
    assert!(matches!(
        registry.insert("orders", "id", &Key::from("4"), BlockId::new(4)),
        Err(Error::KeyTypeMismatch { .. })
    ));
    assert_eq!(registry.len(), 3);
}

/// A dropped index can be saved and registered again from disk.
#[test]
fn test_drop_save_and_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("users_age.idx");

    let mut registry = IndexRegistry::new();
    registry.create_index("users", "age", 4, KeyType::Int32).unwrap();
    for age in 18..60 {
        registry.insert("users", "age", &Key::from(age), BlockId::new(age as u16)).unwrap();
    }

    let index = registry.drop_index("users", "age").unwrap();
    index.save_to(&path).unwrap();
    assert!(matches!(
        registry.search("users", "age", &Key::from(30)),
        Err(Error::IndexNotFound { .. })
    ));

    let reopened = blockidx::IndexFile::open(&path, KeyType::Int32).unwrap();
    assert_eq!(reopened.len(), 42);
    assert_eq!(reopened.lookup(&Key::from(30)).unwrap(), vec![BlockId::new(30)]);
}
