//! Registry of the indexes built over table columns.

use std::collections::BTreeMap;

use tracing::info;

use crate::common::config::IndexConfig;
use crate::common::{BlockId, Error, Result};
use crate::index::btree::{IndexFile, Key, KeyType};

/// Owns one [`IndexFile`] per `(table, column)` pair.
///
/// Callers hold the registry and pass it where it is needed; there is no
/// process-wide current index.
#[derive(Debug, Default)]
pub struct IndexRegistry {
    indexes: BTreeMap<(String, String), IndexFile>,
}

impl IndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty index on `table.column`.
    ///
    /// # Errors
    /// - `Error::IndexExists` if the column is already indexed
    /// - `Error::InvalidOrder` if `order` is unusable
    pub fn create_index(&mut self, table: &str, column: &str, order: u16, key_type: KeyType) -> Result<&mut IndexFile> {
        self.register(table, column, IndexConfig::new(order, key_type))
    }

    /// Create an empty index on `table.column` at the default order.
    ///
    /// # Errors
    /// Returns `Error::IndexExists` if the column is already indexed.
    pub fn create_default_index(&mut self, table: &str, column: &str, key_type: KeyType) -> Result<&mut IndexFile> {
        self.register(table, column, IndexConfig::for_key_type(key_type))
    }

    fn register(&mut self, table: &str, column: &str, config: IndexConfig) -> Result<&mut IndexFile> {
        let name = (table.to_owned(), column.to_owned());
        if self.indexes.contains_key(&name) {
            return Err(Error::IndexExists {
                table: name.0,
                column: name.1,
            });
        }

        let index = IndexFile::with_config(config)?;
        info!(table, column, order = config.order, key_type = %config.key_type, "created index");
        Ok(self.indexes.entry(name).or_insert(index))
    }

    pub fn get(&self, table: &str, column: &str) -> Result<&IndexFile> {
        self.indexes
            .get(&(table.to_owned(), column.to_owned()))
            .ok_or_else(|| not_found(table, column))
    }

    pub fn get_mut(&mut self, table: &str, column: &str) -> Result<&mut IndexFile> {
        self.indexes
            .get_mut(&(table.to_owned(), column.to_owned()))
            .ok_or_else(|| not_found(table, column))
    }

    /// Insert into the index on `table.column`.
    pub fn insert(&mut self, table: &str, column: &str, key: &Key, data_block_id: BlockId) -> Result<()> {
        self.get_mut(table, column)?.insert(key, data_block_id)
    }

    /// Search the index on `table.column`.
    pub fn search(&self, table: &str, column: &str, key: &Key) -> Result<Option<BlockId>> {
        self.get(table, column)?.search(key)
    }

    /// Remove the index on `table.column` and hand it back.
    pub fn drop_index(&mut self, table: &str, column: &str) -> Result<IndexFile> {
        let index = self
            .indexes
            .remove(&(table.to_owned(), column.to_owned()))
            .ok_or_else(|| not_found(table, column))?;
        info!(table, column, "dropped index");
        Ok(index)
    }

    pub fn contains(&self, table: &str, column: &str) -> bool {
        self.indexes.contains_key(&(table.to_owned(), column.to_owned()))
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    /// Indexed `(table, column)` pairs in sorted order.
    pub fn names(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.indexes
            .keys()
            .map(|(table, column)| (table.as_str(), column.as_str()))
    }
}

fn not_found(table: &str, column: &str) -> Error {
    Error::IndexNotFound {
        table: table.to_owned(),
        column: column.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::DEFAULT_ORDER;

    #[test]
    fn test_create_and_search() {
        let mut registry = IndexRegistry::new();
        registry.create_index("users", "age", 4, KeyType::Int32).unwrap();

        for age in [30, 25, 41, 19, 52] {
            registry
                .insert("users", "age", &Key::from(age), BlockId::new(age as u16))
                .unwrap();
        }

        assert!(registry.search("users", "age", &Key::from(41)).unwrap().is_some());
        assert!(registry.search("users", "age", &Key::from(40)).unwrap().is_none());
        assert_eq!(registry.get("users", "age").unwrap().len(), 5);
    }

    #[test]
    fn test_create_default_index() {
        let mut registry = IndexRegistry::new();
        let index = registry.create_default_index("users", "name", KeyType::Text).unwrap();
        assert_eq!(index.order(), DEFAULT_ORDER);
        assert_eq!(index.key_type(), KeyType::Text);

        assert!(matches!(
            registry.create_default_index("users", "name", KeyType::Text),
            Err(Error::IndexExists { .. })
        ));
    }

    #[test]
    fn test_duplicate_create_fails() {
        let mut registry = IndexRegistry::new();
        registry.create_index("t", "c", 4, KeyType::Text).unwrap();
        let err = registry.create_index("t", "c", 8, KeyType::Int64).unwrap_err();
        assert!(matches!(err, Error::IndexExists { .. }));
        assert_eq!(registry.get("t", "c").unwrap().order(), 4);
    }

    #[test]
    fn test_unknown_index() {
        let mut registry = IndexRegistry::new();
        assert!(matches!(registry.get("t", "c"), Err(Error::IndexNotFound { .. })));
        assert!(matches!(
            registry.insert("t", "c", &Key::from(1), BlockId::new(1)),
            Err(Error::IndexNotFound { .. })
        ));
        assert!(matches!(registry.drop_index("t", "c"), Err(Error::IndexNotFound { .. })));
    }

    #[test]
    fn test_drop_and_names() {
        let mut registry = IndexRegistry::new();
        registry.create_index("b", "x", 4, KeyType::Int32).unwrap();
        registry.create_index("a", "y", 4, KeyType::Float64).unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec![("a", "y"), ("b", "x")]);

        let dropped = registry.drop_index("b", "x").unwrap();
        assert_eq!(dropped.key_type(), KeyType::Int32);
        assert!(!registry.contains("b", "x"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_invalid_order_not_registered() {
        let mut registry = IndexRegistry::new();
        assert!(registry.create_index("t", "c", 1, KeyType::Int32).is_err());
        assert!(registry.is_empty());
    }
}
