//! Ordered key/value store.
//!
//! A thin transactional wrapper around a single on-disk database file. The
//! handle is shared for the process lifetime and the file is released when
//! the handle drops.

use crate::error::StorageError;
use redb::{Database, ReadTransaction, ReadableTable, TableDefinition, WriteTransaction};
use std::path::Path;

/// The default keyspace. Keys and values are raw bytes; keys iterate in
/// byte order.
pub const DATA_TABLE: TableDefinition<'static, &[u8], &[u8]> = TableDefinition::new("data");

/// Handle to the embedded ordered key/value store.
pub struct Storage {
    db: Database,
}

impl Storage {
    /// Opens or creates the database file at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = Database::create(path)?;
        Ok(Self { db })
    }

    /// Runs a read transaction. The closure sees a consistent snapshot of
    /// the keyspace.
    pub fn view<T>(
        &self,
        f: impl FnOnce(&ReadTransaction) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let txn = self.db.begin_read()?;
        f(&txn)
    }

    /// Runs a write transaction, committing on success. If the closure
    /// errors the transaction is dropped and nothing is persisted.
    pub fn update<T>(
        &self,
        f: impl FnOnce(&WriteTransaction) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let txn = self.db.begin_write()?;
        let result = f(&txn)?;
        txn.commit()?;
        Ok(result)
    }

    /// Fetches the value stored under `key`, if any.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        self.view(|txn| {
            let table = match txn.open_table(DATA_TABLE) {
                Ok(table) => table,
                // A fresh database has no tables yet.
                Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
                Err(err) => return Err(err.into()),
            };
            Ok(table.get(key)?.map(|guard| guard.value().to_vec()))
        })
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        self.update(|txn| {
            let mut table = txn.open_table(DATA_TABLE)?;
            table.insert(key, value)?;
            Ok(())
        })
    }

    /// Removes `key`, returning whether it was present.
    pub fn delete(&self, key: &[u8]) -> Result<bool, StorageError> {
        self.update(|txn| {
            let mut table = txn.open_table(DATA_TABLE)?;
            let removed = table.remove(key)?.is_some();
            Ok(removed)
        })
    }

    /// Returns all entries whose keys start with `prefix`, in key order.
    pub fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        self.view(|txn| {
            let table = match txn.open_table(DATA_TABLE) {
                Ok(table) => table,
                Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
                Err(err) => return Err(err.into()),
            };

            let mut entries = Vec::new();
            for item in table.range::<&[u8]>(prefix..)? {
                let (key, value) = item?;
                if !key.value().starts_with(prefix) {
                    break;
                }
                entries.push((key.value().to_vec(), value.value().to_vec()));
            }
            Ok(entries)
        })
    }
}
