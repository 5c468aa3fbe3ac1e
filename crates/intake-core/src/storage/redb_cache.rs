//! # redb-backed Cache Store
//!
//! A disk-backed `CacheStore` using the redb embedded database, so cached
//! reference data survives restarts of the CLI and the server.
//!
//! One table maps cache keys to encoded entries. Every save and remove is
//! its own write transaction.

use crate::cache::{CacheError, CacheStore};
use redb::{Database, ReadableDatabase, TableDefinition};
use std::path::Path;

/// Table for cache entries: key -> encoded entry bytes
const ENTRIES: TableDefinition<&str, &[u8]> = TableDefinition::new("cache_entries");

fn io_error(e: impl std::fmt::Display) -> CacheError {
    CacheError::Io(e.to_string())
}

/// A disk-backed cache store.
pub struct RedbCacheStore {
    db: Database,
}

impl std::fmt::Debug for RedbCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbCacheStore").finish_non_exhaustive()
    }
}

impl RedbCacheStore {
    /// Open or create a cache database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let db = Database::create(path.as_ref()).map_err(io_error)?;

        // Create the table up front so reads never hit a missing table.
        {
            let write_txn = db.begin_write().map_err(io_error)?;
            let _ = write_txn.open_table(ENTRIES).map_err(io_error)?;
            write_txn.commit().map_err(io_error)?;
        }

        Ok(Self { db })
    }
}

impl CacheStore for RedbCacheStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let read_txn = self.db.begin_read().map_err(io_error)?;
        let table = read_txn.open_table(ENTRIES).map_err(io_error)?;
        let value = table
            .get(key)
            .map_err(io_error)?
            .map(|guard| guard.value().to_vec());
        Ok(value)
    }

    fn save(&mut self, key: &str, bytes: &[u8]) -> Result<(), CacheError> {
        let write_txn = self.db.begin_write().map_err(io_error)?;
        {
            let mut table = write_txn.open_table(ENTRIES).map_err(io_error)?;
            table.insert(key, bytes).map_err(io_error)?;
        }
        write_txn.commit().map_err(io_error)
    }

    fn remove(&mut self, key: &str) -> Result<bool, CacheError> {
        let write_txn = self.db.begin_write().map_err(io_error)?;
        let removed = {
            let mut table = write_txn.open_table(ENTRIES).map_err(io_error)?;
            table.remove(key).map_err(io_error)?.is_some()
        };
        write_txn.commit().map_err(io_error)?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheLookup, TtlCache};
    use tempfile::TempDir;

    #[test]
    fn entries_survive_reopen() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("cache.redb");

        {
            let mut cache = TtlCache::new(RedbCacheStore::open(&path).expect("open"));
            cache.put("k", &"hello".to_string(), 100).expect("put");
        }

        let cache = TtlCache::new(RedbCacheStore::open(&path).expect("reopen"));
        assert_eq!(
            cache.lookup::<String>("k", 600, 200),
            Ok(CacheLookup::Fresh("hello".to_string()))
        );
    }

    #[test]
    fn remove_reports_presence() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = RedbCacheStore::open(dir.path().join("cache.redb")).expect("open");
        store.save("k", b"bytes").expect("save");
        assert_eq!(store.load("k"), Ok(Some(b"bytes".to_vec())));
        assert_eq!(store.remove("k"), Ok(true));
        assert_eq!(store.remove("k"), Ok(false));
        assert_eq!(store.load("k"), Ok(None));
    }

    #[test]
    fn save_overwrites_whole_entry() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = RedbCacheStore::open(dir.path().join("cache.redb")).expect("open");
        store.save("k", b"first-and-longer").expect("save");
        store.save("k", b"second").expect("save");
        assert_eq!(store.load("k"), Ok(Some(b"second".to_vec())));
    }
}
