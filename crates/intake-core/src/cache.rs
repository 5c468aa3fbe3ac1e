//! # TTL Cache
//!
//! A time-to-live cache over a pluggable byte store, used for reference
//! data.
//!
//! Entry format: header (5 bytes) + postcard-serialized `(stored_at, value)`.
//! - 4 bytes: magic ("INTK")
//! - 1 byte: format version
//!
//! Writes replace the whole entry. Time is passed in as Unix seconds so the
//! cache itself never reads a clock.

use crate::primitives::{CACHE_FORMAT_VERSION, CACHE_MAGIC_BYTES, MAX_CACHE_ENTRY_SIZE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

const HEADER_LEN: usize = 5;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The backing store failed.
    #[error("Cache I/O error: {0}")]
    Io(String),

    /// A stored entry could not be decoded.
    #[error("Corrupt cache entry: {0}")]
    Corrupt(String),

    /// The fetcher of `get_or_fetch` failed; nothing was stored.
    #[error("Fetch failed: {0}")]
    Fetch(String),
}

// =============================================================================
// STORES
// =============================================================================

/// Raw key → bytes storage behind a `TtlCache`.
pub trait CacheStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    fn save(&mut self, key: &str, bytes: &[u8]) -> Result<(), CacheError>;

    /// Returns `true` when an entry was removed.
    fn remove(&mut self, key: &str) -> Result<bool, CacheError>;
}

/// Volatile in-process store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, bytes: &[u8]) -> Result<(), CacheError> {
        self.entries.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.remove(key).is_some())
    }
}

// =============================================================================
// ENTRY FORMAT
// =============================================================================

#[derive(Serialize, Deserialize)]
struct CacheEntry<V> {
    stored_at: u64,
    value: V,
}

/// Encode an entry (header + payload).
pub fn encode_entry<V: Serialize>(stored_at: u64, value: &V) -> Result<Vec<u8>, CacheError> {
    let payload = postcard::to_stdvec(&CacheEntry { stored_at, value })
        .map_err(|e| CacheError::Corrupt(e.to_string()))?;
    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(CACHE_MAGIC_BYTES);
    bytes.push(CACHE_FORMAT_VERSION);
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Decode an entry into `(stored_at, value)`.
///
/// Size, magic and version are validated before the payload is parsed.
pub fn decode_entry<V: DeserializeOwned>(bytes: &[u8]) -> Result<(u64, V), CacheError> {
    if bytes.len() < HEADER_LEN {
        return Err(CacheError::Corrupt("entry too short".to_string()));
    }
    if bytes.len() > MAX_CACHE_ENTRY_SIZE {
        return Err(CacheError::Corrupt(format!(
            "entry size {} bytes exceeds maximum {} bytes",
            bytes.len(),
            MAX_CACHE_ENTRY_SIZE
        )));
    }
    let (header, payload) = bytes.split_at(HEADER_LEN);
    if &header[..4] != CACHE_MAGIC_BYTES {
        return Err(CacheError::Corrupt("invalid magic bytes".to_string()));
    }
    if header[4] != CACHE_FORMAT_VERSION {
        return Err(CacheError::Corrupt(format!(
            "unsupported version {} (expected {})",
            header[4], CACHE_FORMAT_VERSION
        )));
    }
    let entry: CacheEntry<V> =
        postcard::from_bytes(payload).map_err(|e| CacheError::Corrupt(e.to_string()))?;
    Ok((entry.stored_at, entry.value))
}

// =============================================================================
// TTL CACHE
// =============================================================================

/// Classification of a cached entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup<V> {
    /// Younger than the TTL.
    Fresh(V),
    /// Present but expired; usable while a refresh runs.
    Stale(V),
    Miss,
}

impl<V> CacheLookup<V> {
    /// The cached value regardless of freshness.
    pub fn into_value(self) -> Option<V> {
        match self {
            Self::Fresh(value) | Self::Stale(value) => Some(value),
            Self::Miss => None,
        }
    }
}

/// Whether an entry stored at `stored_at` is still fresh at `now`.
///
/// Entries stamped in the future (clock moved back) count as fresh.
#[must_use]
pub fn is_fresh(stored_at: u64, now: u64, ttl_secs: u64) -> bool {
    now.saturating_sub(stored_at) < ttl_secs
}

/// TTL cache over a `CacheStore`.
#[derive(Debug, Clone, Default)]
pub struct TtlCache<S> {
    store: S,
}

impl<S: CacheStore> TtlCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Classify the entry for `key` as fresh, stale or missing.
    pub fn lookup<V: DeserializeOwned>(
        &self,
        key: &str,
        ttl_secs: u64,
        now: u64,
    ) -> Result<CacheLookup<V>, CacheError> {
        let Some(bytes) = self.store.load(key)? else {
            return Ok(CacheLookup::Miss);
        };
        let (stored_at, value) = decode_entry(&bytes)?;
        if is_fresh(stored_at, now, ttl_secs) {
            Ok(CacheLookup::Fresh(value))
        } else {
            Ok(CacheLookup::Stale(value))
        }
    }

    /// Overwrite the entry for `key`.
    pub fn put<V: Serialize>(&mut self, key: &str, value: &V, now: u64) -> Result<(), CacheError> {
        let bytes = encode_entry(now, value)?;
        self.store.save(key, &bytes)
    }

    pub fn invalidate(&mut self, key: &str) -> Result<bool, CacheError> {
        self.store.remove(key)
    }

    /// Return the fresh value for `key`, or run `fetcher` and store its
    /// result.
    ///
    /// A corrupt entry is treated as missing and overwritten. A failing
    /// fetcher leaves the store untouched.
    pub fn get_or_fetch<V, F, E>(
        &mut self,
        key: &str,
        ttl_secs: u64,
        now: u64,
        fetcher: F,
    ) -> Result<V, CacheError>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<V, E>,
        E: std::fmt::Display,
    {
        match self.lookup(key, ttl_secs, now) {
            Ok(CacheLookup::Fresh(value)) => return Ok(value),
            Ok(_) | Err(CacheError::Corrupt(_)) => {}
            Err(other) => return Err(other),
        }
        let value = fetcher().map_err(|e| CacheError::Fetch(e.to_string()))?;
        self.put(key, &value, now)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "reference";

    #[test]
    fn entry_round_trip_keeps_timestamp() {
        let bytes = encode_entry(42, &vec!["a".to_string()]).expect("encode");
        let (stored_at, value): (u64, Vec<String>) = decode_entry(&bytes).expect("decode");
        assert_eq!(stored_at, 42);
        assert_eq!(value, vec!["a"]);
    }

    #[test]
    fn invalid_header_rejected() {
        let mut bytes = encode_entry(1, &7u32).expect("encode");
        bytes[0] = b'X';
        assert!(matches!(
            decode_entry::<u32>(&bytes),
            Err(CacheError::Corrupt(_))
        ));
        assert!(matches!(
            decode_entry::<u32>(&[1, 2]),
            Err(CacheError::Corrupt(_))
        ));
    }

    #[test]
    fn lookup_classifies_by_age() {
        let mut cache = TtlCache::new(MemoryStore::new());
        assert_eq!(cache.lookup::<u32>(KEY, 600, 1_000), Ok(CacheLookup::Miss));

        cache.put(KEY, &7u32, 1_000).expect("put");
        assert_eq!(cache.lookup(KEY, 600, 1_599), Ok(CacheLookup::Fresh(7u32)));
        assert_eq!(cache.lookup(KEY, 600, 1_600), Ok(CacheLookup::Stale(7u32)));
        // Clock moved back.
        assert_eq!(cache.lookup(KEY, 600, 900), Ok(CacheLookup::Fresh(7u32)));
    }

    #[test]
    fn get_or_fetch_uses_fresh_entry() {
        let mut cache = TtlCache::new(MemoryStore::new());
        cache.put(KEY, &1u32, 100).expect("put");
        let value = cache
            .get_or_fetch(KEY, 600, 200, || Err::<u32, _>("must not run"))
            .expect("fresh");
        assert_eq!(value, 1);
    }

    #[test]
    fn get_or_fetch_refreshes_stale_entry() {
        let mut cache = TtlCache::new(MemoryStore::new());
        cache.put(KEY, &1u32, 100).expect("put");
        let value = cache
            .get_or_fetch(KEY, 600, 800, || Ok::<_, String>(2u32))
            .expect("refetch");
        assert_eq!(value, 2);
        assert_eq!(cache.lookup(KEY, 600, 800), Ok(CacheLookup::Fresh(2u32)));
    }

    #[test]
    fn failed_fetch_keeps_stale_entry() {
        let mut cache = TtlCache::new(MemoryStore::new());
        cache.put(KEY, &1u32, 100).expect("put");
        let err = cache
            .get_or_fetch::<u32, _, _>(KEY, 600, 800, || Err("backend down"))
            .expect_err("fetch fails");
        assert_eq!(err, CacheError::Fetch("backend down".to_string()));
        assert_eq!(cache.lookup(KEY, 600, 800), Ok(CacheLookup::Stale(1u32)));
    }

    #[test]
    fn corrupt_entry_is_overwritten_by_fetch() {
        let mut store = MemoryStore::new();
        store.save(KEY, b"garbage").expect("save");
        let mut cache = TtlCache::new(store);
        let value = cache
            .get_or_fetch(KEY, 600, 10, || Ok::<_, String>(5u32))
            .expect("fetch");
        assert_eq!(value, 5);
    }

    #[test]
    fn invalidate_removes_entry() {
        let mut cache = TtlCache::new(MemoryStore::new());
        cache.put(KEY, &1u32, 100).expect("put");
        assert_eq!(cache.invalidate(KEY), Ok(true));
        assert_eq!(cache.invalidate(KEY), Ok(false));
    }
}
