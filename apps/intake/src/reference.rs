//! # Reference Service
//!
//! Reference data behind the TTL cache, shared by the CLI and the server.
//!
//! - Fresh entry: returned as-is.
//! - Stale entry: returned immediately; one background refresh runs.
//! - Missing or corrupt entry: fetched from the backend and stored.
//!
//! Without a backend client only cached (or seeded) data is available.

use crate::client::BackendClient;
use crate::error::AppError;
use intake_core::primitives::REFERENCE_CACHE_KEY;
use intake_core::{
    CacheError, CacheLookup, CacheStore, InFlight, MemoryStore, RedbCacheStore, ReferenceData,
    TtlCache,
};
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

/// Seconds since the Unix epoch.
#[must_use]
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// =============================================================================
// CACHE BACKEND
// =============================================================================

/// Where cached reference data lives.
#[derive(Debug)]
pub enum CacheBackend {
    Memory(MemoryStore),
    Redb(RedbCacheStore),
}

impl CacheBackend {
    /// redb at `path` when given, otherwise in memory.
    pub fn open(path: Option<&Path>) -> Result<Self, CacheError> {
        match path {
            Some(path) => Ok(Self::Redb(RedbCacheStore::open(path)?)),
            None => Ok(Self::Memory(MemoryStore::new())),
        }
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Redb(_))
    }
}

impl CacheStore for CacheBackend {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        match self {
            Self::Memory(store) => store.load(key),
            Self::Redb(store) => store.load(key),
        }
    }

    fn save(&mut self, key: &str, bytes: &[u8]) -> Result<(), CacheError> {
        match self {
            Self::Memory(store) => store.save(key, bytes),
            Self::Redb(store) => store.save(key, bytes),
        }
    }

    fn remove(&mut self, key: &str) -> Result<bool, CacheError> {
        match self {
            Self::Memory(store) => store.remove(key),
            Self::Redb(store) => store.remove(key),
        }
    }
}

// =============================================================================
// SERVICE
// =============================================================================

/// Cached access to reference data.
#[derive(Debug)]
pub struct ReferenceService {
    cache: Mutex<TtlCache<CacheBackend>>,
    client: Option<BackendClient>,
    ttl_secs: u64,
    refreshing: InFlight,
}

impl ReferenceService {
    pub fn new(backend: CacheBackend, client: Option<BackendClient>, ttl_secs: u64) -> Self {
        Self {
            cache: Mutex::new(TtlCache::new(backend)),
            client,
            ttl_secs,
            refreshing: InFlight::new(),
        }
    }

    /// Store `data` as if it had just been fetched.
    pub async fn seed(&self, data: &ReferenceData) -> Result<(), AppError> {
        let mut cache = self.cache.lock().await;
        cache.put(REFERENCE_CACHE_KEY, data, unix_now())?;
        Ok(())
    }

    /// Drop the cached entry.
    pub async fn invalidate(&self) -> Result<bool, AppError> {
        let mut cache = self.cache.lock().await;
        Ok(cache.invalidate(REFERENCE_CACHE_KEY)?)
    }

    /// Reference data, served from cache when possible.
    pub async fn get(self: &Arc<Self>) -> Result<ReferenceData, AppError> {
        let lookup = {
            let cache = self.cache.lock().await;
            cache.lookup::<ReferenceData>(REFERENCE_CACHE_KEY, self.ttl_secs, unix_now())
        };

        match lookup {
            Ok(CacheLookup::Fresh(data)) => Ok(data),
            Ok(CacheLookup::Stale(data)) => {
                self.spawn_refresh();
                Ok(data)
            }
            Ok(CacheLookup::Miss) => self.refresh().await,
            Err(CacheError::Corrupt(reason)) => {
                tracing::warn!("Discarding corrupt reference cache entry: {}", reason);
                self.refresh().await
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Fetch from the backend and overwrite the cached entry.
    pub async fn refresh(&self) -> Result<ReferenceData, AppError> {
        let client = self.client.as_ref().ok_or_else(|| {
            AppError::Config("No cached reference data and no backend configured".to_string())
        })?;
        let data = client.fetch_reference().await?;
        let mut cache = self.cache.lock().await;
        cache.put(REFERENCE_CACHE_KEY, &data, unix_now())?;
        tracing::info!(
            business_units = data.business_units.len(),
            phases = data.phases.len(),
            "Reference data refreshed"
        );
        Ok(data)
    }

    fn spawn_refresh(self: &Arc<Self>) {
        if self.client.is_none() || self.refreshing.is_busy() {
            return;
        }
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let Some(_guard) = service.refreshing.try_begin() else {
                return;
            };
            if let Err(e) = service.refresh().await {
                tracing::warn!("Background reference refresh failed: {}", e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ReferenceData {
        serde_json::from_str(r#"{"roles": [{"id": 1, "name": "Owner"}]}"#).expect("fixture")
    }

    #[tokio::test]
    async fn seeded_data_is_served_without_backend() {
        let service = Arc::new(ReferenceService::new(
            CacheBackend::Memory(MemoryStore::new()),
            None,
            600,
        ));
        service.seed(&sample()).await.expect("seed");
        let data = service.get().await.expect("get");
        assert_eq!(data.roles.len(), 1);
    }

    #[tokio::test]
    async fn miss_without_backend_is_config_error() {
        let service = Arc::new(ReferenceService::new(
            CacheBackend::Memory(MemoryStore::new()),
            None,
            600,
        ));
        assert!(matches!(service.get().await, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn stale_entry_is_still_served() {
        let service = Arc::new(ReferenceService::new(
            CacheBackend::Memory(MemoryStore::new()),
            None,
            0,
        ));
        service.seed(&sample()).await.expect("seed");
        let data = service.get().await.expect("stale data");
        assert_eq!(data, sample());
    }

    #[tokio::test]
    async fn redb_backend_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cache.redb");
        {
            let backend = CacheBackend::open(Some(&path)).expect("open");
            assert!(backend.is_persistent());
            let service = ReferenceService::new(backend, None, 600);
            service.seed(&sample()).await.expect("seed");
        }
        let service = Arc::new(ReferenceService::new(
            CacheBackend::open(Some(&path)).expect("reopen"),
            None,
            600,
        ));
        assert_eq!(service.get().await.expect("get"), sample());
    }
}
