//! # Storage
//!
//! Persistent `CacheStore` implementations.

pub mod redb_cache;

pub use redb_cache::RedbCacheStore;
