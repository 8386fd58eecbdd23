// src/cache/mod.rs

//! Result cache and replay.
//!
//! - [`recreator`]: stored form of one output.
//! - [`memory`]: size-bounded in-memory store with idle expiry.
//! - [`key`]: content hash of a job plus its realized inputs.
//! - [`replay`]: rebuilds outputs from the store without running anything.

pub mod key;
pub mod memory;
pub mod recreator;
pub mod replay;

use std::collections::BTreeMap;
use std::sync::Arc;

pub use key::compute_cache_key;
pub use memory::{CacheSettings, InMemoryCache};
pub use recreator::Recreator;
pub use replay::{replay_all, replay_one};

/// Stored outputs of one computation, keyed by output name.
pub type CacheEntry = BTreeMap<String, Recreator>;

/// Lookup-by-key store for computed results.
pub trait CacheStore: Send + Sync {
    fn get_cached_result(&self, key: &str) -> Option<Arc<CacheEntry>>;

    fn insert_result(&self, key: String, entry: CacheEntry);
}

impl<T: CacheStore + ?Sized> CacheStore for Arc<T> {
    fn get_cached_result(&self, key: &str) -> Option<Arc<CacheEntry>> {
        (**self).get_cached_result(key)
    }

    fn insert_result(&self, key: String, entry: CacheEntry) {
        (**self).insert_result(key, entry)
    }
}
