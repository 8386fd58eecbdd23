// src/cache/memory.rs

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use lru::LruCache;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheStore, Recreator};

const MIB: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// Upper bound on the summed entry weights, in MiB.
    pub max_size_mb: u64,
    /// Entries not read for this long are dropped.
    pub expire_after_access: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_size_mb: 512,
            expire_after_access: Duration::from_secs(60 * 60 * 24 * 60),
        }
    }
}

struct Slot {
    entry: Arc<CacheEntry>,
    weight_mb: u64,
    last_access: Instant,
}

/// In-memory cache store.
///
/// Every stored output weighs its byte size in whole MiB (at least 1) and
/// an entry weighs the sum of its outputs. The LRU order is bounded by
/// weight rather than entry count: when the total exceeds the bound, least
/// recently read entries go first.
pub struct InMemoryCache {
    settings: CacheSettings,
    slots: Mutex<LruCache<String, Slot>>,
}

impl InMemoryCache {
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            settings,
            slots: Mutex::new(LruCache::unbounded()),
        }
    }

    pub fn settings(&self) -> CacheSettings {
        self.settings
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn total_weight_mb(&self) -> u64 {
        self.lock().iter().map(|(_, s)| s.weight_mb).sum()
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, Slot>> {
        match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn is_expired(&self, slot: &Slot, now: Instant) -> bool {
        now.duration_since(slot.last_access) >= self.settings.expire_after_access
    }

    fn purge_expired(&self, slots: &mut LruCache<String, Slot>, now: Instant) {
        let expired: Vec<String> = slots
            .iter()
            .filter(|(_, slot)| self.is_expired(slot, now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            debug!(cache_key = %key, "cache entry expired");
            slots.pop(&key);
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new(CacheSettings::default())
    }
}

fn weight_of_output(recreator: &Recreator) -> u64 {
    ((recreator.size_in_bytes() / MIB) as u64).max(1)
}

fn weight_of(entry: &CacheEntry) -> u64 {
    entry.values().map(weight_of_output).sum()
}

impl CacheStore for InMemoryCache {
    fn get_cached_result(&self, key: &str) -> Option<Arc<CacheEntry>> {
        let now = Instant::now();
        let mut slots = self.lock();

        if self.is_expired(slots.peek(key)?, now) {
            debug!(cache_key = %key, "cache entry expired");
            slots.pop(key);
            return None;
        }

        let slot = slots.get_mut(key)?;
        slot.last_access = now;
        Some(Arc::clone(&slot.entry))
    }

    fn insert_result(&self, key: String, entry: CacheEntry) {
        let weight_mb = weight_of(&entry);
        if weight_mb > self.settings.max_size_mb {
            warn!(
                cache_key = %key,
                weight_mb,
                max_size_mb = self.settings.max_size_mb,
                "result too large to cache"
            );
            return;
        }

        let now = Instant::now();
        let mut slots = self.lock();
        self.purge_expired(&mut slots, now);
        slots.put(
            key,
            Slot {
                entry: Arc::new(entry),
                weight_mb,
                last_access: now,
            },
        );

        // The new entry is most recent, so it is only reached when alone.
        let mut total: u64 = slots.iter().map(|(_, s)| s.weight_mb).sum();
        while total > self.settings.max_size_mb && slots.len() > 1 {
            let Some((victim, slot)) = slots.pop_lru() else {
                break;
            };
            debug!(cache_key = %victim, weight_mb = slot.weight_mb, "evicting cache entry");
            total -= slot.weight_mb;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValueKind;

    fn entry_of(bytes: usize) -> CacheEntry {
        let mut entry = CacheEntry::new();
        entry.insert(
            "out".to_string(),
            Recreator::FromBytes {
                kind: ValueKind::GenericFile,
                bytes: vec![0; bytes],
            },
        );
        entry
    }

    #[test]
    fn small_entries_weigh_one_mib() {
        let cache = InMemoryCache::default();
        cache.insert_result("a".into(), entry_of(10));
        assert_eq!(cache.total_weight_mb(), 1);
        assert!(cache.get_cached_result("a").is_some());
        assert!(cache.get_cached_result("b").is_none());
    }

    #[test]
    fn least_recently_read_entry_is_evicted() {
        let cache = InMemoryCache::new(CacheSettings {
            max_size_mb: 2,
            ..CacheSettings::default()
        });
        cache.insert_result("old".into(), entry_of(1));
        cache.insert_result("fresh".into(), entry_of(1));
        assert!(cache.get_cached_result("old").is_some());
        cache.insert_result("newest".into(), entry_of(1));

        assert_eq!(cache.len(), 2);
        assert!(cache.get_cached_result("fresh").is_none());
        assert!(cache.get_cached_result("old").is_some());
        assert!(cache.get_cached_result("newest").is_some());
    }

    #[test]
    fn each_output_weighs_at_least_one_mib() {
        let mut entry = entry_of(10);
        entry.insert("status".to_string(), Recreator::FromExitCode(0));
        entry.insert(
            "log".to_string(),
            Recreator::FromBytes {
                kind: ValueKind::String,
                bytes: b"done".to_vec(),
            },
        );
        assert_eq!(weight_of(&entry), 3);

        let mut large = entry_of(3 * MIB + 10);
        large.insert("status".to_string(), Recreator::FromExitCode(1));
        assert_eq!(weight_of(&large), 4);
    }

    #[test]
    fn eviction_frees_enough_weight_for_a_multi_output_entry() {
        let cache = InMemoryCache::new(CacheSettings {
            max_size_mb: 3,
            ..CacheSettings::default()
        });
        cache.insert_result("a".into(), entry_of(1));
        cache.insert_result("b".into(), entry_of(1));
        cache.insert_result("c".into(), entry_of(1));

        let mut pair = entry_of(1);
        pair.insert("status".to_string(), Recreator::FromExitCode(0));
        cache.insert_result("pair".into(), pair);

        assert_eq!(cache.total_weight_mb(), 3);
        assert!(cache.get_cached_result("a").is_none());
        assert!(cache.get_cached_result("b").is_none());
        assert!(cache.get_cached_result("c").is_some());
        assert!(cache.get_cached_result("pair").is_some());
    }

    #[test]
    fn idle_entries_expire() {
        let cache = InMemoryCache::new(CacheSettings {
            expire_after_access: Duration::ZERO,
            ..CacheSettings::default()
        });
        cache.insert_result("a".into(), entry_of(1));
        assert!(cache.get_cached_result("a").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn oversized_entry_is_not_stored() {
        let cache = InMemoryCache::new(CacheSettings {
            max_size_mb: 1,
            ..CacheSettings::default()
        });
        cache.insert_result("big".into(), entry_of(2 * MIB));
        assert!(cache.is_empty());
    }
}
