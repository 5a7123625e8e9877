use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::kernel::Generation;

/// Hit and miss counters of a cache.  A stale entry counts as a miss.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stale: u64,
}

#[derive(Debug)]
struct CacheEntry<V> {
    generation: Generation,
    value: Arc<V>,
}

/// The `CausalityCache` keeps computed causality interfaces together with
/// the workspace generation they were computed at.  Entries are never
/// invalidated eagerly; an entry whose generation is not the live one is
/// discarded when it is next asked for.
#[derive(Debug)]
pub struct CausalityCache<K: Ord, V> {
    entries: BTreeMap<K, CacheEntry<V>>,
    stats: CacheStats,
}

impl<K: Ord, V> Default for CausalityCache<K, V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            stats: CacheStats::default(),
        }
    }
}

impl<K: Ord + Debug, V> CausalityCache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The entry for `key`, when it was computed at `generation`.
    pub fn get(&mut self, key: &K, generation: Generation) -> Option<Arc<V>> {
        let cached = match self.entries.get(key) {
            Some(entry) if entry.generation == generation => {
                self.stats.hits += 1;
                trace!(key = ?key, "causality cache hit");
                return Some(entry.value.clone());
            }
            Some(entry) => Some(entry.generation),
            None => None,
        };
        if let Some(cached) = cached {
            debug!(
                key = ?key,
                cached = cached.value(),
                live = generation.value(),
                "discarding stale causality"
            );
            self.stats.stale += 1;
            self.entries.remove(key);
        }
        self.stats.misses += 1;
        None
    }

    pub fn insert(&mut self, key: K, generation: Generation, value: Arc<V>) {
        trace!(key = ?key, generation = generation.value(), "caching causality");
        self.entries.insert(key, CacheEntry { generation, value });
    }

    pub fn contains(&self, key: &K, generation: Generation) -> bool {
        self.entries
            .get(key)
            .map_or(false, |entry| entry.generation == generation)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_entries_are_discarded() {
        let mut cache: CausalityCache<String, u32> = CausalityCache::new();
        let first = Generation::default();
        cache.insert(String::from("idle"), first, Arc::new(1));
        assert_eq!(cache.get(&String::from("idle"), first).as_deref(), Some(&1));

        let mut workspace = crate::kernel::Workspace::new();
        let second = workspace.mutated();
        assert!(cache.get(&String::from("idle"), second).is_none());
        assert!(cache.is_empty());
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                stale: 1
            }
        );
    }
}
