//! Response cache for `/assess`
//!
//! LRU over a `LinkedHashMap` with optional TTL. Keys hash the parsed
//! profile together with the catalog generation, so a catalog reload
//! never serves results ranked against the old catalog.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use fmsc_common::config::CacheConfig;
use fmsc_common::MovementProfile;
use linked_hash_map::LinkedHashMap;
use sha2::{Digest, Sha256};
use tracing::{debug, error};

struct CachedEntry<V> {
    value: V,
    inserted: Instant,
}

/// Bounded LRU cache with optional expiry
pub struct ResponseCache<V> {
    entries: RwLock<LinkedHashMap<String, CachedEntry<V>>>,
    max_entries: usize,
    ttl: Option<Duration>,
}

/// Hex SHA-256 of the canonical profile encoding plus catalog generation
///
/// `None` when the profile cannot be encoded; the caller skips the cache.
pub fn cache_key(profile: &MovementProfile, generation: u64) -> Option<String> {
    // Struct field order is fixed and unknown keys live in BTreeMaps, so
    // the encoding is canonical for equal profiles.
    let bytes = match serde_json::to_vec(profile) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Profile encoding failed, bypassing cache: {}", e);
            return None;
        }
    };

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    hasher.update(generation.to_le_bytes());
    Some(format!("{:x}", hasher.finalize()))
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LinkedHashMap::new()),
            max_entries: config.max_entries.max(1),
            ttl: config.ttl_seconds.map(Duration::from_secs),
        }
    }

    /// Look up a value, refreshing its LRU position
    ///
    /// Expired entries are removed and reported as misses.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = match self.entries.write() {
            Ok(entries) => entries,
            Err(_) => return None,
        };

        let expired = match entries.get_refresh(key) {
            Some(entry) => self
                .ttl
                .is_some_and(|ttl| entry.inserted.elapsed() >= ttl),
            None => return None,
        };

        if expired {
            entries.remove(key);
            debug!(key = %key, "Cache entry expired");
            return None;
        }

        entries.get(key).map(|entry| entry.value.clone())
    }

    /// Insert a value, evicting the least recently used entries if full
    pub fn insert(&self, key: String, value: V) {
        let mut entries = match self.entries.write() {
            Ok(entries) => entries,
            Err(e) => {
                error!("Response cache lock poisoned: {}", e);
                return;
            }
        };

        entries.remove(&key);
        while entries.len() >= self.max_entries {
            if entries.pop_front().is_none() {
                break;
            }
        }

        entries.insert(
            key,
            CachedEntry {
                value,
                inserted: Instant::now(),
            },
        );
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
