//! Content-hash keyed cache of generated suggestions.
//!
//! Keys are SHA-256 digests of the article text (see
//! [`compute_hash`](crate::models::compute_hash)), so the cache memoizes a
//! pure function of the input. Entries expire after a TTL and the oldest
//! entries are evicted once the valid count exceeds `max_entries`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::clock::Clock;
use crate::models::{CacheEntry, SuggestionSet};

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long an entry stays valid after being written.
    pub ttl: Duration,

    /// Maximum number of valid entries kept after a write.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    /// 24 hours, 100 entries.
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(24 * 60 * 60),
            max_entries: 100,
        }
    }
}

/// Cache statistics for the options page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    /// Sum of the serialized JSON size of every entry.
    pub total_size_bytes: usize,
    pub oldest_entry: Option<DateTime<Utc>>,
    pub newest_entry: Option<DateTime<Utc>>,
}

/// In-memory suggestion cache. Clones share the same entries.
#[derive(Clone)]
pub struct SuggestionCache<C> {
    config: CacheConfig,
    clock: C,
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
}

impl<C: Clock> SuggestionCache<C> {
    pub fn new(config: CacheConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovered from poisoned cache mutex");
            poisoned.into_inner()
        })
    }

    /// Look up a key, deleting the entry if it has expired.
    pub fn get(&self, key: &str) -> Option<SuggestionSet> {
        let now = self.clock.now();
        let mut entries = self.lock();
        let entry = entries.get(key)?;
        if entry.is_expired(now) {
            tracing::debug!(key = %short(key), "Cache entry expired");
            entries.remove(key);
            return None;
        }
        Some(entry.data.clone())
    }

    /// Store a value, then drop expired entries and evict the oldest ones
    /// beyond `max_entries`.
    pub fn set(&self, key: &str, value: SuggestionSet) {
        let now = self.clock.now();
        let ttl = chrono::Duration::from_std(self.config.ttl).unwrap_or(chrono::TimeDelta::MAX);
        let entry = CacheEntry {
            key: key.to_string(),
            data: value,
            created_at: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        };

        let mut entries = self.lock();
        entries.insert(key.to_string(), entry);
        let removed = Self::cleanup(&mut entries, now, self.config.max_entries);
        if removed > 0 {
            tracing::debug!(removed, "Cleaned up cache entries");
        }
    }

    pub fn remove(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Remove every entry, returning how many were dropped.
    pub fn clear(&self) -> usize {
        let mut entries = self.lock();
        let count = entries.len();
        entries.clear();
        count
    }

    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let entries = self.lock();

        let expired_entries = entries.values().filter(|e| e.is_expired(now)).count();
        let total_size_bytes = entries
            .values()
            .map(|e| serde_json::to_string(e).map(|s| s.len()).unwrap_or(0))
            .sum();

        CacheStats {
            total_entries: entries.len(),
            valid_entries: entries.len() - expired_entries,
            expired_entries,
            total_size_bytes,
            oldest_entry: entries.values().map(|e| e.created_at).min(),
            newest_entry: entries.values().map(|e| e.created_at).max(),
        }
    }

    /// Snapshot of all entries (expired ones included), oldest first.
    pub fn entries(&self) -> Vec<CacheEntry> {
        let mut all: Vec<CacheEntry> = self.lock().values().cloned().collect();
        all.sort_by_key(|e| e.created_at);
        all
    }

    /// Load previously persisted entries, skipping expired ones and
    /// applying the capacity limit.
    pub fn restore(&self, restored: impl IntoIterator<Item = CacheEntry>) {
        let now = self.clock.now();
        let mut entries = self.lock();
        for entry in restored.into_iter().filter(|e| !e.is_expired(now)) {
            entries.insert(entry.key.clone(), entry);
        }
        Self::cleanup(&mut entries, now, self.config.max_entries);
    }

    fn cleanup(
        entries: &mut HashMap<String, CacheEntry>,
        now: DateTime<Utc>,
        max_entries: usize,
    ) -> usize {
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired(now));

        if entries.len() > max_entries {
            let mut by_age: Vec<(DateTime<Utc>, String)> = entries
                .values()
                .map(|e| (e.created_at, e.key.clone()))
                .collect();
            by_age.sort();
            let excess = entries.len() - max_entries;
            for (_, key) in by_age.into_iter().take(excess) {
                entries.remove(&key);
            }
        }

        before - entries.len()
    }
}

fn short(key: &str) -> &str {
    key.get(..8).unwrap_or(key)
}
