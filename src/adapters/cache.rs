use crate::domain::model::{CacheEntry, RecordSet};
use crate::domain::ports::RecordCache;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// In-process TTL cache shared by every request of one `CsvApi`.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        let purged = before - entries.len();
        if purged > 0 {
            tracing::debug!("Purged {} expired cache entries", purged);
        }
        purged
    }

    // 資料本身不會因 panic 而失效，所以直接取回 poisoned lock
    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl RecordCache for MemoryCache {
    fn get(&self, key: &str) -> Option<RecordSet> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.is_expired_at(Utc::now()) => {
                tracing::debug!("Cache entry {} expired", key);
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    // 寫入時順便清掉過期項目，避免只用一次的來源一直留在記憶體
    fn put(&self, key: &str, value: RecordSet, ttl: Duration) {
        let now = Utc::now();
        let entry = CacheEntry {
            key: key.to_string(),
            value,
            expires_at: expiry_after(now, ttl),
        };
        tracing::debug!("Caching {} records under {}", entry.value.len(), key);

        let mut entries = self.lock();
        entries.retain(|_, existing| !existing.is_expired_at(now));
        entries.insert(key.to_string(), entry);
    }
}
