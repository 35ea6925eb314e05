//! Per-product review cache with time-to-live
//!
//! Entries expire lazily: an expired entry is removed the next time it is
//! read, probed or counted in stats. An entry is expired only once its age
//! is strictly greater than the TTL.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

use crate::domain::review::Review;

pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
struct CacheEntry {
    reviews: Vec<Review>,
    stored_at: Instant,
    written_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub total_reviews: usize,
    pub oldest_entry: Option<DateTime<Utc>>,
    pub newest_entry: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct ReviewCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl Default for ReviewCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl ReviewCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_ttl_minutes(minutes: u64) -> Self {
        Self::new(Duration::from_secs(minutes.saturating_mul(60)))
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store reviews for a product, replacing any previous entry.
    pub fn set(&self, product_id: &str, reviews: Vec<Review>) {
        debug!("Caching {} reviews for {}", reviews.len(), product_id);
        self.lock().insert(
            product_id.to_string(),
            CacheEntry {
                reviews,
                stored_at: Instant::now(),
                written_at: Utc::now(),
            },
        );
    }

    pub fn get(&self, product_id: &str) -> Option<Vec<Review>> {
        let mut entries = self.lock();
        let entry = entries.get(product_id)?;
        if self.is_expired(entry, Instant::now()) {
            debug!("Cache entry for {} expired", product_id);
            entries.remove(product_id);
            return None;
        }
        Some(entry.reviews.clone())
    }

    pub fn has(&self, product_id: &str) -> bool {
        let mut entries = self.lock();
        match entries.get(product_id) {
            Some(entry) if self.is_expired(entry, Instant::now()) => {
                entries.remove(product_id);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    pub fn delete(&self, product_id: &str) {
        self.lock().remove(product_id);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Summary of live entries; expired entries are purged first.
    pub fn stats(&self) -> CacheStats {
        let mut entries = self.lock();
        let now = Instant::now();
        entries.retain(|_, entry| !self.is_expired(entry, now));

        CacheStats {
            entries: entries.len(),
            total_reviews: entries.values().map(|e| e.reviews.len()).sum(),
            oldest_entry: entries.values().map(|e| e.written_at).min(),
            newest_entry: entries.values().map(|e| e.written_at).max(),
        }
    }

    fn is_expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.stored_at) > self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
