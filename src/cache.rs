//! Process-lifetime store of the last good result per indicator.

use std::{collections::HashMap, time::Duration};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::datasources::QuoteResult;
use crate::indicator::Indicator;

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub result: QuoteResult,
    pub captured_at_epoch_millis: i64,
}

impl CacheEntry {
    pub fn age_millis(&self, now: DateTime<Utc>) -> i64 {
        now.timestamp_millis() - self.captured_at_epoch_millis
    }

    /// A clock that went backwards counts as age zero.
    pub fn is_fresh(&self, now: DateTime<Utc>, window: Duration) -> bool {
        let window_millis = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
        self.age_millis(now).max(0) < window_millis
    }
}

/// One slot per indicator, last write wins. Entries are never evicted; staleness is
/// decided by the reader.
#[derive(Debug, Default)]
pub struct StalenessCache {
    slots: RwLock<HashMap<Indicator, CacheEntry>>,
}

impl StalenessCache {
    pub fn new() -> StalenessCache {
        StalenessCache::default()
    }

    pub async fn get(&self, indicator: Indicator) -> Option<CacheEntry> {
        self.slots.read().await.get(&indicator).cloned()
    }

    pub async fn put(&self, indicator: Indicator, result: QuoteResult, now: DateTime<Utc>) {
        let entry = CacheEntry {
            result,
            captured_at_epoch_millis: now.timestamp_millis(),
        };
        self.slots.write().await.insert(indicator, entry);
    }
}
