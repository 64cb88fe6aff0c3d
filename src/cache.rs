//! TTL cache on top of the local store's `cache` partition.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::store::{LocalStore, Partition};

/// Default time-to-live for cache writes
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// A cached value with its write time and optional time-to-live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,

    pub timestamp: DateTime<Utc>,

    /// Milliseconds; entries without a ttl never expire
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, timestamp: DateTime<Utc>, ttl: Option<Duration>) -> Self {
        Self {
            data,
            timestamp,
            ttl: ttl.map(|ttl| i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)),
        }
    }

    /// Expired iff `now - timestamp > ttl`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.ttl {
            Some(ttl) => chrono::Duration::try_milliseconds(ttl)
                .is_some_and(|ttl| now - self.timestamp > ttl),
            None => false,
        }
    }
}

/// Key-value cache whose entries expire lazily on read
#[derive(Debug, Clone)]
pub struct TtlCache {
    store: LocalStore,
    default_ttl: Duration,
}

impl TtlCache {
    pub fn new(store: LocalStore) -> Self {
        Self::with_default_ttl(store, DEFAULT_TTL)
    }

    pub fn with_default_ttl(store: LocalStore, default_ttl: Duration) -> Self {
        Self { store, default_ttl }
    }

    /// Cache `data` under `key` with the default ttl
    pub fn cache_data<T: Serialize>(&self, key: &str, data: &T) -> Result<()> {
        self.cache_data_with_ttl(key, data, Some(self.default_ttl))
    }

    /// Cache `data` under `key`; `None` never expires
    pub fn cache_data_with_ttl<T: Serialize>(&self, key: &str, data: &T, ttl: Option<Duration>) -> Result<()> {
        let entry = CacheEntry::new(data, Utc::now(), ttl);
        self.store.save_local(Partition::Cache, key, &entry)
    }

    /// Read a fresh entry, evicting it if it has expired
    pub fn get_cached_data<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.get_cached_data_at(key, Utc::now())
    }

    /// [`get_cached_data`](Self::get_cached_data) against an explicit clock
    pub fn get_cached_data_at<T: DeserializeOwned>(&self, key: &str, now: DateTime<Utc>) -> Result<Option<T>> {
        let Some(entry) = self.store.get_local::<CacheEntry<T>>(Partition::Cache, key)? else {
            return Ok(None);
        };

        if entry.is_expired(now) {
            log::debug!("Cache entry {key} expired");
            self.store.delete_local(Partition::Cache, key)?;
            return Ok(None);
        }

        Ok(Some(entry.data))
    }

    /// Evict every expired entry; returns how many were removed
    pub fn clear_expired_cache(&self) -> Result<usize> {
        self.clear_expired_cache_at(Utc::now())
    }

    pub fn clear_expired_cache_at(&self, now: DateTime<Utc>) -> Result<usize> {
        let expired: Vec<String> = self
            .store
            .entries::<CacheEntry<Value>>(Partition::Cache)?
            .into_iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key)
            .collect();

        for key in &expired {
            self.store.delete_local(Partition::Cache, key)?;
        }

        log::info!("Cleared {} expired cache entries", expired.len());
        Ok(expired.len())
    }

    pub fn len(&self) -> Result<usize> {
        self.store.count(Partition::Cache)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
