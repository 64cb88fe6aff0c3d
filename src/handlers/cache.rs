//! Cache command handlers

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::Value;
use std::time::Duration;

use crate::cache::TtlCache;
use crate::settings::SyncSettings;
use crate::store::LocalStore;

fn open_cache() -> Result<TtlCache> {
    let settings = SyncSettings::load()?;
    Ok(TtlCache::with_default_ttl(
        LocalStore::open_default()?,
        settings.cache_ttl(),
    ))
}

/// Cache a JSON value under `key`
///
/// `ttl_secs` overrides the configured TTL; `no_expiry` keeps the entry until
/// it is overwritten.
pub fn handle_cache_set(key: &str, data: &str, ttl_secs: Option<u64>, no_expiry: bool) -> Result<()> {
    let value: Value = serde_json::from_str(data).context("Cache data must be valid JSON")?;
    let cache = open_cache()?;

    if no_expiry {
        cache.cache_data_with_ttl(key, &value, None)?;
        println!("{} Cached {} without expiry", "✓".green(), key.bold());
    } else if let Some(secs) = ttl_secs {
        cache.cache_data_with_ttl(key, &value, Some(Duration::from_secs(secs)))?;
        println!("{} Cached {} for {}s", "✓".green(), key.bold(), secs);
    } else {
        cache.cache_data(key, &value)?;
        println!("{} Cached {}", "✓".green(), key.bold());
    }

    Ok(())
}

/// Print the cached value, if still fresh
pub fn handle_cache_get(key: &str) -> Result<()> {
    let cache = open_cache()?;

    match cache.get_cached_data::<Value>(key)? {
        Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        None => println!("{}", format!("No fresh cache entry for {key}").yellow()),
    }

    Ok(())
}

/// Drop every expired entry
pub fn handle_cache_clear_expired() -> Result<()> {
    let cache = open_cache()?;
    let removed = cache.clear_expired_cache()?;

    if removed > 0 {
        println!("{} Removed {} expired entries", "✓".green(), removed);
    } else {
        println!("{}", "No expired cache entries".dimmed());
    }

    Ok(())
}
