use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use duty_core::{RateRecord, TaxError, TaxResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const DEFAULT_TTL_SECS: i64 = 3600; // 1 hour

/// Internal cache entry with timestamp
struct CacheEntry {
    records: Vec<RateRecord>,
    cached_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Age of the first record's provenance; entries with no records age from insertion.
    fn age(&self, now: DateTime<Utc>) -> Duration {
        let reference = self
            .records
            .first()
            .map(|r| r.source.last_updated)
            .unwrap_or(self.cached_at);
        now - reference
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub size: usize,
    pub countries: BTreeSet<String>,
}

/// Rate lookups keyed by `(country, code-or-"all")`.
///
/// Concurrent readers and writers are fine; a racing duplicate fetch only
/// overwrites an entry with an equivalent one.
pub struct RateCache {
    entries: DashMap<String, CacheEntry>,
    enabled: bool,
    ttl: Duration,
}

impl Default for RateCache {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_TTL_SECS))
    }
}

impl RateCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            enabled: true,
            ttl,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn key(country: &str, code: Option<&str>) -> String {
        format!("{}:{}", country.to_uppercase(), code.unwrap_or("all"))
    }

    pub fn configure(&mut self, enabled: bool, ttl_secs: i64) -> TaxResult<()> {
        if enabled && ttl_secs <= 0 {
            return Err(TaxError::cache(format!(
                "cache TTL must be positive when caching is enabled (got {})",
                ttl_secs
            )));
        }
        self.enabled = enabled;
        self.ttl = Duration::seconds(ttl_secs.max(0));
        if !enabled {
            self.entries.clear();
        }
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh records for the key, if any. A stale entry is evicted.
    pub fn get(&self, country: &str, code: Option<&str>) -> Option<Vec<RateRecord>> {
        if !self.enabled {
            return None;
        }
        let key = Self::key(country, code);
        let now = Utc::now();

        if let Some(entry) = self.entries.get(&key) {
            if entry.age(now) < self.ttl {
                return Some(entry.records.clone());
            }
        } else {
            return None;
        }

        self.entries.remove_if(&key, |_, entry| entry.age(now) >= self.ttl);
        None
    }

    pub fn put(&self, country: &str, code: Option<&str>, records: Vec<RateRecord>) {
        if !self.enabled {
            return;
        }
        self.entries.insert(
            Self::key(country, code),
            CacheEntry {
                records,
                cached_at: Utc::now(),
            },
        );
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Drop every entry for a country, whatever its code.
    pub fn invalidate_country(&self, country: &str) {
        let prefix = format!("{}:", country.to_uppercase());
        self.entries.retain(|key, _| !key.starts_with(&prefix));
    }

    pub fn stats(&self) -> CacheStats {
        let countries = self
            .entries
            .iter()
            .filter_map(|e| e.key().split(':').next().map(str::to_string))
            .collect();
        CacheStats {
            size: self.entries.len(),
            countries,
        }
    }
}
