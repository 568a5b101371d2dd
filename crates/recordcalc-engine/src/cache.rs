//! The formula result cache.
//!
//! Entries are keyed by (expression text, record id) and carry a snapshot of
//! every dependency's value at computation time. A lookup only hits when the
//! entry is unexpired and every snapshotted dependency still holds the same
//! value; anything stale is evicted on the spot.

use crate::value::{DataType, Value};
use ahash::AHashMap;
use chrono::{DateTime, Duration, Utc};
use recordcalc_model::RecordId;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub expression: String,
    pub record_id: RecordId,
}

impl CacheKey {
    #[must_use]
    pub fn new(expression: impl Into<String>, record_id: RecordId) -> Self {
        Self {
            expression: expression.into(),
            record_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub expression: String,
    pub record_id: RecordId,
    pub value: Value,
    pub data_type: DataType,
    /// Dependency snapshot: property name -> value at computation time. The
    /// name set is always a superset of what the exact expression reads;
    /// staleness detection is only as precise as this snapshot.
    pub dependencies: AHashMap<String, Value>,
    pub calculated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Bumped on every overwrite of the same key.
    pub version: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Owned, injectable result cache; one instance per engine.
#[derive(Debug, Default)]
pub struct FormulaCache {
    entries: AHashMap<CacheKey, CacheEntry>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl FormulaCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached entry for `key` if it is still fresh against
    /// `current_properties`. Expired or stale entries are evicted and the
    /// lookup counts as a miss.
    pub fn lookup(
        &mut self,
        key: &CacheKey,
        current_properties: &AHashMap<String, Value>,
    ) -> Option<&CacheEntry> {
        let fresh = match self.entries.get(key) {
            None => {
                self.misses += 1;
                return None;
            }
            Some(entry) => is_fresh(entry, current_properties),
        };

        if fresh {
            self.hits += 1;
            self.entries.get(key)
        } else {
            self.entries.remove(key);
            self.evictions += 1;
            self.misses += 1;
            None
        }
    }

    /// Write an entry for `key`, snapshotting `dependencies` and stamping the
    /// computation instant. Overwriting bumps the version counter.
    pub fn store(
        &mut self,
        key: CacheKey,
        value: Value,
        dependencies: AHashMap<String, Value>,
        ttl: Option<Duration>,
    ) {
        let now = Utc::now();
        let version = self.entries.get(&key).map(|e| e.version + 1).unwrap_or(1);
        let entry = CacheEntry {
            expression: key.expression.clone(),
            record_id: key.record_id.clone(),
            data_type: value.data_type(),
            value,
            dependencies,
            calculated_at: now,
            expires_at: ttl.map(|ttl| now + ttl),
            version,
        };
        self.entries.insert(key, entry);
    }

    /// Explicitly evict one entry. Returns `true` if it existed.
    pub fn invalidate(&mut self, key: &CacheKey) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.evictions += 1;
        }
        removed
    }

    /// Evict every entry belonging to `record_id` (e.g. when its formula is
    /// deleted).
    pub fn invalidate_record(&mut self, record_id: &RecordId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| &key.record_id != record_id);
        let removed = before - self.entries.len();
        self.evictions += removed as u64;
        removed
    }

    pub fn clear(&mut self) {
        self.evictions += self.entries.len() as u64;
        self.entries.clear();
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_fresh(entry: &CacheEntry, current_properties: &AHashMap<String, Value>) -> bool {
    if let Some(expires_at) = entry.expires_at {
        if expires_at <= Utc::now() {
            return false;
        }
    }
    entry.dependencies.iter().all(|(name, snapshot)| {
        current_properties.get(name).unwrap_or(&Value::Null) == snapshot
    })
}
