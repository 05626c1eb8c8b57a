//! IndicatorCache — FIFO, capacity-bounded cache for pure indicator
//! computations shared across optimizer trials.
//!
//! Eviction removes the oldest 10% of entries (by insertion order) once the
//! cache is at capacity, not a single LRU-style eviction.

use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct Inner {
    entries: HashMap<String, Decimal>,
    order: Vec<String>,
    hits: u64,
    misses: u64,
}

/// Thread-safe (guarded by an internal mutex, like `MarketSimulator`'s
/// state) so the same cache can be shared across a `rayon` worker pool.
pub struct IndicatorCache {
    max_size: usize,
    inner: Mutex<Inner>,
}

impl IndicatorCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: Vec::new(),
                hits: 0,
                misses: 0,
            }),
        }
    }

    /// `indicator:data_hash:sorted_params_json`.
    pub fn make_key(indicator: &str, data_hash: &str, params: &JsonValue) -> String {
        format!("{indicator}:{data_hash}:{}", canonical_json(params))
    }

    /// 16-hex prefix of SHA-256 over the comma-joined numeric series.
    pub fn hash_data(data: &[Decimal]) -> String {
        let joined = data.iter().map(Decimal::to_string).collect::<Vec<_>>().join(",");
        let mut hasher = Sha256::new();
        hasher.update(joined.as_bytes());
        format!("{:x}", hasher.finalize())[..16].to_string()
    }

    pub fn get(&self, key: &str) -> Option<Decimal> {
        let mut inner = self.inner.lock().unwrap();
        let hit = inner.entries.get(key).copied();
        if hit.is_some() {
            inner.hits += 1;
        } else {
            inner.misses += 1;
        }
        hit
    }

    pub fn put(&self, key: String, value: Decimal) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.max_size && self.max_size > 0 {
            let remove_count = (self.max_size / 10).max(1);
            let to_remove: Vec<String> = inner.order.iter().take(remove_count).cloned().collect();
            for k in to_remove {
                inner.entries.remove(&k);
            }
            inner.order.drain(..remove_count.min(inner.order.len()));
        }
        if !inner.entries.contains_key(&key) {
            inner.order.push(key.clone());
        }
        inner.entries.insert(key, value);
    }

    /// Look up `key`; on miss, compute with `f` and store the result.
    pub fn get_or_compute(&self, key: &str, f: impl FnOnce() -> Decimal) -> Decimal {
        if let Some(v) = self.get(key) {
            return v;
        }
        let v = f();
        self.put(key.to_string(), v);
        v
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.entries.clear();
        inner.order.clear();
        inner.hits = 0;
        inner.misses = 0;
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().unwrap();
        CacheStats {
            size: inner.entries.len(),
            max_size: self.max_size,
            hits: inner.hits,
            misses: inner.misses,
        }
    }
}

fn canonical_json(v: &JsonValue) -> String {
    match v {
        JsonValue::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let parts: Vec<String> = keys.iter().map(|k| format!("\"{k}\":{}", canonical_json(&map[*k]))).collect();
            format!("{{{}}}", parts.join(","))
        }
        other => other.to_string(),
    }
}
