use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RequestType {
    Classify,
    CostPrediction,
    SqlOptimization,
}

impl RequestType {
    fn ttl(self, cache_config: &crate::config::CacheConfig) -> Duration {
        let secs = match self {
            RequestType::Classify => cache_config.ttl_classify_secs,
            RequestType::CostPrediction => cache_config.ttl_cost_prediction_secs,
            RequestType::SqlOptimization => cache_config.ttl_sql_optimization_secs,
        };
        Duration::from_secs(secs)
    }
}

struct CacheEntry {
    value: Value,
    request_type: RequestType,
    created_at: Instant,
    expires_at: Instant,
}

/// `sha256(canonical JSON of {type, prompt_version, payload})`-keyed
/// response cache with per-request-type TTLs (spec.md §4.6). Single mutex
/// around the map, matching the teacher's single-mutex cache policy
/// (spec.md §5).
pub struct ResponseCache {
    capacity: usize,
    entries: Mutex<BTreeMap<String, CacheEntry>>,
    insertion_order: Mutex<Vec<String>>,
}

impl ResponseCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(BTreeMap::new()),
            insertion_order: Mutex::new(Vec::new()),
        }
    }

    pub fn key(request_type: RequestType, prompt_version: &str, payload: &impl Serialize) -> String {
        let canonical = serde_json::json!({
            "type": format!("{request_type:?}"),
            "prompt_version": prompt_version,
            "payload": serde_json::to_value(payload).unwrap_or(Value::Null),
        });
        let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }

    pub fn lookup(&self, key: &str, now: Instant) -> Option<Value> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(
        &self,
        key: String,
        value: Value,
        request_type: RequestType,
        cache_config: &crate::config::CacheConfig,
        now: Instant,
    ) {
        self.sweep_expired(now);
        {
            let entries = self.entries.lock();
            if entries.len() >= self.capacity {
                drop(entries);
                self.evict_oldest_tenth();
            }
        }
        let expires_at = now + request_type.ttl(cache_config);
        self.entries.lock().insert(
            key.clone(),
            CacheEntry {
                value,
                request_type,
                created_at: now,
                expires_at,
            },
        );
        self.insertion_order.lock().push(key);
    }

    fn sweep_expired(&self, now: Instant) {
        let mut entries = self.entries.lock();
        entries.retain(|_, entry| entry.expires_at > now);
    }

    fn evict_oldest_tenth(&self) {
        let mut order = self.insertion_order.lock();
        let mut entries = self.entries.lock();
        order.retain(|k| entries.contains_key(k));
        let remove_count = (order.len() / 10).max(1);
        let to_remove: Vec<String> = order.drain(..remove_count.min(order.len())).collect();
        for key in to_remove {
            entries.remove(&key);
        }
    }

    pub fn invalidate_by_type(&self, request_type: RequestType) {
        let mut entries = self.entries.lock();
        entries.retain(|_, entry| entry.request_type != request_type);
    }

    pub fn invalidate_all(&self) {
        self.entries.lock().clear();
        self.insertion_order.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    fn created_at(&self, key: &str) -> Option<Instant> {
        self.entries.lock().get(key).map(|e| e.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;

    #[test]
    fn lookup_evicts_past_expiry_entries() {
        let cache = ResponseCache::new(10);
        let config = CacheConfig {
            ttl_classify_secs: 1,
            ..CacheConfig::default()
        };
        let now = Instant::now();
        cache.insert("k1".to_string(), Value::Bool(true), RequestType::Classify, &config, now);
        assert!(cache.lookup("k1", now).is_some());
        let later = now + Duration::from_secs(2);
        assert!(cache.lookup("k1", later).is_none());
    }

    #[test]
    fn eviction_at_capacity_removes_oldest_tenth() {
        let cache = ResponseCache::new(10);
        let config = CacheConfig::default();
        let now = Instant::now();
        for i in 0..10 {
            cache.insert(format!("k{i}"), Value::from(i), RequestType::Classify, &config, now);
        }
        assert_eq!(cache.len(), 10);
        cache.insert("k10".to_string(), Value::from(10), RequestType::Classify, &config, now);
        assert!(cache.len() <= 10);
        assert!(cache.created_at("k0").is_none());
    }

    #[test]
    fn invalidate_by_type_leaves_other_types_intact() {
        let cache = ResponseCache::new(10);
        let config = CacheConfig::default();
        let now = Instant::now();
        cache.insert("a".to_string(), Value::Null, RequestType::Classify, &config, now);
        cache.insert("b".to_string(), Value::Null, RequestType::CostPrediction, &config, now);
        cache.invalidate_by_type(RequestType::Classify);
        assert!(cache.lookup("a", now).is_none());
        assert!(cache.lookup("b", now).is_some());
    }
}
