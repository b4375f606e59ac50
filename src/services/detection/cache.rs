// Detection Cache
// Fixed-capacity result cache with insertion-order (FIFO) eviction.
// Reads never reorder entries, so a hot entry can be evicted before a cold one.

use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};

use crate::models::{AnalysisContext, DetectionResult};
use crate::services::text_processor::char_prefix;

/// Characters of normalized text folded into the key ahead of the full original.
const KEY_PREFIX_CHARS: usize = 100;

/// Digest of the registry version, the normalized prefix, the original text and
/// the serialized context. The original text is included because regex rules
/// run against it, so two inputs that normalize identically can still score
/// differently. Results computed on an older registry hash to keys no lookup
/// will ever ask for again.
pub fn cache_key(registry_version: u64, normalized: &str, original: &str, context: &AnalysisContext) -> String {
    let context_json = serde_json::to_string(context).unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(registry_version.to_le_bytes());
    hasher.update(char_prefix(normalized, KEY_PREFIX_CHARS).as_bytes());
    hasher.update([0u8]);
    hasher.update(original.as_bytes());
    hasher.update([0u8]);
    hasher.update(context_json.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug)]
pub struct DetectionCache {
    capacity: usize,
    entries: HashMap<String, DetectionResult>,
    order: VecDeque<String>,
}

impl DetectionCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity.min(4096)),
            order: VecDeque::with_capacity(capacity.min(4096)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&DetectionResult> {
        self.entries.get(key)
    }

    /// Store a result. Existing keys keep their original value and position.
    pub fn insert(&mut self, key: String, result: DetectionResult) {
        if self.capacity == 0 || self.entries.contains_key(&key) {
            return;
        }
        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, result);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(score: f64) -> DetectionResult {
        let mut r = DetectionResult::empty(0.0);
        r.risk_score = score;
        r
    }

    #[test]
    fn test_evicts_oldest_inserted() {
        let mut cache = DetectionCache::new(2);
        cache.insert("a".to_string(), result(1.0));
        cache.insert("b".to_string(), result(2.0));
        // Reads do not refresh position.
        assert!(cache.get("a").is_some());
        cache.insert("c".to_string(), result(3.0));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("b").map(|r| r.risk_score), Some(2.0));
        assert_eq!(cache.get("c").map(|r| r.risk_score), Some(3.0));
    }

    #[test]
    fn test_existing_entries_are_not_replaced() {
        let mut cache = DetectionCache::new(4);
        cache.insert("a".to_string(), result(1.0));
        cache.insert("a".to_string(), result(9.0));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a").map(|r| r.risk_score), Some(1.0));
    }

    #[test]
    fn test_zero_capacity_disables_cache() {
        let mut cache = DetectionCache::new(0);
        cache.insert("a".to_string(), result(1.0));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_key_depends_on_context_and_original() {
        let plain = AnalysisContext::default();
        let linkedin = AnalysisContext::for_platform("linkedin");
        let k1 = cache_key(0, "you idiot", "you idiot", &plain);
        let k2 = cache_key(0, "you idiot", "you idiot", &linkedin);
        let k3 = cache_key(0, "you idiot", "you, idiot!", &plain);
        assert_ne!(k1, k2);
        assert_ne!(k1, k3);
        assert_eq!(k1, cache_key(0, "you idiot", "you idiot", &AnalysisContext::default()));
        assert_eq!(k1.len(), 64);
    }

    #[test]
    fn test_cache_key_depends_on_registry_version() {
        let ctx = AnalysisContext::default();
        assert_ne!(
            cache_key(1, "walnut", "walnut", &ctx),
            cache_key(2, "walnut", "walnut", &ctx)
        );
    }
}
