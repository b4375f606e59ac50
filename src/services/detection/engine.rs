// Detection Engine
// Normalize, match, adjust and score a message, with a shared result cache and counters

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, info};

use crate::models::{AnalysisContext, Category, DetectionResult, Severity};
use crate::services::config_store::DetectionConfig;
use crate::services::text_processor::{normalize_text, preview};

use super::aggregation::score_detections;
use super::cache::{cache_key, DetectionCache};
use super::context::adjust_for_context;
use super::matcher::{detect_all, MatchSettings};
use super::pattern_registry::{PatternError, PatternRegistry, RegistryHandle};

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 10000.0).round() / 100.0
}

/// Running counters for one engine instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionStats {
    pub total_scanned: u64,
    pub threats_detected: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub categories: BTreeMap<Category, u64>,
}

impl DetectionStats {
    /// Percentage of lookups served from cache.
    pub fn cache_hit_rate(&self) -> f64 {
        percent(self.cache_hits, self.cache_hits + self.cache_misses)
    }

    /// Percentage of scanned messages flagged as abusive.
    pub fn detection_rate(&self) -> f64 {
        percent(self.threats_detected, self.total_scanned)
    }

    /// Blank input is scanned but never reaches the cache.
    fn record_empty(&mut self) {
        self.total_scanned += 1;
    }

    fn record(&mut self, result: &DetectionResult, cache_hit: bool) {
        self.total_scanned += 1;
        if cache_hit {
            self.cache_hits += 1;
        } else {
            self.cache_misses += 1;
        }
        if result.is_abusive {
            self.threats_detected += 1;
            for category in &result.categories {
                *self.categories.entry(*category).or_insert(0) += 1;
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Thread-safe entry point for content analysis. Share it behind an `Arc`.
pub struct DetectionEngine {
    registry: RegistryHandle,
    cache: Mutex<DetectionCache>,
    stats: Mutex<DetectionStats>,
    settings: MatchSettings,
}

impl DetectionEngine {
    pub fn new(config: &DetectionConfig) -> Self {
        Self::with_registry(PatternRegistry::builtin(), config)
    }

    pub fn with_registry(registry: PatternRegistry, config: &DetectionConfig) -> Self {
        info!(
            entries = registry.entries().len(),
            patterns = registry.pattern_count(),
            words = registry.word_count(),
            cache_capacity = config.cache_capacity,
            "[detection] engine initialized"
        );
        Self {
            registry: RegistryHandle::new(registry),
            cache: Mutex::new(DetectionCache::new(config.cache_capacity)),
            stats: Mutex::new(DetectionStats::default()),
            settings: config.match_settings(),
        }
    }

    /// Assess `text` under `context`. Never fails; empty input yields the
    /// canonical empty result.
    pub fn analyze(&self, text: &str, context: &AnalysisContext) -> DetectionResult {
        let started = Instant::now();
        let elapsed_ms = || started.elapsed().as_secs_f64() * 1000.0;

        let normalized = normalize_text(text);
        if normalized.is_empty() {
            lock(&self.stats).record_empty();
            return DetectionResult::empty(elapsed_ms());
        }

        // Matching runs on this snapshot with no lock held. Its version is part
        // of the key, so a result computed before a registry swap is unreachable.
        let registry = self.registry.snapshot();
        let key = cache_key(registry.version(), &normalized, text, context);
        let cached = lock(&self.cache).get(&key).cloned();
        if let Some(hit) = cached {
            let result = hit.with_processing_time(elapsed_ms());
            lock(&self.stats).record(&result, true);
            debug!(risk = result.risk_score, "[detection] cache hit");
            return result;
        }

        let detections = detect_all(&registry, &normalized, text, &self.settings);
        let adjusted = adjust_for_context(detections, context);
        let result = score_detections(adjusted, text).with_processing_time(elapsed_ms());

        lock(&self.cache).insert(key, result.clone());
        lock(&self.stats).record(&result, false);

        if result.is_abusive {
            info!(
                risk = result.risk_score,
                level = ?result.risk_level,
                detections = result.detections.len(),
                "[detection] flagged: {}",
                preview(text, 50)
            );
        } else {
            debug!("[detection] clean message ({} chars)", text.chars().count());
        }

        result
    }

    /// Register a regex for `category`. Invalid patterns leave the registry unchanged.
    pub fn add_custom_pattern(&self, category: Category, pattern: &str, severity: Severity) -> Result<u64, PatternError> {
        let version = self.registry.add_custom_pattern(category, pattern, severity)?;
        self.clear_cache();
        Ok(version)
    }

    pub fn remove_pattern(&self, category: Category, pattern: &str) -> Result<u64, PatternError> {
        let version = self.registry.remove_pattern(category, pattern)?;
        self.clear_cache();
        Ok(version)
    }

    pub fn registry(&self) -> Arc<PatternRegistry> {
        self.registry.snapshot()
    }

    pub fn registry_version(&self) -> u64 {
        self.registry.snapshot().version()
    }

    pub fn stats(&self) -> DetectionStats {
        lock(&self.stats).clone()
    }

    pub fn reset_stats(&self) {
        *lock(&self.stats) = DetectionStats::default();
        info!("[detection] statistics reset");
    }

    pub fn clear_cache(&self) {
        lock(&self.cache).clear();
        debug!("[detection] cache cleared");
    }

    pub fn cached_results(&self) -> usize {
        lock(&self.cache).len()
    }
}

impl Default for DetectionEngine {
    fn default() -> Self {
        Self::new(&DetectionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MatchMethod, RiskLevel};
    use std::thread;

    #[test]
    fn test_empty_and_whitespace_input() {
        let engine = DetectionEngine::default();
        for text in ["", "   \n\t", "!!! ???"] {
            let result = engine.analyze(text, &AnalysisContext::default());
            assert!(!result.is_abusive);
            assert_eq!(result.risk_score, 0.0);
            assert_eq!(result.risk_level, RiskLevel::None);
            assert_eq!(result.confidence, 1.0);
            assert!(result.detections.is_empty());
        }

        let stats = engine.stats();
        assert_eq!(stats.total_scanned, 3);
        assert_eq!(stats.cache_hits + stats.cache_misses, 0);
        assert_eq!(stats.detection_rate(), 0.0);
        assert_eq!(engine.cached_results(), 0);
    }

    #[test]
    fn test_clean_message() {
        let engine = DetectionEngine::default();
        let result = engine.analyze("hello there, how are you", &AnalysisContext::default());
        assert!(!result.is_abusive);
        assert_eq!(result.risk_level, RiskLevel::None);
        assert!(result.categories.is_empty());
        assert!(result.suggestions.is_empty());
    }

    #[test]
    fn test_threat_is_flagged() {
        let engine = DetectionEngine::default();
        let result = engine.analyze("I will kill you", &AnalysisContext::default());
        assert!(result.is_abusive);
        assert!(result.categories.contains(&Category::Threats));
        assert!(matches!(result.risk_level, RiskLevel::High | RiskLevel::Critical));
        assert!(result.risk_score <= 100.0);
        assert_eq!(result.suggestions.len(), result.categories.len());
    }

    #[test]
    fn test_obfuscated_word_is_normalized() {
        let engine = DetectionEngine::default();
        let result = engine.analyze("you 1d10t", &AnalysisContext::default());
        assert!(result
            .detections
            .iter()
            .any(|d| d.category == Category::Harassment && d.method == MatchMethod::Exact));
    }

    #[test]
    fn test_spaced_look_alike_and_stretched_words_are_flagged() {
        let engine = DetectionEngine::default();
        for text in ["you are s t u p i d", "you ıdıot", "you iiiidiot", "you are ＳＴＵＰＩＤ"] {
            let result = engine.analyze(text, &AnalysisContext::default());
            assert!(result.is_abusive, "{}", text);
            assert!(result.categories.contains(&Category::Harassment), "{}", text);
            assert!(result.detections.iter().all(|d| d.method != MatchMethod::Fuzzy), "{}", text);
        }
    }

    #[test]
    fn test_cache_hit_matches_miss_except_timing() {
        let engine = DetectionEngine::default();
        let ctx = AnalysisContext::for_platform("twitter");
        let first = engine.analyze("you are so stupid", &ctx);
        let second = engine.analyze("you are so stupid", &ctx);

        assert_eq!(first.with_processing_time(0.0), second.with_processing_time(0.0));
        let stats = engine.stats();
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.cache_hit_rate(), 50.0);
    }

    #[test]
    fn test_context_changes_cache_key() {
        let engine = DetectionEngine::default();
        engine.analyze("idiot", &AnalysisContext::default());
        engine.analyze("idiot", &AnalysisContext::for_platform("linkedin"));
        assert_eq!(engine.stats().cache_misses, 2);
        assert_eq!(engine.cached_results(), 2);
    }

    #[test]
    fn test_zero_capacity_disables_cache() {
        let config = DetectionConfig {
            cache_capacity: 0,
            ..DetectionConfig::default()
        };
        let engine = DetectionEngine::new(&config);
        engine.analyze("idiot", &AnalysisContext::default());
        engine.analyze("idiot", &AnalysisContext::default());
        assert_eq!(engine.stats().cache_hits, 0);
        assert_eq!(engine.cached_results(), 0);
    }

    #[test]
    fn test_custom_pattern_lifecycle() {
        let engine = DetectionEngine::default();
        let ctx = AnalysisContext::default();
        let before = engine.registry().pattern_count();
        assert!(!engine.analyze("you absolute walnut", &ctx).is_abusive);

        let version = engine
            .add_custom_pattern(Category::Trolling, r"absolute\s+walnut", Severity::Medium)
            .unwrap();
        assert_eq!(version, engine.registry_version());
        assert_eq!(engine.registry().pattern_count(), before + 1);
        assert_eq!(engine.cached_results(), 0);

        let result = engine.analyze("you absolute walnut", &ctx);
        assert!(result.categories.contains(&Category::Trolling));

        engine.remove_pattern(Category::Trolling, r"absolute\s+walnut").unwrap();
        assert_eq!(engine.registry().pattern_count(), before);
        assert!(!engine.analyze("you absolute walnut", &ctx).is_abusive);
    }

    #[test]
    fn test_result_cached_after_registry_swap_is_not_served() {
        let engine = DetectionEngine::default();
        let ctx = AnalysisContext::default();
        let text = "you absolute walnut";

        let old_version = engine.registry_version();
        let stale = engine.analyze(text, &ctx);
        assert!(!stale.is_abusive);

        engine
            .add_custom_pattern(Category::Trolling, r"absolute\s+walnut", Severity::Medium)
            .unwrap();
        // A slow analysis that scored on the old snapshot inserts after the swap.
        let stale_key = cache_key(old_version, &normalize_text(text), text, &ctx);
        lock(&engine.cache).insert(stale_key, stale);
        assert_eq!(engine.cached_results(), 1);

        let fresh = engine.analyze(text, &ctx);
        assert!(fresh.is_abusive);
        assert!(fresh.categories.contains(&Category::Trolling));
        assert_eq!(engine.stats().cache_hits, 0);
    }

    #[test]
    fn test_invalid_pattern_leaves_registry_unchanged() {
        let engine = DetectionEngine::default();
        let before = engine.registry().pattern_count();
        let version = engine.registry_version();

        let err = engine.add_custom_pattern(Category::Spam, "(unclosed", Severity::Low);
        assert!(matches!(err, Err(PatternError::InvalidRegex { .. })));
        assert_eq!(engine.registry().pattern_count(), before);
        assert_eq!(engine.registry_version(), version);
    }

    #[test]
    fn test_stats_and_reset() {
        let engine = DetectionEngine::default();
        let ctx = AnalysisContext::default();
        engine.analyze("buy now, click here", &ctx);
        engine.analyze("have a nice day", &ctx);

        let stats = engine.stats();
        assert_eq!(stats.total_scanned, 2);
        assert_eq!(stats.threats_detected, 1);
        assert_eq!(stats.detection_rate(), 50.0);
        assert_eq!(stats.categories.get(&Category::Spam), Some(&1));

        engine.reset_stats();
        assert_eq!(engine.stats(), DetectionStats::default());
        assert_eq!(engine.stats().cache_hit_rate(), 0.0);
    }

    #[test]
    fn test_concurrent_analysis() {
        let engine = Arc::new(DetectionEngine::default());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    let text = if i % 2 == 0 { "I will kill you" } else { "hello friend" };
                    for _ in 0..25 {
                        engine.analyze(text, &AnalysisContext::default());
                    }
                    engine.analyze(text, &AnalysisContext::default())
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let result = handle.join().unwrap();
            assert_eq!(result.is_abusive, i % 2 == 0);
        }

        let stats = engine.stats();
        assert_eq!(stats.total_scanned, 8 * 26);
        assert_eq!(stats.cache_hits + stats.cache_misses, stats.total_scanned);
        assert!(engine.cached_results() <= 2);
    }
}
