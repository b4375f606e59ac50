// Word and Pattern Matcher
// Exact, fuzzy and regex matching of one registry snapshot against a message

use crate::models::{Category, Detection, DetectionType, MatchMethod, Severity};

use crate::services::text_processor::{fold_repeats, has_repeats};

use super::pattern_registry::{CompiledPattern, PatternKind, PatternRegistry};
use super::similarity::{length_bound, similarity};

/// Confidence assigned to every regex hit.
pub const REGEX_CONFIDENCE: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchSettings {
    /// Minimum normalized Levenshtein similarity for a fuzzy hit.
    pub fuzzy_threshold: f64,
    /// Shortest token (in chars) considered for fuzzy comparison.
    pub fuzzy_min_len: usize,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.9,
            fuzzy_min_len: 3,
        }
    }
}

/// Fuzzy hits are less certain: one step down, but never below medium.
pub fn fuzzy_severity(base: Severity) -> Severity {
    if base > Severity::Medium {
        base.step_down()
    } else {
        base
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Match a word list against normalized tokens. Multi-word entries compare
/// against windows of the same number of tokens. A window with doubled letters
/// that equals the word once every run is folded ("iidiot") counts as exact.
pub fn match_words(
    tokens: &[&str],
    words: &[String],
    category: Category,
    severity: Severity,
    settings: &MatchSettings,
) -> Vec<Detection> {
    let mut detections = Vec::new();

    for word in words {
        let width = word.split(' ').count().max(1);
        if tokens.len() < width {
            continue;
        }
        let word_len = word.chars().count();
        let folded_word = fold_repeats(word);

        for (position, window) in tokens.windows(width).enumerate() {
            let candidate = window.join(" ");

            let exact = candidate == *word;
            if exact || (has_repeats(&candidate) && fold_repeats(&candidate) == folded_word) {
                detections.push(Detection {
                    detection_type: DetectionType::Word,
                    category,
                    severity,
                    matched: word.clone(),
                    position,
                    confidence: 1.0,
                    method: MatchMethod::Exact,
                    actual_word: (!exact).then_some(candidate),
                });
                continue;
            }

            let candidate_len = candidate.chars().count();
            if candidate_len < settings.fuzzy_min_len || word_len < settings.fuzzy_min_len {
                continue;
            }
            if length_bound(candidate_len, word_len) < settings.fuzzy_threshold {
                continue;
            }

            let score = similarity(&candidate, word);
            if score >= settings.fuzzy_threshold {
                detections.push(Detection {
                    detection_type: DetectionType::Word,
                    category,
                    severity: fuzzy_severity(severity),
                    matched: word.clone(),
                    position,
                    confidence: round3(score),
                    method: MatchMethod::Fuzzy,
                    actual_word: Some(candidate),
                });
            }
        }
    }

    detections
}

/// Run regexes over the original text so punctuation stays available to them.
pub fn match_patterns(
    text: &str,
    patterns: &[CompiledPattern],
    category: Category,
    severity: Severity,
) -> Vec<Detection> {
    patterns
        .iter()
        .flat_map(|pattern| pattern.regex().find_iter(text))
        .map(|m| Detection {
            detection_type: DetectionType::Pattern,
            category,
            severity,
            matched: m.as_str().to_string(),
            position: m.start(),
            confidence: REGEX_CONFIDENCE,
            method: MatchMethod::Regex,
            actual_word: None,
        })
        .collect()
}

/// Every detection from every entry, in registry order. Overlapping hits from
/// different rules are all kept.
pub fn detect_all(
    registry: &PatternRegistry,
    normalized: &str,
    original: &str,
    settings: &MatchSettings,
) -> Vec<Detection> {
    let tokens = crate::services::text_processor::tokenize(normalized);
    let mut detections = Vec::new();

    for entry in registry.entries() {
        match &entry.kind {
            PatternKind::Words(words) => {
                detections.extend(match_words(&tokens, words, entry.category, entry.severity, settings));
            }
            PatternKind::Regex(patterns) => {
                detections.extend(match_patterns(original, patterns, entry.category, entry.severity));
            }
        }
    }

    detections
}
