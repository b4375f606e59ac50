// Detection Module
// Abuse detection core logic organized into specialized submodules:
// - pattern_registry: Per-category word lists and regex rules, swapped as snapshots
// - similarity: Levenshtein distance for fuzzy matching
// - matcher: Exact, fuzzy and regex matching
// - context: Platform, time and history adjustments
// - aggregation: Risk score, level and suggestions
// - cache: FIFO result cache
// - engine: Thread-safe facade tying the pipeline together

pub mod pattern_registry;
pub mod similarity;
pub mod matcher;
pub mod context;
pub mod aggregation;
pub mod cache;
pub mod engine;

// Re-export commonly used items
pub use pattern_registry::{CompiledPattern, PatternEntry, PatternError, PatternKind, PatternRegistry, RegistryHandle};
pub use matcher::{detect_all, MatchSettings};
pub use context::{adjust_for_context, PlatformKind};
pub use aggregation::score_detections;
pub use cache::DetectionCache;
pub use engine::{DetectionEngine, DetectionStats};
