// Pattern Registry
// Immutable per-category word lists and regex rules, replaced wholesale on admin edits

use regex::{Regex, RegexBuilder};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{Category, Severity};

/// Compiled program size cap for admin-supplied patterns.
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

#[derive(Error, Debug)]
pub enum PatternError {
    #[error("invalid regex pattern '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("pattern must not be empty")]
    EmptyPattern,
    #[error("pattern '{pattern}' already registered for {category}")]
    Duplicate { category: Category, pattern: String },
    #[error("pattern '{pattern}' not found in {category}")]
    NotFound { category: Category, pattern: String },
}

/// A regex together with the source it was compiled from.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: String,
    regex: Regex,
}

impl CompiledPattern {
    pub fn compile(source: &str) -> Result<Self, PatternError> {
        if source.trim().is_empty() {
            return Err(PatternError::EmptyPattern);
        }
        let regex = RegexBuilder::new(source)
            .case_insensitive(true)
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()
            .map_err(|e| PatternError::InvalidRegex {
                pattern: source.to_string(),
                source: e,
            })?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

#[derive(Debug, Clone)]
pub enum PatternKind {
    /// Literal words or short phrases, matched against normalized tokens.
    Words(Vec<String>),
    /// Case-insensitive regexes, matched against the original text.
    Regex(Vec<CompiledPattern>),
}

/// One lexical or regex rule for a category.
#[derive(Debug, Clone)]
pub struct PatternEntry {
    pub category: Category,
    pub severity: Severity,
    pub kind: PatternKind,
    pub custom: bool,
}

impl PatternEntry {
    pub fn words(category: Category, severity: Severity, words: &[&str]) -> Self {
        Self {
            category,
            severity,
            kind: PatternKind::Words(words.iter().map(|w| w.to_lowercase()).collect()),
            custom: false,
        }
    }

    pub fn regexes(category: Category, severity: Severity, sources: &[&str]) -> Result<Self, PatternError> {
        let compiled = sources
            .iter()
            .map(|s| CompiledPattern::compile(s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            category,
            severity,
            kind: PatternKind::Regex(compiled),
            custom: false,
        })
    }

    fn pattern_count(&self) -> usize {
        match &self.kind {
            PatternKind::Regex(patterns) => patterns.len(),
            PatternKind::Words(_) => 0,
        }
    }

    fn has_source(&self, source: &str) -> bool {
        match &self.kind {
            PatternKind::Regex(patterns) => patterns.iter().any(|p| p.source == source),
            PatternKind::Words(_) => false,
        }
    }
}

struct CategorySeed {
    category: Category,
    severity: Severity,
    words: &'static [&'static str],
    patterns: &'static [&'static str],
}

const DEFAULT_SEEDS: &[CategorySeed] = &[
    CategorySeed {
        category: Category::Harassment,
        severity: Severity::High,
        words: &[
            "idiot", "stupid", "moron", "loser", "pathetic", "worthless", "disgusting", "useless",
            "trash", "garbage", "scum", "freak", "imbecile",
        ],
        patterns: &[
            r"you\s+(are|r)\s+(so\s+)?(stupid|dumb|idiotic|pathetic)",
            r"kill\s+yourself",
            r"go\s+die",
            r"nobody\s+likes\s+you",
            r"you\s+should\s+die",
            r"waste\s+of\s+space",
            r"you\s+suck\s+at\s+everything",
        ],
    },
    CategorySeed {
        category: Category::HateSpeech,
        severity: Severity::Critical,
        words: &["racist", "bigot", "nazi", "supremacist", "subhuman"],
        patterns: &[
            r"all\s+\w+\s+are\s+(bad|evil|stupid|inferior|animals)",
            r"i\s+hate\s+all\s+\w+",
            r"\w+\s+people\s+are\s+(inferior|dangerous|vermin)",
            r"death\s+to\s+all\s+\w+",
            r"go\s+back\s+to\s+your\s+country",
        ],
    },
    CategorySeed {
        category: Category::Threats,
        severity: Severity::Critical,
        words: &["kill", "murder", "stab", "shoot", "torture", "strangle"],
        patterns: &[
            r"i\s+will\s+(kill|hurt|harm|destroy|find)",
            r"gonna\s+(kill|hurt|destroy|attack)",
            r"watch\s+your\s+back",
            r"you\s+(will|gonna)\s+pay",
            r"i'll\s+find\s+you",
            r"you're\s+dead",
        ],
    },
    CategorySeed {
        category: Category::Violence,
        severity: Severity::High,
        words: &["bomb", "massacre", "behead", "bloodbath"],
        patterns: &[r"(beat|punch|smash)\s+(you|your\s+face)", r"burn\s+(it|everything)\s+down"],
    },
    CategorySeed {
        category: Category::Cyberbullying,
        severity: Severity::High,
        words: &["ugly", "outcast", "cringe", "failure", "reject"],
        patterns: &[
            r"everyone\s+hates\s+you",
            r"you\s+have\s+no\s+friends",
            r"why\s+don't\s+you\s+just\s+leave",
            r"nobody\s+wants\s+you\s+here",
            r"you're\s+such\s+a\s+(loser|failure)",
        ],
    },
    CategorySeed {
        category: Category::SexualHarassment,
        severity: Severity::High,
        words: &["nudes", "sexy"],
        patterns: &[
            r"send\s+me\s+(pics|photos|nudes)",
            r"what\s+are\s+you\s+wearing",
            r"you\s+look\s+(hot|sexy)",
            r"wanna\s+hook\s+up",
        ],
    },
    CategorySeed {
        category: Category::Doxxing,
        severity: Severity::High,
        words: &["doxx", "doxxed"],
        patterns: &[
            r"(your|his|her)\s+(home\s+)?address\s+is",
            r"\b\d{3}[-.\s]\d{3}[-.\s]\d{4}\b",
            r"i('ll|\s+will)\s+(post|leak)\s+your\s+(address|number|info)",
        ],
    },
    CategorySeed {
        category: Category::SelfHarm,
        severity: Severity::Critical,
        words: &["suicide"],
        patterns: &[r"cut\s+yourself", r"end\s+your\s+life", r"nobody\s+would\s+miss\s+you"],
    },
    CategorySeed {
        category: Category::Stalking,
        severity: Severity::High,
        words: &[],
        patterns: &[
            r"i\s+know\s+where\s+you\s+live",
            r"i('m|\s+am)\s+watching\s+you",
            r"i\s+saw\s+you\s+at",
            r"followed\s+you\s+home",
        ],
    },
    CategorySeed {
        category: Category::Exclusion,
        severity: Severity::Medium,
        words: &[],
        patterns: &[
            r"you\s+don't\s+belong",
            r"not\s+welcome\s+here",
            r"people\s+like\s+you",
            r"your\s+kind\s+(isn't|is\s+not|aren't)",
        ],
    },
    CategorySeed {
        category: Category::IdentityTargeting,
        severity: Severity::High,
        words: &[],
        patterns: &[
            r"because\s+of\s+your\s+(race|religion|gender|sexuality)",
            r"typical\s+(boy|girl|man|woman)",
        ],
    },
    CategorySeed {
        category: Category::PassiveAggressive,
        severity: Severity::Low,
        words: &[],
        patterns: &[r"no\s+offense\s+but", r"bless\s+your\s+heart", r"i'm\s+just\s+being\s+honest"],
    },
    CategorySeed {
        category: Category::Profanity,
        severity: Severity::Low,
        words: &["fuck", "shit", "bitch", "bastard", "asshole", "dickhead"],
        patterns: &[r"\bf+u+c+k+\s+(you|off)\b", r"\bstfu\b"],
    },
    CategorySeed {
        category: Category::Spam,
        severity: Severity::Low,
        words: &[
            "buy now", "click here", "free money", "guaranteed win", "limited time", "act now",
            "special offer", "work from home", "make money", "get rich",
        ],
        patterns: &[
            r"click\s+here\s+to\s+(win|earn|get)",
            r"free\s+\$\d+",
            r"guaranteed\s+(income|money|win)",
            r"(bit\.ly|tinyurl\.com|goo\.gl)/\w+",
            r"earn\s+\$\d+\s+per\s+(day|hour|week)",
        ],
    },
    CategorySeed {
        category: Category::Scam,
        severity: Severity::Medium,
        words: &["giveaway scam"],
        patterns: &[
            r"verify\s+your\s+(account|password|wallet)",
            r"send\s+(me\s+)?\d+\s*(btc|eth|usdt|bitcoin)",
            r"your\s+account\s+(has\s+been|will\s+be)\s+(locked|suspended)",
        ],
    },
    CategorySeed {
        category: Category::Impersonation,
        severity: Severity::Medium,
        words: &[],
        patterns: &[r"pretending\s+to\s+be", r"this\s+is\s+the\s+official\s+(support|admin)"],
    },
    CategorySeed {
        category: Category::Extremism,
        severity: Severity::Critical,
        words: &["jihad", "genocide"],
        patterns: &[r"join\s+the\s+(holy\s+)?war", r"race\s+war\s+now"],
    },
    CategorySeed {
        category: Category::Misinformation,
        severity: Severity::Low,
        words: &[],
        patterns: &[r"vaccines\s+cause\s+autism", r"the\s+election\s+was\s+stolen"],
    },
    CategorySeed {
        category: Category::Trolling,
        severity: Severity::Low,
        words: &["triggered", "snowflake"],
        patterns: &[r"cry\s+more", r"\bcope\s+harder\b"],
    },
];

/// Immutable snapshot of every rule known to the engine.
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    entries: Vec<PatternEntry>,
    version: u64,
}

impl PatternRegistry {
    pub fn new(entries: Vec<PatternEntry>) -> Self {
        Self { entries, version: 0 }
    }

    /// Built-in rule set.
    pub fn builtin() -> Self {
        let mut entries = Vec::with_capacity(DEFAULT_SEEDS.len() * 2);
        for seed in DEFAULT_SEEDS {
            if !seed.words.is_empty() {
                entries.push(PatternEntry::words(seed.category, seed.severity, seed.words));
            }
            if !seed.patterns.is_empty() {
                match PatternEntry::regexes(seed.category, seed.severity, seed.patterns) {
                    Ok(entry) => entries.push(entry),
                    Err(e) => warn!("[pattern_registry] skipping built-in {} patterns: {}", seed.category, e),
                }
            }
        }
        Self::new(entries)
    }

    pub fn entries(&self) -> &[PatternEntry] {
        &self.entries
    }

    pub fn entries_for(&self, category: Category) -> impl Iterator<Item = &PatternEntry> {
        self.entries.iter().filter(move |e| e.category == category)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of regex patterns across all categories.
    pub fn pattern_count(&self) -> usize {
        self.entries.iter().map(PatternEntry::pattern_count).sum()
    }

    pub fn word_count(&self) -> usize {
        self.entries
            .iter()
            .map(|e| match &e.kind {
                PatternKind::Words(words) => words.len(),
                PatternKind::Regex(_) => 0,
            })
            .sum()
    }

    pub fn categories(&self) -> Vec<Category> {
        let mut out: Vec<Category> = self.entries.iter().map(|e| e.category).collect();
        out.sort();
        out.dedup();
        out
    }

    pub fn contains_pattern(&self, category: Category, source: &str) -> bool {
        self.entries_for(category).any(|e| e.has_source(source))
    }

    /// New snapshot with one more custom regex. `self` is left untouched.
    pub fn with_custom_pattern(
        &self,
        category: Category,
        source: &str,
        severity: Severity,
    ) -> Result<Self, PatternError> {
        let compiled = CompiledPattern::compile(source)?;
        if self.contains_pattern(category, source) {
            return Err(PatternError::Duplicate {
                category,
                pattern: source.to_string(),
            });
        }

        let mut next = self.clone();
        let existing = next.entries.iter().position(|e| {
            e.custom && e.category == category && e.severity == severity && matches!(e.kind, PatternKind::Regex(_))
        });
        match existing {
            Some(idx) => {
                if let PatternKind::Regex(patterns) = &mut next.entries[idx].kind {
                    patterns.push(compiled);
                }
            }
            None => next.entries.push(PatternEntry {
                category,
                severity,
                kind: PatternKind::Regex(vec![compiled]),
                custom: true,
            }),
        }
        next.version += 1;
        Ok(next)
    }

    /// New snapshot without the given regex source.
    pub fn without_pattern(&self, category: Category, source: &str) -> Result<Self, PatternError> {
        if !self.contains_pattern(category, source) {
            return Err(PatternError::NotFound {
                category,
                pattern: source.to_string(),
            });
        }

        let mut next = self.clone();
        for entry in next.entries.iter_mut().filter(|e| e.category == category) {
            if let PatternKind::Regex(patterns) = &mut entry.kind {
                patterns.retain(|p| p.source != source);
            }
        }
        next.entries
            .retain(|e| !matches!(&e.kind, PatternKind::Regex(patterns) if patterns.is_empty()));
        next.version += 1;
        Ok(next)
    }
}

impl Default for PatternRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Shared reference to the current registry snapshot. Readers clone the `Arc`;
/// writers build a new snapshot and swap it in under the write lock.
#[derive(Debug)]
pub struct RegistryHandle {
    current: RwLock<Arc<PatternRegistry>>,
}

impl RegistryHandle {
    pub fn new(registry: PatternRegistry) -> Self {
        Self {
            current: RwLock::new(Arc::new(registry)),
        }
    }

    pub fn snapshot(&self) -> Arc<PatternRegistry> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn update<F>(&self, build: F) -> Result<u64, PatternError>
    where
        F: FnOnce(&PatternRegistry) -> Result<PatternRegistry, PatternError>,
    {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let next = build(&guard)?;
        let version = next.version;
        *guard = Arc::new(next);
        Ok(version)
    }

    pub fn add_custom_pattern(&self, category: Category, source: &str, severity: Severity) -> Result<u64, PatternError> {
        let result = self.update(|current| current.with_custom_pattern(category, source, severity));
        match &result {
            Ok(version) => info!(category = %category, version, "[pattern_registry] added custom pattern: {}", source),
            Err(e) => warn!(category = %category, "[pattern_registry] rejected pattern: {}", e),
        }
        result
    }

    pub fn remove_pattern(&self, category: Category, source: &str) -> Result<u64, PatternError> {
        let result = self.update(|current| current.without_pattern(category, source));
        if let Ok(version) = &result {
            info!(category = %category, version, "[pattern_registry] removed pattern: {}", source);
        }
        result
    }
}

impl Default for RegistryHandle {
    fn default() -> Self {
        Self::new(PatternRegistry::builtin())
    }
}
