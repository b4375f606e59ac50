// Rephrasing Suggestions
// Proposes calmer alternatives for flagged messages. Advisory only.

use regex::{NoExpand, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

use crate::models::Category;
use crate::services::text_processor::preview;

const MAX_SUGGESTIONS: usize = 5;
const EMPTY_NOTE: &str = "No suggestions available for this message.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Insult,
    Criticism,
    Disagreement,
    Frustration,
    Threat,
    Dismissal,
    Exclusion,
}

impl MessageType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insult => "insult",
            Self::Criticism => "criticism",
            Self::Disagreement => "disagreement",
            Self::Frustration => "frustration",
            Self::Threat => "threat",
            Self::Dismissal => "dismissal",
            Self::Exclusion => "exclusion",
        }
    }

    fn educational_note(self) -> &'static str {
        match self {
            Self::Insult => "Remember that everyone has feelings. Try to express your thoughts without putting someone down.",
            Self::Criticism => "Constructive feedback focuses on specific behaviors rather than personal attacks.",
            Self::Disagreement => "It's okay to disagree! Try expressing your different viewpoint respectfully.",
            Self::Frustration => "When frustrated, taking a moment to breathe can help you communicate more clearly.",
            Self::Threat => "Threatening language can be harmful and is never appropriate. Consider expressing your feelings differently.",
            Self::Dismissal => "Everyone's thoughts and feelings matter. Try to engage more thoughtfully.",
            Self::Exclusion => "Including others creates a more positive environment for everyone.",
        }
    }

    /// Message type implied by a detection category, if any.
    fn from_category(category: Category) -> Option<Self> {
        match category {
            Category::Harassment
            | Category::Cyberbullying
            | Category::HateSpeech
            | Category::IdentityTargeting
            | Category::Profanity => Some(Self::Insult),
            Category::Threats | Category::Violence | Category::Stalking => Some(Self::Threat),
            Category::Exclusion => Some(Self::Exclusion),
            Category::PassiveAggressive | Category::Trolling => Some(Self::Dismissal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReframingStrategy {
    SoftenTone,
    AddEmpathy,
    ConstructiveCriticism,
    QuestionReframe,
    PerspectiveShift,
    CollaborativeApproach,
    BoundarySetting,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RephrasingSuggestion {
    pub original_text: String,
    pub suggested_text: String,
    pub strategy: ReframingStrategy,
    pub explanation: String,
    pub tone_improvement: f64,
    pub appropriateness_score: f64,
    pub context_preserved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RephrasingResult {
    pub original_message: String,
    pub message_type: MessageType,
    pub suggestions: Vec<RephrasingSuggestion>,
    pub educational_note: String,
    pub confidence: f64,
}

impl RephrasingResult {
    fn empty(original: &str) -> Self {
        Self {
            original_message: original.to_string(),
            message_type: MessageType::Criticism,
            suggestions: Vec::new(),
            educational_note: EMPTY_NOTE.to_string(),
            confidence: 0.0,
        }
    }
}

/// Aggregate figures over a batch of results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RephrasingSummary {
    pub total_processed: usize,
    pub successful: usize,
    pub success_rate: f64,
    pub message_types: BTreeMap<MessageType, usize>,
    pub strategies: BTreeMap<ReframingStrategy, usize>,
    pub average_confidence: f64,
    pub average_tone_improvement: f64,
    pub average_appropriateness: f64,
}

// ============ Phrase tables ============

const TONE_SOFTENERS: &[(&str, &[&str])] = &[
    ("you're wrong", &["I see it differently", "I have a different view", "from my perspective"]),
    ("shut up", &["let me share my thoughts", "I'd like to add", "here's another perspective"]),
    ("you are", &["you might be", "you seem to be", "it appears you are"]),
    ("you're", &["you might be", "you seem", "it appears you're"]),
    ("obviously", &["it seems that", "perhaps", "it appears that"]),
    ("clearly", &["it seems", "perhaps", "it might be that"]),
    ("stupid", &["not well thought out", "confusing", "unclear"]),
    ("dumb", &["not clear", "confusing", "hard to understand"]),
    ("idiotic", &["not well planned", "unclear", "confusing"]),
    ("ridiculous", &["surprising", "unexpected", "unusual"]),
    ("pathetic", &["disappointing", "concerning", "unfortunate"]),
    ("terrible", &["not ideal", "challenging", "difficult"]),
    ("awful", &["not great", "challenging", "difficult"]),
    ("hate", &["strongly dislike", "find frustrating", "have concerns about"]),
    ("disgusting", &["concerning", "troubling", "problematic"]),
    ("never", &["rarely", "seldom", "not often"]),
    ("always", &["often", "frequently", "usually"]),
];

const EMPATHY_PHRASES: &[&str] = &[
    "I understand this might be frustrating",
    "I can see why you might feel that way",
    "I appreciate your perspective",
    "I recognize this is important to you",
    "I hear what you're saying",
    "I can imagine how you feel",
    "Your feelings are valid",
    "I understand your point of view",
    "This seems important to you",
    "I can see this matters to you",
];

const CONSTRUCTIVE_STARTERS: &[&str] = &[
    "What if we tried to",
    "Have you considered ways to",
    "Maybe we could explore how to",
    "Another approach might be to",
    "It might help to",
    "One option could be to",
    "Perhaps we could",
    "How about we",
    "Could we try to",
    "Let's consider how to",
];

const CRITICISM_QUESTIONS: &[&str] = &[
    "What do you think about {suggestion}?",
    "How would you feel about {suggestion}?",
    "What if we approached this by {suggestion}?",
    "Could we consider {suggestion}?",
];

const DISAGREEMENT_QUESTIONS: &[&str] = &[
    "I'm curious about your thoughts on {topic}",
    "How do you see {topic}?",
    "What's your perspective on {topic}?",
    "Can you help me understand {topic}?",
    "What am I missing about {topic}?",
];

const FRUSTRATION_QUESTIONS: &[&str] = &[
    "What would make this situation better?",
    "How can we improve this?",
    "What would be most helpful right now?",
    "What changes would you like to see?",
    "How can we work together on this?",
];

const PERSPECTIVE_SHIFTERS: &[&str] = &[
    "From another angle",
    "Looking at it differently",
    "Another way to see this",
    "From a different perspective",
    "Considering another viewpoint",
    "If we look at this another way",
    "From where I stand",
    "In my experience",
    "From what I've seen",
    "Based on my understanding",
];

const COLLABORATIVE_STARTERS: &[&str] = &[
    "Let's work together to",
    "How can we",
    "What if we both tried to",
    "Maybe we can figure out how to",
];

const BOUNDARY_STATEMENTS: &[&str] = &[
    "I'm really frustrated right now, and I need us to keep this respectful.",
    "I disagree strongly, but I'm not going to make this personal.",
    "This bothers me a lot. Can we talk about the issue instead of each other?",
    "I need to step back from this conversation for a moment before I say something I regret.",
];

const CRITICISM_SUGGESTIONS: &[(&str, &str)] = &[
    ("stupid", "finding a clearer approach"),
    ("wrong", "exploring different options"),
    ("useless", "making this more effective"),
    ("terrible", "making this better"),
    ("awful", "finding a better way"),
    ("bad", "improving this"),
];

const TOPIC_STOPWORDS: &[&str] = &[
    "stupid", "dumb", "wrong", "terrible", "awful", "hate", "you", "your", "this", "that", "you're", "are", "is",
];

const MESSAGE_PATTERNS: &[(MessageType, &[&str])] = &[
    (
        MessageType::Insult,
        &[
            r"\b(stupid|dumb|idiot|moron|loser|pathetic|worthless)\b",
            r"you\s+(are|'re)\s+(so\s+)?(stupid|dumb|pathetic)",
            r"what\s+an?\s+(idiot|moron|loser)",
        ],
    ),
    (
        MessageType::Criticism,
        &[
            r"you\s+(always|never)\s+\w+",
            r"you\s+(can't|cannot)\s+do\s+anything",
            r"you\s+suck\s+at",
            r"you're\s+(terrible|awful|bad)\s+at",
        ],
    ),
    (
        MessageType::Disagreement,
        &[
            r"you're\s+(wrong|mistaken|incorrect)",
            r"that's\s+(not\s+true|false|wrong)",
            r"absolutely\s+not",
            r"\bno\s+way\b",
        ],
    ),
    (
        MessageType::Frustration,
        &[
            r"this\s+is\s+(stupid|ridiculous|insane)",
            r"i\s+(hate|can't\s+stand)\s+this",
            r"this\s+makes\s+no\s+sense",
            r"what\s+the\s+(hell|fuck)",
        ],
    ),
    (
        MessageType::Threat,
        &[
            r"i'll\s+\w+\s+you",
            r"i\s+will\s+\w+\s+you",
            r"you're\s+gonna\s+pay",
            r"watch\s+out",
            r"you'll\s+regret",
        ],
    ),
    (
        MessageType::Dismissal,
        &[r"\b(whatever|who\s+cares|so\s+what|big\s+deal)\b", r"don't\s+care", r"not\s+my\s+problem"],
    ),
    (
        MessageType::Exclusion,
        &[r"you\s+don't\s+belong", r"go\s+back\s+to", r"not\s+welcome\s+here", r"\bget\s+out\b"],
    ),
];

const KEYWORD_FALLBACKS: &[(MessageType, &[&str])] = &[
    (MessageType::Insult, &["stupid", "idiot", "moron", "loser"]),
    (MessageType::Criticism, &["always", "never", "can't do"]),
    (MessageType::Disagreement, &["wrong", "incorrect", "false"]),
    (MessageType::Frustration, &["hate", "ridiculous", "insane"]),
    (MessageType::Dismissal, &["whatever", "who cares", "so what"]),
];

// ============ Compiled patterns ============

fn case_insensitive(source: &str) -> Regex {
    RegexBuilder::new(source)
        .case_insensitive(true)
        .build()
        .expect("rephrasing regex")
}

fn message_type_res() -> &'static [(MessageType, Vec<Regex>)] {
    static RES: OnceLock<Vec<(MessageType, Vec<Regex>)>> = OnceLock::new();
    RES.get_or_init(|| {
        MESSAGE_PATTERNS
            .iter()
            .map(|(kind, sources)| (*kind, sources.iter().map(|s| case_insensitive(s)).collect()))
            .collect()
    })
}

fn softener_res() -> &'static [(Regex, &'static [&'static str])] {
    static RES: OnceLock<Vec<(Regex, &'static [&'static str])>> = OnceLock::new();
    RES.get_or_init(|| {
        TONE_SOFTENERS
            .iter()
            .map(|(harsh, soft)| (case_insensitive(&format!(r"\b{}\b", regex::escape(harsh))), *soft))
            .collect()
    })
}

fn core_issue_res() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        [
            r"(?:stupid|dumb|bad|terrible|awful)\s+(.+)",
            r"you\s+(?:can't|cannot|never)\s+(.+)",
            r"this\s+(?:doesn't|won't|isn't)\s+(.+)",
        ]
        .iter()
        .map(|s| case_insensitive(s))
        .collect()
    })
}

fn outcome_res() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        [r"\bwant\s+(.+)", r"\bneed\s+(.+)", r"\bshould\s+(.+)", r"\bhave\s+to\s+(.+)"]
            .iter()
            .map(|s| case_insensitive(s))
            .collect()
    })
}

/// Stable choice from `options` for this text. `salt` keeps different
/// strategies from always landing on the same index.
fn pick<'a>(options: &[&'a str], text: &str, salt: &str) -> &'a str {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&digest[..8]);
    options[(u64::from_le_bytes(seed) % options.len() as u64) as usize]
}

fn first_capture(res: &[Regex], text: &str) -> Option<String> {
    res.iter().find_map(|re| {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().trim_end_matches(['.', '!', '?']).to_string())
            .filter(|s| !s.is_empty())
    })
}

fn suggestion(
    text: &str,
    suggested: String,
    strategy: ReframingStrategy,
    explanation: &str,
    tone_improvement: f64,
    appropriateness_score: f64,
    context_preserved: bool,
) -> RephrasingSuggestion {
    RephrasingSuggestion {
        original_text: text.to_string(),
        suggested_text: suggested,
        strategy,
        explanation: explanation.to_string(),
        tone_improvement,
        appropriateness_score,
        context_preserved,
    }
}

/// Stateless suggestion generator. Phrase tables are compiled once per process.
#[derive(Debug, Clone, Copy, Default)]
pub struct RephrasingEngine;

impl RephrasingEngine {
    pub fn new() -> Self {
        Self
    }

    /// Classify a message by its wording, then by the detector's categories,
    /// then by keywords. Defaults to criticism.
    pub fn identify_message_type(&self, text: &str, categories: &[Category]) -> MessageType {
        for (kind, res) in message_type_res() {
            if res.iter().any(|re| re.is_match(text)) {
                return *kind;
            }
        }

        if let Some(kind) = categories.iter().find_map(|c| MessageType::from_category(*c)) {
            return kind;
        }

        let lower = text.to_lowercase();
        KEYWORD_FALLBACKS
            .iter()
            .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
            .map(|(kind, _)| *kind)
            .unwrap_or(MessageType::Criticism)
    }

    pub fn generate(&self, text: &str, categories: &[Category]) -> RephrasingResult {
        if text.trim().is_empty() {
            return RephrasingResult::empty(text);
        }

        let message_type = self.identify_message_type(text, categories);
        let boundary = message_type == MessageType::Insult;

        let mut suggestions: Vec<RephrasingSuggestion> = Vec::new();
        if boundary {
            suggestions.push(self.boundary_setting(text));
        }
        suggestions.extend(self.soften_tone(text));
        suggestions.push(self.add_empathy(text));
        if !boundary && message_type == MessageType::Criticism {
            suggestions.push(self.constructive_reframe(text));
        }
        suggestions.push(self.question_reframe(text, message_type));
        suggestions.push(self.perspective_shift(text));
        if !boundary {
            suggestions.push(self.collaborative(text));
        }

        suggestions.sort_by(|a, b| {
            b.appropriateness_score
                .partial_cmp(&a.appropriateness_score)
                .unwrap_or(Ordering::Equal)
        });
        suggestions.truncate(MAX_SUGGESTIONS);

        let confidence = if suggestions.is_empty() {
            0.0
        } else {
            let mean = suggestions.iter().map(|s| s.appropriateness_score).sum::<f64>() / suggestions.len() as f64;
            (suggestions.len() as f64 * 0.2 + mean).min(1.0)
        };

        debug!(
            message_type = message_type.as_str(),
            count = suggestions.len(),
            "[suggestions] generated for: {}",
            preview(text, 50)
        );

        RephrasingResult {
            original_message: text.to_string(),
            message_type,
            suggestions,
            educational_note: message_type.educational_note().to_string(),
            confidence,
        }
    }

    pub fn generate_batch<'a, I>(&self, messages: I) -> Vec<RephrasingResult>
    where
        I: IntoIterator<Item = (&'a str, &'a [Category])>,
    {
        messages
            .into_iter()
            .map(|(text, categories)| self.generate(text, categories))
            .collect()
    }

    /// One suggestion aimed at a specific emotion, when a strategy fits it.
    pub fn suggest_for_emotion(&self, emotion: &str, text: &str) -> Option<RephrasingSuggestion> {
        if text.trim().is_empty() {
            return None;
        }
        match emotion.trim().to_lowercase().as_str() {
            "anger" => self.soften_tone(text),
            "frustration" => Some(self.constructive_reframe(text)),
            "sadness" => Some(self.add_empathy(text)),
            "aggressive" => Some(self.collaborative(text)),
            _ => None,
        }
    }

    pub fn summarize(&self, results: &[RephrasingResult]) -> RephrasingSummary {
        if results.is_empty() {
            return RephrasingSummary::default();
        }

        let mut summary = RephrasingSummary {
            total_processed: results.len(),
            ..RephrasingSummary::default()
        };
        let mut tone = Vec::new();
        let mut appropriateness = Vec::new();

        for result in results {
            if !result.suggestions.is_empty() {
                summary.successful += 1;
            }
            *summary.message_types.entry(result.message_type).or_insert(0) += 1;
            for s in &result.suggestions {
                *summary.strategies.entry(s.strategy).or_insert(0) += 1;
                tone.push(s.tone_improvement);
                appropriateness.push(s.appropriateness_score);
            }
        }

        let mean = |values: &[f64]| {
            if values.is_empty() {
                0.0
            } else {
                ((values.iter().sum::<f64>() / values.len() as f64) * 1000.0).round() / 1000.0
            }
        };
        let confidences: Vec<f64> = results.iter().map(|r| r.confidence).collect();

        summary.success_rate = summary.successful as f64 / results.len() as f64;
        summary.average_confidence = mean(&confidences);
        summary.average_tone_improvement = mean(&tone);
        summary.average_appropriateness = mean(&appropriateness);
        summary
    }

    // ============ Strategies ============

    fn boundary_setting(&self, text: &str) -> RephrasingSuggestion {
        suggestion(
            text,
            pick(BOUNDARY_STATEMENTS, text, "boundary").to_string(),
            ReframingStrategy::BoundarySetting,
            "States how you feel and what you need without attacking the other person",
            0.9,
            0.95,
            false,
        )
    }

    fn soften_tone(&self, text: &str) -> Option<RephrasingSuggestion> {
        let mut softened = text.to_string();
        let mut changes = 0u32;

        for (re, alternatives) in softener_res() {
            if re.is_match(&softened) {
                let replacement = pick(alternatives, text, re.as_str());
                softened = re.replace_all(&softened, NoExpand(replacement)).into_owned();
                changes += 1;
            }
        }

        if changes == 0 {
            return None;
        }
        Some(suggestion(
            text,
            softened,
            ReframingStrategy::SoftenTone,
            "Softened harsh language to make the message less aggressive",
            (changes as f64 * 0.3).min(1.0),
            0.8,
            true,
        ))
    }

    fn add_empathy(&self, text: &str) -> RephrasingSuggestion {
        let phrase = pick(EMPATHY_PHRASES, text, "empathy");
        let trimmed = text.trim();
        let suggested = if trimmed.ends_with('.') || trimmed.ends_with('!') {
            format!("{}, but {}", phrase, trimmed.to_lowercase())
        } else {
            format!("{}. {}", phrase, trimmed)
        };
        suggestion(
            text,
            suggested,
            ReframingStrategy::AddEmpathy,
            "Added empathy to acknowledge the other person's perspective",
            0.6,
            0.7,
            true,
        )
    }

    fn constructive_reframe(&self, text: &str) -> RephrasingSuggestion {
        let starter = pick(CONSTRUCTIVE_STARTERS, text, "constructive");
        let issue = first_capture(core_issue_res(), text)
            .map(|issue| format!("improve {}", issue.to_lowercase()))
            .unwrap_or_else(|| "find a better approach".to_string());
        suggestion(
            text,
            format!("{} {}", starter, issue),
            ReframingStrategy::ConstructiveCriticism,
            "Reframed as constructive feedback focusing on solutions",
            0.8,
            0.9,
            true,
        )
    }

    fn question_reframe(&self, text: &str, message_type: MessageType) -> RephrasingSuggestion {
        let templates = match message_type {
            MessageType::Disagreement => DISAGREEMENT_QUESTIONS,
            MessageType::Frustration => FRUSTRATION_QUESTIONS,
            _ => CRITICISM_QUESTIONS,
        };
        let template = pick(templates, text, "question");
        let suggested = template
            .replace("{suggestion}", criticism_suggestion(text))
            .replace("{topic}", &extract_topic(text));
        suggestion(
            text,
            suggested,
            ReframingStrategy::QuestionReframe,
            "Reframed as a question to encourage dialogue",
            0.7,
            0.8,
            true,
        )
    }

    fn perspective_shift(&self, text: &str) -> RephrasingSuggestion {
        let shifter = pick(PERSPECTIVE_SHIFTERS, text, "perspective");
        suggestion(
            text,
            format!("{}, {}", shifter, neutralize(text)),
            ReframingStrategy::PerspectiveShift,
            "Added perspective to show this is your viewpoint",
            0.5,
            0.7,
            true,
        )
    }

    fn collaborative(&self, text: &str) -> RephrasingSuggestion {
        let starter = pick(COLLABORATIVE_STARTERS, text, "collaborative");
        let goal = first_capture(outcome_res(), text)
            .map(|g| g.to_lowercase())
            .unwrap_or_else(|| "solve this issue".to_string());
        suggestion(
            text,
            format!("{} {}", starter, goal),
            ReframingStrategy::CollaborativeApproach,
            "Reframed to encourage working together",
            0.8,
            0.9,
            false,
        )
    }
}

fn criticism_suggestion(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    CRITICISM_SUGGESTIONS
        .iter()
        .find(|(word, _)| lower.contains(word))
        .map(|(_, s)| *s)
        .unwrap_or("working on this together")
}

fn extract_topic(text: &str) -> String {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '\''))
        .filter(|w| !w.is_empty() && !TOPIC_STOPWORDS.contains(w))
        .take(3)
        .collect();
    if words.len() >= 2 {
        words.join(" ")
    } else {
        "this topic".to_string()
    }
}

/// Lowercased text with every harsh phrase swapped for its mildest alternative.
fn neutralize(text: &str) -> String {
    let mut cleaned = text.to_string();
    for (re, alternatives) in softener_res() {
        if let Some(first) = alternatives.first() {
            cleaned = re.replace_all(&cleaned, NoExpand(first)).into_owned();
        }
    }
    cleaned.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strategies(result: &RephrasingResult) -> Vec<ReframingStrategy> {
        result.suggestions.iter().map(|s| s.strategy).collect()
    }

    #[test]
    fn test_empty_text() {
        let result = RephrasingEngine::new().generate("   ", &[]);
        assert!(result.suggestions.is_empty());
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.educational_note, EMPTY_NOTE);
    }

    #[test]
    fn test_insult_prefers_boundary_setting() {
        let result = RephrasingEngine::new().generate("You are so stupid", &[Category::Harassment]);
        assert_eq!(result.message_type, MessageType::Insult);

        let used = strategies(&result);
        assert_eq!(used[0], ReframingStrategy::BoundarySetting);
        assert!(!used.contains(&ReframingStrategy::ConstructiveCriticism));
        assert!(!used.contains(&ReframingStrategy::CollaborativeApproach));
        assert!(used.contains(&ReframingStrategy::SoftenTone));
        assert!(used.len() <= MAX_SUGGESTIONS);
    }

    #[test]
    fn test_criticism_uses_constructive_reframe() {
        let result = RephrasingEngine::new().generate("You never finish the reports on time", &[]);
        assert_eq!(result.message_type, MessageType::Criticism);

        let constructive = result
            .suggestions
            .iter()
            .find(|s| s.strategy == ReframingStrategy::ConstructiveCriticism)
            .unwrap();
        assert!(constructive.suggested_text.ends_with("improve finish the reports on time"));
        assert_eq!(result.suggestions.len(), MAX_SUGGESTIONS);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_ranking_is_by_appropriateness() {
        let result = RephrasingEngine::new().generate("This is ridiculous, I hate this", &[]);
        let scores: Vec<f64> = result.suggestions.iter().map(|s| s.appropriateness_score).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(result.message_type, MessageType::Frustration);
    }

    #[test]
    fn test_category_fallback_for_type() {
        let engine = RephrasingEngine::new();
        assert_eq!(engine.identify_message_type("meet me outside later", &[Category::Threats]), MessageType::Threat);
        assert_eq!(engine.identify_message_type("meet me outside later", &[]), MessageType::Criticism);
        assert_eq!(engine.identify_message_type("that's false", &[]), MessageType::Disagreement);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let engine = RephrasingEngine::new();
        let a = engine.generate("Obviously you're wrong about this", &[]);
        let b = engine.generate("Obviously you're wrong about this", &[]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_softening_replaces_phrases() {
        let engine = RephrasingEngine::new();
        let softened = engine.suggest_for_emotion("anger", "This is terrible and you always do it").unwrap();
        assert_eq!(softened.strategy, ReframingStrategy::SoftenTone);
        assert!(!softened.suggested_text.contains("terrible"));
        assert!(!softened.suggested_text.contains("always"));
        assert!((softened.tone_improvement - 0.6).abs() < 1e-9);

        assert!(engine.suggest_for_emotion("anger", "see you tomorrow").is_none());
        assert!(engine.suggest_for_emotion("boredom", "anything").is_none());
    }

    #[test]
    fn test_neutralize_and_topic() {
        assert_eq!(neutralize("You are STUPID"), "you might be not well thought out");
        assert_eq!(extract_topic("You're wrong about the budget plan"), "about the budget");
        assert_eq!(extract_topic("wrong"), "this topic");
    }

    #[test]
    fn test_batch_and_summary() {
        let engine = RephrasingEngine::new();
        let harassment = [Category::Harassment];
        let results = engine.generate_batch(vec![
            ("you idiot", &harassment[..]),
            ("", &[][..]),
            ("whatever, who cares", &[][..]),
        ]);
        assert_eq!(results.len(), 3);
        assert_eq!(results[2].message_type, MessageType::Dismissal);

        let summary = engine.summarize(&results);
        assert_eq!(summary.total_processed, 3);
        assert_eq!(summary.successful, 2);
        assert_eq!(summary.message_types.get(&MessageType::Insult), Some(&1));
        assert_eq!(summary.strategies.get(&ReframingStrategy::BoundarySetting), Some(&1));
    }
}
