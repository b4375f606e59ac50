// TypeAware Data Models
// Value types shared by detection, moderation and suggestion services

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// ============ Severity ============

/// Ordinal strength of a single violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low = 1,
    Medium = 2,
    High = 3,
    Critical = 4,
}

impl Severity {
    pub const MAX_LEVEL: u8 = 4;

    pub fn level(self) -> u8 {
        self as u8
    }

    /// Clamps any integer level into `Low..=Critical`.
    pub fn from_level(level: i64) -> Self {
        match level {
            i64::MIN..=1 => Self::Low,
            2 => Self::Medium,
            3 => Self::High,
            _ => Self::Critical,
        }
    }

    pub fn step_up(self) -> Self {
        Self::from_level(self.level() as i64 + 1)
    }

    pub fn step_down(self) -> Self {
        Self::from_level(self.level() as i64 - 1)
    }

    /// Multiplies the level, rounding half-up and clamping to the valid range.
    pub fn scale(self, factor: f64) -> Self {
        Self::from_level((self.level() as f64 * factor).round() as i64)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn parse(val: &str) -> Option<Self> {
        match val.trim().to_lowercase().as_str() {
            "low" | "1" => Some(Self::Low),
            "medium" | "2" => Some(Self::Medium),
            "high" | "3" => Some(Self::High),
            "critical" | "4" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============ Category ============

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

/// Semantic bucket of abusive content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Harassment,
    HateSpeech,
    Threats,
    Spam,
    Doxxing,
    Cyberbullying,
    SexualHarassment,
    SelfHarm,
    Profanity,
    Impersonation,
    Scam,
    Extremism,
    Stalking,
    Exclusion,
    IdentityTargeting,
    PassiveAggressive,
    Misinformation,
    Violence,
    Trolling,
    Other,
}

impl Category {
    pub const ALL: [Category; 20] = [
        Self::Harassment,
        Self::HateSpeech,
        Self::Threats,
        Self::Spam,
        Self::Doxxing,
        Self::Cyberbullying,
        Self::SexualHarassment,
        Self::SelfHarm,
        Self::Profanity,
        Self::Impersonation,
        Self::Scam,
        Self::Extremism,
        Self::Stalking,
        Self::Exclusion,
        Self::IdentityTargeting,
        Self::PassiveAggressive,
        Self::Misinformation,
        Self::Violence,
        Self::Trolling,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Harassment => "harassment",
            Self::HateSpeech => "hate_speech",
            Self::Threats => "threats",
            Self::Spam => "spam",
            Self::Doxxing => "doxxing",
            Self::Cyberbullying => "cyberbullying",
            Self::SexualHarassment => "sexual_harassment",
            Self::SelfHarm => "self_harm",
            Self::Profanity => "profanity",
            Self::Impersonation => "impersonation",
            Self::Scam => "scam",
            Self::Extremism => "extremism",
            Self::Stalking => "stalking",
            Self::Exclusion => "exclusion",
            Self::IdentityTargeting => "identity_targeting",
            Self::PassiveAggressive => "passive_aggressive",
            Self::Misinformation => "misinformation",
            Self::Violence => "violence",
            Self::Trolling => "trolling",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

// ============ Detection ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionType {
    Word,
    Pattern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMethod {
    Exact,
    Fuzzy,
    Regex,
}

/// One matched occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub detection_type: DetectionType,
    pub category: Category,
    pub severity: Severity,
    /// Registry word for word matches, matched span for regex matches.
    pub matched: String,
    /// Token index for word matches, byte offset into the original text for regex matches.
    pub position: usize,
    pub confidence: f64,
    pub method: MatchMethod,
    /// The obfuscated token actually seen, fuzzy matches only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_word: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Self::Critical
        } else if score >= 60.0 {
            Self::High
        } else if score >= 30.0 {
            Self::Medium
        } else if score > 0.0 {
            Self::Low
        } else {
            Self::None
        }
    }
}

/// Aggregate output of one classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub is_abusive: bool,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub detections: Vec<Detection>,
    pub suggestions: Vec<String>,
    pub categories: Vec<Category>,
    pub confidence: f64,
    pub processing_time_ms: f64,
}

impl DetectionResult {
    /// Canonical result for text with nothing found.
    pub fn empty(processing_time_ms: f64) -> Self {
        Self {
            is_abusive: false,
            risk_score: 0.0,
            risk_level: RiskLevel::None,
            detections: Vec::new(),
            suggestions: Vec::new(),
            categories: Vec::new(),
            confidence: 1.0,
            processing_time_ms,
        }
    }

    pub fn with_processing_time(mut self, processing_time_ms: f64) -> Self {
        self.processing_time_ms = processing_time_ms;
        self
    }

    pub fn max_severity(&self) -> Option<Severity> {
        self.detections.iter().map(|d| d.severity).max()
    }
}

// ============ Analysis Context ============

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserHistory {
    #[serde(default)]
    pub previous_violations: u32,
    #[serde(default)]
    pub is_new_user: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_history: Option<UserHistory>,
}

impl AnalysisContext {
    pub fn for_platform(platform: &str) -> Self {
        Self {
            platform: Some(platform.to_string()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.platform.is_none() && self.timestamp.is_none() && self.user_history.is_none()
    }

    pub fn hour_utc(&self) -> Option<u32> {
        self.timestamp.map(|t| t.hour())
    }
}

// ============ Moderation State ============

/// Main penalty state. Suspension end and ban reason live inside the variants
/// so a suspended account without an end date cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AccountState {
    #[default]
    Active,
    Warned,
    Suspended {
        until: DateTime<Utc>,
    },
    Banned {
        reason: String,
    },
    ShadowBanned,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationStatus {
    pub state: AccountState,
    #[serde(default)]
    pub shadow_banned: bool,
    #[serde(default)]
    pub last_warning_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_suspension_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub warning_count: u32,
    #[serde(default)]
    pub suspension_count: u32,
    #[serde(default)]
    pub total_violations: u32,
}

impl ModerationStatus {
    pub fn suspension_end(&self) -> Option<DateTime<Utc>> {
        match self.state {
            AccountState::Suspended { until } => Some(until),
            _ => None,
        }
    }

    pub fn ban_reason(&self) -> Option<&str> {
        match &self.state {
            AccountState::Banned { reason } => Some(reason.as_str()),
            _ => None,
        }
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self.state, AccountState::Suspended { .. })
    }

    pub fn is_banned(&self) -> bool {
        matches!(self.state, AccountState::Banned { .. })
    }

    pub fn is_active(&self) -> bool {
        !self.is_suspended() && !self.is_banned()
    }

    pub fn status_label(&self) -> &'static str {
        match self.state {
            AccountState::Active => "active",
            AccountState::Warned => "warned",
            AccountState::Suspended { .. } => "suspended",
            AccountState::Banned { .. } => "banned",
            AccountState::ShadowBanned => "shadow_banned",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    Warning,
    Suspension,
    Ban,
    ShadowBan,
}

/// One historical infraction. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub kind: ViolationKind,
    pub reason: String,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub report_id: Option<String>,
    pub admin_action: bool,
    #[serde(default)]
    pub admin_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    AutomaticAction,
    ManualAction,
    Reactivation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminNote {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub kind: NoteKind,
    pub text: String,
    #[serde(default)]
    pub admin_id: Option<String>,
}

impl AdminNote {
    pub fn new(kind: NoteKind, text: impl Into<String>, admin_id: Option<&str>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: now,
            kind,
            text: text.into(),
            admin_id: admin_id.map(str::to_string),
        }
    }
}

/// Snapshot of one user's moderation data, owned by the user store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserModerationRecord {
    pub user_id: String,
    #[serde(default)]
    pub status: ModerationStatus,
    #[serde(default)]
    pub violations: Vec<ViolationRecord>,
    #[serde(default)]
    pub notes: Vec<AdminNote>,
}

impl UserModerationRecord {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            status: ModerationStatus::default(),
            violations: Vec::new(),
            notes: Vec::new(),
        }
    }
}

// ============ Actions ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Warning,
    Suspension,
    Ban,
    ShadowBan,
}

impl ActionKind {
    pub fn violation_kind(self) -> ViolationKind {
        match self {
            Self::Warning => ViolationKind::Warning,
            Self::Suspension => ViolationKind::Suspension,
            Self::Ban => ViolationKind::Ban,
            Self::ShadowBan => ViolationKind::ShadowBan,
        }
    }
}

/// Consequence chosen for a violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_hours: Option<i64>,
    pub message: String,
}

impl Action {
    pub fn warning(count: u32) -> Self {
        Self {
            kind: ActionKind::Warning,
            duration_hours: None,
            message: format!(
                "Warning {}: please review the community guidelines. Further violations may lead to suspension.",
                count
            ),
        }
    }

    pub fn suspension(hours: i64) -> Self {
        Self {
            kind: ActionKind::Suspension,
            duration_hours: Some(hours),
            message: format!("Your account has been suspended for {}.", describe_hours(hours)),
        }
    }

    pub fn ban() -> Self {
        Self {
            kind: ActionKind::Ban,
            duration_hours: None,
            message: "Your account has been permanently banned for repeated violations.".to_string(),
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration_hours.and_then(Duration::try_hours)
    }
}

fn describe_hours(hours: i64) -> String {
    if hours % 24 == 0 {
        let days = hours / 24;
        if days == 1 {
            "24 hours".to_string()
        } else {
            format!("{} days", days)
        }
    } else {
        format!("{} hours", hours)
    }
}

/// Admin-issued action that bypasses automatic escalation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ManualAction {
    Warning,
    Suspension {
        #[serde(default)]
        hours: Option<i64>,
    },
    Ban,
    ShadowBan,
    ClearShadowBan,
    Unban,
    Reactivate,
}

impl ManualAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Suspension { .. } => "suspension",
            Self::Ban => "ban",
            Self::ShadowBan => "shadow_ban",
            Self::ClearShadowBan => "clear_shadow_ban",
            Self::Unban => "unban",
            Self::Reactivate => "reactivate",
        }
    }

    /// Whether this action lifts restrictions rather than imposing them.
    pub fn is_lifting(&self) -> bool {
        matches!(self, Self::ClearShadowBan | Self::Unban | Self::Reactivate)
    }
}
