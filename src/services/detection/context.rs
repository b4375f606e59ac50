// Context Adjustment
// Scales detection severity/confidence by platform, posting time and user history.
// Adjustment never changes a detection's category or method.

use crate::models::{AnalysisContext, Category, Detection};

const PROFESSIONAL_FACTOR: f64 = 1.2;
const MICROBLOG_HARASSMENT_FACTOR: f64 = 0.8;
const CASUAL_FACTOR: f64 = 0.7;
const REPEAT_OFFENDER_THRESHOLD: u32 = 3;
const NEW_USER_CONFIDENCE_FACTOR: f64 = 0.9;
const LATE_NIGHT_CONFIDENCE_FACTOR: f64 = 1.1;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PlatformKind {
    Professional,
    Microblog,
    Casual,
    General,
}

impl PlatformKind {
    pub fn from_str(val: &str) -> Self {
        match val.trim().to_lowercase().as_str() {
            "linkedin" => Self::Professional,
            "twitter" | "x" => Self::Microblog,
            "gaming" | "twitch" | "discord" => Self::Casual,
            _ => Self::General,
        }
    }

    fn severity_factor(self, category: Category) -> Option<f64> {
        match self {
            Self::Professional => Some(PROFESSIONAL_FACTOR),
            Self::Microblog if category == Category::Harassment => Some(MICROBLOG_HARASSMENT_FACTOR),
            Self::Casual if matches!(category, Category::Harassment | Category::Cyberbullying) => Some(CASUAL_FACTOR),
            _ => None,
        }
    }
}

/// 22:00 to 05:59 UTC.
fn is_late_night(hour: u32) -> bool {
    hour >= 22 || hour < 6
}

fn adjust_one(mut detection: Detection, context: &AnalysisContext) -> Detection {
    if let Some(platform) = context.platform.as_deref() {
        if let Some(factor) = PlatformKind::from_str(platform).severity_factor(detection.category) {
            detection.severity = detection.severity.scale(factor);
        }
    }

    if let Some(history) = &context.user_history {
        if history.previous_violations >= REPEAT_OFFENDER_THRESHOLD {
            detection.severity = detection.severity.step_up();
        } else if history.is_new_user && history.previous_violations == 0 {
            detection.confidence *= NEW_USER_CONFIDENCE_FACTOR;
        }
    }

    if context.hour_utc().is_some_and(is_late_night) {
        detection.confidence = (detection.confidence * LATE_NIGHT_CONFIDENCE_FACTOR).min(1.0);
    }

    detection
}

/// Apply context adjustments to every detection; an empty context is a no-op.
pub fn adjust_for_context(detections: Vec<Detection>, context: &AnalysisContext) -> Vec<Detection> {
    if context.is_empty() {
        return detections;
    }
    detections.into_iter().map(|d| adjust_one(d, context)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DetectionType, MatchMethod, Severity, UserHistory};
    use chrono::{TimeZone, Utc};

    fn detection(category: Category, severity: Severity) -> Detection {
        Detection {
            detection_type: DetectionType::Word,
            category,
            severity,
            matched: "x".to_string(),
            position: 0,
            confidence: 0.8,
            method: MatchMethod::Exact,
            actual_word: None,
        }
    }

    #[test]
    fn test_professional_platform_scales_up() {
        let ctx = AnalysisContext::for_platform("LinkedIn");
        let out = adjust_for_context(vec![detection(Category::Spam, Severity::High)], &ctx);
        assert_eq!(out[0].severity, Severity::Critical);
        assert_eq!(out[0].category, Category::Spam);
        assert_eq!(out[0].method, MatchMethod::Exact);
    }

    #[test]
    fn test_casual_platform_only_softens_selected_categories() {
        let ctx = AnalysisContext::for_platform("discord");
        let out = adjust_for_context(
            vec![
                detection(Category::Harassment, Severity::High),
                detection(Category::Threats, Severity::Critical),
            ],
            &ctx,
        );
        assert_eq!(out[0].severity, Severity::Medium);
        assert_eq!(out[1].severity, Severity::Critical);
    }

    #[test]
    fn test_repeat_offender_steps_up() {
        let ctx = AnalysisContext {
            user_history: Some(UserHistory {
                previous_violations: 4,
                is_new_user: false,
            }),
            ..AnalysisContext::default()
        };
        let out = adjust_for_context(vec![detection(Category::Trolling, Severity::Low)], &ctx);
        assert_eq!(out[0].severity, Severity::Medium);
    }

    #[test]
    fn test_new_user_and_late_night_confidence() {
        let ctx = AnalysisContext {
            user_history: Some(UserHistory {
                previous_violations: 0,
                is_new_user: true,
            }),
            ..AnalysisContext::default()
        };
        let out = adjust_for_context(vec![detection(Category::Spam, Severity::Low)], &ctx);
        assert!((out[0].confidence - 0.72).abs() < 1e-9);

        let night = AnalysisContext {
            timestamp: Some(Utc.with_ymd_and_hms(2024, 3, 1, 23, 30, 0).unwrap()),
            ..AnalysisContext::default()
        };
        let out = adjust_for_context(vec![detection(Category::Spam, Severity::Low)], &night);
        assert!((out[0].confidence - 0.88).abs() < 1e-9);
    }

    #[test]
    fn test_empty_context_is_noop() {
        let input = vec![detection(Category::Harassment, Severity::High)];
        let out = adjust_for_context(input.clone(), &AnalysisContext::default());
        assert_eq!(out, input);
    }
}
