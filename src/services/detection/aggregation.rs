// Risk Aggregation
// Turns adjusted detections into the overall score, level and category suggestions

use crate::models::{Category, Detection, DetectionResult, RiskLevel, Severity};
use crate::services::text_processor::word_count;

const MAX_DENSITY_MULTIPLIER: f64 = 1.5;
const DENSITY_WEIGHT: f64 = 2.0;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `100 * sum(severity * confidence) / (4 * n)`, before density.
pub fn base_score(detections: &[Detection]) -> f64 {
    if detections.is_empty() {
        return 0.0;
    }
    let weighted: f64 = detections
        .iter()
        .map(|d| d.severity.level() as f64 * d.confidence)
        .sum();
    let max_possible = (detections.len() * Severity::MAX_LEVEL as usize) as f64;
    weighted / max_possible * 100.0
}

/// Several hits in a short message weigh more than the same hits in a long one.
pub fn density_multiplier(detection_count: usize, words: usize) -> f64 {
    if words == 0 {
        return 1.0;
    }
    let density = detection_count as f64 / words as f64;
    (1.0 + density * DENSITY_WEIGHT).min(MAX_DENSITY_MULTIPLIER)
}

pub fn category_suggestion(category: Category) -> &'static str {
    match category {
        Category::Harassment => "Consider using more respectful language when expressing disagreement.",
        Category::HateSpeech => "Please avoid language that targets or discriminates against groups of people.",
        Category::Threats => "Express your feelings without threatening language or implications of harm.",
        Category::Spam => "Focus on genuine communication rather than promotional content.",
        Category::Doxxing => "Never share someone's personal or location details without their consent.",
        Category::Cyberbullying => "Try to communicate constructively rather than attacking the person.",
        Category::SexualHarassment => "Keep your communication appropriate and professional.",
        Category::SelfHarm => "If you or someone else is struggling, please reach out to a support line instead.",
        Category::Profanity => "Try expressing yourself without profanity.",
        Category::Impersonation => "Speak for yourself rather than presenting yourself as someone else.",
        Category::Scam => "Do not ask others for credentials, payments or account verification.",
        Category::Extremism => "Content promoting violent extremism is not allowed.",
        Category::Stalking => "Respect other people's privacy and personal boundaries.",
        Category::Exclusion => "Including others creates a more positive environment for everyone.",
        Category::IdentityTargeting => "Address ideas and behaviour, not someone's identity.",
        Category::PassiveAggressive => "Say what you mean directly and kindly.",
        Category::Misinformation => "Check claims against reliable sources before sharing them.",
        Category::Violence => "Avoid describing or encouraging violence against anyone.",
        Category::Trolling => "Engage with the conversation in good faith.",
        Category::Other => "Consider how your message might affect others.",
    }
}

/// Distinct categories in first-seen order.
pub fn distinct_categories(detections: &[Detection]) -> Vec<Category> {
    let mut out: Vec<Category> = Vec::new();
    for d in detections {
        if !out.contains(&d.category) {
            out.push(d.category);
        }
    }
    out
}

pub fn generate_suggestions(categories: &[Category]) -> Vec<String> {
    categories.iter().map(|c| category_suggestion(*c).to_string()).collect()
}

/// Score the detections for `text`. Processing time is left at zero for the
/// caller to fill in.
pub fn score_detections(detections: Vec<Detection>, text: &str) -> DetectionResult {
    if detections.is_empty() {
        return DetectionResult::empty(0.0);
    }

    let base = base_score(&detections);
    let multiplier = density_multiplier(detections.len(), word_count(text));
    let final_score = (base * multiplier).min(100.0);

    let confidence = detections.iter().map(|d| d.confidence).sum::<f64>() / detections.len() as f64;
    let categories = distinct_categories(&detections);
    let suggestions = generate_suggestions(&categories);

    DetectionResult {
        is_abusive: final_score > 0.0,
        risk_score: round2(final_score),
        risk_level: RiskLevel::from_score(final_score),
        detections,
        suggestions,
        categories,
        confidence: round2(confidence),
        processing_time_ms: 0.0,
    }
}
