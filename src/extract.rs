//! Structured signal extraction from free-text task output
//!
//! Reasoning tasks return natural language; the pipeline needs numbers and
//! classifications. Everything in this module is pure and deterministic:
//! an ordered pattern list for ratings and keyword presence rules for the
//! decision classifiers. No semantic reconciliation is attempted — when a
//! document contains conflicting matches, the first accepted pattern's first
//! occurrence wins.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Neutral midpoint on the 10-point scale, used whenever no rating can be
/// extracted or a task degrades.
pub const NEUTRAL_RATING: f64 = 5.0;

/// Accepted rating patterns, in priority order. All capture one numeric
/// group on a 10-point scale.
static RATING_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)rating\s*[:：]?\s*(\d+(?:\.\d+)?)\s*/\s*10",
        r"(?i)(?:overall\s+)?score\s*[:：]?\s*(\d+(?:\.\d+)?)\s*/\s*10",
        r"(\d+(?:\.\d+)?)\s*/\s*10",
        r"(?i)overall\s+score\s*[:：]?\s*(\d+(?:\.\d+)?)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("rating pattern must compile"))
    .collect()
});

static PERCENT_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+\s*(?:-|–|to)\s*\d+\s*%|\d+\s*%").expect("range pattern"));

/// Final trade recommendation classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Buy,
    Hold,
    Sell,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Buy => "buy",
            Recommendation::Hold => "hold",
            Recommendation::Sell => "sell",
        }
    }
}

/// Confidence classification for the final decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

/// Qualitative position-size classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSize {
    Light,
    Half,
    Heavy,
}

impl PositionSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionSize::Light => "light",
            PositionSize::Half => "half",
            PositionSize::Heavy => "heavy",
        }
    }
}

/// Extract a rating on the 10-point scale from free text.
///
/// Patterns are tried in priority order; the first pattern that matches
/// anywhere in the document wins, using its first occurrence. The result is
/// clamped to [0, 10]. Text without any accepted pattern yields the neutral
/// default 5.0.
pub fn extract_rating(text: &str) -> f64 {
    for pattern in RATING_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(text) {
            if let Some(value) = captures.get(1).and_then(|m| m.as_str().parse::<f64>().ok()) {
                return value.clamp(0.0, 10.0);
            }
        }
    }
    NEUTRAL_RATING
}

/// Classify a recommendation by keyword presence.
///
/// "buy" takes precedence over "sell"; text mentioning neither defaults to
/// hold.
pub fn extract_recommendation(text: &str) -> Recommendation {
    let lower = text.to_lowercase();
    if lower.contains("buy") {
        Recommendation::Buy
    } else if lower.contains("sell") {
        Recommendation::Sell
    } else {
        Recommendation::Hold
    }
}

/// Classify confidence by keyword presence, defaulting to medium.
pub fn extract_confidence(text: &str) -> Confidence {
    let lower = text.to_lowercase();
    if lower.contains("high confidence") || lower.contains("confidence: high") {
        Confidence::High
    } else if lower.contains("low confidence") || lower.contains("confidence: low") {
        Confidence::Low
    } else {
        Confidence::Medium
    }
}

/// Classify a suggested position size, defaulting to light.
pub fn extract_position(text: &str) -> PositionSize {
    let lower = text.to_lowercase();
    if lower.contains("heavy position") || lower.contains("full position") {
        PositionSize::Heavy
    } else if lower.contains("half position") {
        PositionSize::Half
    } else {
        PositionSize::Light
    }
}

/// Extract per-risk-profile position suggestions from synthesis output.
///
/// Lines mentioning a risk profile are scanned for an explicit percentage
/// range; profiles the text never pins down fall back to the default bands.
pub fn extract_position_suggestions(text: &str) -> BTreeMap<String, String> {
    let mut suggestions: BTreeMap<String, String> = [
        ("aggressive", "50-70%"),
        ("balanced", "30-50%"),
        ("conservative", "10-30%"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    for line in text.lines() {
        let lower = line.to_lowercase();
        for profile in ["aggressive", "balanced", "conservative"] {
            if lower.contains(profile) {
                if let Some(range) = PERCENT_RANGE.find(line) {
                    suggestions.insert(profile.to_string(), range.as_str().to_string());
                }
            }
        }
    }

    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rating_colon_slash_ten() {
        assert_eq!(extract_rating("Fundamentals look solid. Rating: 7/10"), 7.0);
        assert_eq!(extract_rating("rating:8.5/10 overall"), 8.5);
    }

    #[test]
    fn test_rating_bare_slash_ten() {
        assert_eq!(extract_rating("I would put this at 6/10 given the risks"), 6.0);
    }

    #[test]
    fn test_rating_overall_score() {
        assert_eq!(extract_rating("Overall score: 9"), 9.0);
        assert_eq!(extract_rating("overall score: 4.2/10"), 4.2);
    }

    #[test]
    fn test_rating_no_match_defaults_neutral() {
        assert_eq!(extract_rating("no numbers here"), NEUTRAL_RATING);
        assert_eq!(extract_rating(""), NEUTRAL_RATING);
    }

    #[test]
    fn test_rating_clamped() {
        assert_eq!(extract_rating("rating: 15/10"), 10.0);
    }

    #[test]
    fn test_rating_first_pattern_wins_over_later_text() {
        // Two conflicting ratings: the higher-priority pattern's first
        // occurrence decides.
        let text = "Early take: 3/10. Final rating: 8/10 after revision.";
        assert_eq!(extract_rating(text), 8.0);
    }

    #[test]
    fn test_rating_first_occurrence_within_pattern() {
        let text = "rating: 6/10 ... revised rating: 9/10";
        assert_eq!(extract_rating(text), 6.0);
    }

    proptest! {
        #[test]
        fn prop_rating_always_in_range(text in ".*") {
            let rating = extract_rating(&text);
            prop_assert!((0.0..=10.0).contains(&rating));
        }
    }

    #[test]
    fn test_recommendation_keywords() {
        assert_eq!(
            extract_recommendation("Strong Buy on momentum"),
            Recommendation::Buy
        );
        assert_eq!(
            extract_recommendation("I would sell into strength"),
            Recommendation::Sell
        );
        assert_eq!(extract_recommendation("wait and see"), Recommendation::Hold);
    }

    #[test]
    fn test_recommendation_buy_precedes_sell() {
        assert_eq!(
            extract_recommendation("buy now, sell later"),
            Recommendation::Buy
        );
    }

    #[test]
    fn test_confidence_markers() {
        assert_eq!(
            extract_confidence("High confidence in this view"),
            Confidence::High
        );
        assert_eq!(
            extract_confidence("confidence: low due to macro noise"),
            Confidence::Low
        );
        assert_eq!(extract_confidence("somewhat unsure"), Confidence::Medium);
    }

    #[test]
    fn test_position_markers() {
        assert_eq!(
            extract_position("recommend a heavy position here"),
            PositionSize::Heavy
        );
        assert_eq!(
            extract_position("a half position is prudent"),
            PositionSize::Half
        );
        assert_eq!(extract_position("tread carefully"), PositionSize::Light);
    }

    #[test]
    fn test_position_suggestions_defaults() {
        let suggestions = extract_position_suggestions("no specifics given");
        assert_eq!(suggestions["aggressive"], "50-70%");
        assert_eq!(suggestions["balanced"], "30-50%");
        assert_eq!(suggestions["conservative"], "10-30%");
    }

    #[test]
    fn test_position_suggestions_parsed_from_text() {
        let text = "Aggressive investors: 60-80% exposure.\nConservative: cap at 15%.";
        let suggestions = extract_position_suggestions(text);
        assert_eq!(suggestions["aggressive"], "60-80%");
        assert_eq!(suggestions["conservative"], "15%");
        assert_eq!(suggestions["balanced"], "30-50%");
    }
}
