// ABOUTME: Structured assessment schema returned by the symptom analysis engine
// ABOUTME: Defines urgency/likelihood tags and the camelCase JSON wire shape

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sana Health

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Triage tag attached to an analysis, driving UI emphasis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyLevel {
    /// Symptoms that can typically be self-managed
    Mild,
    /// Symptoms that warrant a routine professional visit
    Moderate,
    /// Symptoms that need prompt medical attention
    Severe,
}

impl UrgencyLevel {
    /// String form used in stored rows and API responses
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mild => "mild",
            Self::Moderate => "moderate",
            Self::Severe => "severe",
        }
    }

    /// Parse a stored urgency string
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mild" => Some(Self::Mild),
            "moderate" => Some(Self::Moderate),
            "severe" => Some(Self::Severe),
            _ => None,
        }
    }
}

impl Display for UrgencyLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// How strongly the reported symptoms point at a candidate condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Likelihood {
    /// Strong match with the reported symptoms
    High,
    /// Plausible but not definitive
    Moderate,
    /// Possible but unlikely
    Low,
}

/// A candidate (non-diagnostic) explanation for reported symptoms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// Condition name (e.g. "Tension headache")
    pub name: String,
    /// Likelihood tag for this condition
    pub likelihood: Likelihood,
    /// Optional explanation of why the symptoms suggest this condition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// A care recommendation, optionally flagged as a warning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    /// The recommendation text
    pub text: String,
    /// Whether this suggestion is a warning (e.g. seek immediate care)
    pub is_warning: bool,
    /// Optional reasoning behind the recommendation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// Structured assessment produced for one user symptom message
///
/// Field names follow the camelCase wire format the client consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Overall urgency of the reported symptoms
    pub urgency: UrgencyLevel,
    /// Candidate conditions, ordered most likely first
    pub conditions: Vec<Condition>,
    /// Care recommendations
    pub suggestions: Vec<Suggestion>,
    /// Conversational reply shown to the user
    pub message: String,
    /// Question prompting the user for the next useful detail
    pub follow_up_question: String,
    /// Medical specialty to consult, when one clearly applies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
}

/// Outcome of an analysis attempt that reached the provider
///
/// Malformed model output is recovered as `Fallback`; transport failures are
/// the `Err` arm of the surrounding `Result` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Analyzed {
    /// The model returned valid JSON matching the schema
    Parsed(AnalysisResult),
    /// The model output could not be parsed; fixed safe result substituted
    Fallback(AnalysisResult),
}

impl Analyzed {
    /// The assessment, regardless of how it was obtained
    #[must_use]
    pub const fn result(&self) -> &AnalysisResult {
        match self {
            Self::Parsed(r) | Self::Fallback(r) => r,
        }
    }

    /// Consume and return the assessment
    #[must_use]
    pub fn into_result(self) -> AnalysisResult {
        match self {
            Self::Parsed(r) | Self::Fallback(r) => r,
        }
    }

    /// Whether the safe fallback was substituted for malformed output
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_serializes_camel_case() {
        let result = AnalysisResult {
            urgency: UrgencyLevel::Moderate,
            conditions: vec![Condition {
                name: "Tension headache".to_owned(),
                likelihood: Likelihood::High,
                explanation: None,
            }],
            suggestions: vec![Suggestion {
                text: "Rest and hydrate".to_owned(),
                is_warning: false,
                reasoning: None,
            }],
            message: "This sounds like a tension headache.".to_owned(),
            follow_up_question: "Does light make it worse?".to_owned(),
            specialty: None,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["urgency"], "moderate");
        assert_eq!(json["conditions"][0]["likelihood"], "High");
        assert_eq!(json["suggestions"][0]["isWarning"], false);
        assert!(json["followUpQuestion"].is_string());
        assert!(json.get("specialty").is_none());
    }

    #[test]
    fn test_result_round_trips() {
        let json = r#"{
            "urgency": "severe",
            "conditions": [{"name": "Migraine", "likelihood": "Moderate", "explanation": "Throbbing, light-sensitive"}],
            "suggestions": [{"text": "Seek care today", "isWarning": true}],
            "message": "Please see a doctor.",
            "followUpQuestion": "Any visual changes?",
            "specialty": "Neurology"
        }"#;

        let parsed: AnalysisResult = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.urgency, UrgencyLevel::Severe);
        assert!(parsed.suggestions[0].is_warning);
        assert_eq!(parsed.specialty.as_deref(), Some("Neurology"));

        let reserialized = serde_json::to_string(&parsed).unwrap();
        let reparsed: AnalysisResult = serde_json::from_str(&reserialized).unwrap();
        assert_eq!(parsed, reparsed);
    }

    #[test]
    fn test_urgency_parse() {
        assert_eq!(UrgencyLevel::parse("mild"), Some(UrgencyLevel::Mild));
        assert_eq!(UrgencyLevel::parse("critical"), None);
    }
}
