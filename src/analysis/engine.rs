// ABOUTME: Prompt construction, JSON extraction, and fallback policy for symptom analysis
// ABOUTME: Drives an LlmProvider and converts untrusted output into Analyzed results

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sana Health

use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

use super::types::{Analyzed, AnalysisResult, Condition, Likelihood, Suggestion, UrgencyLevel};
use crate::errors::AppResult;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};

/// Low temperature favors deterministic, schema-abiding output
const ANALYSIS_TEMPERATURE: f32 = 0.2;

/// Generous ceiling; assessments are short but explanations vary
const ANALYSIS_MAX_TOKENS: u32 = 1024;

/// System instruction demanding a single JSON object matching the schema
const SYSTEM_PROMPT: &str = "\
You are a careful symptom-assessment assistant for a health tracking app. \
You are not a doctor and you never diagnose; you help users understand \
possible explanations for their symptoms and when to seek care.

Respond with ONLY a single JSON object, no prose before or after, matching \
exactly this schema:
{
  \"urgency\": \"mild\" | \"moderate\" | \"severe\",
  \"conditions\": [{\"name\": string, \"likelihood\": \"High\" | \"Moderate\" | \"Low\", \"explanation\": string}],
  \"suggestions\": [{\"text\": string, \"isWarning\": boolean, \"reasoning\": string}],
  \"message\": string,
  \"followUpQuestion\": string,
  \"specialty\": string (optional)
}

Rules:
- Order conditions most likely first. Never present them as diagnoses.
- Mark a suggestion with \"isWarning\": true when it concerns seeking \
urgent or emergency care.
- \"message\" is a short empathetic reply suitable to show the user directly.
- \"followUpQuestion\" asks for the single most useful missing detail.
- If a health profile is provided, take age, conditions, medications, and \
allergies into account.
- If symptoms suggest an emergency, set urgency to \"severe\" and lead with \
a warning suggestion.";

/// Fenced ```json block
static JSON_FENCE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(\{.*?\})\s*```").ok());

/// Plain fenced block containing an object
static PLAIN_FENCE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)```\s*(\{.*?\})\s*```").ok());

/// Symptom analysis engine bound to a configured LLM provider
pub struct AnalysisEngine {
    provider: Arc<dyn LlmProvider>,
    model: Option<String>,
}

impl AnalysisEngine {
    /// Create an engine using the provider's default model
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            model: None,
        }
    }

    /// Override the model used for analysis requests
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Analyze a symptom description in the context of prior turns
    ///
    /// `history` holds the conversation's prior messages in creation order,
    /// excluding `symptom_text` itself, which is appended as the final user
    /// message. `profile_context` is injected verbatim when present.
    ///
    /// Malformed model output yields `Ok(Analyzed::Fallback(..))`; only a
    /// transport or provider failure produces an error.
    ///
    /// # Errors
    ///
    /// Returns the provider's typed error on network failure, timeout,
    /// authentication failure, or rate limiting.
    pub async fn analyze(
        &self,
        symptom_text: &str,
        history: &[ChatMessage],
        profile_context: Option<&str>,
    ) -> AppResult<Analyzed> {
        let messages = Self::build_messages(symptom_text, history, profile_context);

        let mut request = ChatRequest::new(messages)
            .with_temperature(ANALYSIS_TEMPERATURE)
            .with_max_tokens(ANALYSIS_MAX_TOKENS);
        if let Some(model) = &self.model {
            request = request.with_model(model.clone());
        }
        if self.provider.capabilities().supports_json_mode() {
            request = request.with_json_mode();
        }

        let response = self.provider.complete(&request).await?;

        match extract_analysis(&response.content) {
            Some(result) => {
                debug!(urgency = %result.urgency, "Parsed analysis from model output");
                Ok(Analyzed::Parsed(result))
            }
            None => {
                warn!(
                    provider = self.provider.name(),
                    output_len = response.content.len(),
                    "Model output did not contain a valid analysis; using fallback"
                );
                Ok(Analyzed::Fallback(fallback_result()))
            }
        }
    }

    /// Assemble the chat-formatted prompt
    fn build_messages(
        symptom_text: &str,
        history: &[ChatMessage],
        profile_context: Option<&str>,
    ) -> Vec<ChatMessage> {
        let system = match profile_context {
            Some(context) if !context.is_empty() => {
                ChatMessage::system(format!("{SYSTEM_PROMPT}\n\nUser health profile:\n{context}"))
            }
            _ => ChatMessage::system(SYSTEM_PROMPT),
        };

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(system);
        messages.extend(history.iter().cloned());
        messages.push(ChatMessage::user(symptom_text));
        messages
    }
}

/// Extract an `AnalysisResult` from raw model output
///
/// Tolerates three shapes: a fenced ```json block, a plain fenced block, and
/// a bare `{...}` substring. The first candidate that parses wins.
#[must_use]
pub fn extract_analysis(raw: &str) -> Option<AnalysisResult> {
    for candidate in json_candidates(raw) {
        if let Ok(result) = serde_json::from_str::<AnalysisResult>(candidate) {
            return Some(result);
        }
    }
    None
}

/// Candidate JSON substrings in priority order
fn json_candidates(raw: &str) -> Vec<&str> {
    let mut candidates = Vec::with_capacity(3);

    if let Some(re) = JSON_FENCE_RE.as_ref() {
        if let Some(captures) = re.captures(raw) {
            if let Some(m) = captures.get(1) {
                candidates.push(m.as_str());
            }
        }
    }

    if let Some(re) = PLAIN_FENCE_RE.as_ref() {
        if let Some(captures) = re.captures(raw) {
            if let Some(m) = captures.get(1) {
                candidates.push(m.as_str());
            }
        }
    }

    if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) {
        if end > start {
            candidates.push(&raw[start..=end]);
        }
    }

    candidates
}

/// The fixed, safe result substituted when model output cannot be parsed
///
/// Deliberately conservative: mild urgency, a single low-likelihood
/// placeholder condition, and a warning pointing at professional care.
#[must_use]
pub fn fallback_result() -> AnalysisResult {
    AnalysisResult {
        urgency: UrgencyLevel::Mild,
        conditions: vec![Condition {
            name: "Unable to analyze symptoms".to_owned(),
            likelihood: Likelihood::Low,
            explanation: Some(
                "The analysis service could not interpret the model's response for this request."
                    .to_owned(),
            ),
        }],
        suggestions: vec![Suggestion {
            text: "Please consult a healthcare professional about your symptoms.".to_owned(),
            is_warning: true,
            reasoning: None,
        }],
        message: "I'm sorry, I wasn't able to analyze your symptoms this time. If your symptoms \
                  are severe or getting worse, please seek medical care."
            .to_owned(),
        follow_up_question: "Could you describe your symptoms again, including when they started \
                             and how severe they feel?"
            .to_owned(),
        specialty: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MessageRole;

    const VALID_JSON: &str = r#"{
        "urgency": "moderate",
        "conditions": [{"name": "Tension headache", "likelihood": "High", "explanation": "Common with stress"}],
        "suggestions": [{"text": "Rest in a dark room", "isWarning": false, "reasoning": "Reduces stimulation"}],
        "message": "This sounds like a tension headache.",
        "followUpQuestion": "Does the pain change with posture?"
    }"#;

    #[test]
    fn test_extracts_bare_json() {
        let result = extract_analysis(VALID_JSON).unwrap();
        assert_eq!(result.urgency, UrgencyLevel::Moderate);
        assert_eq!(result.conditions.len(), 1);
    }

    #[test]
    fn test_extracts_json_fence() {
        let wrapped = format!("Here is the assessment:\n```json\n{VALID_JSON}\n```\nTake care!");
        let result = extract_analysis(&wrapped).unwrap();
        assert_eq!(result, extract_analysis(VALID_JSON).unwrap());
    }

    #[test]
    fn test_extracts_plain_fence() {
        let wrapped = format!("```\n{VALID_JSON}\n```");
        let result = extract_analysis(&wrapped).unwrap();
        assert_eq!(result, extract_analysis(VALID_JSON).unwrap());
    }

    #[test]
    fn test_extracts_embedded_object() {
        let wrapped = format!("Sure! {VALID_JSON} Hope that helps.");
        let result = extract_analysis(&wrapped).unwrap();
        assert_eq!(result.urgency, UrgencyLevel::Moderate);
    }

    #[test]
    fn test_rejects_non_json() {
        assert!(extract_analysis("I think you have a headache, rest up!").is_none());
    }

    #[test]
    fn test_rejects_schema_mismatch() {
        assert!(extract_analysis(r#"{"urgency": "extreme", "foo": 1}"#).is_none());
    }

    #[test]
    fn test_fallback_shape() {
        let fallback = fallback_result();
        assert_eq!(fallback.urgency, UrgencyLevel::Mild);
        assert_eq!(fallback.conditions.len(), 1);
        assert_eq!(fallback.conditions[0].likelihood, Likelihood::Low);
        assert_eq!(fallback.suggestions.len(), 1);
        assert!(fallback.suggestions[0].is_warning);
        assert!(!fallback.message.is_empty());
        assert!(!fallback.follow_up_question.is_empty());
    }

    #[test]
    fn test_build_messages_order() {
        let history = vec![
            ChatMessage::user("I have a headache."),
            ChatMessage::assistant("How long has it lasted?"),
        ];
        let messages =
            AnalysisEngine::build_messages("Three days now.", &history, Some("Age: 34"));

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, MessageRole::System);
        assert!(messages[0].content.contains("Age: 34"));
        assert_eq!(messages[1].role, MessageRole::User);
        assert_eq!(messages[2].role, MessageRole::Assistant);
        assert_eq!(messages[3].content, "Three days now.");
    }

    #[test]
    fn test_build_messages_empty_profile_skipped() {
        let messages = AnalysisEngine::build_messages("Sore throat.", &[], Some(""));
        assert!(!messages[0].content.contains("health profile"));
    }
}
