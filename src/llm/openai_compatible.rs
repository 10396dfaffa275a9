// ABOUTME: Generic OpenAI-compatible LLM provider for cloud and local endpoints
// ABOUTME: Supports Groq, OpenAI, Ollama, and any OpenAI-compatible chat API
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sana Health

//! # `OpenAI`-Compatible Provider
//!
//! Generic implementation for any `OpenAI`-compatible chat completions
//! endpoint. This covers Groq (the default), `OpenAI` itself, and local
//! servers like Ollama or vLLM.
//!
//! ## Configuration
//!
//! - `SANA_LLM_BASE_URL`: Base URL (default: Groq)
//! - `SANA_LLM_API_KEY`: API key (optional for local servers)
//! - `SANA_LLM_MODEL`: Model override

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{debug, error, instrument};

use super::{ChatMessage, ChatRequest, ChatResponse, LlmCapabilities, LlmProvider, TokenUsage};
use crate::errors::{AppError, ErrorCode};

// ============================================================================
// Configuration Constants
// ============================================================================

/// Environment variable for the API base URL
const BASE_URL_ENV: &str = "SANA_LLM_BASE_URL";

/// Environment variable for the API key
const API_KEY_ENV: &str = "SANA_LLM_API_KEY";

/// Default base URL (Groq)
const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default model for symptom analysis
const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Connection timeout
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Request timeout, aligned with typical hosted-LLM latency
const REQUEST_TIMEOUT_SECS: u64 = 60;

// ============================================================================
// API Request/Response Types (OpenAI-compatible format)
// ============================================================================

/// `OpenAI`-compatible API request structure
#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

/// Structured-output request flag
#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

/// Message structure for `OpenAI`-compatible API
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

impl From<&ChatMessage> for OpenAiMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role.as_str().to_owned(),
            content: msg.content.clone(),
        }
    }
}

/// `OpenAI`-compatible API response structure
#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
    model: String,
}

/// Choice in response
#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

/// Message in response
#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

/// Usage statistics in response
#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// Error response structure
#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiErrorDetail,
}

/// Error detail structure
#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// Configuration for the `OpenAI`-compatible provider
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleConfig {
    /// Base URL for the API
    pub base_url: String,
    /// API key (optional for local servers)
    pub api_key: Option<String>,
    /// Default model to use
    pub default_model: String,
    /// Provider name for display/logging
    pub provider_name: String,
    /// Provider display name
    pub display_name: String,
    /// Capabilities of this provider
    pub capabilities: LlmCapabilities,
}

impl Default for OpenAiCompatibleConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            api_key: None,
            default_model: DEFAULT_MODEL.to_owned(),
            provider_name: "groq".to_owned(),
            display_name: "Groq".to_owned(),
            capabilities: LlmCapabilities::JSON_MODE | LlmCapabilities::SYSTEM_MESSAGES,
        }
    }
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// Generic `OpenAI`-compatible LLM provider
///
/// Works with any endpoint that implements the `OpenAI` chat completions API.
pub struct OpenAiCompatibleProvider {
    client: Client,
    config: OpenAiCompatibleConfig,
}

impl OpenAiCompatibleProvider {
    /// Create a new provider with the given configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: OpenAiCompatibleConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Create a provider from environment variables
    ///
    /// Reads `SANA_LLM_BASE_URL`, `SANA_LLM_API_KEY`, and `SANA_LLM_MODEL`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn from_env() -> Result<Self, AppError> {
        let base_url = env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned());
        let api_key = env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty());
        let default_model = crate::config::LlmProviderType::model_from_env()
            .unwrap_or_else(|| DEFAULT_MODEL.to_owned());

        // Detect provider from URL for better display names
        let (provider_name, display_name) = if base_url.contains("groq.com") {
            ("groq", "Groq")
        } else if base_url.contains("openai.com") {
            ("openai", "OpenAI")
        } else {
            ("local", "Local LLM")
        };

        let config = OpenAiCompatibleConfig {
            base_url,
            api_key,
            default_model,
            provider_name: provider_name.to_owned(),
            display_name: display_name.to_owned(),
            capabilities: LlmCapabilities::JSON_MODE | LlmCapabilities::SYSTEM_MESSAGES,
        };

        debug!(
            "Initializing {} provider: base_url={}, model={}",
            config.display_name, config.base_url, config.default_model
        );

        Self::new(config)
    }

    /// Build the API URL for a given endpoint
    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint)
    }

    /// Parse error response from the API
    fn parse_error_response(&self, status: reqwest::StatusCode, body: &str) -> AppError {
        if let Ok(error_response) = serde_json::from_str::<OpenAiErrorResponse>(body) {
            let error_type = error_response
                .error
                .error_type
                .unwrap_or_else(|| "unknown".to_owned());

            match status.as_u16() {
                401 => AppError::new(
                    ErrorCode::ExternalAuthFailed,
                    format!("API authentication failed: {}", error_response.error.message),
                ),
                429 => AppError::new(
                    ErrorCode::ExternalRateLimited,
                    Self::extract_rate_limit_message(&error_response.error.message),
                ),
                _ => AppError::external_service(
                    &self.config.display_name,
                    format!("{} - {}", error_type, error_response.error.message),
                ),
            }
        } else {
            AppError::external_service(
                &self.config.display_name,
                format!(
                    "API error ({}): {}",
                    status,
                    body.chars().take(200).collect::<String>()
                ),
            )
        }
    }

    /// Extract a user-friendly rate limit message from an `OpenAI`-style error
    ///
    /// Rate limit errors may include retry-after info, e.g. "try again in 6.5s".
    /// Offsets stay within the lowercased copy; indexing the original with
    /// them would land mid-character when lowercasing changes byte lengths.
    fn extract_rate_limit_message(message: &str) -> String {
        let lowered = message.to_lowercase();
        if let Some(retry_pos) = lowered.find("try again in ") {
            let after_prefix = &lowered[retry_pos + 13..];
            if let Some(end_pos) = after_prefix.find(|c: char| !c.is_ascii_digit() && c != '.') {
                let time_str = &after_prefix[..end_pos];
                if let Ok(seconds) = time_str.parse::<f64>() {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let seconds_int = seconds.ceil() as u64;
                    return format!(
                        "AI service rate limit reached. Please try again in {seconds_int} seconds."
                    );
                }
            }
        }
        "AI service rate limit reached. Please wait a moment and try again.".to_owned()
    }

    /// Add authorization header if an API key is configured
    fn add_auth_header(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(ref api_key) = self.config.api_key {
            request.header("Authorization", format!("Bearer {api_key}"))
        } else {
            request
        }
    }
}

/// Truncate a response body for logging
///
/// Counts characters, not bytes; byte truncation panics when a multibyte
/// character straddles the cut.
fn body_preview(body: &str) -> String {
    body.chars().take(500).collect()
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &'static str {
        "openai-compatible"
    }

    fn display_name(&self) -> &'static str {
        "OpenAI-compatible"
    }

    fn capabilities(&self) -> LlmCapabilities {
        self.config.capabilities
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    #[instrument(skip(self, request), fields(model = %request.model.as_deref().unwrap_or(&self.config.default_model)))]
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        let model = request
            .model
            .as_deref()
            .unwrap_or(&self.config.default_model);

        let response_format = (request.json_mode
            && self.config.capabilities.supports_json_mode())
        .then(|| ResponseFormat {
            format_type: "json_object".to_owned(),
        });

        let openai_request = OpenAiRequest {
            model: model.to_owned(),
            messages: request.messages.iter().map(OpenAiMessage::from).collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format,
        };

        debug!(
            "Sending chat completion request to {} with {} messages",
            self.config.provider_name,
            request.messages.len()
        );

        let http_request = self
            .client
            .post(self.api_url("chat/completions"))
            .header("Content-Type", "application/json")
            .json(&openai_request);

        let response = self.add_auth_header(http_request).send().await.map_err(|e| {
            error!(
                "Failed to send request to {}: {}",
                self.config.provider_name, e
            );
            if e.is_timeout() {
                AppError::external_service(
                    &self.config.display_name,
                    "Request timed out waiting for the model",
                )
            } else if e.is_connect() {
                AppError::external_service(
                    &self.config.display_name,
                    format!("Cannot connect to {}", self.config.base_url),
                )
            } else {
                AppError::external_service(&self.config.display_name, format!("Request failed: {e}"))
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AppError::external_service(&self.config.display_name, format!("Failed to read response: {e}"))
        })?;

        if !status.is_success() {
            return Err(self.parse_error_response(status, &body));
        }

        let openai_response: OpenAiResponse = serde_json::from_str(&body).map_err(|e| {
            error!(
                "Failed to parse API response: {} - body: {}",
                e,
                body_preview(&body)
            );
            AppError::external_service(
                &self.config.display_name,
                format!("Failed to parse response: {e}"),
            )
        })?;

        let choice = openai_response.choices.into_iter().next().ok_or_else(|| {
            AppError::external_service(&self.config.display_name, "API returned no choices")
        })?;

        Ok(ChatResponse {
            content: choice.message.content.unwrap_or_default(),
            model: openai_response.model,
            usage: openai_response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            finish_reason: choice.finish_reason,
        })
    }
}
