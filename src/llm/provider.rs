// ABOUTME: Enum dispatch over concrete LLM providers selected at startup
// ABOUTME: Resolves SANA_LLM_PROVIDER into a ready-to-use ChatProvider

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sana Health

use async_trait::async_trait;

use super::{ChatRequest, ChatResponse, GeminiProvider, LlmCapabilities, LlmProvider, OpenAiCompatibleProvider};
use crate::config::LlmProviderType;
use crate::errors::AppError;

/// Concrete LLM provider selected from configuration
///
/// Enum dispatch keeps the hot path free of vtable indirection while still
/// allowing `Arc<dyn LlmProvider>` at the engine seam for tests.
pub enum ChatProvider {
    /// `OpenAI`-compatible endpoint (Groq, `OpenAI`, local)
    OpenAiCompatible(OpenAiCompatibleProvider),
    /// Google Gemini
    Gemini(GeminiProvider),
}

impl ChatProvider {
    /// Build the provider named by `SANA_LLM_PROVIDER`
    ///
    /// # Errors
    ///
    /// Returns a config error when the selected provider's required
    /// environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, AppError> {
        Self::for_type(LlmProviderType::from_env())
    }

    /// Build a specific provider type from its environment variables
    ///
    /// # Errors
    ///
    /// Returns a config error when the provider's required environment
    /// variables are missing or invalid.
    pub fn for_type(provider_type: LlmProviderType) -> Result<Self, AppError> {
        match provider_type {
            LlmProviderType::OpenAiCompatible => {
                Ok(Self::OpenAiCompatible(OpenAiCompatibleProvider::from_env()?))
            }
            LlmProviderType::Gemini => Ok(Self::Gemini(GeminiProvider::from_env()?)),
        }
    }
}

#[async_trait]
impl LlmProvider for ChatProvider {
    fn name(&self) -> &'static str {
        match self {
            Self::OpenAiCompatible(p) => p.name(),
            Self::Gemini(p) => p.name(),
        }
    }

    fn display_name(&self) -> &'static str {
        match self {
            Self::OpenAiCompatible(p) => p.display_name(),
            Self::Gemini(p) => p.display_name(),
        }
    }

    fn capabilities(&self) -> LlmCapabilities {
        match self {
            Self::OpenAiCompatible(p) => p.capabilities(),
            Self::Gemini(p) => p.capabilities(),
        }
    }

    fn default_model(&self) -> &str {
        match self {
            Self::OpenAiCompatible(p) => p.default_model(),
            Self::Gemini(p) => p.default_model(),
        }
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        match self {
            Self::OpenAiCompatible(p) => p.complete(request).await,
            Self::Gemini(p) => p.complete(request).await,
        }
    }
}
