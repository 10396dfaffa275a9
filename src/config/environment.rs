// ABOUTME: Environment-based server configuration loading and validation
// ABOUTME: Reads SANA_* variables into a typed ServerConfig at startup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sana Health

use crate::config::types::{Environment, LlmProviderType, LogLevel};
use crate::errors::{AppError, AppResult};
use std::env;

/// Default HTTP port when `SANA_HTTP_PORT` is not set
const DEFAULT_HTTP_PORT: u16 = 8081;

/// Default database URL (file-backed SQLite, created on first run)
const DEFAULT_DATABASE_URL: &str = "sqlite:data/sana.db";

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP port for the API server (`SANA_HTTP_PORT`)
    pub http_port: u16,
    /// Database connection URL (`SANA_DATABASE_URL`)
    pub database_url: String,
    /// Secret used to sign JWT session tokens (`SANA_JWT_SECRET`)
    pub jwt_secret: String,
    /// Deployment environment (`SANA_ENV`)
    pub environment: Environment,
    /// Log level (`SANA_LOG_LEVEL`)
    pub log_level: LogLevel,
    /// Selected LLM provider (`SANA_LLM_PROVIDER`)
    pub llm_provider: LlmProviderType,
    /// Optional model override for the selected provider (`SANA_LLM_MODEL`)
    pub llm_model: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns a config error if `SANA_HTTP_PORT` is set but unparseable, or
    /// if `SANA_JWT_SECRET` is missing in a production environment.
    pub fn from_env() -> AppResult<Self> {
        let http_port = match env::var("SANA_HTTP_PORT") {
            Ok(port) => port
                .parse()
                .map_err(|_| AppError::config(format!("Invalid SANA_HTTP_PORT value: {port}")))?,
            Err(_) => DEFAULT_HTTP_PORT,
        };

        let database_url =
            env::var("SANA_DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_owned());

        let environment = env::var("SANA_ENV")
            .map(|s| Environment::from_str_or_default(&s))
            .unwrap_or_default();

        let jwt_secret = match env::var("SANA_JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ if environment.is_production() => {
                return Err(AppError::config(
                    "SANA_JWT_SECRET must be set in production environments",
                ));
            }
            // Deterministic development secret; never valid in production
            _ => "sana-development-secret".to_owned(),
        };

        let log_level = env::var("SANA_LOG_LEVEL")
            .map(|s| LogLevel::from_str_or_default(&s))
            .unwrap_or_default();

        Ok(Self {
            http_port,
            database_url,
            jwt_secret,
            environment,
            log_level,
            llm_provider: LlmProviderType::from_env(),
            llm_model: LlmProviderType::model_from_env(),
        })
    }
}
