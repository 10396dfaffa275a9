// ABOUTME: Configuration module for environment-driven server settings
// ABOUTME: Exposes typed config enums and the ServerConfig loader
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sana Health

//! Configuration management for the Sana server.
//!
//! All configuration is environment-driven; see [`environment::ServerConfig`]
//! for the full list of `SANA_*` variables.

pub mod environment;
pub mod types;

pub use environment::ServerConfig;
pub use types::{Environment, LlmProviderType, LogLevel};
