// ABOUTME: Library root for the sana-server symptom-analysis backend
// ABOUTME: Exposes the database, analysis, LLM, and HTTP route modules

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sana Health

//! # Sana Server
//!
//! Backend for a health-tracking application. Users hold conversations about
//! their symptoms; each user message is analyzed by an external LLM into a
//! structured triage assessment (urgency, candidate conditions, suggestions)
//! that is persisted next to the assistant's reply.
//!
//! ## Architecture
//!
//! - [`database`] — SQLite persistence for users, conversations, messages,
//!   analyses, and health profiles
//! - [`llm`] — provider abstraction over hosted chat-completion APIs
//! - [`analysis`] — prompt construction, JSON extraction, fallback policy
//! - [`services`] — the message/analysis orchestration flow
//! - [`routes`] — Axum HTTP surface with JWT bearer authentication

#![deny(unsafe_code)]

pub mod analysis;
pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod llm;
pub mod logging;
pub mod routes;
pub mod services;
