// ABOUTME: Symptom analysis engine producing structured triage assessments
// ABOUTME: Prompts an LLM provider and parses its output into a fixed schema

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sana Health

//! # Symptom Analysis Engine
//!
//! Given a free-text symptom description, prior conversation turns, and an
//! optional health-profile context, the engine prompts an LLM provider for a
//! single JSON object and parses it into [`AnalysisResult`].
//!
//! Failure handling separates two very different situations:
//!
//! - **Malformed model output** (non-JSON, schema mismatch) is recovered
//!   locally with a fixed safe fallback — the caller always receives a
//!   well-formed result ([`Analyzed::Fallback`]).
//! - **Transport failure** (network, auth, rate limit, timeout) propagates
//!   as a typed error; the engine never fabricates medical content when the
//!   provider itself is unreachable.

mod engine;
mod types;

pub use engine::AnalysisEngine;
pub use types::{Analyzed, AnalysisResult, Condition, Likelihood, Suggestion, UrgencyLevel};
