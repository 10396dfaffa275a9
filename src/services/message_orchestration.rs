// ABOUTME: Orchestrates one user message end to end: persist, analyze, persist reply
// ABOUTME: Serializes turns per conversation and never rolls back the user's message

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sana Health

//! # Message/Analysis Orchestration
//!
//! One call handles one submitted message: validate, persist it, run the
//! analysis engine against the conversation's prior history, and persist the
//! assistant reply with its analysis in a single transaction.
//!
//! Partial-failure policy: the user's message is persisted before the engine
//! runs and is never rolled back by a downstream failure. A transport error
//! degrades the response to `{message, error}` instead of losing the turn.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

use crate::analysis::AnalysisEngine;
use crate::database::{AnalysisRecord, Database, MessageRecord};
use crate::errors::{AppError, AppResult};
use crate::llm::{ChatMessage, MessageRole};

/// Per-conversation locks serializing concurrent message submissions
///
/// Turns within one conversation must see a consistent prior history;
/// submissions to different conversations stay independent.
#[derive(Default)]
pub struct ConversationLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ConversationLocks {
    /// Create an empty lock map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the lock for a conversation
    #[must_use]
    pub fn lock_for(&self, conversation_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(conversation_id.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Outcome of posting a message to a conversation
#[derive(Debug)]
pub enum MessageDispatch {
    /// Non-user message stored verbatim; no analysis attempted
    Plain(MessageRecord),
    /// User message analyzed; assistant reply and analysis persisted
    Analyzed {
        message: MessageRecord,
        analysis: AnalysisRecord,
    },
    /// User message persisted but the provider call failed
    Degraded {
        message: MessageRecord,
        error: String,
    },
}

/// Post a message to a conversation, analyzing user turns
///
/// # Errors
///
/// Returns a validation error for an empty body or unknown role, a
/// not-found error when the owner has no such conversation, and a database
/// error if persistence fails. Provider failures are not errors here; they
/// surface as [`MessageDispatch::Degraded`].
pub async fn post_user_message(
    db: &Database,
    engine: &AnalysisEngine,
    locks: &ConversationLocks,
    conversation_id: &str,
    user_id: &str,
    role: &str,
    content: &str,
) -> AppResult<MessageDispatch> {
    let role = MessageRole::parse(role)
        .filter(|r| matches!(r, MessageRole::User | MessageRole::Assistant))
        .ok_or_else(|| AppError::invalid_input("role must be \"user\" or \"assistant\""))?;

    if content.trim().is_empty() {
        return Err(AppError::invalid_input("content must not be empty"));
    }

    let conversations = db.conversations();
    conversations
        .get_conversation(conversation_id, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Conversation"))?;

    let lock = locks.lock_for(conversation_id);
    let _guard = lock.lock().await;

    // Prior turns, captured before the new message is appended
    let history: Vec<ChatMessage> = conversations
        .get_messages(conversation_id)
        .await?
        .iter()
        .filter_map(|m| {
            MessageRole::parse(&m.role).map(|role| ChatMessage::new(role, m.content.clone()))
        })
        .collect();

    let message = conversations
        .add_message(conversation_id, role, content)
        .await?;

    if role != MessageRole::User {
        return Ok(MessageDispatch::Plain(message));
    }

    let profile_context = db
        .profiles()
        .get_profile(user_id)
        .await?
        .and_then(|p| p.profile_context());

    match engine
        .analyze(content, &history, profile_context.as_deref())
        .await
    {
        Ok(analyzed) => {
            let result = analyzed.into_result();
            let (_, analysis) = conversations
                .add_assistant_turn(conversation_id, &result.message, &result)
                .await?;
            Ok(MessageDispatch::Analyzed { message, analysis })
        }
        Err(e) => {
            warn!(
                conversation_id,
                error = %e,
                "Analysis failed; returning user message without analysis"
            );
            Ok(MessageDispatch::Degraded {
                message,
                error: e.to_string(),
            })
        }
    }
}
