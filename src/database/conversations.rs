// ABOUTME: Conversation, message, and analysis persistence scoped to owning users
// ABOUTME: Append-only message log with transactional assistant-turn inserts

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sana Health

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::analysis::{AnalysisResult, Condition, Suggestion};
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::llm::MessageRole;

/// A symptom-assessment conversation owned by one user
///
/// Serialized camelCase; these records double as API response bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub created_at: String,
}

/// One turn in a conversation's append-only log
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: String,
    pub conversation_id: String,
    pub role: String,
    pub content: String,
    pub created_at: String,
}

/// A stored structured assessment attached to one assistant message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: String,
    pub conversation_id: String,
    pub message_id: String,
    pub urgency_level: String,
    pub conditions: Vec<Condition>,
    pub suggestions: Vec<Suggestion>,
    pub follow_up_question: Option<String>,
    pub created_at: String,
}

/// Manager for conversations and their messages and analyses
///
/// Every read and mutation that takes a `user_id` is scoped to that owner;
/// a conversation belonging to someone else behaves as if it did not exist.
pub struct ConversationManager {
    pool: SqlitePool,
}

impl ConversationManager {
    /// Create a new conversation manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ========================================================================
    // Conversations
    // ========================================================================

    /// Create a new conversation for a user
    ///
    /// # Errors
    ///
    /// Returns a database error if the insert fails.
    pub async fn create_conversation(
        &self,
        user_id: &str,
        title: &str,
    ) -> AppResult<ConversationRecord> {
        let record = ConversationRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_owned(),
            title: title.to_owned(),
            created_at: Utc::now().to_rfc3339(),
        };

        sqlx::query("INSERT INTO conversations (id, user_id, title, created_at) VALUES ($1, $2, $3, $4)")
            .bind(&record.id)
            .bind(&record.user_id)
            .bind(&record.title)
            .bind(&record.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to create conversation: {e}")))?;

        Ok(record)
    }

    /// Fetch a conversation, scoped to its owner
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub async fn get_conversation(
        &self,
        id: &str,
        user_id: &str,
    ) -> AppResult<Option<ConversationRecord>> {
        let row = sqlx::query(
            "SELECT id, user_id, title, created_at FROM conversations WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to fetch conversation: {e}")))?;

        Ok(row.map(|r| ConversationRecord {
            id: r.get("id"),
            user_id: r.get("user_id"),
            title: r.get("title"),
            created_at: r.get("created_at"),
        }))
    }

    /// List a user's conversations, newest first
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub async fn list_conversations(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<ConversationRecord>> {
        let rows = sqlx::query(
            "SELECT id, user_id, title, created_at FROM conversations
             WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list conversations: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|r| ConversationRecord {
                id: r.get("id"),
                user_id: r.get("user_id"),
                title: r.get("title"),
                created_at: r.get("created_at"),
            })
            .collect())
    }

    /// Rename a conversation; returns false when the owner has no such conversation
    ///
    /// # Errors
    ///
    /// Returns a database error if the update fails.
    pub async fn update_conversation_title(
        &self,
        id: &str,
        user_id: &str,
        title: &str,
    ) -> AppResult<bool> {
        let result =
            sqlx::query("UPDATE conversations SET title = $1 WHERE id = $2 AND user_id = $3")
                .bind(title)
                .bind(id)
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::database(format!("Failed to rename conversation: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a conversation and, by cascade, its messages and analyses
    ///
    /// # Errors
    ///
    /// Returns a database error if the delete fails.
    pub async fn delete_conversation(&self, id: &str, user_id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete conversation: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    // ========================================================================
    // Messages
    // ========================================================================

    /// Append a message to a conversation's log
    ///
    /// # Errors
    ///
    /// Returns a database error if the insert fails.
    pub async fn add_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
    ) -> AppResult<MessageRecord> {
        let record = MessageRecord {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_owned(),
            role: role.as_str().to_owned(),
            content: content.to_owned(),
            created_at: Utc::now().to_rfc3339(),
        };

        sqlx::query(
            "INSERT INTO messages (id, conversation_id, role, content, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&record.id)
        .bind(&record.conversation_id)
        .bind(&record.role)
        .bind(&record.content)
        .bind(&record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to save message: {e}")))?;

        Ok(record)
    }

    /// Load a conversation's messages in creation order
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub async fn get_messages(&self, conversation_id: &str) -> AppResult<Vec<MessageRecord>> {
        let rows = sqlx::query(
            "SELECT id, conversation_id, role, content, created_at FROM messages
             WHERE conversation_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to load messages: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|r| MessageRecord {
                id: r.get("id"),
                conversation_id: r.get("conversation_id"),
                role: r.get("role"),
                content: r.get("content"),
                created_at: r.get("created_at"),
            })
            .collect())
    }

    // ========================================================================
    // Analyses
    // ========================================================================

    /// Persist the assistant's reply and its analysis in one transaction
    ///
    /// Either both rows exist afterwards or neither does, so every assistant
    /// message created here has a matching analysis.
    ///
    /// # Errors
    ///
    /// Returns a database error if any statement or the commit fails, or a
    /// serialization error if conditions/suggestions cannot be encoded.
    pub async fn add_assistant_turn(
        &self,
        conversation_id: &str,
        content: &str,
        analysis: &AnalysisResult,
    ) -> AppResult<(MessageRecord, AnalysisRecord)> {
        let now = Utc::now().to_rfc3339();

        let message = MessageRecord {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_owned(),
            role: MessageRole::Assistant.as_str().to_owned(),
            content: content.to_owned(),
            created_at: now.clone(),
        };

        let conditions_json = serde_json::to_string(&analysis.conditions)
            .map_err(|e| serialization_error("conditions", &e))?;
        let suggestions_json = serde_json::to_string(&analysis.suggestions)
            .map_err(|e| serialization_error("suggestions", &e))?;

        let record = AnalysisRecord {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_owned(),
            message_id: message.id.clone(),
            urgency_level: analysis.urgency.as_str().to_owned(),
            conditions: analysis.conditions.clone(),
            suggestions: analysis.suggestions.clone(),
            follow_up_question: Some(analysis.follow_up_question.clone()),
            created_at: now,
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;

        sqlx::query(
            "INSERT INTO messages (id, conversation_id, role, content, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&message.id)
        .bind(&message.conversation_id)
        .bind(&message.role)
        .bind(&message.content)
        .bind(&message.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to save assistant message: {e}")))?;

        sqlx::query(
            "INSERT INTO analyses
             (id, conversation_id, message_id, urgency_level, conditions, suggestions, follow_up_question, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&record.id)
        .bind(&record.conversation_id)
        .bind(&record.message_id)
        .bind(&record.urgency_level)
        .bind(&conditions_json)
        .bind(&suggestions_json)
        .bind(&record.follow_up_question)
        .bind(&record.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to save analysis: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit assistant turn: {e}")))?;

        Ok((message, record))
    }

    /// Load a conversation's analyses in creation order
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails, or a serialization error
    /// if a stored JSON column is corrupt.
    pub async fn get_analyses(&self, conversation_id: &str) -> AppResult<Vec<AnalysisRecord>> {
        let rows = sqlx::query(
            "SELECT id, conversation_id, message_id, urgency_level, conditions, suggestions,
                    follow_up_question, created_at
             FROM analyses WHERE conversation_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to load analyses: {e}")))?;

        rows.into_iter()
            .map(|r| {
                let conditions_json: String = r.get("conditions");
                let suggestions_json: String = r.get("suggestions");
                Ok(AnalysisRecord {
                    id: r.get("id"),
                    conversation_id: r.get("conversation_id"),
                    message_id: r.get("message_id"),
                    urgency_level: r.get("urgency_level"),
                    conditions: serde_json::from_str(&conditions_json)
                        .map_err(|e| serialization_error("conditions", &e))?,
                    suggestions: serde_json::from_str(&suggestions_json)
                        .map_err(|e| serialization_error("suggestions", &e))?,
                    follow_up_question: r.get("follow_up_question"),
                    created_at: r.get("created_at"),
                })
            })
            .collect()
    }

    /// Count a conversation's analyses
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub async fn count_analyses(&self, conversation_id: &str) -> AppResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM analyses WHERE conversation_id = $1")
            .bind(conversation_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to count analyses: {e}")))?;

        Ok(row.get("n"))
    }
}

fn serialization_error(field: &str, e: &serde_json::Error) -> AppError {
    AppError::new(
        ErrorCode::SerializationError,
        format!("Failed to encode analysis {field}: {e}"),
    )
}
