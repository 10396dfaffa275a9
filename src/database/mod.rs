// ABOUTME: SQLite persistence layer with startup migrations and manager accessors
// ABOUTME: Owns the connection pool shared by user, conversation, and profile managers

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sana Health

//! # Database Layer
//!
//! SQLite via sqlx. Migrations are idempotent `CREATE TABLE IF NOT EXISTS`
//! statements run at startup; identifiers are UUID text, timestamps RFC 3339
//! text so lexicographic ordering matches creation order.

pub mod conversations;
pub mod profiles;
pub mod users;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

use crate::errors::{AppError, AppResult};

pub use conversations::{AnalysisRecord, ConversationManager, ConversationRecord, MessageRecord};
pub use profiles::{HealthProfileManager, HealthProfileRecord};
pub use users::{UserManager, UserRecord};

/// Maximum connections in the pool
const MAX_CONNECTIONS: u32 = 5;

/// Shared database handle
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to the database and run migrations
    ///
    /// The database file is created if it does not exist. Foreign keys are
    /// enabled so conversation deletes cascade to messages and analyses.
    ///
    /// # Errors
    ///
    /// Returns a database error if the URL is invalid, the connection fails,
    /// or a migration statement fails.
    pub async fn new(database_url: &str) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::database(format!("Invalid database URL: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(|e| AppError::database(format!("Failed to connect to database: {e}")))?;

        let db = Self { pool };
        db.migrate().await?;
        info!("Database ready");
        Ok(db)
    }

    /// Wrap an existing pool (used by tests with in-memory SQLite)
    ///
    /// # Errors
    ///
    /// Returns a database error if a migration statement fails.
    pub async fn from_pool(pool: SqlitePool) -> AppResult<Self> {
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Access the underlying pool
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Manager for user accounts
    #[must_use]
    pub fn users(&self) -> UserManager {
        UserManager::new(self.pool.clone())
    }

    /// Manager for conversations, messages, and analyses
    #[must_use]
    pub fn conversations(&self) -> ConversationManager {
        ConversationManager::new(self.pool.clone())
    }

    /// Manager for health profiles
    #[must_use]
    pub fn profiles(&self) -> HealthProfileManager {
        HealthProfileManager::new(self.pool.clone())
    }

    /// Run idempotent schema migrations
    async fn migrate(&self) -> AppResult<()> {
        let statements = [
            r"CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                display_name TEXT,
                created_at TEXT NOT NULL
            )",
            r"CREATE TABLE IF NOT EXISTS health_profiles (
                user_id TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                age INTEGER,
                sex TEXT,
                conditions TEXT NOT NULL DEFAULT '[]',
                medications TEXT NOT NULL DEFAULT '[]',
                allergies TEXT NOT NULL DEFAULT '[]',
                updated_at TEXT NOT NULL
            )",
            r"CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            r"CREATE INDEX IF NOT EXISTS idx_conversations_user
                ON conversations(user_id, created_at)",
            r"CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            r"CREATE INDEX IF NOT EXISTS idx_messages_conversation
                ON messages(conversation_id, created_at)",
            r"CREATE TABLE IF NOT EXISTS analyses (
                id TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                message_id TEXT NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
                urgency_level TEXT NOT NULL,
                conditions TEXT NOT NULL,
                suggestions TEXT NOT NULL,
                follow_up_question TEXT,
                created_at TEXT NOT NULL
            )",
            r"CREATE INDEX IF NOT EXISTS idx_analyses_conversation
                ON analyses(conversation_id, created_at)",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::database(format!("Migration failed: {e}")))?;
        }

        Ok(())
    }
}
