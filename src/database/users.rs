// ABOUTME: User account persistence for registration and login
// ABOUTME: Stores bcrypt password hashes keyed by unique email

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sana Health

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

/// A registered user account
///
/// The password hash is never serialized into responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub display_name: Option<String>,
    pub created_at: String,
}

/// Manager for user accounts
pub struct UserManager {
    pool: SqlitePool,
}

impl UserManager {
    /// Create a new user manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a user account with an already-hashed password
    ///
    /// # Errors
    ///
    /// Returns an already-exists error when the email is taken, or a
    /// database error if the insert fails.
    pub async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        display_name: Option<&str>,
    ) -> AppResult<UserRecord> {
        if self.get_user_by_email(email).await?.is_some() {
            return Err(AppError::already_exists(format!(
                "An account with email {email} already exists"
            )));
        }

        let record = UserRecord {
            id: Uuid::new_v4().to_string(),
            email: email.to_owned(),
            password_hash: password_hash.to_owned(),
            display_name: display_name.map(str::to_owned),
            created_at: Utc::now().to_rfc3339(),
        };

        sqlx::query(
            "INSERT INTO users (id, email, password_hash, display_name, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&record.id)
        .bind(&record.email)
        .bind(&record.password_hash)
        .bind(&record.display_name)
        .bind(&record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create user: {e}")))?;

        Ok(record)
    }

    /// Look up a user by email
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub async fn get_user_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        let row = sqlx::query(
            "SELECT id, email, password_hash, display_name, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to fetch user: {e}")))?;

        Ok(row.map(map_user_row))
    }

    /// Look up a user by id
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub async fn get_user_by_id(&self, id: &str) -> AppResult<Option<UserRecord>> {
        let row = sqlx::query(
            "SELECT id, email, password_hash, display_name, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to fetch user: {e}")))?;

        Ok(row.map(map_user_row))
    }
}

fn map_user_row(row: sqlx::sqlite::SqliteRow) -> UserRecord {
    UserRecord {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        display_name: row.get("display_name"),
        created_at: row.get("created_at"),
    }
}
