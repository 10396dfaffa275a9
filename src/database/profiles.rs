// ABOUTME: Health profile storage and prompt-context rendering
// ABOUTME: One profile row per user, upserted as a whole

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sana Health

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use crate::errors::{AppError, AppResult, ErrorCode};

/// Stored health attributes used to personalize symptom analysis
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthProfileRecord {
    pub age: Option<u16>,
    pub sex: Option<String>,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
}

impl HealthProfileRecord {
    /// Render the profile as a compact text block for the analysis prompt
    ///
    /// Returns `None` when nothing is filled in, so an empty profile adds no
    /// context to the prompt.
    #[must_use]
    pub fn profile_context(&self) -> Option<String> {
        let mut lines = Vec::new();

        if let Some(age) = self.age {
            lines.push(format!("Age: {age}"));
        }
        if let Some(sex) = self.sex.as_deref().filter(|s| !s.is_empty()) {
            lines.push(format!("Sex: {sex}"));
        }
        if !self.conditions.is_empty() {
            lines.push(format!("Known conditions: {}", self.conditions.join(", ")));
        }
        if !self.medications.is_empty() {
            lines.push(format!("Medications: {}", self.medications.join(", ")));
        }
        if !self.allergies.is_empty() {
            lines.push(format!("Allergies: {}", self.allergies.join(", ")));
        }

        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}

/// Manager for health profiles
pub struct HealthProfileManager {
    pool: SqlitePool,
}

impl HealthProfileManager {
    /// Create a new profile manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch a user's health profile
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails, or a serialization error
    /// if a stored list column is corrupt.
    pub async fn get_profile(&self, user_id: &str) -> AppResult<Option<HealthProfileRecord>> {
        let row = sqlx::query(
            "SELECT age, sex, conditions, medications, allergies
             FROM health_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to fetch health profile: {e}")))?;

        row.map(|r| {
            let conditions: String = r.get("conditions");
            let medications: String = r.get("medications");
            let allergies: String = r.get("allergies");
            let age: Option<i64> = r.get("age");
            Ok(HealthProfileRecord {
                age: age.and_then(|a| u16::try_from(a).ok()),
                sex: r.get("sex"),
                conditions: decode_list("conditions", &conditions)?,
                medications: decode_list("medications", &medications)?,
                allergies: decode_list("allergies", &allergies)?,
            })
        })
        .transpose()
    }

    /// Insert or replace a user's health profile
    ///
    /// # Errors
    ///
    /// Returns a database error if the upsert fails, or a serialization
    /// error if a list cannot be encoded.
    pub async fn upsert_profile(
        &self,
        user_id: &str,
        profile: &HealthProfileRecord,
    ) -> AppResult<()> {
        let conditions = encode_list("conditions", &profile.conditions)?;
        let medications = encode_list("medications", &profile.medications)?;
        let allergies = encode_list("allergies", &profile.allergies)?;

        sqlx::query(
            "INSERT INTO health_profiles (user_id, age, sex, conditions, medications, allergies, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT(user_id) DO UPDATE SET
               age = excluded.age,
               sex = excluded.sex,
               conditions = excluded.conditions,
               medications = excluded.medications,
               allergies = excluded.allergies,
               updated_at = excluded.updated_at",
        )
        .bind(user_id)
        .bind(profile.age.map(i64::from))
        .bind(&profile.sex)
        .bind(&conditions)
        .bind(&medications)
        .bind(&allergies)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to save health profile: {e}")))?;

        Ok(())
    }
}

fn encode_list(field: &str, list: &[String]) -> AppResult<String> {
    serde_json::to_string(list).map_err(|e| {
        AppError::new(
            ErrorCode::SerializationError,
            format!("Failed to encode profile {field}: {e}"),
        )
    })
}

fn decode_list(field: &str, json: &str) -> AppResult<Vec<String>> {
    serde_json::from_str(json).map_err(|e| {
        AppError::new(
            ErrorCode::SerializationError,
            format!("Failed to decode profile {field}: {e}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_context_rendering() {
        let profile = HealthProfileRecord {
            age: Some(34),
            sex: Some("female".to_owned()),
            conditions: vec!["asthma".to_owned()],
            medications: vec!["albuterol".to_owned()],
            allergies: vec![],
        };

        let context = profile.profile_context().unwrap();
        assert!(context.contains("Age: 34"));
        assert!(context.contains("Known conditions: asthma"));
        assert!(!context.contains("Allergies"));
    }

    #[test]
    fn test_empty_profile_yields_no_context() {
        assert!(HealthProfileRecord::default().profile_context().is_none());
    }
}
