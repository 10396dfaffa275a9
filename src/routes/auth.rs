// ABOUTME: Registration and login endpoints issuing JWT session tokens
// ABOUTME: Validates credentials against bcrypt hashes stored in SQLite

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sana Health

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::ServerResources;
use crate::auth::AuthManager;
use crate::database::UserRecord;
use crate::errors::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: UserRecord,
    pub token: String,
}

/// Minimum accepted password length
const MIN_PASSWORD_LEN: usize = 8;

/// POST /api/auth/register
pub async fn register(
    State(resources): State<Arc<ServerResources>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Response, AppError> {
    let email = request.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::invalid_input("A valid email address is required"));
    }
    if request.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::invalid_input(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let password_hash = AuthManager::hash_password(&request.password)?;
    let user = resources
        .database
        .users()
        .create_user(&email, &password_hash, request.display_name.as_deref())
        .await?;

    info!(user_id = %user.id, "Registered new user");

    let token = resources.auth.generate_token(&user)?;
    Ok((StatusCode::CREATED, Json(SessionResponse { user, token })).into_response())
}

/// POST /api/auth/login
pub async fn login(
    State(resources): State<Arc<ServerResources>>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let email = request.email.trim().to_lowercase();

    let user = resources
        .database
        .users()
        .get_user_by_email(&email)
        .await?
        .ok_or_else(|| AppError::auth_invalid("Invalid email or password"))?;

    AuthManager::verify_password(&request.password, &user.password_hash)?;

    let token = resources.auth.generate_token(&user)?;
    Ok(Json(SessionResponse { user, token }).into_response())
}
