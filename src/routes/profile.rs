// ABOUTME: Health profile retrieval and upsert endpoints
// ABOUTME: Profiles feed the analysis prompt's personalization context

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sana Health

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;

use super::{authenticate, ServerResources};
use crate::database::HealthProfileRecord;
use crate::errors::AppError;

/// GET /api/profile
///
/// Returns an empty profile for users who have not saved one yet.
pub async fn get_profile(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let claims = authenticate(&resources, &headers)?;

    let profile = resources
        .database
        .profiles()
        .get_profile(&claims.sub)
        .await?
        .unwrap_or_default();

    Ok(Json(profile).into_response())
}

/// PUT /api/profile
pub async fn put_profile(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Json(profile): Json<HealthProfileRecord>,
) -> Result<Response, AppError> {
    let claims = authenticate(&resources, &headers)?;

    resources
        .database
        .profiles()
        .upsert_profile(&claims.sub, &profile)
        .await?;

    Ok(Json(profile).into_response())
}
