// ABOUTME: Conversation CRUD plus message submission and analysis retrieval
// ABOUTME: Every handler authenticates and scopes access to the owning user

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sana Health

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use super::{authenticate, ServerResources};
use crate::database::{AnalysisRecord, MessageRecord};
use crate::errors::AppError;
use crate::services::{post_user_message, MessageDispatch};

#[derive(Debug, Deserialize)]
pub struct CreateConversationRequest {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameConversationRequest {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

const fn default_limit() -> i64 {
    50
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub message: MessageRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisRecord>,
}

/// POST /api/conversations
pub async fn create_conversation(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Json(request): Json<CreateConversationRequest>,
) -> Result<Response, AppError> {
    let claims = authenticate(&resources, &headers)?;

    let title = request.title.trim();
    if title.is_empty() {
        return Err(AppError::invalid_input("title must not be empty"));
    }

    let conversation = resources
        .database
        .conversations()
        .create_conversation(&claims.sub, title)
        .await?;

    Ok((StatusCode::CREATED, Json(conversation)).into_response())
}

/// GET /api/conversations
pub async fn list_conversations(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<Response, AppError> {
    let claims = authenticate(&resources, &headers)?;

    let limit = params.limit.clamp(1, 200);
    let offset = params.offset.max(0);

    let conversations = resources
        .database
        .conversations()
        .list_conversations(&claims.sub, limit, offset)
        .await?;

    Ok(Json(conversations).into_response())
}

/// PUT /api/conversations/:id
pub async fn rename_conversation(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<RenameConversationRequest>,
) -> Result<Response, AppError> {
    let claims = authenticate(&resources, &headers)?;

    let title = request.title.trim();
    if title.is_empty() {
        return Err(AppError::invalid_input("title must not be empty"));
    }

    let renamed = resources
        .database
        .conversations()
        .update_conversation_title(&id, &claims.sub, title)
        .await?;
    if !renamed {
        return Err(AppError::not_found("Conversation"));
    }

    Ok(Json(json!({"id": id, "title": title})).into_response())
}

/// DELETE /api/conversations/:id
pub async fn delete_conversation(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let claims = authenticate(&resources, &headers)?;

    let deleted = resources
        .database
        .conversations()
        .delete_conversation(&id, &claims.sub)
        .await?;
    if !deleted {
        return Err(AppError::not_found("Conversation"));
    }

    Ok(StatusCode::NO_CONTENT.into_response())
}

/// GET /api/conversations/:id/messages
pub async fn get_messages(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let claims = authenticate(&resources, &headers)?;

    let conversations = resources.database.conversations();
    conversations
        .get_conversation(&id, &claims.sub)
        .await?
        .ok_or_else(|| AppError::not_found("Conversation"))?;

    let messages = conversations.get_messages(&id).await?;
    Ok(Json(messages).into_response())
}

/// POST /api/conversations/:id/messages
///
/// Returns `{message}` for non-user roles, `{message, analysis}` on engine
/// success, and 502 `{message, error}` when the provider call fails. The
/// user's message is persisted in every non-4xx case.
pub async fn post_message(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<PostMessageRequest>,
) -> Result<Response, AppError> {
    let claims = authenticate(&resources, &headers)?;

    let dispatch = post_user_message(
        &resources.database,
        &resources.engine,
        &resources.locks,
        &id,
        &claims.sub,
        &request.role,
        &request.content,
    )
    .await?;

    let response = match dispatch {
        MessageDispatch::Plain(message) => Json(MessageResponse {
            message,
            analysis: None,
        })
        .into_response(),
        MessageDispatch::Analyzed { message, analysis } => Json(MessageResponse {
            message,
            analysis: Some(analysis),
        })
        .into_response(),
        MessageDispatch::Degraded { message, error } => (
            StatusCode::BAD_GATEWAY,
            Json(json!({"message": message, "error": error})),
        )
            .into_response(),
    };

    Ok(response)
}

/// GET /api/conversations/:id/analyses
pub async fn get_analyses(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let claims = authenticate(&resources, &headers)?;

    let conversations = resources.database.conversations();
    conversations
        .get_conversation(&id, &claims.sub)
        .await?
        .ok_or_else(|| AppError::not_found("Conversation"))?;

    let analyses = conversations.get_analyses(&id).await?;
    Ok(Json(analyses).into_response())
}
