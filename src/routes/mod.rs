// ABOUTME: HTTP router assembly and shared per-request resources
// ABOUTME: Wires auth, conversation, and profile routes onto an Axum router

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sana Health

//! # HTTP Surface
//!
//! JSON over HTTP, bearer-token authenticated. All conversation access is
//! scoped to the authenticated owner.

pub mod auth;
pub mod conversations;
pub mod profile;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::analysis::AnalysisEngine;
use crate::auth::{extract_bearer_token, AuthManager, Claims};
use crate::database::Database;
use crate::errors::AppResult;
use crate::services::ConversationLocks;

/// Shared state handed to every route handler
pub struct ServerResources {
    pub database: Database,
    pub auth: AuthManager,
    pub engine: AnalysisEngine,
    pub locks: ConversationLocks,
}

impl ServerResources {
    /// Bundle the server's long-lived components
    #[must_use]
    pub fn new(database: Database, auth: AuthManager, engine: AnalysisEngine) -> Self {
        Self {
            database,
            auth,
            engine,
            locks: ConversationLocks::new(),
        }
    }
}

/// Authenticate a request from its `Authorization` header
///
/// # Errors
///
/// Returns an auth error when the header is missing, malformed, or carries
/// an invalid token.
pub fn authenticate(resources: &ServerResources, headers: &HeaderMap) -> AppResult<Claims> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let token = extract_bearer_token(header)?;
    resources.auth.validate_token(token)
}

/// Build the API router
pub fn build_router(resources: Arc<ServerResources>) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route(
            "/api/conversations",
            post(conversations::create_conversation).get(conversations::list_conversations),
        )
        .route(
            "/api/conversations/:id",
            put(conversations::rename_conversation).delete(conversations::delete_conversation),
        )
        .route(
            "/api/conversations/:id/messages",
            get(conversations::get_messages).post(conversations::post_message),
        )
        .route(
            "/api/conversations/:id/analyses",
            get(conversations::get_analyses),
        )
        .route(
            "/api/profile",
            get(profile::get_profile).put(profile::put_profile),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(resources)
}

/// Liveness probe
async fn health_check(State(_resources): State<Arc<ServerResources>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "sana-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
