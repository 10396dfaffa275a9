// ABOUTME: Integration tests for the HTTP route handlers
// ABOUTME: Covers auth, conversation CRUD, message posting, and owner scoping

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sana Health

#![allow(clippy::unwrap_used, clippy::expect_used)]
#![allow(missing_docs)]

mod common;
mod helpers;

use common::{
    create_other_user, create_test_resources, create_test_user, MockProvider, VALID_ANALYSIS_JSON,
};
use helpers::axum_test::AxumTestRequest;

use axum::http::StatusCode;
use sana_server::routes::build_router;
use serde_json::{json, Value};

// ============================================================================
// Test Helpers
// ============================================================================

async fn setup() -> (axum::Router, String) {
    let resources = create_test_resources(MockProvider::replying(VALID_ANALYSIS_JSON)).await;
    let (_user, token) = create_test_user(&resources).await;
    (build_router(resources), token)
}

async fn create_conversation(app: &axum::Router, token: &str, title: &str) -> String {
    let response = AxumTestRequest::post("/api/conversations")
        .bearer(token)
        .json(&json!({"title": title}))
        .send(app.clone())
        .await
        .assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    body["id"].as_str().unwrap().to_owned()
}

// ============================================================================
// Health & Auth
// ============================================================================

#[tokio::test]
async fn health_endpoint_is_public() {
    let (app, _) = setup().await;
    let response = AxumTestRequest::get("/api/health").send(app).await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn register_and_login_issue_working_tokens() {
    let resources = create_test_resources(MockProvider::replying(VALID_ANALYSIS_JSON)).await;
    let app = build_router(resources);

    let response = AxumTestRequest::post("/api/auth/register")
        .json(&json!({
            "email": "new@example.com",
            "password": "long enough password",
            "displayName": "Newcomer"
        }))
        .send(app.clone())
        .await
        .assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["user"]["email"], "new@example.com");
    assert!(body["user"].get("passwordHash").is_none());

    let response = AxumTestRequest::post("/api/auth/login")
        .json(&json!({"email": "new@example.com", "password": "long enough password"}))
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK);
    let body: Value = response.json();
    let token = body["token"].as_str().unwrap();

    // The issued token authenticates API calls
    AxumTestRequest::get("/api/conversations")
        .bearer(token)
        .send(app)
        .await
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let (app, _) = setup().await;
    let response = AxumTestRequest::post("/api/auth/register")
        .json(&json!({"email": "tester@example.com", "password": "long enough password"}))
        .send(app)
        .await;
    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let (app, _) = setup().await;
    let response = AxumTestRequest::post("/api/auth/login")
        .json(&json!({"email": "tester@example.com", "password": "wrong password"}))
        .send(app)
        .await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn conversation_endpoints_require_auth() {
    let (app, _) = setup().await;

    for request in [
        AxumTestRequest::get("/api/conversations"),
        AxumTestRequest::post("/api/conversations").json(&json!({"title": "x"})),
        AxumTestRequest::get("/api/conversations/some-id/messages"),
        AxumTestRequest::get("/api/profile"),
    ] {
        let response = request.send(app.clone()).await;
        assert_eq!(response.status(), 401);
    }
}

// ============================================================================
// Conversation CRUD
// ============================================================================

#[tokio::test]
async fn conversation_crud_round_trip() {
    let (app, token) = setup().await;

    let id = create_conversation(&app, &token, "Morning headaches").await;

    let response = AxumTestRequest::get("/api/conversations")
        .bearer(&token)
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK);
    let list: Vec<Value> = response.json();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["title"], "Morning headaches");
    assert!(list[0]["createdAt"].is_string());

    AxumTestRequest::put(&format!("/api/conversations/{id}"))
        .bearer(&token)
        .json(&json!({"title": "Recurring headaches"}))
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK);

    AxumTestRequest::delete(&format!("/api/conversations/{id}"))
        .bearer(&token)
        .send(app.clone())
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let response = AxumTestRequest::get("/api/conversations")
        .bearer(&token)
        .send(app)
        .await;
    let list: Vec<Value> = response.json();
    assert!(list.is_empty());
}

#[tokio::test]
async fn empty_title_is_rejected() {
    let (app, token) = setup().await;
    let response = AxumTestRequest::post("/api/conversations")
        .bearer(&token)
        .json(&json!({"title": "   "}))
        .send(app)
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn other_users_conversations_are_invisible() {
    let resources = create_test_resources(MockProvider::replying(VALID_ANALYSIS_JSON)).await;
    let (_user, token) = create_test_user(&resources).await;
    let (other, other_token) = create_other_user(&resources).await;

    let conversation = resources
        .database
        .conversations()
        .create_conversation(&other.id, "Private")
        .await
        .unwrap();
    let app = build_router(resources);

    // Owner sees it
    AxumTestRequest::get(&format!("/api/conversations/{}/messages", conversation.id))
        .bearer(&other_token)
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK);

    // Everyone else gets 404, same as a nonexistent id
    for path in [
        format!("/api/conversations/{}/messages", conversation.id),
        format!("/api/conversations/{}/analyses", conversation.id),
    ] {
        let response = AxumTestRequest::get(&path).bearer(&token).send(app.clone()).await;
        assert_eq!(response.status(), 404);
    }

    let response = AxumTestRequest::delete(&format!("/api/conversations/{}", conversation.id))
        .bearer(&token)
        .send(app)
        .await;
    assert_eq!(response.status(), 404);
}

// ============================================================================
// Messages & Analyses
// ============================================================================

#[tokio::test]
async fn posting_symptoms_returns_message_and_analysis() {
    let (app, token) = setup().await;
    let id = create_conversation(&app, &token, "Headache").await;

    let response = AxumTestRequest::post(&format!("/api/conversations/{id}/messages"))
        .bearer(&token)
        .json(&json!({
            "role": "user",
            "content": "I have a throbbing headache for 3 days, worse when bending over"
        }))
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["message"]["role"], "user");

    let analysis = &body["analysis"];
    let urgency = analysis["urgencyLevel"].as_str().unwrap();
    assert!(["mild", "moderate", "severe"].contains(&urgency));
    let conditions = analysis["conditions"].as_array().unwrap();
    assert!(!conditions.is_empty());
    for condition in conditions {
        let likelihood = condition["likelihood"].as_str().unwrap();
        assert!(["High", "Moderate", "Low"].contains(&likelihood));
    }
    assert!(!analysis["followUpQuestion"].as_str().unwrap().is_empty());

    // Both turns visible via GET, analysis via its endpoint
    let response = AxumTestRequest::get(&format!("/api/conversations/{id}/messages"))
        .bearer(&token)
        .send(app.clone())
        .await;
    let messages: Vec<Value> = response.json();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1]["role"], "assistant");

    let response = AxumTestRequest::get(&format!("/api/conversations/{id}/analyses"))
        .bearer(&token)
        .send(app)
        .await;
    let analyses: Vec<Value> = response.json();
    assert_eq!(analyses.len(), 1);
    assert_eq!(analyses[0]["messageId"], messages[1]["id"]);
}

#[tokio::test]
async fn provider_failure_returns_502_with_preserved_message() {
    let resources = create_test_resources(MockProvider::failing()).await;
    let (_user, token) = create_test_user(&resources).await;
    let app = build_router(resources);
    let id = create_conversation(&app, &token, "Dizzy").await;

    let response = AxumTestRequest::post(&format!("/api/conversations/{id}/messages"))
        .bearer(&token)
        .json(&json!({"role": "user", "content": "I keep getting dizzy."}))
        .send(app.clone())
        .await;
    assert_eq!(response.status(), 502);

    let body: Value = response.json();
    assert_eq!(body["message"]["content"], "I keep getting dizzy.");
    assert!(!body["error"].as_str().unwrap().is_empty());

    // The user message is retrievable afterwards; no analysis was created
    let response = AxumTestRequest::get(&format!("/api/conversations/{id}/messages"))
        .bearer(&token)
        .send(app.clone())
        .await;
    let messages: Vec<Value> = response.json();
    assert_eq!(messages.len(), 1);

    let response = AxumTestRequest::get(&format!("/api/conversations/{id}/analyses"))
        .bearer(&token)
        .send(app)
        .await;
    let analyses: Vec<Value> = response.json();
    assert!(analyses.is_empty());
}

#[tokio::test]
async fn invalid_message_bodies_are_rejected() {
    let (app, token) = setup().await;
    let id = create_conversation(&app, &token, "Validation").await;

    for body in [
        json!({"role": "user", "content": ""}),
        json!({"role": "wizard", "content": "abracadabra"}),
    ] {
        let response = AxumTestRequest::post(&format!("/api/conversations/{id}/messages"))
            .bearer(&token)
            .json(&body)
            .send(app.clone())
            .await;
        assert_eq!(response.status(), 400);
    }
}

// ============================================================================
// Health Profile
// ============================================================================

#[tokio::test]
async fn profile_round_trip() {
    let (app, token) = setup().await;

    // Unset profile reads back empty
    let response = AxumTestRequest::get("/api/profile")
        .bearer(&token)
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert!(body["age"].is_null());

    AxumTestRequest::put("/api/profile")
        .bearer(&token)
        .json(&json!({
            "age": 41,
            "sex": "male",
            "conditions": ["migraine"],
            "medications": ["sumatriptan"],
            "allergies": []
        }))
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK);

    let response = AxumTestRequest::get("/api/profile")
        .bearer(&token)
        .send(app)
        .await;
    let body: Value = response.json();
    assert_eq!(body["age"], 41);
    assert_eq!(body["conditions"][0], "migraine");
}
