// ABOUTME: Shared fixtures for integration tests: in-memory database and mock provider
// ABOUTME: Builds ServerResources backed by a scripted LlmProvider, no network

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sana Health

#![allow(dead_code)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use sana_server::analysis::AnalysisEngine;
use sana_server::auth::AuthManager;
use sana_server::database::{Database, UserRecord};
use sana_server::errors::AppError;
use sana_server::llm::{
    ChatRequest, ChatResponse, LlmCapabilities, LlmProvider,
};
use sana_server::routes::ServerResources;

pub const TEST_JWT_SECRET: &str = "integration-test-secret";

/// A syntactically valid analysis the mock provider can return
pub const VALID_ANALYSIS_JSON: &str = r#"{
    "urgency": "moderate",
    "conditions": [
        {"name": "Tension headache", "likelihood": "High", "explanation": "Persistent dull pain is typical"},
        {"name": "Sinus congestion", "likelihood": "Moderate", "explanation": "Worse when bending over"}
    ],
    "suggestions": [
        {"text": "Rest and stay hydrated", "isWarning": false, "reasoning": "Supports recovery"},
        {"text": "Seek care if vision changes occur", "isWarning": true, "reasoning": "Could indicate something serious"}
    ],
    "message": "This sounds most consistent with a tension headache, though sinus pressure is possible.",
    "followUpQuestion": "Have you noticed any fever or neck stiffness?"
}"#;

/// One scripted provider turn
pub enum MockOutcome {
    /// Return this text as the model's raw output
    Reply(String),
    /// Sleep before replying, to let concurrent submissions overlap
    DelayedReply { reply: String, delay_ms: u64 },
    /// Fail the call as a transport error
    TransportError,
}

/// Scripted `LlmProvider` that records every request it receives
pub struct MockProvider {
    outcomes: Mutex<VecDeque<MockOutcome>>,
    default_reply: String,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockProvider {
    /// Provider that always replies with the given raw text
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(VecDeque::new()),
            default_reply: reply.to_owned(),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Provider that always fails with a transport error
    pub fn failing() -> Arc<Self> {
        // Empty default reply makes every call fail
        Arc::new(Self {
            outcomes: Mutex::new(VecDeque::new()),
            default_reply: String::new(),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Queue an outcome ahead of the default reply
    pub fn push(&self, outcome: MockOutcome) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    /// Requests received so far, in order
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_outcome(&self) -> MockOutcome {
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                if self.default_reply.is_empty() {
                    MockOutcome::TransportError
                } else {
                    MockOutcome::Reply(self.default_reply.clone())
                }
            })
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn display_name(&self) -> &'static str {
        "Mock Provider"
    }

    fn capabilities(&self) -> LlmCapabilities {
        LlmCapabilities::SYSTEM_MESSAGES
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        self.requests.lock().unwrap().push(request.clone());

        let content = match self.next_outcome() {
            MockOutcome::Reply(content) => content,
            MockOutcome::DelayedReply { reply, delay_ms } => {
                tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                reply
            }
            MockOutcome::TransportError => {
                return Err(AppError::external_service(
                    "Mock Provider",
                    "simulated network failure",
                ));
            }
        };

        Ok(ChatResponse {
            content,
            model: "mock-model".to_owned(),
            usage: None,
            finish_reason: Some("stop".to_owned()),
        })
    }
}

/// Fresh in-memory database with migrations applied
pub async fn create_test_database() -> Database {
    // A single connection keeps every query on the same in-memory database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");
    Database::from_pool(pool)
        .await
        .expect("Failed to run migrations")
}

/// Server resources wired to the given provider
pub async fn create_test_resources(provider: Arc<MockProvider>) -> Arc<ServerResources> {
    let database = create_test_database().await;
    let auth = AuthManager::new(TEST_JWT_SECRET);
    let engine = AnalysisEngine::new(provider);
    Arc::new(ServerResources::new(database, auth, engine))
}

/// Create a user and a valid session token for it
pub async fn create_test_user(resources: &ServerResources) -> (UserRecord, String) {
    let password_hash = AuthManager::hash_password("correct horse battery").unwrap();
    let user = resources
        .database
        .users()
        .create_user("tester@example.com", &password_hash, Some("Tester"))
        .await
        .expect("Failed to create test user");
    let token = resources
        .auth
        .generate_token(&user)
        .expect("Failed to issue token");
    (user, token)
}

/// Create a second user for cross-user scoping tests
pub async fn create_other_user(resources: &ServerResources) -> (UserRecord, String) {
    let password_hash = AuthManager::hash_password("another password").unwrap();
    let user = resources
        .database
        .users()
        .create_user("other@example.com", &password_hash, None)
        .await
        .expect("Failed to create second user");
    let token = resources
        .auth
        .generate_token(&user)
        .expect("Failed to issue token");
    (user, token)
}
