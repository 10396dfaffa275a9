// ABOUTME: Server binary wiring configuration, database, provider, and router
// ABOUTME: Runs the Axum HTTP server with graceful shutdown on ctrl-c

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Sana Health

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use sana_server::analysis::AnalysisEngine;
use sana_server::auth::AuthManager;
use sana_server::config::ServerConfig;
use sana_server::database::Database;
use sana_server::llm::{ChatProvider, LlmProvider};
use sana_server::logging::{self, LogFormat};
use sana_server::routes::{build_router, ServerResources};

#[derive(Parser)]
#[command(name = "sana-server", about = "Symptom-analysis backend for the Sana health app")]
struct Args {
    /// HTTP port (overrides SANA_HTTP_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Database URL (overrides SANA_DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env().context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.http_port = port;
    }
    if let Some(database_url) = args.database_url {
        config.database_url = database_url;
    }

    logging::init(&config.log_level, LogFormat::from_env());

    info!(
        environment = %config.environment,
        provider = %config.llm_provider,
        port = config.http_port,
        "Starting sana-server"
    );

    let database = Database::new(&config.database_url)
        .await
        .context("Failed to initialize database")?;

    let provider = ChatProvider::from_env().context("Failed to configure LLM provider")?;
    info!(provider = provider.display_name(), model = provider.default_model(), "LLM provider ready");

    let mut engine = AnalysisEngine::new(Arc::new(provider));
    if let Some(model) = &config.llm_model {
        engine = engine.with_model(model.clone());
    }

    let auth = AuthManager::new(&config.jwt_secret);
    let resources = Arc::new(ServerResources::new(database, auth, engine));
    let router = build_router(resources);

    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Listening on {addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::error!("Failed to install ctrl-c handler");
    }
}
