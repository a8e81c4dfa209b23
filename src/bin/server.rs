//! med-crew HTTP server binary.
//!
//! Starts an axum HTTP server that queues meditation-session generation jobs
//! and streams their progress.
//!
//! # Environment Variables
//!
//! - `PORT` — HTTP port (default: 8080)
//! - `MEDCREW_MODEL` — model identifier (default: gpt-4o-mini)
//! - `OPENAI_API_KEY` — API key for the model provider
//! - `OPENAI_BASE_URL` — alternate OpenAI-compatible endpoint
//! - `MEDCREW_AGENTS_CONFIG` / `MEDCREW_TASKS_CONFIG` — YAML config paths
//!   (default: the definitions baked into the binary)
//! - `RUST_LOG` — tracing filter (default: "info")
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin server
//! ```

use std::sync::Arc;

use medcrew::llm::OpenAICompletion;
use medcrew::project::CrewConfig;
use medcrew::server::{app_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,medcrew=debug".into()),
        )
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let bind_addr = format!("0.0.0.0:{port}");

    let llm = Arc::new(OpenAICompletion::from_env());
    let mut state = AppState::new(llm);

    if let (Ok(agents_path), Ok(tasks_path)) = (
        std::env::var("MEDCREW_AGENTS_CONFIG"),
        std::env::var("MEDCREW_TASKS_CONFIG"),
    ) {
        tracing::info!("loading crew config from {agents_path} and {tasks_path}");
        state = state.with_config(CrewConfig::from_files(&agents_path, &tasks_path)?);
    }

    let app = app_router(state);

    tracing::info!("med-crew server starting on {bind_addr}");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                 — liveness probe");
    tracing::info!("  POST /generate               — queue a generation job");
    tracing::info!("  GET  /status/:job_id         — job status");
    tracing::info!("  GET  /status/stream/:job_id  — SSE progress stream");
    tracing::info!("  GET  /result/:job_id         — finished session document");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
