//! Axum route handlers for the med-crew HTTP server.
//!
//! # Routes
//!
//! - `GET  /health`                — liveness probe
//! - `POST /generate`              — queue a session-generation job
//! - `GET  /status/:job_id`        — job status snapshot
//! - `GET  /status/stream/:job_id` — SSE progress stream with keep-alive
//! - `GET  /result/:job_id`        — finished session document

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde::Serialize;
use serde_json::Value;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::crew::{GenerationRequest, MeditationCrew};
use crate::llm::BaseLLM;
use crate::project::CrewConfig;
use crate::server::jobs::{JobRegistry, JobStatus};

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<JobRegistry>,
    pub config: CrewConfig,
    pub llm: Arc<dyn BaseLLM>,
}

impl AppState {
    /// State over the embedded crew configuration.
    pub fn new(llm: Arc<dyn BaseLLM>) -> Self {
        Self {
            registry: Arc::new(JobRegistry::new()),
            config: CrewConfig::embedded().clone(),
            llm,
        }
    }

    pub fn with_config(mut self, config: CrewConfig) -> Self {
        self.config = config;
        self
    }
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/generate", post(generate_handler))
        .route("/status/:job_id", get(status_handler))
        .route("/status/stream/:job_id", get(stream_status_handler))
        .route("/result/:job_id", get(result_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn not_found(message: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"error": message})),
    )
}

/// GET /health — liveness probe.
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
        "service": "med-crew",
    }))
}

#[derive(Debug, Serialize)]
struct JobTicket {
    job_id: Uuid,
    status: JobStatus,
}

/// POST /generate — queue a generation job and return its ticket.
async fn generate_handler(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> impl IntoResponse {
    let job_id = state.registry.create();
    tracing::info!(
        %job_id,
        theme = %request.theme,
        duration = request.duration,
        difficulty = %request.difficulty,
        "generation job queued"
    );

    tokio::spawn(run_generation_job(state.clone(), job_id, request));

    (
        StatusCode::ACCEPTED,
        Json(JobTicket {
            job_id,
            status: JobStatus::Queued,
        }),
    )
}

/// Background execution of one generation job.
async fn run_generation_job(state: AppState, job_id: Uuid, request: GenerationRequest) {
    state.registry.start(job_id);

    let registry = Arc::clone(&state.registry);
    let crew = MeditationCrew::new(state.config.clone(), Arc::clone(&state.llm))
        .with_step_callback(move |event| registry.apply_event(job_id, event));

    match crew.kickoff(&request).await {
        Ok(output) => {
            tracing::info!(%job_id, "generation job completed");
            state.registry.complete(job_id, output.session);
        }
        Err(error) => {
            tracing::error!(%job_id, %error, "generation job failed");
            state.registry.fail(job_id, error.to_string());
        }
    }
}

/// GET /status/:job_id — status snapshot.
async fn status_handler(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, Json<Value>)> {
    state
        .registry
        .status(job_id)
        .map(Json)
        .ok_or_else(|| not_found("Job not found"))
}

/// GET /status/stream/:job_id — SSE progress stream.
///
/// Emits the current progress immediately, then one event per change until
/// the job reaches a terminal state; keep-alive comments flow every few
/// seconds so idle connections stay open.
async fn stream_status_handler(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, Json<Value>)> {
    let receiver = state
        .registry
        .subscribe(job_id)
        .ok_or_else(|| not_found("Job not found"))?;

    let stream = futures::stream::unfold(
        (Some(receiver), true),
        |(receiver, first)| async move {
            let mut receiver = receiver?;
            if !first && receiver.changed().await.is_err() {
                return None;
            }
            let progress = receiver.borrow_and_update().clone();
            let terminal = progress.status.is_terminal();
            let event = Event::default().json_data(&progress).ok()?;
            let next = if terminal { None } else { Some(receiver) };
            Some((Ok::<_, Infallible>(event), (next, false)))
        },
    );

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(5))
            .text("heartbeat"),
    ))
}

/// GET /result/:job_id — the finished session document.
async fn result_handler(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, Json<Value>)> {
    match state.registry.result(job_id) {
        Some(Some(document)) => Ok(Json(document)),
        Some(None) => Err(not_found("Result not found or not ready yet")),
        None => Err(not_found("Job not found")),
    }
}
