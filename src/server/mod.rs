//! HTTP surface: job submission, status polling, SSE progress, results.

pub mod jobs;
pub mod routes;

pub use jobs::{JobProgress, JobRegistry, JobStatus};
pub use routes::{app_router, AppState};
