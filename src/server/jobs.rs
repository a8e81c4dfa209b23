//! In-memory registry of generation jobs.
//!
//! Jobs live only for the lifetime of the process: persistence of finished
//! sessions is the caller's responsibility. Each job carries a watch channel
//! so status streams see progress without polling.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::watch;
use uuid::Uuid;

use crate::events::{GenerationEvent, Stage};
use crate::models::SessionDocument;

/// Lifecycle state of a generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Progress snapshot pushed to status-stream subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct JobProgress {
    pub job_id: Uuid,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobProgress {
    fn queued(job_id: Uuid) -> Self {
        Self {
            job_id,
            status: JobStatus::Queued,
            stage: None,
            agent: None,
            message: None,
            error: None,
        }
    }
}

/// Point-in-time view of a job returned by the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatusView {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

struct JobEntry {
    status: JobStatus,
    created_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    error: Option<String>,
    result: Option<SessionDocument>,
    sender: watch::Sender<JobProgress>,
}

/// Thread-safe, in-memory job registry.
#[derive(Default)]
pub struct JobRegistry {
    jobs: DashMap<Uuid, JobEntry>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new queued job and return its id.
    pub fn create(&self) -> Uuid {
        let job_id = Uuid::new_v4();
        let (sender, _) = watch::channel(JobProgress::queued(job_id));
        self.jobs.insert(
            job_id,
            JobEntry {
                status: JobStatus::Queued,
                created_at: Utc::now(),
                finished_at: None,
                error: None,
                result: None,
                sender,
            },
        );
        job_id
    }

    /// Mark a job as running.
    pub fn start(&self, job_id: Uuid) {
        if let Some(mut entry) = self.jobs.get_mut(&job_id) {
            entry.status = JobStatus::Running;
            entry.sender.send_modify(|progress| {
                progress.status = JobStatus::Running;
            });
        }
    }

    /// Fold a crew progress event into the job's streamed progress.
    pub fn apply_event(&self, job_id: Uuid, event: &GenerationEvent) {
        let Some(entry) = self.jobs.get(&job_id) else {
            return;
        };
        entry.sender.send_modify(|progress| match event {
            GenerationEvent::StageStarted { stage, agent, .. } => {
                progress.status = JobStatus::Running;
                progress.stage = Some(*stage);
                progress.agent = Some(agent.clone());
                progress.message = Some(format!("{stage} stage started"));
            }
            GenerationEvent::StageCompleted { stage, agent, .. } => {
                progress.stage = Some(*stage);
                progress.agent = Some(agent.clone());
                progress.message = Some(format!("{stage} stage completed"));
            }
            GenerationEvent::ValidationRejected {
                stage,
                attempt,
                error,
                ..
            } => {
                progress.stage = Some(*stage);
                progress.message = Some(format!(
                    "{stage} stage attempt {attempt} rejected: {error}"
                ));
            }
            // Terminal events are folded in by complete()/fail(), which also
            // attach the result or error.
            GenerationEvent::PipelineCompleted { .. }
            | GenerationEvent::PipelineFailed { .. } => {}
        });
    }

    /// Record a successful result and close out the job.
    pub fn complete(&self, job_id: Uuid, result: SessionDocument) {
        if let Some(mut entry) = self.jobs.get_mut(&job_id) {
            entry.status = JobStatus::Completed;
            entry.finished_at = Some(Utc::now());
            entry.result = Some(result);
            entry.sender.send_modify(|progress| {
                progress.status = JobStatus::Completed;
                progress.message = Some("session generated".to_string());
                progress.error = None;
            });
        }
    }

    /// Record a failure and close out the job.
    pub fn fail(&self, job_id: Uuid, error: String) {
        if let Some(mut entry) = self.jobs.get_mut(&job_id) {
            entry.status = JobStatus::Failed;
            entry.finished_at = Some(Utc::now());
            entry.error = Some(error.clone());
            entry.sender.send_modify(|progress| {
                progress.status = JobStatus::Failed;
                progress.error = Some(error.clone());
            });
        }
    }

    /// Status snapshot, or `None` for an unknown job.
    pub fn status(&self, job_id: Uuid) -> Option<JobStatusView> {
        self.jobs.get(&job_id).map(|entry| JobStatusView {
            job_id,
            status: entry.status,
            created_at: entry.created_at,
            finished_at: entry.finished_at,
            error: entry.error.clone(),
        })
    }

    /// Finished session for a job.
    ///
    /// `None` for an unknown job; `Some(None)` when the job exists but has
    /// not completed.
    pub fn result(&self, job_id: Uuid) -> Option<Option<SessionDocument>> {
        self.jobs
            .get(&job_id)
            .map(|entry| entry.result.clone())
    }

    /// Subscribe to a job's progress stream.
    pub fn subscribe(&self, job_id: Uuid) -> Option<watch::Receiver<JobProgress>> {
        self.jobs.get(&job_id).map(|entry| entry.sender.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_lifecycle() {
        let registry = JobRegistry::new();
        let job_id = registry.create();
        assert_eq!(registry.status(job_id).unwrap().status, JobStatus::Queued);

        registry.start(job_id);
        registry.apply_event(job_id, &GenerationEvent::stage_started(Stage::Design));
        assert_eq!(registry.status(job_id).unwrap().status, JobStatus::Running);

        registry.fail(job_id, "model unavailable".to_string());
        let view = registry.status(job_id).unwrap();
        assert_eq!(view.status, JobStatus::Failed);
        assert_eq!(view.error.as_deref(), Some("model unavailable"));
        assert!(view.finished_at.is_some());
    }

    #[test]
    fn test_unknown_job_is_none() {
        let registry = JobRegistry::new();
        assert!(registry.status(Uuid::new_v4()).is_none());
        assert!(registry.result(Uuid::new_v4()).is_none());
        assert!(registry.subscribe(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_subscriber_sees_progress() {
        let registry = JobRegistry::new();
        let job_id = registry.create();
        let rx = registry.subscribe(job_id).unwrap();
        assert_eq!(rx.borrow().status, JobStatus::Queued);

        registry.apply_event(job_id, &GenerationEvent::stage_started(Stage::Content));
        let progress = rx.borrow();
        assert_eq!(progress.stage, Some(Stage::Content));
        assert_eq!(progress.agent.as_deref(), Some("content_creator"));
    }
}
