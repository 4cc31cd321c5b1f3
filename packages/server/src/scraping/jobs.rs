//! In-memory tracking of analysis jobs.
//!
//! Jobs are fire-and-forget: `start` registers the job, detaches the
//! pipeline onto the runtime, and returns the id immediately. Clients
//! poll `status`; every poll also sweeps entries older than the retention
//! window, so expiry is a side effect of reads rather than a background
//! timer. There is no cancellation - closing the connection does not stop
//! a running analysis.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::scraping::pipeline::{AnalysisPipeline, AnalysisResult};

/// Jobs older than this are removed on the next status read.
pub const JOB_RETENTION_SECS: i64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Completed,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub id: String,
    pub status: JobStatus,
    pub result: Option<AnalysisResult>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl JobRecord {
    fn processing(id: String) -> Self {
        Self {
            id,
            status: JobStatus::Processing,
            result: None,
            error: None,
            started_at: Utc::now(),
        }
    }
}

/// Storage abstraction for job state.
///
/// The in-memory map is the only implementation shipped; the trait keeps
/// the tracker independent of how sweeping is indexed.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn put(&self, job: JobRecord);
    async fn get(&self, id: &str) -> Option<JobRecord>;
    /// Move a processing job to `completed`. Terminal states are final.
    async fn complete(&self, id: &str, result: AnalysisResult);
    /// Move a processing job to `error`. Terminal states are final.
    async fn fail(&self, id: &str, message: String);
    /// Drop every job started before `cutoff`, regardless of status.
    async fn sweep(&self, cutoff: DateTime<Utc>);
}

#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: Mutex<HashMap<String, JobRecord>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn put(&self, job: JobRecord) {
        self.jobs.lock().await.insert(job.id.clone(), job);
    }

    async fn get(&self, id: &str) -> Option<JobRecord> {
        self.jobs.lock().await.get(id).cloned()
    }

    async fn complete(&self, id: &str, result: AnalysisResult) {
        let mut jobs = self.jobs.lock().await;
        if let Some(job) = jobs.get_mut(id) {
            if job.status == JobStatus::Processing {
                job.status = JobStatus::Completed;
                job.result = Some(result);
            }
        }
    }

    async fn fail(&self, id: &str, message: String) {
        let mut jobs = self.jobs.lock().await;
        if let Some(job) = jobs.get_mut(id) {
            if job.status == JobStatus::Processing {
                job.status = JobStatus::Error;
                job.error = Some(message);
            }
        }
    }

    async fn sweep(&self, cutoff: DateTime<Utc>) {
        let mut jobs = self.jobs.lock().await;
        let before = jobs.len();
        jobs.retain(|_, job| job.started_at >= cutoff);
        let swept = before - jobs.len();
        if swept > 0 {
            debug!(swept, "Swept expired jobs");
        }
    }
}

/// Registers jobs and detaches the pipeline run for each one.
pub struct JobTracker {
    store: Arc<dyn JobStore>,
    pipeline: Arc<AnalysisPipeline>,
}

impl JobTracker {
    pub fn new(store: Arc<dyn JobStore>, pipeline: Arc<AnalysisPipeline>) -> Self {
        Self { store, pipeline }
    }

    /// Register a job and kick off its analysis without awaiting it.
    pub async fn start(&self, url: String, template_id: String) -> String {
        let id = Uuid::new_v4().to_string();
        self.store.put(JobRecord::processing(id.clone())).await;
        info!(job_id = %id, url = %url, template_id = %template_id, "Analysis job started");

        let store = Arc::clone(&self.store);
        let pipeline = Arc::clone(&self.pipeline);
        let job_id = id.clone();
        let run = tokio::spawn(async move { pipeline.analyze(&url, &template_id).await });
        tokio::spawn(async move {
            // The pipeline converts its own failures into Err; a JoinError
            // (panic) still has to land the job in a terminal state.
            match run.await {
                Ok(Ok(result)) => store.complete(&job_id, result).await,
                Ok(Err(e)) => store.fail(&job_id, format!("{e:#}")).await,
                Err(e) => store.fail(&job_id, format!("analysis task failed: {e}")).await,
            }
        });

        id
    }

    /// Current state of a job; sweeps expired entries first.
    pub async fn status(&self, id: &str) -> Option<JobRecord> {
        let cutoff = Utc::now() - Duration::seconds(JOB_RETENTION_SECS);
        self.store.sweep(cutoff).await;
        self.store.get(id).await
    }
}
