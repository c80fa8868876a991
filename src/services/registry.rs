use std::collections::HashMap;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::job::{JobRecord, JobStatus};

/// Process-lifetime registry of extraction jobs; the single source of truth
/// for job lifecycle queried by clients.
///
/// Records are never evicted; they live until the process restarts. Known
/// limitation: a production deployment would back this with real storage
/// and an eviction policy. Writers to
/// different ids never conflict; concurrent writers to the same id are
/// unsupported (last snapshot wins).
pub struct JobRegistry {
    jobs: RwLock<HashMap<Uuid, JobRecord>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Register a freshly submitted job: `queued`, progress 0.
    pub async fn create(&self, id: Uuid, message: &str) {
        self.jobs
            .write()
            .await
            .insert(id, JobRecord::queued(id, message));
    }

    /// Snapshot of one job, or `None` for an unknown id (the status route
    /// maps that to 404, never a default record).
    pub async fn get(&self, id: Uuid) -> Option<JobRecord> {
        self.jobs.read().await.get(&id).cloned()
    }

    pub async fn count(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Move a job into a new lifecycle state.
    pub async fn set_status(&self, id: Uuid, status: JobStatus, progress: u8, message: &str) {
        self.update(id, |job| {
            job.status = status;
            job.progress = progress;
            job.message = message.to_string();
        })
        .await;
    }

    /// Update progress/message of a running job without touching its
    /// status (pipeline stages run under either `processing` or
    /// `retrying`).
    pub async fn set_stage(&self, id: Uuid, progress: u8, message: &str) {
        self.update(id, |job| {
            job.progress = progress;
            job.message = message.to_string();
        })
        .await;
    }

    /// Terminal success: attach the result, clear any previous error.
    pub async fn complete(&self, id: Uuid, result: Value) {
        self.update(id, |job| {
            job.status = JobStatus::Completed;
            job.progress = 100;
            job.message = "Success".to_string();
            job.result = Some(result);
            job.error = None;
        })
        .await;
    }

    /// Failure: record the error, drop any partial result. Terminal unless
    /// a batch retry pass picks the job up again.
    pub async fn fail(&self, id: Uuid, error: impl Into<String>) {
        self.update(id, |job| {
            job.status = JobStatus::Failed;
            job.progress = 0;
            job.message = "Job failed".to_string();
            job.result = None;
            job.error = Some(error.into());
        })
        .await;
    }

    async fn update(&self, id: Uuid, mutate: impl FnOnce(&mut JobRecord)) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(&id) {
            mutate(job);
            job.updated_at = Utc::now();
        }
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn created_jobs_start_queued() {
        tokio_test::block_on(async {
            let registry = JobRegistry::new();
            let id = Uuid::new_v4();
            registry.create(id, "Job queued").await;

            let job = registry.get(id).await.unwrap();
            assert_eq!(job.status, JobStatus::Queued);
            assert_eq!(job.progress, 0);
            assert_eq!(job.message, "Job queued");
            assert!(job.result.is_none());
            assert!(job.error.is_none());
        });
    }

    #[test]
    fn unknown_id_is_none_not_a_default_record() {
        tokio_test::block_on(async {
            let registry = JobRegistry::new();
            assert!(registry.get(Uuid::new_v4()).await.is_none());
        });
    }

    #[test]
    fn completion_writes_a_coherent_snapshot() {
        tokio_test::block_on(async {
            let registry = JobRegistry::new();
            let id = Uuid::new_v4();
            registry.create(id, "Job queued").await;
            registry.set_status(id, JobStatus::Processing, 0, "Processing").await;
            registry.set_stage(id, 50, "AI analysis").await;

            let mid = registry.get(id).await.unwrap();
            assert_eq!(mid.status, JobStatus::Processing);
            assert_eq!(mid.progress, 50);

            registry.complete(id, json!({"financials": {}})).await;
            let done = registry.get(id).await.unwrap();
            assert_eq!(done.status, JobStatus::Completed);
            assert_eq!(done.progress, 100);
            assert_eq!(done.message, "Success");
            assert!(done.result.is_some());
            assert!(done.error.is_none());
        });
    }

    #[test]
    fn failure_records_the_error_and_drops_results() {
        tokio_test::block_on(async {
            let registry = JobRegistry::new();
            let id = Uuid::new_v4();
            registry.create(id, "Job queued").await;
            registry.complete(id, json!({})).await;
            registry.fail(id, "AI analysis failed").await;

            let job = registry.get(id).await.unwrap();
            assert_eq!(job.status, JobStatus::Failed);
            assert_eq!(job.progress, 0);
            assert_eq!(job.error.as_deref(), Some("AI analysis failed"));
            assert!(job.result.is_none());
        });
    }

    #[test]
    fn updates_to_unknown_ids_are_ignored() {
        tokio_test::block_on(async {
            let registry = JobRegistry::new();
            registry.fail(Uuid::new_v4(), "nope").await;
            assert_eq!(registry.count().await, 0);
        });
    }
}
