//! Drives jobs through the extraction pipeline: content extraction, vision
//! analysis, reconciliation, registry updates.
//!
//! Batches run strictly sequentially on one logical worker (throughput is
//! traded for provider-side rate-limit safety) in two passes: every job
//! once, then one bounded retry pass over the failures. Single submissions
//! share the same pipeline and run as independent tasks.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tokio::time::sleep;

use crate::models::extraction::TokenUsage;
use crate::models::job::{JobInput, JobStatus};
use crate::services::content::{self, ContentError};
use crate::services::registry::JobRegistry;
use crate::services::vision::{self, DocumentAnalyzer, GatewayError};

/// Fixed delays between jobs; a deliberate, simple stand-in for token-bucket
/// rate limiting. Tests shrink these to zero.
#[derive(Debug, Clone)]
pub struct BatchPacing {
    /// Between consecutive jobs in pass 1.
    pub inter_job: Duration,
    /// Once, before the retry pass starts.
    pub retry_cooldown: Duration,
    /// Between consecutive retries in pass 2.
    pub retry_spacing: Duration,
}

impl Default for BatchPacing {
    fn default() -> Self {
        Self {
            inter_job: Duration::from_secs(2),
            retry_cooldown: Duration::from_secs(5),
            retry_spacing: Duration::from_secs(3),
        }
    }
}

/// Why one job's pipeline run ended in failure. Stored verbatim on the job
/// record; never escalated past it.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("content extraction failed: {0}")]
    Content(#[from] ContentError),

    #[error("document has no analyzable content")]
    EmptyDocument,

    #[error("AI analysis failed: {0}")]
    Analysis(#[from] GatewayError),

    #[error("AI response is not a JSON object after cleanup: {0}")]
    MalformedOutput(String),
}

pub struct Orchestrator {
    registry: Arc<JobRegistry>,
    analyzer: Arc<dyn DocumentAnalyzer>,
    pacing: BatchPacing,
}

impl Orchestrator {
    pub fn new(registry: Arc<JobRegistry>, analyzer: Arc<dyn DocumentAnalyzer>) -> Self {
        Self::with_pacing(registry, analyzer, BatchPacing::default())
    }

    pub fn with_pacing(
        registry: Arc<JobRegistry>,
        analyzer: Arc<dyn DocumentAnalyzer>,
        pacing: BatchPacing,
    ) -> Self {
        Self {
            registry,
            analyzer,
            pacing,
        }
    }

    /// Run one independently submitted job to its terminal state.
    pub async fn run_single(&self, job: JobInput) {
        self.registry
            .set_status(job.id, JobStatus::Processing, 0, "Processing")
            .await;
        self.process(&job).await;
    }

    /// Run a batch in submission order: pass 1 over every job, then, if
    /// anything failed, one cooldown and a retry pass over the failures in
    /// their original encounter order. A job failing twice stays `failed`;
    /// there is no third pass.
    pub async fn run_batch(&self, jobs: Vec<JobInput>) {
        let all: Vec<&JobInput> = jobs.iter().collect();
        let failed = self
            .run_pass(&all, JobStatus::Processing, self.pacing.inter_job)
            .await;

        if failed.is_empty() {
            tracing::info!(jobs = jobs.len(), "batch completed without failures");
            return;
        }

        tracing::info!(
            failed = failed.len(),
            "first pass left failures, cooling down before the retry pass"
        );
        sleep(self.pacing.retry_cooldown).await;
        metrics::counter!("extraction_jobs_retried").increment(failed.len() as u64);

        self.run_pass(&failed, JobStatus::Retrying, self.pacing.retry_spacing)
            .await;
    }

    /// The one pass driver shared by both batch passes: mark each job with
    /// the entry status, run the pipeline, collect failures, and sleep the
    /// spacing between jobs (skipped after the last).
    async fn run_pass<'a>(
        &self,
        jobs: &[&'a JobInput],
        entry_status: JobStatus,
        spacing: Duration,
    ) -> Vec<&'a JobInput> {
        let entry_message = match entry_status {
            JobStatus::Retrying => "Retrying failed job",
            _ => "Processing",
        };

        let mut failed = Vec::new();
        for (i, job) in jobs.iter().enumerate() {
            self.registry
                .set_status(job.id, entry_status.clone(), 0, entry_message)
                .await;

            if !self.process(job).await {
                failed.push(*job);
            }

            if i + 1 < jobs.len() {
                sleep(spacing).await;
            }
        }
        failed
    }

    /// Run the pipeline and record the outcome. Returns whether the job
    /// completed; every error ends up on the job record, never here.
    async fn process(&self, job: &JobInput) -> bool {
        metrics::counter!("extraction_jobs_total").increment(1);
        let start = Instant::now();

        match self.pipeline(job).await {
            Ok(result) => {
                metrics::histogram!("extraction_processing_seconds")
                    .record(start.elapsed().as_secs_f64());
                metrics::counter!("extraction_jobs_completed").increment(1);
                tracing::info!(job_id = %job.id, file = %job.file_name, "job completed");
                self.registry.complete(job.id, result).await;
                true
            }
            Err(e) => {
                metrics::counter!("extraction_jobs_failed").increment(1);
                tracing::error!(job_id = %job.id, file = %job.file_name, error = %e, "job failed");
                self.registry.fail(job.id, e.to_string()).await;
                false
            }
        }
    }

    async fn pipeline(&self, job: &JobInput) -> Result<Value, PipelineError> {
        self.registry
            .set_stage(job.id, 20, "Extracting document content")
            .await;
        let content = content::extract_content(&job.bytes, &job.file_name)?;
        if content.raw_text.trim().is_empty() && content.page_images.is_empty() {
            return Err(PipelineError::EmptyDocument);
        }

        self.registry
            .set_stage(job.id, 50, "AI analysis (vision + fraud)")
            .await;
        let analysis = self.analyzer.analyze(&content, &job.file_name).await?;

        let body = vision::parse_model_json(&analysis.text)
            .map_err(|e| PipelineError::MalformedOutput(e.to_string()))?;
        let mut result = with_token_usage(body, &analysis.token_usage)?;
        crate::services::reconcile::reconcile(&mut result);
        Ok(result)
    }
}

/// Rebuild the result object with `token_usage` as its first field; the
/// injected record wins over anything the model emitted under that key.
fn with_token_usage(body: Value, usage: &TokenUsage) -> Result<Value, PipelineError> {
    let Value::Object(rest) = body else {
        return Err(PipelineError::MalformedOutput(
            "top-level JSON value is not an object".to_string(),
        ));
    };

    let mut merged = Map::new();
    merged.insert(
        "token_usage".to_string(),
        serde_json::to_value(usage).unwrap_or(Value::Null),
    );
    for (key, value) in rest {
        if key != "token_usage" {
            merged.insert(key, value);
        }
    }
    Ok(Value::Object(merged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn token_usage_is_the_first_field() {
        let usage = TokenUsage {
            prompt_tokens: 10,
            output_tokens: 2,
            total_tokens: 12,
            model: "test-model".to_string(),
        };
        let body = json!({"file_info": {}, "financials": {}});

        let merged = with_token_usage(body, &usage).unwrap();
        let keys: Vec<&String> = merged.as_object().unwrap().keys().collect();
        assert_eq!(keys[0], "token_usage");
        assert_eq!(merged["token_usage"]["total_tokens"], 12);
    }

    #[test]
    fn non_object_output_is_rejected() {
        let usage = TokenUsage::default();
        assert!(with_token_usage(json!([1, 2, 3]), &usage).is_err());
        assert!(with_token_usage(json!("just text"), &usage).is_err());
    }
}
