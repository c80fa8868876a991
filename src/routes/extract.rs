use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::api::{BatchJobRef, BatchSubmitResponse, SubmitResponse};
use crate::models::job::{JobInput, JobRecord};

fn status_url(job_id: Uuid) -> String {
    format!("/api/v1/status/{job_id}")
}

/// POST /api/v1/extract — upload one document for extraction.
///
/// Returns the job id immediately; the pipeline runs as a background task
/// and reports only through the registry.
pub async fn submit_extraction(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SubmitResponse>, StatusCode> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        if field.name() == Some("file") {
            let file_name = field.file_name().unwrap_or_default().to_string();
            if file_name.is_empty() {
                return Err(StatusCode::BAD_REQUEST);
            }
            let data = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
            upload = Some((file_name, data.to_vec()));
        }
    }

    let (file_name, bytes) = upload.ok_or(StatusCode::BAD_REQUEST)?;

    let job_id = Uuid::new_v4();
    state.registry.create(job_id, "Job queued").await;

    tracing::info!(job_id = %job_id, file = %file_name, "document submitted");

    let orchestrator = state.orchestrator.clone();
    let job = JobInput {
        id: job_id,
        file_name,
        bytes,
    };
    tokio::spawn(async move { orchestrator.run_single(job).await });

    Ok(Json(SubmitResponse {
        job_id,
        status_url: status_url(job_id),
    }))
}

/// POST /api/v1/batch-extract — upload multiple documents as one batch.
///
/// Creates one job per file, schedules a single two-pass orchestration run
/// over all of them, and returns the job ids without waiting.
pub async fn submit_batch(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<BatchSubmitResponse>, StatusCode> {
    let mut jobs = Vec::new();
    let mut batch_results = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        if field.name() != Some("files") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        if file_name.is_empty() {
            // Nameless parts are skipped, not fatal to the batch.
            continue;
        }
        let data = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;

        let job_id = Uuid::new_v4();
        state
            .registry
            .create(job_id, "Job queued for batch processing")
            .await;

        batch_results.push(BatchJobRef {
            filename: file_name.clone(),
            job_id,
            status_url: status_url(job_id),
        });
        jobs.push(JobInput {
            id: job_id,
            file_name,
            bytes: data.to_vec(),
        });
    }

    if jobs.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    tracing::info!(jobs = jobs.len(), "batch submitted");

    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move { orchestrator.run_batch(jobs).await });

    Ok(Json(BatchSubmitResponse { batch_results }))
}

/// GET /api/v1/status/{job_id} — full job record; unknown id → 404.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobRecord>, StatusCode> {
    state
        .registry
        .get(job_id)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}
