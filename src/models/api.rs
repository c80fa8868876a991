use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Response after submitting a single document for extraction.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub job_id: Uuid,
    pub status_url: String,
}

/// One entry of a batch submission response.
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchJobRef {
    pub filename: String,
    pub job_id: Uuid,
    pub status_url: String,
}

/// Response after submitting a batch of documents.
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchSubmitResponse {
    pub batch_results: Vec<BatchJobRef>,
}
