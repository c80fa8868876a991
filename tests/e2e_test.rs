//! End-to-end test against a running server with real provider credentials.
//!
//! Requires the server started separately (`cargo run`) and at least one
//! provider API key configured. Run with:
//! `cargo test --test e2e_test -- --ignored`

use std::time::Duration;

use tokio::time::sleep;

use invoice_audit::models::api::SubmitResponse;
use invoice_audit::models::job::{JobRecord, JobStatus};

/// Minimal 1x1 transparent PNG; enough for the upload path, and a valid
/// (if boring) document for the vision call.
const TEST_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

fn base_url() -> String {
    std::env::var("INVOICE_AUDIT_URL").unwrap_or_else(|_| "http://127.0.0.1:8000".to_string())
}

#[tokio::test]
#[ignore] // Run with: cargo test --test e2e_test -- --ignored
async fn test_full_extraction_flow() {
    let client = reqwest::Client::new();
    let base = base_url();

    // 1. Health check
    let health = client
        .get(format!("{base}/health"))
        .send()
        .await
        .expect("Server not reachable");
    assert!(
        health.status().is_success(),
        "Server degraded; are provider keys configured?"
    );

    // 2. Submit one document
    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(TEST_PNG.to_vec()).file_name("e2e_test.png"),
    );
    let submit: SubmitResponse = client
        .post(format!("{base}/api/v1/extract"))
        .multipart(form)
        .send()
        .await
        .expect("Submit request failed")
        .json()
        .await
        .expect("Submit response not parseable");

    // 3. Poll until terminal
    let mut record: JobRecord;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(180);
    loop {
        record = client
            .get(format!("{base}{}", submit.status_url))
            .send()
            .await
            .expect("Status request failed")
            .json()
            .await
            .expect("Status response not parseable");

        if record.status.is_terminal() {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "Job did not finish in time (last: {:?} {}%)",
            record.status,
            record.progress
        );
        sleep(Duration::from_secs(2)).await;
    }

    // 4. A completed job carries a reconciled result with token accounting
    assert_eq!(
        record.status,
        JobStatus::Completed,
        "Job failed: {:?}",
        record.error
    );
    let result = record.result.expect("Completed job without result");
    assert!(result.get("token_usage").is_some());
    assert!(result["financials"].get("calculated_total").is_some());
    assert!(result["fraud_analysis"].get("math_mismatch_detected").is_some());

    // 5. Unknown ids are a 404, never a default record
    let missing = client
        .get(format!("{base}/api/v1/status/{}", uuid::Uuid::new_v4()))
        .send()
        .await
        .expect("Status request failed");
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
}
