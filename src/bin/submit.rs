//! CLI batch submitter: uploads documents to a running invoice-audit
//! server, waits for the jobs to finish, and writes one standalone
//! `result_<name>.json` per completed document.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

use invoice_audit::models::api::BatchSubmitResponse;
use invoice_audit::models::job::{JobRecord, JobStatus};

const POLL_INTERVAL: Duration = Duration::from_secs(2);
const POLL_TIMEOUT: Duration = Duration::from_secs(300);
const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "jpg", "jpeg", "png"];

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("Usage: submit <file-or-directory>...");
        std::process::exit(2);
    }

    let base_url = std::env::var("INVOICE_AUDIT_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string());

    let files = collect_files(&args);
    if files.is_empty() {
        tracing::error!("No input files found");
        std::process::exit(1);
    }
    tracing::info!(count = files.len(), server = %base_url, "Submitting documents");

    let client = reqwest::Client::new();
    if let Err(e) = run(&client, &base_url, &files).await {
        tracing::error!(error = %e, "Batch submission failed");
        std::process::exit(1);
    }
    tracing::info!("Batch processing complete");
}

/// Expand file and directory arguments into the list of documents to
/// submit. Directories are scanned one level deep for supported extensions.
fn collect_files(inputs: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        let path = Path::new(input);
        if path.is_dir() {
            if let Ok(entries) = std::fs::read_dir(path) {
                let mut found: Vec<PathBuf> = entries
                    .flatten()
                    .map(|entry| entry.path())
                    .filter(|p| is_supported(p))
                    .collect();
                found.sort();
                files.extend(found);
            }
        } else if path.is_file() {
            files.push(path.to_path_buf());
        } else {
            tracing::warn!(input = %input, "Skipping missing input");
        }
    }
    files
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

async fn run(
    client: &reqwest::Client,
    base_url: &str,
    files: &[PathBuf],
) -> Result<(), Box<dyn std::error::Error>> {
    // One batch submission for everything; the server paces and retries.
    let mut form = reqwest::multipart::Form::new();
    for file in files {
        let bytes = std::fs::read(file)?;
        let name = file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document")
            .to_string();
        form = form.part(
            "files",
            reqwest::multipart::Part::bytes(bytes).file_name(name),
        );
    }

    let batch: BatchSubmitResponse = client
        .post(format!("{base_url}/api/v1/batch-extract"))
        .multipart(form)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    for job in &batch.batch_results {
        let record = poll_until_terminal(client, base_url, job.job_id).await?;
        match record.status {
            JobStatus::Completed => {
                let Some(result) = &record.result else {
                    tracing::warn!(file = %job.filename, "Completed job carried no result");
                    continue;
                };
                let output = format!("result_{}.json", job.filename);
                std::fs::write(&output, serde_json::to_string_pretty(result)?)?;

                let risk = result
                    .get("fraud_analysis")
                    .and_then(|f| f.get("risk_level"))
                    .and_then(|r| r.as_str())
                    .unwrap_or("UNKNOWN");
                tracing::info!(file = %job.filename, output = %output, risk, "Extraction saved");
            }
            _ => {
                tracing::warn!(
                    file = %job.filename,
                    error = record.error.as_deref().unwrap_or("unknown"),
                    "Extraction failed"
                );
            }
        }
    }
    Ok(())
}

async fn poll_until_terminal(
    client: &reqwest::Client,
    base_url: &str,
    job_id: uuid::Uuid,
) -> Result<JobRecord, Box<dyn std::error::Error>> {
    let deadline = tokio::time::Instant::now() + POLL_TIMEOUT;
    loop {
        let record: JobRecord = client
            .get(format!("{base_url}/api/v1/status/{job_id}"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if record.status.is_terminal() {
            return Ok(record);
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(format!("timed out waiting for job {job_id}").into());
        }
        sleep(POLL_INTERVAL).await;
    }
}
