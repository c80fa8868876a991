//! Extraction gateway: "ask some AI provider to analyze this document".
//!
//! One credential is drawn from the pool per job; the matching provider
//! caller performs the wire call. The retry shell lives here, shared by all
//! providers: fixed-interval backoff, bounded attempts. Fixed intervals
//! (rather than exponential backoff) are adequate at this concurrency since
//! the orchestrator already spaces jobs out.

mod anthropic;
mod gemini;
mod openai;
mod prompt;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::models::extraction::{DocumentContent, TokenUsage};
use crate::services::credentials::{CredentialEntry, CredentialPool, Provider};

/// Providers accept at most this many page images per request.
pub const MAX_IMAGES_PER_REQUEST: usize = 5;

/// Attempt budget for one analysis call (initial attempt included).
const MAX_ATTEMPTS: usize = 3;

/// Backoff after a rate-limit signal.
const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(5);

/// Backoff after a transport-level failure or an unusable response body.
const TRANSPORT_BACKOFF: Duration = Duration::from_secs(2);

/// Raw model output plus the provider's token accounting.
#[derive(Debug, Clone)]
pub struct RawAnalysis {
    pub text: String,
    pub token_usage: TokenUsage,
}

/// Error from one provider wire call.
#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("provider rate limit hit")]
    RateLimited,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("provider response missing expected fields: {0}")]
    Malformed(String),
}

impl VisionError {
    /// How long to sleep before retrying, or `None` if the error is
    /// non-retryable. Timeouts surface as `Transport` and are retried on
    /// the short interval.
    fn backoff(&self) -> Option<Duration> {
        match self {
            VisionError::RateLimited => Some(RATE_LIMIT_BACKOFF),
            VisionError::Transport(_) | VisionError::Malformed(_) => Some(TRANSPORT_BACKOFF),
            VisionError::Api { .. } => None,
        }
    }
}

/// Terminal outcome of an analysis request, surfaced as the job's failure.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("no vision provider configured; set GEMINI_API_KEY, OPENAI_API_KEY, or ANTHROPIC_API_KEY")]
    NoCredentials,

    #[error("provider call failed: {0}")]
    Provider(VisionError),

    #[error("provider call failed after {attempts} attempts: {last}")]
    Exhausted { attempts: usize, last: VisionError },
}

/// One provider-specific wire caller.
#[async_trait]
pub trait VisionCaller: Send + Sync {
    /// Model identifier, for logging and token accounting.
    fn model(&self) -> &'static str;

    async fn analyze(
        &self,
        content: &DocumentContent,
        document_name: &str,
    ) -> Result<RawAnalysis, VisionError>;
}

/// The seam the orchestrator depends on. `ExtractionGateway` is the
/// production implementation; tests substitute scripted analyzers.
#[async_trait]
pub trait DocumentAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        content: &DocumentContent,
        document_name: &str,
    ) -> Result<RawAnalysis, GatewayError>;
}

/// Routes each analysis request to the next pooled credential's provider.
pub struct ExtractionGateway {
    credentials: Arc<CredentialPool>,
    http: reqwest::Client,
}

impl ExtractionGateway {
    /// `timeout` bounds each provider network call (120 s in production
    /// configuration); hitting it fails that attempt, not the whole job.
    pub fn new(credentials: Arc<CredentialPool>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { credentials, http })
    }

    fn caller_for(&self, entry: &CredentialEntry) -> Box<dyn VisionCaller> {
        match entry.provider {
            Provider::Gemini => Box::new(gemini::GeminiCaller::new(
                self.http.clone(),
                entry.api_key.clone(),
            )),
            Provider::OpenAi => Box::new(openai::OpenAiCaller::new(
                self.http.clone(),
                entry.api_key.clone(),
            )),
            Provider::Anthropic => Box::new(anthropic::AnthropicCaller::new(
                self.http.clone(),
                entry.api_key.clone(),
            )),
        }
    }
}

#[async_trait]
impl DocumentAnalyzer for ExtractionGateway {
    async fn analyze(
        &self,
        content: &DocumentContent,
        document_name: &str,
    ) -> Result<RawAnalysis, GatewayError> {
        let entry = self
            .credentials
            .next_credential()
            .ok_or(GatewayError::NoCredentials)?;
        let caller = self.caller_for(&entry);

        tracing::info!(
            provider = %entry.provider,
            model = caller.model(),
            document = document_name,
            pages = content.page_count,
            "dispatching vision analysis"
        );

        let mut attempt = 1;
        loop {
            match caller.analyze(content, document_name).await {
                Ok(raw) => return Ok(raw),
                Err(err) => match err.backoff() {
                    None => return Err(GatewayError::Provider(err)),
                    Some(_) if attempt >= MAX_ATTEMPTS => {
                        return Err(GatewayError::Exhausted {
                            attempts: MAX_ATTEMPTS,
                            last: err,
                        });
                    }
                    Some(delay) => {
                        tracing::warn!(
                            provider = %entry.provider,
                            document = document_name,
                            attempt,
                            error = %err,
                            "provider call failed, backing off"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                },
            }
        }
    }
}

/// Clean a model response into parseable JSON: strip markdown fences, then
/// slice from the first `{` to the last `}` to drop surrounding prose.
pub fn parse_model_json(raw: &str) -> Result<Value, serde_json::Error> {
    let cleaned = raw.replace("```json", "").replace("```", "");
    let cleaned = match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if start < end => &cleaned[start..=end],
        _ => cleaned.as_str(),
    };
    serde_json::from_str(cleaned.trim())
}
