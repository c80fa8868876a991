use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{prompt, RawAnalysis, VisionCaller, VisionError, MAX_IMAGES_PER_REQUEST};
use crate::models::extraction::{DocumentContent, TokenUsage};

const MODEL: &str = "gemini-2.5-flash";

/// Caller for the Gemini generateContent API.
pub struct GeminiCaller {
    http: Client,
    api_key: String,
}

impl GeminiCaller {
    pub fn new(http: Client, api_key: String) -> Self {
        Self { http, api_key }
    }
}

#[async_trait::async_trait]
impl VisionCaller for GeminiCaller {
    fn model(&self) -> &'static str {
        MODEL
    }

    async fn analyze(
        &self,
        content: &DocumentContent,
        document_name: &str,
    ) -> Result<RawAnalysis, VisionError> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{MODEL}:generateContent?key={}",
            self.api_key
        );

        let mut parts = vec![json!({
            "text": prompt::audit_prompt(document_name, content.page_count)
        })];
        for (i, image) in content
            .page_images
            .iter()
            .take(MAX_IMAGES_PER_REQUEST)
            .enumerate()
        {
            parts.push(json!({"text": format!("--- VISUAL DATA FOR PAGE {} ---", i + 1)}));
            parts.push(json!({"inline_data": {"mime_type": "image/jpeg", "data": image}}));
        }
        if !content.raw_text.is_empty() {
            parts.push(json!({
                "text": format!("EXTRACTED TEXT CONTEXT:\n{}", content.raw_text)
            }));
        }

        let response = self
            .http
            .post(&url)
            .json(&json!({"contents": [{"parts": parts}]}))
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(VisionError::RateLimited);
        }
        if !status.is_success() {
            return Err(VisionError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: GenerateContentResponse = response.json().await?;
        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| VisionError::Malformed("empty candidate list".to_string()))?;

        let usage = body.usage_metadata.unwrap_or_default();
        Ok(RawAnalysis {
            text,
            token_usage: TokenUsage {
                prompt_tokens: usage.prompt_token_count,
                output_tokens: usage.candidates_token_count,
                total_tokens: usage.total_token_count,
                model: MODEL.to_string(),
            },
        })
    }
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct UsageMetadata {
    prompt_token_count: u64,
    candidates_token_count: u64,
    total_token_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_generate_content_response() {
        let raw = r#"{
            "candidates": [{"content": {"parts": [{"text": "{\"pages\": []}"}]}}],
            "usageMetadata": {"promptTokenCount": 120, "candidatesTokenCount": 30, "totalTokenCount": 150}
        }"#;
        let body: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(body.candidates.len(), 1);
        let usage = body.usage_metadata.unwrap();
        assert_eq!(usage.total_token_count, 150);
    }

    #[test]
    fn missing_usage_defaults_to_zero() {
        let raw = r#"{"candidates": []}"#;
        let body: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert!(body.candidates.is_empty());
        assert!(body.usage_metadata.is_none());
    }
}
