use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{prompt, RawAnalysis, VisionCaller, VisionError, MAX_IMAGES_PER_REQUEST};
use crate::models::extraction::{DocumentContent, TokenUsage};

const MODEL: &str = "claude-3-5-sonnet-20240620";
const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4000;

/// Caller for the Anthropic Messages API with vision content.
pub struct AnthropicCaller {
    http: Client,
    api_key: String,
}

impl AnthropicCaller {
    pub fn new(http: Client, api_key: String) -> Self {
        Self { http, api_key }
    }
}

#[async_trait::async_trait]
impl VisionCaller for AnthropicCaller {
    fn model(&self) -> &'static str {
        MODEL
    }

    async fn analyze(
        &self,
        content: &DocumentContent,
        document_name: &str,
    ) -> Result<RawAnalysis, VisionError> {
        let mut blocks: Vec<serde_json::Value> = content
            .page_images
            .iter()
            .take(MAX_IMAGES_PER_REQUEST)
            .map(|image| {
                json!({
                    "type": "image",
                    "source": {"type": "base64", "media_type": "image/jpeg", "data": image}
                })
            })
            .collect();

        let mut text = prompt::audit_prompt(document_name, content.page_count);
        if !content.raw_text.is_empty() {
            text.push_str(&format!("\n\nTEXT CONTEXT:\n{}", content.raw_text));
        }
        blocks.push(json!({"type": "text", "text": text}));

        let request = json!({
            "model": MODEL,
            "max_tokens": MAX_TOKENS,
            "messages": [{"role": "user", "content": blocks}]
        });

        let response = self
            .http
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
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

        let body: MessagesResponse = response.json().await?;
        let text = body
            .content
            .into_iter()
            .next()
            .map(|b| b.text)
            .ok_or_else(|| VisionError::Malformed("empty content list".to_string()))?;

        let usage = body.usage.unwrap_or_default();
        Ok(RawAnalysis {
            text,
            token_usage: TokenUsage {
                prompt_tokens: usage.input_tokens,
                output_tokens: usage.output_tokens,
                total_tokens: usage.input_tokens + usage.output_tokens,
                model: MODEL.to_string(),
            },
        })
    }
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_messages_response() {
        let raw = r#"{
            "content": [{"type": "text", "text": "{\"header\": {}}"}],
            "usage": {"input_tokens": 2048, "output_tokens": 512}
        }"#;
        let body: MessagesResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(body.content[0].text, "{\"header\": {}}");
        let usage = body.usage.unwrap();
        assert_eq!(usage.input_tokens + usage.output_tokens, 2560);
    }
}
