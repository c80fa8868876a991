use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{prompt, RawAnalysis, VisionCaller, VisionError, MAX_IMAGES_PER_REQUEST};
use crate::models::extraction::{DocumentContent, TokenUsage};

const MODEL: &str = "gpt-4o";
const API_URL: &str = "https://api.openai.com/v1/chat/completions";
const MAX_TOKENS: u32 = 4000;

/// Caller for the OpenAI Chat Completions API with vision content.
pub struct OpenAiCaller {
    http: Client,
    api_key: String,
}

impl OpenAiCaller {
    pub fn new(http: Client, api_key: String) -> Self {
        Self { http, api_key }
    }
}

#[async_trait::async_trait]
impl VisionCaller for OpenAiCaller {
    fn model(&self) -> &'static str {
        MODEL
    }

    async fn analyze(
        &self,
        content: &DocumentContent,
        document_name: &str,
    ) -> Result<RawAnalysis, VisionError> {
        let mut user_content = vec![json!({
            "type": "text",
            "text": prompt::audit_prompt(document_name, content.page_count)
        })];
        for (i, image) in content
            .page_images
            .iter()
            .take(MAX_IMAGES_PER_REQUEST)
            .enumerate()
        {
            user_content.push(json!({"type": "text", "text": format!("--- PAGE {} ---", i + 1)}));
            user_content.push(json!({
                "type": "image_url",
                "image_url": {"url": format!("data:image/jpeg;base64,{image}")}
            }));
        }
        if !content.raw_text.is_empty() {
            user_content.push(json!({
                "type": "text",
                "text": format!("TEXT CONTEXT:\n{}", content.raw_text)
            }));
        }

        let request = json!({
            "model": MODEL,
            "messages": [
                {"role": "system", "content": "You are a JSON-only extraction API."},
                {"role": "user", "content": user_content}
            ],
            "response_format": {"type": "json_object"},
            "max_tokens": MAX_TOKENS
        });

        let response = self
            .http
            .post(API_URL)
            .bearer_auth(&self.api_key)
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

        let body: ChatCompletionResponse = response.json().await?;
        let text = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| VisionError::Malformed("empty choice list".to_string()))?;

        let usage = body.usage.unwrap_or_default();
        Ok(RawAnalysis {
            text,
            token_usage: TokenUsage {
                prompt_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
                model: MODEL.to_string(),
            },
        })
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: u64,
}
