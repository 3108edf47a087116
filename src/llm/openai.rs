//! OpenAI-compatible chat-completions client

use super::{CompletionRequest, LanguageModel, LlmError};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable overriding the API base URL
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Chat-completions client for OpenAI and compatible endpoints
#[derive(Clone)]
pub struct OpenAiModel {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for OpenAiModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiModel")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenAiModel {
    /// Creates a client for `base_url` (e.g. `https://api.openai.com/v1`)
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self, LlmError> {
        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Creates a client from `OPENAI_API_KEY`, honoring `OPENAI_BASE_URL`
    ///
    /// Fails with [`LlmError::MissingApiKey`] before any request is made when
    /// the key is unset or empty.
    pub fn from_env(default_base_url: &str) -> Result<Self, LlmError> {
        Self::resolve(
            std::env::var(API_KEY_ENV).ok(),
            std::env::var(BASE_URL_ENV).ok(),
            default_base_url,
        )
    }

    fn resolve(
        api_key: Option<String>,
        base_url: Option<String>,
        default_base_url: &str,
    ) -> Result<Self, LlmError> {
        let api_key = api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or(LlmError::MissingApiKey)?;
        let base_url = base_url
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| default_base_url.to_string());
        Self::new(api_key, base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request_body(request: &CompletionRequest) -> Value {
        let user_content = if request.images.is_empty() {
            Value::String(request.prompt.clone())
        } else {
            let mut parts = vec![json!({ "type": "text", "text": request.prompt })];
            for image in &request.images {
                let data_url = format!(
                    "data:{};base64,{}",
                    image.media_type,
                    STANDARD.encode(&image.data)
                );
                parts.push(json!({
                    "type": "image_url",
                    "image_url": { "url": data_url, "detail": "high" }
                }));
            }
            Value::Array(parts)
        };

        let mut body = json!({
            "model": request.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": user_content }
            ]
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }
        if request.json_response {
            body["response_format"] = json!({ "type": "json_object" });
        }
        body
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponseRaw {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let start = Instant::now();

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&Self::request_body(request))
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Model request failed");
                LlmError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "Model API error");
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let raw: ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        let content = raw
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::Parse("response contained no message content".into()))?;

        tracing::debug!(
            model = %request.model,
            images = request.images.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Model completion"
        );

        Ok(content)
    }
}
