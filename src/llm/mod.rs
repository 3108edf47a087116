//! Language model seam
//!
//! The pipeline only needs "text (and images) in, text out". The
//! [`LanguageModel`] trait is that seam; [`OpenAiModel`] is the production
//! implementation and tests substitute canned models.

mod openai;
pub mod prompts;

pub use openai::{OpenAiModel, API_KEY_ENV, BASE_URL_ENV};

use async_trait::async_trait;
use thiserror::Error;

/// Model call errors
#[derive(Debug, Error)]
pub enum LlmError {
    /// `OPENAI_API_KEY` is not set
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,

    /// Connection failed, timed out, or the body could not be read
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response from the API
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The response did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),
}

/// An image attached to a request
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// MIME type, e.g. `image/png`
    pub media_type: String,
    pub data: Vec<u8>,
}

impl ImageInput {
    pub fn png(data: Vec<u8>) -> Self {
        Self {
            media_type: "image/png".to_string(),
            data,
        }
    }
}

/// One completion request
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub prompt: String,
    pub images: Vec<ImageInput>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Ask the API for a JSON object response
    pub json_response: bool,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: system.into(),
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn image(mut self, image: ImageInput) -> Self {
        self.images.push(image);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn json_response(mut self) -> Self {
        self.json_response = true;
        self
    }
}

/// A hosted text-generation model
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Returns the model's text for `request`
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}
