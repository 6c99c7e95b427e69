//! Content generation strategies.

pub mod gemini;
pub mod mock;
pub mod prompt;

use async_trait::async_trait;

use crate::models::content::{ContentRequest, GeneratedContent};
use prompt::PromptError;

/// A provider that turns an image plus seller inputs into product copy.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Registry name of this provider.
    fn name(&self) -> &str;

    /// Generate content for `request`, returning it with the model name used.
    async fn generate_content(
        &self,
        request: &ContentRequest,
    ) -> Result<(GeneratedContent, String), GenerationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to fetch image {url}: {source}")]
    ImageFetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Image {url} is too large ({size} bytes, limit {limit})")]
    ImageTooLarge { url: String, size: usize, limit: usize },

    #[error("Resource at {0} is not a supported image")]
    UnsupportedImage(String),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error("Provider request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("Provider returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Provider returned no content (finish reason: {finish_reason})")]
    EmptyResponse { finish_reason: String },

    #[error("Failed to parse provider response as generated content: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Provider response failed schema validation: {0}")]
    Schema(#[from] garde::Report),
}
