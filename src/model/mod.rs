//! Vision/language model capability
//!
//! The rest of the service only sees [`VisionModel`]: identify the main object
//! in an image, and answer a question about a known object given its image.
//! [`OpenAiVisionClient`] reaches a hosted OpenAI-compatible API;
//! [`ScriptedModel`] is an in-process stand-in.

pub mod image;
pub mod openai;
pub mod prompts;
pub mod scripted;

use async_trait::async_trait;

pub use image::ImageData;
pub use openai::OpenAiVisionClient;
pub use scripted::{ModelCall, Reply, ScriptedModel};

#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Short identification of the main object in `image`
    async fn describe(&self, image: &ImageData) -> Result<String, ModelError>;

    /// Short answer to `question` about `label`, grounded on `image`
    async fn answer(
        &self,
        label: &str,
        image: &ImageData,
        question: &str,
    ) -> Result<String, ModelError>;
}

/// Model call failures, split by cause
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("No API key configured for the model client")]
    MissingCredential,

    #[error("Client build failed: {0}")]
    Build(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Request failed: {0}")]
    Network(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Upstream error: status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ModelError {
    /// Whether the same call could plausibly succeed later. Reported, never acted on.
    pub fn is_retryable(&self) -> bool {
        match self {
            ModelError::Timeout(_) | ModelError::Network(_) | ModelError::RateLimited(_) => true,
            ModelError::Upstream { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ModelError::MissingCredential => "missing_credential",
            ModelError::Build(_) => "build",
            ModelError::Timeout(_) => "timeout",
            ModelError::Network(_) => "network",
            ModelError::Unauthorized(_) => "unauthorized",
            ModelError::RateLimited(_) => "rate_limited",
            ModelError::Upstream { .. } => "upstream",
            ModelError::InvalidResponse(_) => "invalid_response",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ModelError::Timeout("slow".into()).is_retryable());
        assert!(ModelError::RateLimited("429".into()).is_retryable());
        assert!(ModelError::Upstream { status: 503, body: String::new() }.is_retryable());
        assert!(!ModelError::Upstream { status: 400, body: String::new() }.is_retryable());
        assert!(!ModelError::Unauthorized("bad key".into()).is_retryable());
        assert!(!ModelError::InvalidResponse("no choices".into()).is_retryable());
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(ModelError::MissingCredential.kind(), "missing_credential");
        assert_eq!(ModelError::Upstream { status: 500, body: String::new() }.kind(), "upstream");
    }
}
