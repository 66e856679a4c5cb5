//! OpenAI-compatible chat completions client with image input

use super::image::ImageData;
use super::prompts::{qa_system_prompt, DETECT_PROMPT};
use super::{ModelError, VisionModel};
use crate::config::ModelConfig;
use crate::metrics::METRICS;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

/// Vision model reached over HTTP. Makes exactly one request per call; no retries.
pub struct OpenAiVisionClient {
    http: Client,
    endpoint: String,
    api_key: SecretString,
    model: String,
    detect_max_tokens: u32,
    answer_max_tokens: u32,
}

impl OpenAiVisionClient {
    /// Create a client. Fails without an API key.
    pub fn new(config: &ModelConfig) -> Result<Self, ModelError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.expose_secret().trim().is_empty())
            .ok_or(ModelError::MissingCredential)?;

        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ModelError::Build(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            detect_max_tokens: config.detect_max_tokens,
            answer_max_tokens: config.answer_max_tokens,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn complete(
        &self,
        operation: &'static str,
        messages: Vec<ChatMessage>,
        max_tokens: u32,
    ) -> Result<String, ModelError> {
        let start = Instant::now();
        let result = self.send(messages, max_tokens).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        METRICS.record_model_call(operation, outcome, start.elapsed());

        if let Err(e) = &result {
            warn!(
                "Model {} call failed ({}, retryable={}): {}",
                operation,
                e.kind(),
                e.is_retryable(),
                e
            );
        }
        result
    }

    async fn send(&self, messages: Vec<ChatMessage>, max_tokens: u32) -> Result<String, ModelError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout(e.to_string())
                } else {
                    ModelError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(match status.as_u16() {
                401 | 403 => ModelError::Unauthorized(format!("Status {}: {}", status, body)),
                429 => ModelError::RateLimited(format!("Status {}: {}", status, body)),
                code => ModelError::Upstream { status: code, body },
            });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::InvalidResponse("No choices in response".to_string()))?
            .message
            .content
            .ok_or_else(|| ModelError::InvalidResponse("Choice has no content".to_string()))?;

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl VisionModel for OpenAiVisionClient {
    async fn describe(&self, image: &ImageData) -> Result<String, ModelError> {
        debug!("Describing image: {} bytes, {}", image.len(), image.mime());

        let messages = vec![ChatMessage {
            role: "user",
            content: MessageContent::Parts(vec![
                ContentPart::Text {
                    text: DETECT_PROMPT.to_string(),
                },
                ContentPart::image(image),
            ]),
        }];

        self.complete("describe", messages, self.detect_max_tokens).await
    }

    async fn answer(
        &self,
        label: &str,
        image: &ImageData,
        question: &str,
    ) -> Result<String, ModelError> {
        debug!("Answering about '{}': {}", label, question);

        let messages = vec![
            ChatMessage {
                role: "system",
                content: MessageContent::Text(qa_system_prompt(label)),
            },
            ChatMessage {
                role: "user",
                content: MessageContent::Parts(vec![
                    ContentPart::Text {
                        text: question.to_string(),
                    },
                    ContentPart::image(image),
                ]),
            },
        ];

        self.complete("answer", messages, self.answer_max_tokens).await
    }
}

// OpenAI-compatible API types
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    fn image(image: &ImageData) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: image.data_url(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config_with_key(key: Option<&str>) -> ModelConfig {
        ModelConfig {
            api_key: key.map(|k| SecretString::new(k.to_string())),
            ..ModelConfig::default()
        }
    }

    #[test]
    fn test_missing_key_is_rejected() {
        let result = OpenAiVisionClient::new(&config_with_key(None));
        assert!(matches!(result, Err(ModelError::MissingCredential)));

        let result = OpenAiVisionClient::new(&config_with_key(Some("   ")));
        assert!(matches!(result, Err(ModelError::MissingCredential)));
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let mut config = config_with_key(Some("sk-test"));
        config.base_url = "http://localhost:9999/v1/".to_string();
        let client = OpenAiVisionClient::new(&config).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:9999/v1/chat/completions");
    }

    #[test]
    fn test_request_serialization_shape() {
        let image = ImageData::new(&b"abc"[..], Some("image/png"));
        let request = ChatCompletionRequest {
            model: "gpt-4o",
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text("sys".to_string()),
                },
                ChatMessage {
                    role: "user",
                    content: MessageContent::Parts(vec![
                        ContentPart::Text {
                            text: "what is it?".to_string(),
                        },
                        ContentPart::image(&image),
                    ]),
                },
            ],
            max_tokens: 120,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "gpt-4o",
                "max_tokens": 120,
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": [
                        {"type": "text", "text": "what is it?"},
                        {"type": "image_url", "image_url": {"url": "data:image/png;base64,YWJj"}}
                    ]}
                ]
            })
        );
    }
}
