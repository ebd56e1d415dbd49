//! OpenAI-compatible chat-completions client.
//!
//! Works against any backend exposing `/v1/chat/completions` (Ollama,
//! vLLM, OpenAI proper). Multimodal requests attach the image as a
//! base64 data URL content part, per the OpenAI vision message format.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::ports::{CapabilityPort, CapabilityRequest, CapabilityResponse, ProviderError};

#[derive(Clone)]
pub struct OpenAiCompatClient {
    client: Client,
    base_url: String,
    model: String,
}

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3.2";

/// LLM requests can be slow; generous default timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

impl OpenAiCompatClient {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self::with_timeout(base_url, model, DEFAULT_TIMEOUT_SECS)
    }

    /// Create client with custom timeout (for testing).
    pub fn with_timeout(base_url: &str, model: &str, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl CapabilityPort for OpenAiCompatClient {
    async fn invoke(&self, request: CapabilityRequest) -> Result<CapabilityResponse, ProviderError> {
        let api_request = ChatRequest {
            model: self.model.clone(),
            messages: build_messages(&request),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&api_request)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
            return Err(ProviderError::RequestFailed(error_text));
        }

        let api_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("no choices in response".to_string()))?;

        Ok(CapabilityResponse {
            content: choice.message.content.unwrap_or_default(),
        })
    }
}

fn build_messages(request: &CapabilityRequest) -> Vec<ChatMessage> {
    let mut messages = Vec::new();

    if let Some(system) = &request.system_prompt {
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: MessageContent::Text(system.clone()),
        });
    }

    let content = match &request.image {
        Some(image) => {
            let encoded = base64::engine::general_purpose::STANDARD.encode(&image.data);
            MessageContent::Parts(vec![
                ContentPart::Text {
                    text: request.prompt.clone(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: format!("data:{};base64,{encoded}", image.media_type),
                    },
                },
            ])
        }
        None => MessageContent::Text(request.prompt.clone()),
    };

    messages.push(ChatMessage {
        role: "user".to_string(),
        content,
    });

    messages
}

// =============================================================================
// OpenAI API types
// =============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
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

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use personaforge_domain::ImageRef;

    #[test]
    fn text_only_request_uses_plain_string_content() {
        let request = CapabilityRequest::new("Describe a warrior")
            .with_system_prompt("You are a character designer");
        let messages = build_messages(&request);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        let json = serde_json::to_value(&messages[1]).expect("serialize");
        assert_eq!(json["content"], "Describe a warrior");
    }

    #[test]
    fn image_request_attaches_data_url_part() {
        let image = ImageRef {
            data: vec![1, 2, 3],
            media_type: "image/png".to_string(),
        };
        let request = CapabilityRequest::new("What do you see?").with_image(image);
        let messages = build_messages(&request);
        let json = serde_json::to_value(&messages[0]).expect("serialize");
        let parts = json["content"].as_array().expect("content parts");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1]["type"], "image_url");
        let url = parts[1]["image_url"]["url"].as_str().expect("url");
        assert!(url.starts_with("data:image/png;base64,"));
    }
}
