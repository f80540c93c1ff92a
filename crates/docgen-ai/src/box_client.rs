//! Box AI text generation client.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::Credentials;
use crate::error::{AdapterError, Result};
use crate::generator::TextGenerator;

/// Box API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.box.com/2.0";

/// HTTP request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct BoxAiConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Box file id sent as grounding item, when the template lives in Box.
    pub item_id: Option<String>,
}

impl Default for BoxAiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            item_id: None,
        }
    }
}

/// Client for the Box AI `text_gen` endpoint.
pub struct BoxAiClient {
    client: Client,
    config: BoxAiConfig,
    credentials: Credentials,
}

#[derive(Debug, Serialize)]
struct TextGenRequest<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    items: Vec<TextGenItem<'a>>,
    ai_agent: AgentOverride<'a>,
}

#[derive(Debug, Serialize)]
struct TextGenItem<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct AgentOverride<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    basic_gen: BasicGen<'a>,
}

#[derive(Debug, Serialize)]
struct BasicGen<'a> {
    num_tokens_for_completion: u32,
    #[serde(skip_serializing_if = "is_blank")]
    system_message: &'a str,
}

fn is_blank(text: &&str) -> bool {
    text.is_empty()
}

#[derive(Debug, Deserialize)]
struct TextGenResponse {
    answer: String,
}

impl BoxAiClient {
    pub fn new(config: BoxAiConfig, credentials: Credentials) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AdapterError::remote(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            config,
            credentials,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/ai/text_gen", self.config.base_url.trim_end_matches('/'))
    }

    fn request<'a>(
        &'a self,
        prompt: &'a str,
        system_prompt: &'a str,
        max_tokens: u32,
    ) -> TextGenRequest<'a> {
        TextGenRequest {
            prompt,
            items: self
                .config
                .item_id
                .as_deref()
                .map(|id| vec![TextGenItem { id, kind: "file" }])
                .unwrap_or_default(),
            ai_agent: AgentOverride {
                kind: "ai_agent_text_gen",
                basic_gen: BasicGen {
                    num_tokens_for_completion: max_tokens,
                    system_message: system_prompt,
                },
            },
        }
    }

    fn transport_error(&self, error: &reqwest::Error) -> AdapterError {
        if error.is_timeout() {
            AdapterError::Timeout(self.config.timeout)
        } else {
            AdapterError::remote(error.to_string())
        }
    }
}

impl TextGenerator for BoxAiClient {
    fn generate_text(&self, prompt: &str, system_prompt: &str, max_tokens: u32) -> Result<String> {
        let endpoint = self.endpoint();
        debug!(
            endpoint = %endpoint,
            auth_method = %self.credentials.method,
            max_tokens,
            "requesting text generation"
        );
        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(self.credentials.access_token())
            .json(&self.request(prompt, system_prompt, max_tokens))
            .send()
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(status = status.as_u16(), "Box AI rejected credentials");
            return Err(AdapterError::Authentication(format!(
                "HTTP {} from {endpoint}",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            let message = response
                .text()
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AdapterError::RemoteService {
                status: Some(status.as_u16()),
                message,
            });
        }

        let body: TextGenResponse = response
            .json()
            .map_err(|e| AdapterError::remote(format!("invalid text_gen response: {e}")))?;
        debug!(chars = body.answer.len(), "received text generation");
        Ok(body.answer)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::auth::AuthMethod;

    fn client(config: BoxAiConfig) -> BoxAiClient {
        BoxAiClient::new(config, Credentials::new(AuthMethod::DeveloperToken, "token"))
            .expect("client")
    }

    #[test]
    fn request_carries_token_budget_and_system_message() {
        let client = client(BoxAiConfig {
            item_id: Some("12345".to_string()),
            ..BoxAiConfig::default()
        });
        let body = serde_json::to_value(client.request("convert", "be terse", 512))
            .expect("serialize");
        assert_eq!(
            body,
            json!({
                "prompt": "convert",
                "items": [{"id": "12345", "type": "file"}],
                "ai_agent": {
                    "type": "ai_agent_text_gen",
                    "basic_gen": {
                        "num_tokens_for_completion": 512,
                        "system_message": "be terse"
                    }
                }
            })
        );
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let client = client(BoxAiConfig {
            base_url: "https://example.test/2.0/".to_string(),
            ..BoxAiConfig::default()
        });
        assert_eq!(client.endpoint(), "https://example.test/2.0/ai/text_gen");
        let body = serde_json::to_value(client.request("p", "", 8)).expect("serialize");
        assert!(body.get("items").is_none());
        assert!(body["ai_agent"]["basic_gen"].get("system_message").is_none());
    }

    #[test]
    fn unreachable_service_is_a_remote_error() {
        let client = client(BoxAiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_secs(2),
            item_id: None,
        });
        let error = client.generate_text("p", "s", 16).unwrap_err();
        assert!(matches!(
            error,
            AdapterError::RemoteService { .. } | AdapterError::Timeout(_)
        ));
    }
}
