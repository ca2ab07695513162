use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::model::{ChatPrompt, ProviderError, TriageModel};
use crate::config::AiConfig;

/// OpenAI chat-completions client constrained to JSON-object answers.
#[derive(Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(client: reqwest::Client, api_key: String, model: String, base_url: &str) -> Self {
        Self {
            client,
            api_key,
            model,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
        }
    }

    /// Build a client when an API key is configured. The shared `client` should already carry
    /// the configured timeout.
    pub fn from_config(client: reqwest::Client, config: &AiConfig) -> Option<Self> {
        config
            .api_key
            .clone()
            .map(|key| Self::new(client, key, config.model.clone(), &config.base_url))
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[async_trait]
impl TriageModel for OpenAiClient {
    async fn complete_json(&self, prompt: &ChatPrompt) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: 0.2,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: ChatResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;

        let content = payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ProviderError::EmptyResponse)?;

        debug!(model = %self.model, bytes = content.len(), "chat completion received");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(api_key: Option<&str>) -> AiConfig {
        AiConfig {
            api_key: api_key.map(str::to_string),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://llm.internal/v1/".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn requires_an_api_key() {
        assert!(OpenAiClient::from_config(reqwest::Client::new(), &config(None)).is_none());
        let client = OpenAiClient::from_config(reqwest::Client::new(), &config(Some("sk-test")))
            .expect("client with key");
        assert_eq!(client.endpoint, "https://llm.internal/v1/chat/completions");
        assert_eq!(client.model(), "gpt-4o-mini");
        assert!(!format!("{client:?}").contains("sk-test"));
    }

    #[test]
    fn requests_json_object_answers() {
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: [
                ChatMessage {
                    role: "system",
                    content: "regras",
                },
                ChatMessage {
                    role: "user",
                    content: "projeto",
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: 0.2,
        };
        let body = serde_json::to_value(&request).expect("serializes");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "projeto");
    }

    #[test]
    fn tolerates_replies_without_content() {
        let payload: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant"}}]}"#)
                .expect("decodes");
        assert!(payload.choices[0].message.content.is_none());
    }
}
