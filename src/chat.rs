//! Conversational model clients.
//!
//! Used only when no command rule matched. A client that fails answers
//! `None` and the dispatcher falls through to the generic help message.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{AppConfig, ChatProvider};
use crate::error::{AssistantError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A model that can answer free-form prompts.
#[async_trait]
pub trait ConversationModel: Send + Sync {
    /// Returns the model's reply, or `None` on failure or an empty answer.
    async fn reply(&self, prompt: &str) -> Option<String>;
}

/// Builds the configured conversational client, if any.
///
/// # Details
/// Gemini is enabled only when an API key is present. Ollama needs no
/// credential. Either way the choice is made once and holds for the process.
///
/// # Errors
/// Returns an error if the HTTP client cannot be built.
pub fn from_config(config: &AppConfig) -> anyhow::Result<Option<Arc<dyn ConversationModel>>> {
    let model: Option<Arc<dyn ConversationModel>> = match config.chat_provider {
        ChatProvider::Gemini => match &config.gemini_api_key {
            Some(key) => Some(Arc::new(GeminiClient::new(
                &config.gemini_api_url,
                &config.gemini_model,
                key,
            )?)),
            None => {
                info!("GEMINI_API_KEY not set, conversational replies disabled");
                None
            }
        },
        ChatProvider::Ollama => Some(Arc::new(OllamaClient::new(
            &config.ollama_url,
            &config.ollama_model,
        )?)),
        ChatProvider::None => None,
    };
    Ok(model)
}

fn http_client() -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?)
}

/// Drops blank replies and trims the rest.
fn non_empty(reply: String) -> Option<String> {
    let reply = reply.trim();
    (!reply.is_empty()).then(|| reply.to_string())
}

/// Google Gemini `generateContent` client.
pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiReplyContent>,
}

#[derive(Deserialize)]
struct GeminiReplyContent {
    #[serde(default)]
    parts: Vec<GeminiReplyPart>,
}

#[derive(Deserialize)]
struct GeminiReplyPart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    /// Creates a client for `model` under `base_url`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, model: &str, api_key: &str) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client()?,
            endpoint: format!(
                "{}/v1beta/models/{}:generateContent",
                base_url.trim_end_matches('/'),
                model
            ),
            api_key: api_key.to_string(),
        })
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
        };
        let response: GeminiResponse = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AssistantError::external("gemini", e))?
            .json()
            .await
            .map_err(|e| AssistantError::external("gemini", e))?;
        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default();
        Ok(text)
    }
}

#[async_trait]
impl ConversationModel for GeminiClient {
    async fn reply(&self, prompt: &str) -> Option<String> {
        match self.generate(prompt).await {
            Ok(text) => non_empty(text),
            Err(err) => {
                warn!(error = %err, "Gemini request failed");
                None
            }
        }
    }
}

/// Local Ollama `/api/chat` client.
pub struct OllamaClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

/// Chat message structure for the Ollama API.
#[derive(Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaResponse {
    message: ChatMessage,
}

impl OllamaClient {
    /// Creates a client for `model` served at `base_url`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, model: &str) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client()?,
            endpoint: format!("{}/api/chat", base_url.trim_end_matches('/')),
            model: model.to_string(),
        })
    }

    async fn chat(&self, prompt: &str) -> Result<String> {
        let request = OllamaRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            stream: false,
        };
        let response: OllamaResponse = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AssistantError::external("ollama", e))?
            .json()
            .await
            .map_err(|e| AssistantError::external("ollama", e))?;
        Ok(response.message.content)
    }
}

#[async_trait]
impl ConversationModel for OllamaClient {
    async fn reply(&self, prompt: &str) -> Option<String> {
        match self.chat(prompt).await {
            Ok(text) => non_empty(text),
            Err(err) => {
                warn!(error = %err, "Ollama request failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn gemini_joins_candidate_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test:generateContent"))
            .and(header("x-goog-api-key", "secret"))
            .and(body_partial_json(json!({
                "contents": [ { "parts": [ { "text": "tell me a joke" } ] } ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [ { "content": { "role": "model", "parts": [
                    { "text": "Why did the crab " },
                    { "text": "never share? It was shellfish.\n" }
                ] } } ]
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::new(&server.uri(), "gemini-test", "secret").unwrap();
        assert_eq!(
            client.reply("tell me a joke").await.as_deref(),
            Some("Why did the crab never share? It was shellfish.")
        );
    }

    #[tokio::test]
    async fn gemini_failure_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = GeminiClient::new(&server.uri(), "gemini-test", "bad").unwrap();
        assert_eq!(client.reply("hello").await, None);
    }

    #[tokio::test]
    async fn gemini_without_candidates_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let client = GeminiClient::new(&server.uri(), "gemini-test", "secret").unwrap();
        assert_eq!(client.reply("hello").await, None);
    }

    #[tokio::test]
    async fn ollama_returns_message_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({ "model": "llama3.2:3b", "stream": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": { "role": "assistant", "content": "Hello there." }
            })))
            .mount(&server)
            .await;

        let client = OllamaClient::new(&server.uri(), "llama3.2:3b").unwrap();
        assert_eq!(client.reply("hi").await.as_deref(), Some("Hello there."));
    }

    #[tokio::test]
    async fn ollama_blank_reply_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": { "role": "assistant", "content": "   " }
            })))
            .mount(&server)
            .await;

        let client = OllamaClient::new(&server.uri(), "llama3.2:3b").unwrap();
        assert_eq!(client.reply("hi").await, None);
    }

    #[test]
    fn gemini_requires_a_key() {
        let config = AppConfig::default();
        assert!(from_config(&config).unwrap().is_none());

        let config = AppConfig {
            gemini_api_key: Some("key".to_string()),
            ..AppConfig::default()
        };
        assert!(from_config(&config).unwrap().is_some());
    }

    #[test]
    fn disabled_provider_builds_nothing() {
        let config = AppConfig {
            chat_provider: ChatProvider::None,
            gemini_api_key: Some("key".to_string()),
            ..AppConfig::default()
        };
        assert!(from_config(&config).unwrap().is_none());
    }
}
