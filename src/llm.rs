use crate::config::{LLMConfig, LLMProvider};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const OLLAMA_URL: &str = "http://localhost:11434";

/// Errors raised while talking to a completion service.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("{0} API key not provided")]
    MissingApiKey(&'static str),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} API error ({status}): {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("invalid response format from {0}")]
    InvalidResponse(&'static str),

    #[error("{0}")]
    Other(String),
}

/// A chat-style completion service: one system prompt and one user prompt in,
/// one text completion out.
#[allow(async_fn_in_trait)]
pub trait CompletionProvider {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError>;
}

pub struct LLMClient {
    config: LLMConfig,
    client: Client,
    debug: bool,
}

impl LLMClient {
    pub fn new(config: LLMConfig, debug: bool) -> crate::Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;

        Ok(Self { config, client, debug })
    }

    pub fn provider_name(&self) -> &'static str {
        match self.config.provider {
            LLMProvider::OpenAI => "OpenAI",
            LLMProvider::Ollama => "Ollama",
            LLMProvider::Anthropic => "Anthropic",
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn openai_payload(&self, system_prompt: &str, user_prompt: &str) -> Value {
        json!({
            "model": self.config.model,
            "messages": [
                {
                    "role": "system",
                    "content": system_prompt
                },
                {
                    "role": "user",
                    "content": user_prompt
                }
            ],
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens
        })
    }

    pub fn ollama_payload(&self, system_prompt: &str, user_prompt: &str) -> Value {
        json!({
            "model": self.config.model,
            "system": system_prompt,
            "prompt": user_prompt,
            "stream": false,
            "options": {
                "temperature": self.config.temperature,
                "num_predict": self.config.max_tokens
            }
        })
    }

    pub fn anthropic_payload(&self, system_prompt: &str, user_prompt: &str) -> Value {
        json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "system": system_prompt,
            "messages": [
                {
                    "role": "user",
                    "content": user_prompt
                }
            ]
        })
    }

    async fn complete_with_openai(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError> {
        let api_key = self.config.api_key.as_ref()
            .ok_or(LlmError::MissingApiKey("OpenAI"))?;
        let url = self.config.base_url.as_deref().unwrap_or(OPENAI_URL);

        let payload = self.openai_payload(system_prompt, user_prompt);
        self.debug_request("OpenAI", url, &payload);

        let response = self.client
            .post(url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        let response_json = Self::read_json("OpenAI", response).await?;
        self.debug_response("OpenAI", &response_json);

        openai_content(&response_json)
    }

    async fn complete_with_ollama(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError> {
        let base_url = self.config.base_url.as_deref().unwrap_or(OLLAMA_URL);
        let url = format!("{}/api/generate", base_url.trim_end_matches('/'));

        let payload = self.ollama_payload(system_prompt, user_prompt);
        self.debug_request("Ollama", &url, &payload);

        let response = self.client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        let response_json = Self::read_json("Ollama", response).await?;
        self.debug_response("Ollama", &response_json);

        ollama_content(&response_json)
    }

    async fn complete_with_anthropic(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError> {
        let api_key = self.config.api_key.as_ref()
            .ok_or(LlmError::MissingApiKey("Anthropic"))?;
        let url = self.config.base_url.as_deref().unwrap_or(ANTHROPIC_URL);

        let payload = self.anthropic_payload(system_prompt, user_prompt);
        self.debug_request("Anthropic", url, &payload);

        let response = self.client
            .post(url)
            .header("x-api-key", api_key)
            .header("Content-Type", "application/json")
            .header("anthropic-version", "2023-06-01")
            .json(&payload)
            .send()
            .await?;

        let response_json = Self::read_json("Anthropic", response).await?;
        self.debug_response("Anthropic", &response_json);

        anthropic_content(&response_json)
    }

    async fn read_json(provider: &'static str, response: reqwest::Response) -> Result<Value, LlmError> {
        let status = response.status();
        let body = response.text().await?;
        parse_response_body(provider, status, &body)
    }

    fn debug_request(&self, provider: &str, url: &str, payload: &Value) {
        debug!(provider, url, model = %self.config.model, "sending completion request");
        if self.debug {
            println!("\n🔍 LLM Debug - {} Request:", provider);
            println!("Model: {}", self.config.model);
            println!("Payload: {}", serde_json::to_string_pretty(payload).unwrap_or_else(|_| "Failed to serialize".to_string()));
        }
    }

    fn debug_response(&self, provider: &str, response_json: &Value) {
        if self.debug {
            println!("\n🔍 LLM Debug - {} Response:", provider);
            println!("Raw response: {}", serde_json::to_string_pretty(response_json).unwrap_or_else(|_| "Failed to serialize".to_string()));
        }
    }
}

impl CompletionProvider for LLMClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError> {
        match self.config.provider {
            LLMProvider::OpenAI => self.complete_with_openai(system_prompt, user_prompt).await,
            LLMProvider::Ollama => self.complete_with_ollama(system_prompt, user_prompt).await,
            LLMProvider::Anthropic => self.complete_with_anthropic(system_prompt, user_prompt).await,
        }
    }
}

/// Turns a raw HTTP reply into JSON: non-2xx statuses become [`LlmError::Api`],
/// unparseable bodies become [`LlmError::InvalidResponse`].
pub fn parse_response_body(provider: &'static str, status: StatusCode, body: &str) -> Result<Value, LlmError> {
    if !status.is_success() {
        return Err(LlmError::Api { provider, status: status.as_u16(), body: body.to_string() });
    }

    serde_json::from_str(body).map_err(|_| LlmError::InvalidResponse(provider))
}

pub fn openai_content(response_json: &Value) -> Result<String, LlmError> {
    response_json["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or(LlmError::InvalidResponse("OpenAI"))
}

pub fn ollama_content(response_json: &Value) -> Result<String, LlmError> {
    response_json["response"]
        .as_str()
        .map(str::to_string)
        .ok_or(LlmError::InvalidResponse("Ollama"))
}

pub fn anthropic_content(response_json: &Value) -> Result<String, LlmError> {
    response_json["content"][0]["text"]
        .as_str()
        .map(str::to_string)
        .ok_or(LlmError::InvalidResponse("Anthropic"))
}

/// Deterministic provider that never touches the network.
///
/// Replies are served from a queue in the order they were pushed; once the
/// queue is empty every call gets the default response. Clones share the
/// queue and the recorded prompts.
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    queued: Arc<Mutex<VecDeque<Result<String, String>>>>,
    prompts: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockProvider {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            queued: Arc::new(Mutex::new(VecDeque::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn push_response(&self, response: impl Into<String>) {
        lock(&self.queued).push_back(Ok(response.into()));
    }

    /// Make the next unanswered call fail with `message`.
    pub fn push_error(&self, message: impl Into<String>) {
        lock(&self.queued).push_back(Err(message.into()));
    }

    pub fn call_count(&self) -> usize {
        lock(&self.prompts).len()
    }

    /// `(system_prompt, user_prompt)` pairs received so far.
    pub fn prompts(&self) -> Vec<(String, String)> {
        lock(&self.prompts).clone()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("[]")
    }
}

impl CompletionProvider for MockProvider {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError> {
        lock(&self.prompts).push((system_prompt.to_string(), user_prompt.to_string()));

        match lock(&self.queued).pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(LlmError::Other(message)),
            None => Ok(self.default_response.clone()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_provider_default() {
        let provider = MockProvider::new("Test response");
        let result = provider.complete("system", "user").await;
        assert_eq!(result.unwrap(), "Test response");
    }

    #[tokio::test]
    async fn test_mock_provider_queue_then_default() {
        let provider = MockProvider::default();
        provider.push_response("first");
        provider.push_error("boom");

        assert_eq!(provider.complete("s", "u1").await.unwrap(), "first");
        assert!(matches!(provider.complete("s", "u2").await, Err(LlmError::Other(msg)) if msg == "boom"));
        assert_eq!(provider.complete("s", "u3").await.unwrap(), "[]");
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_provider_clone_shares_state() {
        let provider1 = MockProvider::new("x");
        let provider2 = provider1.clone();

        provider1.complete("sys", "hello").await.unwrap();

        assert_eq!(provider2.call_count(), 1);
        assert_eq!(provider2.prompts(), vec![("sys".to_string(), "hello".to_string())]);
    }

    #[tokio::test]
    async fn test_openai_without_key_fails_before_network() {
        let config = LLMConfig { api_key: None, ..LLMConfig::default() };
        let client = LLMClient::new(config, false).unwrap();

        let result = client.complete("system", "user").await;
        assert!(matches!(result, Err(LlmError::MissingApiKey("OpenAI"))));
    }

    #[tokio::test]
    async fn test_anthropic_without_key_fails_before_network() {
        let config = LLMConfig {
            provider: LLMProvider::Anthropic,
            api_key: None,
            ..LLMConfig::default()
        };
        let client = LLMClient::new(config, false).unwrap();

        let result = client.complete("system", "user").await;
        assert!(matches!(result, Err(LlmError::MissingApiKey("Anthropic"))));
        assert_eq!(client.provider_name(), "Anthropic");
    }

    fn client_with(provider: LLMProvider) -> LLMClient {
        let config = LLMConfig { provider, ..LLMConfig::default() };
        LLMClient::new(config, false).unwrap()
    }

    #[test]
    fn test_openai_payload_carries_defaults_and_roles() {
        let payload = client_with(LLMProvider::OpenAI).openai_payload("be precise", "thread text");

        assert_eq!(payload["model"], "gpt-4o-mini");
        assert_eq!(payload["temperature"], 0.3);
        assert_eq!(payload["max_tokens"], 10_000);
        assert_eq!(payload["messages"][0]["role"], "system");
        assert_eq!(payload["messages"][0]["content"], "be precise");
        assert_eq!(payload["messages"][1]["role"], "user");
        assert_eq!(payload["messages"][1]["content"], "thread text");
        assert_eq!(payload["messages"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_anthropic_payload_puts_system_at_top_level() {
        let payload = client_with(LLMProvider::Anthropic).anthropic_payload("be precise", "thread text");

        assert_eq!(payload["system"], "be precise");
        assert_eq!(payload["temperature"], 0.3);
        assert_eq!(payload["max_tokens"], 10_000);
        assert_eq!(payload["messages"][0]["role"], "user");
        assert_eq!(payload["messages"][0]["content"], "thread text");
    }

    #[test]
    fn test_ollama_payload_options() {
        let payload = client_with(LLMProvider::Ollama).ollama_payload("be precise", "thread text");

        assert_eq!(payload["system"], "be precise");
        assert_eq!(payload["prompt"], "thread text");
        assert_eq!(payload["stream"], false);
        assert_eq!(payload["options"]["temperature"], 0.3);
        assert_eq!(payload["options"]["num_predict"], 10_000);
    }

    #[test]
    fn test_content_extraction_per_provider() {
        let openai = json!({"choices": [{"message": {"role": "assistant", "content": "[]"}}]});
        let anthropic = json!({"content": [{"type": "text", "text": "[1]"}]});
        let ollama = json!({"response": "[2]", "done": true});

        assert_eq!(openai_content(&openai).unwrap(), "[]");
        assert_eq!(anthropic_content(&anthropic).unwrap(), "[1]");
        assert_eq!(ollama_content(&ollama).unwrap(), "[2]");
    }

    #[test]
    fn test_malformed_response_shape_is_invalid_response() {
        let wrong_shape = json!({"id": "chatcmpl-1", "choices": []});

        assert!(matches!(openai_content(&wrong_shape), Err(LlmError::InvalidResponse("OpenAI"))));
        assert!(matches!(anthropic_content(&wrong_shape), Err(LlmError::InvalidResponse("Anthropic"))));
        assert!(matches!(ollama_content(&wrong_shape), Err(LlmError::InvalidResponse("Ollama"))));
        assert!(matches!(
            openai_content(&json!({"choices": [{"message": {"content": null}}]})),
            Err(LlmError::InvalidResponse("OpenAI"))
        ));
    }

    #[test]
    fn test_non_success_status_is_api_error() {
        let result = parse_response_body("OpenAI", StatusCode::TOO_MANY_REQUESTS, "rate limited");

        match result {
            Err(LlmError::Api { provider, status, body }) => {
                assert_eq!(provider, "OpenAI");
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
        assert!(matches!(
            parse_response_body("Anthropic", StatusCode::UNAUTHORIZED, "{}"),
            Err(LlmError::Api { status: 401, .. })
        ));
    }

    #[test]
    fn test_success_body_must_be_json() {
        assert!(matches!(
            parse_response_body("Ollama", StatusCode::OK, "<html>gateway</html>"),
            Err(LlmError::InvalidResponse("Ollama"))
        ));
        let value = parse_response_body("OpenAI", StatusCode::OK, r#"{"choices": []}"#).unwrap();
        assert!(value["choices"].is_array());
    }

    #[test]
    fn test_api_error_message() {
        let err = LlmError::Api {
            provider: "OpenAI",
            status: 429,
            body: "rate limited".to_string(),
        };
        assert_eq!(err.to_string(), "OpenAI API error (429): rate limited");
    }
}
