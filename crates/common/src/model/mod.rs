//! Language-model capability abstraction
//!
//! Provides a unified interface to the generative runtime:
//! - Availability query (readiness without side effects)
//! - Stateful chat sessions (conversation history carried per session)
//! - OpenAI-compatible HTTP implementation
//! - Deterministic mock for tests

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Readiness of the generation capability
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Availability {
    /// Ready to create sessions
    Available,
    /// Reachable configuration, but the runtime is not ready
    Unavailable,
    /// Missing configuration (e.g. no API key)
    NeedsSetup,
}

/// A stateful generation session
///
/// Prompts are order-sensitive: each call appends to the session's
/// conversational state. Callers must issue one prompt at a time to
/// completion before the next.
#[async_trait]
pub trait ModelSession: Send {
    /// Issue one prompt and return the model's reply text
    async fn prompt(&mut self, text: &str) -> Result<String>;
}

/// Trait for the generation capability
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Query readiness without creating a session
    async fn availability(&self) -> Availability;

    /// Create a new stateful session seeded with a system prompt
    async fn create_session(&self, system_prompt: &str) -> Result<Box<dyn ModelSession>>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// OpenAI-compatible chat model client
pub struct OpenAiChatModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

impl OpenAiChatModel {
    /// Create a new chat model client
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            model: model.unwrap_or_else(|| crate::DEFAULT_CHAT_MODEL.to_string()),
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiChatModel {
    async fn availability(&self) -> Availability {
        if self.api_key.is_empty() {
            return Availability::NeedsSetup;
        }

        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await;

        match response {
            Ok(r) if r.status().is_success() => Availability::Available,
            Ok(r) => {
                tracing::warn!(status = r.status().as_u16(), "Model endpoint not ready");
                Availability::Unavailable
            }
            Err(e) => {
                tracing::warn!(error = %e, "Model endpoint unreachable");
                Availability::Unavailable
            }
        }
    }

    async fn create_session(&self, system_prompt: &str) -> Result<Box<dyn ModelSession>> {
        if self.api_key.is_empty() {
            return Err(AppError::ModelUnavailable {
                message: "No API key configured for the model service".to_string(),
            });
        }

        Ok(Box::new(OpenAiChatSession {
            client: self.client.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            messages: vec![ChatMessage {
                role: "system".to_string(),
                content: system_prompt.to_string(),
            }],
        }))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// One chat session against an OpenAI-compatible endpoint
///
/// The endpoint itself is stateless; the session carries the full message
/// history so each prompt sees everything issued before it.
struct OpenAiChatSession {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    messages: Vec<ChatMessage>,
}

#[async_trait]
impl ModelSession for OpenAiChatSession {
    async fn prompt(&mut self, text: &str) -> Result<String> {
        self.messages.push(ChatMessage {
            role: "user".to_string(),
            content: text.to_string(),
        });

        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: &self.messages,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                // Drop the unanswered user turn; the history must only hold
                // exchanges the model has seen.
                self.messages.pop();
                if e.is_timeout() {
                    AppError::ModelError {
                        message: "Prompt timed out".to_string(),
                    }
                } else {
                    AppError::ModelError {
                        message: format!("Prompt request failed: {}", e),
                    }
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            self.messages.pop();
            return Err(AppError::ModelError {
                message: format!("Model API error {}: {}", status, body),
            });
        }

        let chat_response: ChatResponse =
            response.json().await.map_err(|e| {
                self.messages.pop();
                AppError::ModelError {
                    message: format!("Failed to parse model response: {}", e),
                }
            })?;

        let reply = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                self.messages.pop();
                AppError::ModelError {
                    message: "Empty response from model".to_string(),
                }
            })?;

        self.messages.push(ChatMessage {
            role: "assistant".to_string(),
            content: reply.clone(),
        });

        Ok(reply)
    }
}

/// Scripted reply for the mock model
pub type MockReply = std::result::Result<String, String>;

/// Mock language model for testing
///
/// Replies are served from a scripted queue shared by all sessions; an
/// exhausted queue falls back to a fixed reply. `Err` entries surface as
/// `ModelError` from the corresponding prompt.
pub struct MockLanguageModel {
    availability: Availability,
    fail_session_creation: bool,
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    sessions_created: AtomicUsize,
    prompts_issued: Arc<AtomicUsize>,
}

impl MockLanguageModel {
    pub fn new() -> Self {
        Self {
            availability: Availability::Available,
            fail_session_creation: false,
            replies: Arc::new(Mutex::new(VecDeque::new())),
            sessions_created: AtomicUsize::new(0),
            prompts_issued: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Script the replies served to successive prompts
    pub fn with_replies(replies: Vec<MockReply>) -> Self {
        let model = Self::new();
        *model.replies.lock().unwrap() = replies.into();
        model
    }

    /// Report the given readiness from `availability()`
    pub fn with_availability(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }

    /// Fail every `create_session` call
    pub fn failing_creation(mut self) -> Self {
        self.fail_session_creation = true;
        self
    }

    /// Number of sessions created so far
    pub fn sessions_created(&self) -> usize {
        self.sessions_created.load(Ordering::SeqCst)
    }

    /// Number of prompts issued across all sessions
    pub fn prompts_issued(&self) -> usize {
        self.prompts_issued.load(Ordering::SeqCst)
    }
}

impl Default for MockLanguageModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn availability(&self) -> Availability {
        self.availability
    }

    async fn create_session(&self, _system_prompt: &str) -> Result<Box<dyn ModelSession>> {
        if self.fail_session_creation {
            return Err(AppError::ModelError {
                message: "Mock session creation failure".to_string(),
            });
        }

        self.sessions_created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            replies: self.replies.clone(),
            prompts_issued: self.prompts_issued.clone(),
        }))
    }

    fn model_name(&self) -> &str {
        "mock-chat"
    }
}

struct MockSession {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    prompts_issued: Arc<AtomicUsize>,
}

#[async_trait]
impl ModelSession for MockSession {
    async fn prompt(&mut self, _text: &str) -> Result<String> {
        self.prompts_issued.fetch_add(1, Ordering::SeqCst);
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(AppError::ModelError { message }),
            None => Ok("Mock reply".to_string()),
        }
    }
}

/// Create a language model based on configuration
pub fn create_model(config: &crate::config::ModelConfig) -> Result<Arc<dyn LanguageModel>> {
    match config.provider.as_str() {
        "openai" => {
            let api_key = config.api_key.clone().unwrap_or_default();
            let model = OpenAiChatModel::new(
                api_key,
                Some(config.model.clone()),
                config.api_base.clone(),
                Duration::from_secs(config.timeout_secs),
            )?;
            Ok(Arc::new(model))
        }
        "mock" => Ok(Arc::new(MockLanguageModel::new())),
        other => {
            tracing::warn!(provider = other, "Unknown model provider, using mock");
            Ok(Arc::new(MockLanguageModel::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_scripted_replies() {
        let model = MockLanguageModel::with_replies(vec![
            Ok("first".to_string()),
            Err("boom".to_string()),
            Ok("third".to_string()),
        ]);

        let mut session = model.create_session("system").await.unwrap();
        assert_eq!(session.prompt("a").await.unwrap(), "first");
        assert!(matches!(
            session.prompt("b").await,
            Err(AppError::ModelError { .. })
        ));
        assert_eq!(session.prompt("c").await.unwrap(), "third");
        assert_eq!(model.prompts_issued(), 3);
    }

    #[tokio::test]
    async fn test_mock_session_counting() {
        let model = MockLanguageModel::new();
        let _a = model.create_session("s").await.unwrap();
        let _b = model.create_session("s").await.unwrap();
        assert_eq!(model.sessions_created(), 2);
    }

    #[tokio::test]
    async fn test_mock_creation_failure() {
        let model = MockLanguageModel::new().failing_creation();
        assert!(model.create_session("s").await.is_err());
        assert_eq!(model.sessions_created(), 0);
    }

    #[tokio::test]
    async fn test_needs_setup_without_api_key() {
        let model = OpenAiChatModel::new(
            String::new(),
            None,
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(model.availability().await, Availability::NeedsSetup);
    }
}
