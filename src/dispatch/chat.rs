//! Chat backend for captured commands.
//!
//! [`ApiChat`] calls any OpenAI-compatible `/v1/chat/completions` endpoint
//! (Ollama, OpenAI, Groq, LM Studio, vLLM …).  All connection details come
//! from [`ChatConfig`]; nothing is hardcoded.
//!
//! [`ChatCommandSink`] adapts a backend to the synchronous [`CommandSink`]
//! port: each transcript is sent from a spawned tokio task and the reply is
//! posted back into the controller's event channel.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::ChatConfig;
use crate::controller::{ControllerEvent, EventSender};

use super::CommandSink;

// ---------------------------------------------------------------------------
// ChatError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ChatError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    #[error("chat request timed out")]
    Timeout,

    #[error("failed to parse chat response: {0}")]
    Parse(String),

    #[error("chat service returned an empty response")]
    EmptyResponse,
}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ChatError::Timeout
        } else {
            ChatError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// ChatBackend trait
// ---------------------------------------------------------------------------

/// Conversational service answering one spoken command.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn reply(&self, message: &str) -> Result<String, ChatError>;
}

// ---------------------------------------------------------------------------
// ApiChat
// ---------------------------------------------------------------------------

pub struct ApiChat {
    client: reqwest::Client,
    config: ChatConfig,
}

impl ApiChat {
    /// The HTTP client carries the per-request timeout from
    /// `config.timeout_secs`.
    pub fn from_config(config: &ChatConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    fn request_body(&self, message: &str) -> serde_json::Value {
        serde_json::json!({
            "model":    self.config.model,
            "messages": [
                { "role": "system", "content": self.config.system_prompt },
                { "role": "user",   "content": message }
            ],
            "stream":      false,
            "temperature": self.config.temperature,
            "max_tokens":  256
        })
    }
}

#[async_trait]
impl ChatBackend for ApiChat {
    /// The `Authorization: Bearer …` header is attached only when
    /// `config.api_key` is a non-empty string.
    async fn reply(&self, message: &str) -> Result<String, ChatError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let mut req = self.client.post(&url).json(&self.request_body(message));

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?.error_for_status()?;

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ChatError::Parse(e.to_string()))?;

        parse_reply(&json)
    }
}

/// Extract `choices[0].message.content`.
fn parse_reply(json: &serde_json::Value) -> Result<String, ChatError> {
    let text = json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or(ChatError::EmptyResponse)?
        .trim()
        .to_string();

    if text.is_empty() {
        return Err(ChatError::EmptyResponse);
    }
    Ok(text)
}

// ---------------------------------------------------------------------------
// ChatCommandSink
// ---------------------------------------------------------------------------

/// [`CommandSink`] that forwards transcripts to a [`ChatBackend`].
///
/// Must be constructed inside a tokio runtime; the runtime handle is
/// captured so `deliver` can be called from any thread.
pub struct ChatCommandSink {
    backend: Arc<dyn ChatBackend>,
    events: EventSender,
    runtime: tokio::runtime::Handle,
}

impl ChatCommandSink {
    pub fn new(backend: Arc<dyn ChatBackend>, events: EventSender) -> Self {
        Self {
            backend,
            events,
            runtime: tokio::runtime::Handle::current(),
        }
    }
}

impl CommandSink for ChatCommandSink {
    fn deliver(&self, transcript: &str) {
        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();
        let message = transcript.to_string();

        self.runtime.spawn(async move {
            match backend.reply(&message).await {
                Ok(reply) => {
                    log::debug!("chat: reply ({} chars)", reply.len());
                    let _ = events.send(ControllerEvent::Reply(reply));
                }
                Err(e) => {
                    log::warn!("chat: no reply for {message:?}: {e}");
                }
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
