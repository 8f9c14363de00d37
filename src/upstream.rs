//! DashScope client for the OpenAI-compatible chat completions endpoint.
//!
//! A call is one POST with bearer auth. The reply is returned whatever its
//! status; callers decide between success and failure.

use axum::http::StatusCode;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Chat completions request body.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatPayload {
    pub model: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(content: MessageContent) -> Self {
        Self {
            role: Role::User,
            content,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// Message content: plain text or typed parts.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    InputText { text: String },
    InputImage { image_url: String },
}

/// Status and parsed JSON body of an upstream reply.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub body: Value,
}

impl UpstreamReply {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// `error.message` from an error envelope, when it is a non-empty string.
    pub fn error_message(&self) -> Option<&str> {
        self.body["error"]["message"]
            .as_str()
            .filter(|message| !message.is_empty())
    }

    /// `choices[0].message.content`, if the envelope carries one.
    pub fn first_content(&self) -> Option<&Value> {
        self.body
            .get("choices")?
            .as_array()?
            .first()?
            .get("message")?
            .get("content")
    }
}

/// The call itself failed; no usable reply exists.
#[derive(Debug)]
pub enum UpstreamError {
    Transport(reqwest::Error),
    InvalidBody(serde_json::Error),
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "Request failed: {}", e),
            Self::InvalidBody(e) => write!(f, "Upstream returned invalid JSON: {}", e),
        }
    }
}

impl std::error::Error for UpstreamError {}

/// Client for the fixed chat completions endpoint.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
    url: String,
}

impl UpstreamClient {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST `payload` with `api_key` as bearer token.
    pub async fn call(&self, payload: &ChatPayload, api_key: &str) -> Result<UpstreamReply, UpstreamError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .json(payload)
            .send()
            .await
            .map_err(UpstreamError::Transport)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(UpstreamError::Transport)?;
        let body = serde_json::from_slice(&bytes).map_err(UpstreamError::InvalidBody)?;

        tracing::debug!(status = status.as_u16(), model = %payload.model, "Upstream replied");
        Ok(UpstreamReply { status, body })
    }
}
