//! Proxy handlers for chat and image-to-text.

use super::routes::Endpoint;
use super::types::*;
use super::AppState;
use crate::error::{json_reply, GatewayError};
use crate::upstream::{ChatPayload, ContentPart, Message, MessageContent, UpstreamReply};
use axum::{body::Bytes, http::StatusCode, response::IntoResponse, response::Response};
use futures::FutureExt;
use serde_json::Value;
use std::future::Future;
use std::panic::AssertUnwindSafe;

pub const PROMPT_REQUIRED: &str = "Prompt is required.";
pub const IMAGE_REQUIRED: &str = "Image data is required.";
pub const NO_RESPONSE: &str = "No response generated.";
pub const UPSTREAM_FALLBACK: &str = "Failed to retrieve response from Qwen.";
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";
pub const DEFAULT_IMAGE_PROMPT: &str = "请识别这张图片中的内容，并输出清晰的文字描述。";

/// Run the handler for `endpoint` and turn its outcome into a JSON reply.
///
/// A panic inside the handler becomes the endpoint's generic 500.
pub async fn proxy(state: &AppState, endpoint: Endpoint, body: Bytes) -> Response {
    guarded(endpoint, async {
        match endpoint {
            Endpoint::Chat => chat(state, &body).await,
            Endpoint::ImageToText => image_to_text(state, &body).await,
        }
    })
    .await
}

async fn guarded<F>(endpoint: Endpoint, handler: F) -> Response
where
    F: Future<Output = Result<CompletionResponse, GatewayError>>,
{
    let outcome = AssertUnwindSafe(handler).catch_unwind().await;

    match outcome {
        Ok(Ok(reply)) => json_reply(StatusCode::OK, reply),
        Ok(Err(e)) => {
            tracing::info!(
                endpoint = endpoint.path(),
                status = e.status_code().as_u16(),
                error_type = e.error_type(),
                "Proxy request failed"
            );
            e.into_response()
        }
        Err(_) => {
            tracing::error!(endpoint = endpoint.path(), "Proxy handler panicked");
            GatewayError::Internal(endpoint.failure_message().to_string()).into_response()
        }
    }
}

// ============================================================================
// Chat
// ============================================================================

pub async fn chat(state: &AppState, body: &[u8]) -> Result<CompletionResponse, GatewayError> {
    let request: ChatRequest = parse_body(body).unwrap_or_default();
    let prompt = request
        .prompt()
        .ok_or_else(|| GatewayError::InvalidInput(PROMPT_REQUIRED.to_string()))?;
    let api_key = state.config.api_key().ok_or(GatewayError::ApiKeyMissing)?;

    let payload = ChatPayload {
        model: state.config.upstream.chat_model.clone(),
        messages: vec![
            Message::system(SYSTEM_PROMPT),
            Message::user(MessageContent::Text(prompt.to_string())),
        ],
    };

    let reply = call_upstream(state, &payload, api_key, Endpoint::Chat).await?;

    Ok(CompletionResponse {
        response: chat_text(reply.first_content()),
    })
}

/// Text of a chat reply; anything but a non-empty string falls back.
pub fn chat_text(content: Option<&Value>) -> String {
    content
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .unwrap_or(NO_RESPONSE)
        .to_string()
}

// ============================================================================
// Image to text
// ============================================================================

pub async fn image_to_text(state: &AppState, body: &[u8]) -> Result<CompletionResponse, GatewayError> {
    let request: ImageToTextRequest = parse_body(body).unwrap_or_default();
    let image_data = request
        .image_data()
        .ok_or_else(|| GatewayError::InvalidInput(IMAGE_REQUIRED.to_string()))?;
    let prompt = request.prompt().unwrap_or(DEFAULT_IMAGE_PROMPT);
    let api_key = state.config.api_key().ok_or(GatewayError::ApiKeyMissing)?;

    // The image value is forwarded as-is; its encoding is the upstream's concern.
    let payload = ChatPayload {
        model: state.config.upstream.vision_model.clone(),
        messages: vec![Message::user(MessageContent::Parts(vec![
            ContentPart::InputText {
                text: prompt.to_string(),
            },
            ContentPart::InputImage {
                image_url: image_data.to_string(),
            },
        ]))],
    };

    let reply = call_upstream(state, &payload, api_key, Endpoint::ImageToText).await?;

    Ok(CompletionResponse {
        response: vision_text(reply.first_content()),
    })
}

/// Text of a vision reply: `output_text` parts joined by newlines, or a plain string.
pub fn vision_text(content: Option<&Value>) -> String {
    match content {
        Some(Value::Array(parts)) => {
            let joined = parts
                .iter()
                .filter(|part| part["type"] == "output_text")
                .filter_map(|part| part["text"].as_str())
                .collect::<Vec<_>>()
                .join("\n");
            if joined.is_empty() {
                NO_RESPONSE.to_string()
            } else {
                joined
            }
        }
        Some(Value::String(text)) => text.clone(),
        _ => NO_RESPONSE.to_string(),
    }
}

// ============================================================================
// Upstream
// ============================================================================

async fn call_upstream(
    state: &AppState,
    payload: &ChatPayload,
    api_key: &str,
    endpoint: Endpoint,
) -> Result<UpstreamReply, GatewayError> {
    let reply = state.upstream.call(payload, api_key).await.map_err(|e| {
        tracing::error!(endpoint = endpoint.path(), error = %e, "Upstream call failed");
        GatewayError::Internal(endpoint.failure_message().to_string())
    })?;

    if !reply.is_success() {
        tracing::error!(status = reply.status.as_u16(), body = %reply.body, "DashScope error");
        return Err(GatewayError::Upstream {
            status: reply.status,
            message: reply.error_message().unwrap_or(UPSTREAM_FALLBACK).to_string(),
        });
    }

    Ok(reply)
}
