//! Unified error handling for dashgate.
//!
//! Proxy failures render as `{"error": "..."}`; static asset failures render
//! as short plain-text bodies.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

pub const API_KEY_MISSING_MESSAGE: &str = "DASHSCOPE_API_KEY is not set on the server.";
pub const INVALID_STREAM_MESSAGE: &str = "Invalid request stream.";

/// Error type for the proxy endpoints.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// Required field missing or malformed in the client payload.
    InvalidInput(String),
    /// No upstream API key configured.
    ApiKeyMissing,
    /// Upstream answered with a non-success status.
    Upstream { status: StatusCode, message: String },
    /// The request body stream failed before completing.
    InvalidStream,
    /// Anything else; the message is the fixed text shown to the client.
    Internal(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "{}", msg),
            Self::ApiKeyMissing => write!(f, "{}", API_KEY_MISSING_MESSAGE),
            Self::Upstream { message, .. } => write!(f, "{}", message),
            Self::InvalidStream => write!(f, "{}", INVALID_STREAM_MESSAGE),
            Self::Internal(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for GatewayError {}

impl GatewayError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::ApiKeyMissing => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream { status, .. } => *status,
            Self::InvalidStream => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type string used in logs.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_request",
            Self::ApiKeyMissing => "configuration_error",
            Self::Upstream { .. } => "upstream_error",
            Self::InvalidStream => "transport_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

/// Client-facing error body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        json_reply(status, ErrorBody { error: self.to_string() })
    }
}

/// JSON reply carrying the permissive origin header every proxy reply has.
pub fn json_reply<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

/// Plain-text reply used by the static resolver and the router fallback.
pub fn text_reply(status: StatusCode, body: &'static str) -> Response {
    (status, [(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)], body).into_response()
}

/// Returned by the gateway service when a request must be dropped without
/// any reply. The connection serving it is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionAborted {
    pub limit: usize,
}

impl fmt::Display for ConnectionAborted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request body exceeded {} bytes; connection aborted", self.limit)
    }
}

impl std::error::Error for ConnectionAborted {}
