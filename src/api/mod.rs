//! HTTP surface of the gateway.
//!
//! Endpoints:
//! - GET <any path> - Static file from the public root
//! - POST /api/chat - Text chat completion
//! - POST /api/image-to-text - Image description
//! - OPTIONS /api/chat, /api/image-to-text - CORS preflight

mod handlers;
mod routes;
mod types;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use reqwest::Client;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::assets::{self, AssetRoot};
use crate::body::{self, CollectError};
use crate::config::Config;
use crate::error::{ConnectionAborted, GatewayError};
use crate::upstream::UpstreamClient;

pub use handlers::{chat_text, vision_text, DEFAULT_IMAGE_PROMPT, NO_RESPONSE};
pub use routes::{Endpoint, Route};
pub use types::*;

/// Read-only state shared by every request.
#[derive(Debug)]
pub struct AppState {
    pub config: Arc<Config>,
    pub assets: AssetRoot,
    pub upstream: UpstreamClient,
}

impl AppState {
    pub fn new(config: Config, client: Client) -> std::io::Result<Self> {
        let assets = AssetRoot::new(&config.gateway.public_dir, config.gateway.default_document.clone())?;
        let upstream = UpstreamClient::new(client, config.upstream.url.clone());
        Ok(Self {
            config: Arc::new(config),
            assets,
            upstream,
        })
    }
}

/// The gateway as a tower service.
///
/// Fails only when a request has to be dropped without a reply; the server
/// closes the connection in that case.
#[derive(Debug, Clone)]
pub struct Gateway {
    state: Arc<AppState>,
}

impl Gateway {
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }
}

impl tower::Service<Request<Body>> for Gateway {
    type Response = Response;
    type Error = ConnectionAborted;
    type Future = BoxFuture<'static, Result<Response, ConnectionAborted>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let state = Arc::clone(&self.state);
        Box::pin(async move { dispatch(&state, request).await })
    }
}

/// Route one request and produce its single response.
pub async fn dispatch(state: &AppState, request: Request<Body>) -> Result<Response, ConnectionAborted> {
    let (parts, body) = request.into_parts();
    let path = parts.uri.path();

    let response = match Route::resolve(&parts.method, path) {
        Route::Asset => state.assets.serve(path).await,
        Route::Proxy(endpoint) => {
            let limit = state.config.gateway.max_body_bytes;
            let raw = match body::collect(body, limit).await {
                Ok(raw) => raw,
                Err(CollectError::TooLarge { limit }) => {
                    tracing::warn!(endpoint = endpoint.path(), limit, "Request body too large, dropping connection");
                    return Err(ConnectionAborted { limit });
                }
                Err(e @ CollectError::Stream(_)) => {
                    tracing::warn!(endpoint = endpoint.path(), error = %e, "Request stream error");
                    return Ok(GatewayError::InvalidStream.into_response());
                }
            };
            handlers::proxy(state, endpoint, raw).await
        }
        Route::Preflight(_) => preflight(),
        Route::NotFound => assets::not_found(),
    };

    Ok(response)
}

/// Fixed CORS preflight reply.
pub fn preflight() -> Response {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
        ],
    )
        .into_response()
}
