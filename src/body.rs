//! Bounded request body collection.
//!
//! Bodies are read chunk by chunk; once the running total would pass the
//! ceiling the read stops and the caller must drop the connection.

use axum::body::{Body, Bytes};
use futures::StreamExt;
use std::fmt;

/// Why a body could not be collected.
#[derive(Debug)]
pub enum CollectError {
    /// The body grew past the ceiling.
    TooLarge { limit: usize },
    /// The underlying stream failed.
    Stream(axum::Error),
}

impl fmt::Display for CollectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLarge { limit } => write!(f, "request body exceeds {} bytes", limit),
            Self::Stream(e) => write!(f, "request stream error: {}", e),
        }
    }
}

impl std::error::Error for CollectError {}

/// Accumulate `body` into memory, refusing to hold more than `limit` bytes.
///
/// A body of exactly `limit` bytes completes normally.
pub async fn collect(body: Body, limit: usize) -> Result<Bytes, CollectError> {
    let mut stream = body.into_data_stream();
    let mut buffer = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(CollectError::Stream)?;
        if buffer.len() + chunk.len() > limit {
            return Err(CollectError::TooLarge { limit });
        }
        buffer.extend_from_slice(&chunk);
    }

    Ok(Bytes::from(buffer))
}
