//! Static file serving confined to a public root.
//!
//! URL paths are decoded, joined onto the root and lexically normalized; the
//! normalized path must stay inside the root before the filesystem is touched.

use crate::error::text_reply;
use axum::{
    body::Bytes,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use percent_encoding::percent_decode_str;
use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Content type for extensions missing from the table.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Get the Content-Type for a file path from its lowercased extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        _ => FALLBACK_CONTENT_TYPE,
    }
}

/// Resolve `.` and `..` segments without consulting the filesystem.
///
/// `..` at the filesystem root stays at the root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => normalized.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}

/// A file read from the public root.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub bytes: Bytes,
    pub content_type: &'static str,
}

impl IntoResponse for Asset {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, self.content_type),
                (header::CACHE_CONTROL, "no-store"),
            ],
            self.bytes,
        )
            .into_response()
    }
}

/// Why an asset could not be served.
#[derive(Debug)]
pub enum AssetError {
    /// The path escapes the public root.
    Forbidden,
    /// No file at the resolved path.
    NotFound,
    /// Any other read failure.
    Io(io::Error),
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forbidden => write!(f, "path escapes the public root"),
            Self::NotFound => write!(f, "asset not found"),
            Self::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for AssetError {}

impl AssetError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AssetError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            Self::Forbidden => "Forbidden",
            Self::NotFound => "Not Found",
            Self::Io(_) => "Internal Server Error",
        };
        text_reply(status, body)
    }
}

/// The directory static files are served from.
#[derive(Debug, Clone)]
pub struct AssetRoot {
    root: PathBuf,
    default_document: String,
}

impl AssetRoot {
    /// Anchor `dir` as an absolute, normalized root.
    pub fn new(dir: impl AsRef<Path>, default_document: impl Into<String>) -> io::Result<Self> {
        let absolute = std::path::absolute(dir.as_ref())?;
        Ok(Self {
            root: normalize(&absolute),
            default_document: default_document.into(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a URL path onto a file path inside the root.
    pub fn resolve(&self, url_path: &str) -> Result<PathBuf, AssetError> {
        let decoded = percent_decode_str(url_path).decode_utf8_lossy();
        let relative = match decoded.trim_start_matches('/') {
            "" => self.default_document.as_str(),
            rest => rest,
        };

        let candidate = normalize(&self.root.join(relative));
        // Path::starts_with compares whole components, so "/srv/public-x"
        // does not count as inside "/srv/public".
        if candidate.starts_with(&self.root) {
            Ok(candidate)
        } else {
            Err(AssetError::Forbidden)
        }
    }

    /// Resolve and read the file for `url_path`.
    pub async fn load(&self, url_path: &str) -> Result<Asset, AssetError> {
        let path = self.resolve(url_path).inspect_err(|_| {
            tracing::warn!(path = %url_path, "Rejected path outside public root");
        })?;

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Asset {
                bytes: Bytes::from(bytes),
                content_type: content_type_for(&path),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(AssetError::NotFound),
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Error serving asset");
                Err(AssetError::Io(e))
            }
        }
    }

    /// Serve `url_path` as a complete response.
    pub async fn serve(&self, url_path: &str) -> Response {
        match self.load(url_path).await {
            Ok(asset) => asset.into_response(),
            Err(e) => e.into_response(),
        }
    }
}

/// Plain-text 404 shared with the router fallback.
pub fn not_found() -> Response {
    text_reply(StatusCode::NOT_FOUND, "Not Found")
}
