//! Method + path dispatch table.

use axum::http::Method;

/// The two proxied JSON endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Chat,
    ImageToText,
}

impl Endpoint {
    pub const ALL: [Endpoint; 2] = [Endpoint::Chat, Endpoint::ImageToText];

    pub fn path(self) -> &'static str {
        match self {
            Self::Chat => "/api/chat",
            Self::ImageToText => "/api/image-to-text",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|endpoint| endpoint.path() == path)
    }

    /// Message returned when the handler fails unexpectedly.
    pub fn failure_message(self) -> &'static str {
        match self {
            Self::Chat => "Failed to process request.",
            Self::ImageToText => "Failed to process image.",
        }
    }
}

/// Where a request goes. Every method/path pair maps to exactly one route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// GET of any path: static file.
    Asset,
    /// POST to a proxy endpoint.
    Proxy(Endpoint),
    /// OPTIONS to a proxy endpoint: CORS preflight.
    Preflight(Endpoint),
    /// Everything else.
    NotFound,
}

impl Route {
    pub fn resolve(method: &Method, path: &str) -> Self {
        match (method, Endpoint::from_path(path)) {
            (&Method::GET, _) => Self::Asset,
            (&Method::POST, Some(endpoint)) => Self::Proxy(endpoint),
            (&Method::OPTIONS, Some(endpoint)) => Self::Preflight(endpoint),
            _ => Self::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_always_serves_assets() {
        for path in ["/", "/index.html", "/api/chat", "/../etc/passwd"] {
            assert_eq!(Route::resolve(&Method::GET, path), Route::Asset, "{}", path);
        }
    }

    #[test]
    fn post_to_known_paths_is_proxied() {
        assert_eq!(Route::resolve(&Method::POST, "/api/chat"), Route::Proxy(Endpoint::Chat));
        assert_eq!(
            Route::resolve(&Method::POST, "/api/image-to-text"),
            Route::Proxy(Endpoint::ImageToText)
        );
    }

    #[test]
    fn options_to_known_paths_is_preflight() {
        for endpoint in Endpoint::ALL {
            assert_eq!(
                Route::resolve(&Method::OPTIONS, endpoint.path()),
                Route::Preflight(endpoint)
            );
        }
    }

    #[test]
    fn everything_else_is_not_found() {
        for (method, path) in [
            (Method::POST, "/api/chat/"),
            (Method::POST, "/index.html"),
            (Method::OPTIONS, "/"),
            (Method::PUT, "/api/chat"),
            (Method::DELETE, "/api/image-to-text"),
            (Method::HEAD, "/index.html"),
            (Method::PATCH, "/"),
        ] {
            assert_eq!(Route::resolve(&method, path), Route::NotFound, "{} {}", method, path);
        }
    }

    #[test]
    fn endpoint_paths_round_trip() {
        for endpoint in Endpoint::ALL {
            assert_eq!(Endpoint::from_path(endpoint.path()), Some(endpoint));
        }
        assert_eq!(Endpoint::from_path("/api/other"), None);
    }
}
