//! dashgate - Static file server and DashScope chat proxy.
//!
//! Features:
//! - Static files from a public root with path containment checks
//! - `/api/chat` and `/api/image-to-text` proxied to DashScope
//! - Bounded request bodies; oversized uploads drop the connection
//! - Stable `{response}` / `{error}` client contract

pub mod api;
pub mod assets;
pub mod body;
pub mod config;
pub mod error;
pub mod http;
pub mod logger;
pub mod server;
pub mod upstream;
