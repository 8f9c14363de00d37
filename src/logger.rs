//! Tracing setup and startup banner.
//!
//! Verbosity levels:
//! - Minimal: `dashgate:<port>` and nothing else on stdout
//! - Compact: two arrow lines
//! - Verbose: boxed summary, log targets included

use crate::config::{Config, LogFormat, LogVerbosity, LoggingConfig};
use std::net::SocketAddr;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the default `info` filter.
pub fn init(config: &LoggingConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_target(config.verbosity == LogVerbosity::Verbose))
            .try_init(),
    }
}

/// Startup banner for `addr`.
pub fn banner(config: &Config, addr: SocketAddr) -> String {
    match config.logging.verbosity {
        LogVerbosity::Minimal => format!("dashgate:{}", addr.port()),
        LogVerbosity::Compact => format!(
            "→ dashgate starting on http://{}\n→ Serving {}",
            addr,
            config.gateway.public_dir.display()
        ),
        LogVerbosity::Verbose => {
            let separator = "────────────────────────────────────────";
            let api_key = if config.api_key().is_some() { "configured" } else { "missing" };
            format!(
                "{separator}\n\
                 dashgate v{version}\n\
                 {separator}\n\
                 Gateway:    http://{addr}\n\
                 Static:     {public}\n\
                 Upstream:   {upstream}\n\
                 API key:    {api_key}\n\
                 Body limit: {limit} bytes\n\
                 {separator}",
                separator = separator,
                version = env!("CARGO_PKG_VERSION"),
                addr = addr,
                public = config.gateway.public_dir.display(),
                upstream = config.upstream.url,
                api_key = api_key,
                limit = config.gateway.max_body_bytes,
            )
        }
    }
}
