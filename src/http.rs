//! Shared HTTP client factory.
//!
//! Upstream calls are single-shot: the client carries no request timeout and
//! nothing in the crate retries.

use reqwest::Client;

/// User agent sent with every upstream request.
pub const USER_AGENT: &str = concat!("dashgate/", env!("CARGO_PKG_VERSION"));

/// Create the HTTP client used for upstream calls.
pub fn create_client() -> Result<Client, reqwest::Error> {
    Client::builder().user_agent(USER_AGENT).build()
}
