//! Configuration types for the HTTP client

use std::time::Duration;

/// Configuration for [`Client`](crate::Client).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Total per-request timeout. Raise this for very large downloads.
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("fetchkit/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
