//! Client configuration

use std::time::Duration;

use checkout_core::{CheckoutError, Result};

/// Back-end connection and stub settings
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL every endpoint path is appended to
    pub base_url: String,

    /// Per-request timeout
    pub timeout: Duration,

    /// Simulated latency of the tokenization stub
    pub tokenize_delay: Duration,
}

impl ClientConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_TOKENIZE_DELAY_MS: u64 = 500;

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            tokenize_delay: Duration::from_millis(Self::DEFAULT_TOKENIZE_DELAY_MS),
        }
    }

    /// Load from environment variables
    ///
    /// - `CHECKOUT_API_BASE_URL` (required)
    /// - `CHECKOUT_HTTP_TIMEOUT_SECS` (default 30)
    /// - `CHECKOUT_TOKENIZE_DELAY_MS` (default 500)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] over any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let base_url = lookup("CHECKOUT_API_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| CheckoutError::Config("CHECKOUT_API_BASE_URL is not set".into()))?;

        let timeout_secs = lookup("CHECKOUT_HTTP_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(Self::DEFAULT_TIMEOUT_SECS);
        let delay_ms = lookup("CHECKOUT_TOKENIZE_DELAY_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(Self::DEFAULT_TOKENIZE_DELAY_MS);

        Ok(Self {
            timeout: Duration::from_secs(timeout_secs),
            tokenize_delay: Duration::from_millis(delay_ms),
            ..Self::new(base_url)
        })
    }
}
