//! Error Types

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lifecycle::{LifecycleEvent, LinkStatus};

/// Result type alias for checkout operations
pub type Result<T> = std::result::Result<T, CheckoutError>;

/// Uniform shape for any non-2xx response or network fault
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable message
    pub message: String,

    /// HTTP status code, absent for network faults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Raw response payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ApiError {
    /// Network-level failure with no response
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            data: None,
        }
    }

    /// Build from a failed response. The payload's `message` field wins
    /// over the generic status text.
    pub fn from_response(status: u16, data: Option<serde_json::Value>) -> Self {
        let message = data
            .as_ref()
            .and_then(|d| d.get("message"))
            .map(|m| match m {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| format!("HTTP error {status}"));

        Self {
            message,
            status: Some(status),
            data,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (status {status})", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Checkout error types
#[derive(Error, Debug)]
pub enum CheckoutError {
    /// Local input validation failed before any network call
    #[error("Validation error on {field}: {message}")]
    Validation { field: &'static str, message: String },

    /// Transport failure (non-2xx or network fault)
    #[error("Transport error: {0}")]
    Transport(ApiError),

    /// Requested entity does not exist
    #[error("{0}")]
    NotFound(String),

    /// Response body did not match the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Lifecycle event not allowed from the current status
    #[error("Invalid transition: {event} not allowed from {from}")]
    InvalidTransition {
        from: LinkStatus,
        event: LifecycleEvent,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CheckoutError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Informational only: nothing in this workspace retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(err) => err.status.is_none_or(|s| s >= 500),
            _ => false,
        }
    }

    /// Convert to a user-facing message
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { message, .. } => message.clone(),
            Self::Transport(err) => err.message.clone(),
            Self::NotFound(msg) => msg.clone(),
            Self::Decode(_) | Self::Json(_) => "Respuesta inesperada del servidor".into(),
            Self::InvalidTransition { .. } => "El link de pago ya no acepta pagos".into(),
            Self::Config(_) => "Error de configuración del servicio".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_error_prefers_payload_message() {
        let err = ApiError::from_response(400, Some(json!({"message": "amount too low"})));
        assert_eq!(err.message, "amount too low");
        assert_eq!(err.status, Some(400));
    }

    #[test]
    fn test_api_error_falls_back_to_status() {
        let err = ApiError::from_response(503, Some(json!("upstream down")));
        assert_eq!(err.message, "HTTP error 503");
        assert_eq!(err.data, Some(json!("upstream down")));
    }

    #[test]
    fn test_retryable_only_for_server_faults() {
        assert!(CheckoutError::Transport(ApiError::network("reset")).is_retryable());
        assert!(!CheckoutError::Transport(ApiError::from_response(404, None)).is_retryable());
        assert!(!CheckoutError::validation("amount", "bad").is_retryable());
    }
}
