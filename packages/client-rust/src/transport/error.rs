//! Uniform failure type for everything that crosses the network boundary.

use http::StatusCode;

/// Transport-level failure. No raw `reqwest` error escapes the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("credential refresh failed: {0}")]
    Credential(String),
}

impl TransportError {
    /// HTTP status carried by the error, if it came from a response.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Unauthorized(_) => Some(StatusCode::UNAUTHORIZED),
            Self::Status { status, .. } => StatusCode::from_u16(*status).ok(),
            _ => None,
        }
    }

    /// Whether re-issuing the same request may succeed.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout { timeout_ms: 0 }
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else if err.is_builder() {
            Self::InvalidRequest(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_reported_for_response_errors() {
        let err = TransportError::Status {
            status: 404,
            message: "Employee not found".to_string(),
        };
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(err.to_string(), "Employee not found");
        assert!(!err.is_retriable());
    }

    #[test]
    fn network_failures_are_retriable() {
        assert!(TransportError::Network("reset".to_string()).is_retriable());
        assert!(TransportError::Timeout { timeout_ms: 10 }.is_retriable());
        assert!(TransportError::Status {
            status: 503,
            message: String::new()
        }
        .is_retriable());
        assert!(!TransportError::Unauthorized("expired".to_string()).is_retriable());
    }
}
