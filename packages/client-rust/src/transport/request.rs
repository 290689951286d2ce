//! Request and response values flowing through the transport pipeline.

use std::time::Duration;

use bytes::Bytes;
use http::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::TransportError;

/// Which credential the bearer layer should attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialMode {
    /// Whatever the identity provider has cached.
    #[default]
    Cached,
    /// A freshly minted credential. Set on the single retry after a 401.
    ForceRefresh,
}

/// An API call before it reaches the wire.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path segments below the base URL, unescaped.
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    /// Value of the `X-Request-Id` header.
    pub request_id: String,
    /// Bearer credential, filled in by the auth layer.
    pub bearer: Option<String>,
    pub credential: CredentialMode,
    /// Per-request timeout overriding the pipeline default.
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    /// A bodiless request for `segments` with a fresh request id.
    #[must_use]
    pub fn new<I, S>(method: Method, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            body: None,
            request_id: uuid::Uuid::new_v4().to_string(),
            bearer: None,
            credential: CredentialMode::Cached,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    /// Attaches a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidRequest`] if `body` cannot be
    /// serialized.
    pub fn with_json<T: Serialize>(mut self, body: &T) -> Result<Self, TransportError> {
        let value = serde_json::to_value(body)
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Slash-joined path, for logs.
    #[must_use]
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

/// A raw response, before status classification.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl ApiResponse {
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Deserializes the JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Decode`] when the body is not the expected
    /// JSON shape.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_json::from_slice(&self.body).map_err(|e| TransportError::Decode(e.to_string()))
    }

    /// Human-readable failure text: the backend's `message` field when the
    /// body carries one, else the canonical reason phrase.
    #[must_use]
    pub fn error_message(&self) -> String {
        serde_json::from_slice::<serde_json::Value>(&self.body)
            .ok()
            .and_then(|body| {
                body.get("message")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string)
            })
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| {
                self.status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            })
    }
}
