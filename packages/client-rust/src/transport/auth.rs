//! Request decorator: attaches the session's bearer credential.

use std::sync::Arc;
use std::task::{Context, Poll};

use tower::{Layer, Service};
use tracing::warn;

use super::error::TransportError;
use super::request::{ApiRequest, ApiResponse, CredentialMode};
use super::BoxFuture;
use crate::session::CredentialSource;

// ---------------------------------------------------------------------------
// BearerAuthLayer
// ---------------------------------------------------------------------------

/// Tower layer that fills [`ApiRequest::bearer`] from a [`CredentialSource`].
///
/// Without a session the request goes out unauthenticated. A failure to read
/// the cached credential is logged and the request proceeds without it; a
/// failure to force-refresh fails the request.
#[derive(Clone)]
pub struct BearerAuthLayer {
    credentials: Arc<dyn CredentialSource>,
}

impl BearerAuthLayer {
    #[must_use]
    pub fn new(credentials: Arc<dyn CredentialSource>) -> Self {
        Self { credentials }
    }
}

impl<S> Layer<S> for BearerAuthLayer {
    type Service = BearerAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BearerAuthService {
            inner,
            credentials: Arc::clone(&self.credentials),
        }
    }
}

// ---------------------------------------------------------------------------
// BearerAuthService
// ---------------------------------------------------------------------------

/// Service wrapper produced by [`BearerAuthLayer`].
#[derive(Clone)]
pub struct BearerAuthService<S> {
    inner: S,
    credentials: Arc<dyn CredentialSource>,
}

impl<S> Service<ApiRequest> for BearerAuthService<S>
where
    S: Service<ApiRequest, Response = ApiResponse, Error = TransportError> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = ApiResponse;
    type Error = TransportError;
    type Future = BoxFuture<ApiResponse>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: ApiRequest) -> Self::Future {
        // Keep the instance that was polled ready.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let credentials = Arc::clone(&self.credentials);

        Box::pin(async move {
            if credentials.has_session() {
                let force = req.credential == CredentialMode::ForceRefresh;
                match credentials.bearer_token(force).await {
                    Ok(token) => req.bearer = token,
                    Err(err) if force => return Err(TransportError::Credential(err.to_string())),
                    Err(err) => {
                        warn!(error = %err, request_id = %req.request_id, "bearer credential unavailable, sending unauthenticated");
                        req.bearer = None;
                    }
                }
            } else {
                req.bearer = None;
            }
            inner.call(req).await
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
