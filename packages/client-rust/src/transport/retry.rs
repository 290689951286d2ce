//! Response classifier: one credential refresh and retry on `401`.

use std::sync::Arc;
use std::task::{Context, Poll};

use http::StatusCode;
use tower::{Layer, Service, ServiceExt};
use tracing::debug;

use super::error::TransportError;
use super::request::{ApiRequest, ApiResponse, CredentialMode};
use super::BoxFuture;
use crate::session::CredentialSource;

// ---------------------------------------------------------------------------
// RefreshRetryLayer
// ---------------------------------------------------------------------------

/// Tower layer that re-issues a request exactly once with
/// [`CredentialMode::ForceRefresh`] when it comes back `401` while a
/// session exists.
///
/// The retried request is never retried again; a second `401` is returned
/// as-is for the classifier to turn into a failure.
#[derive(Clone)]
pub struct RefreshRetryLayer {
    credentials: Arc<dyn CredentialSource>,
}

impl RefreshRetryLayer {
    #[must_use]
    pub fn new(credentials: Arc<dyn CredentialSource>) -> Self {
        Self { credentials }
    }
}

impl<S> Layer<S> for RefreshRetryLayer {
    type Service = RefreshRetryService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RefreshRetryService {
            inner,
            credentials: Arc::clone(&self.credentials),
        }
    }
}

// ---------------------------------------------------------------------------
// RefreshRetryService
// ---------------------------------------------------------------------------

/// Service wrapper produced by [`RefreshRetryLayer`].
#[derive(Clone)]
pub struct RefreshRetryService<S> {
    inner: S,
    credentials: Arc<dyn CredentialSource>,
}

impl<S> Service<ApiRequest> for RefreshRetryService<S>
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

    fn call(&mut self, req: ApiRequest) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let credentials = Arc::clone(&self.credentials);

        Box::pin(async move {
            let already_refreshed = req.credential == CredentialMode::ForceRefresh;
            let mut retry = req.clone();
            let response = inner.call(req).await?;

            if response.status != StatusCode::UNAUTHORIZED
                || already_refreshed
                || !credentials.has_session()
            {
                return Ok(response);
            }

            debug!(request_id = %retry.request_id, path = %retry.path(), "401 received, retrying with refreshed credential");
            retry.credential = CredentialMode::ForceRefresh;
            retry.bearer = None;
            inner.ready().await?.call(retry).await
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
