//! Response classifier: maps non-success statuses to [`TransportError`].

use std::task::{Context, Poll};

use http::StatusCode;
use tower::{Layer, Service};

use super::error::TransportError;
use super::request::{ApiRequest, ApiResponse};
use super::BoxFuture;

/// Tower layer that turns any non-2xx response into an error.
///
/// `401` becomes [`TransportError::Unauthorized`]; every other failure
/// status becomes [`TransportError::Status`] carrying the backend's message.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyLayer;

impl<S> Layer<S> for ClassifyLayer {
    type Service = ClassifyService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ClassifyService { inner }
    }
}

/// Service wrapper produced by [`ClassifyLayer`].
#[derive(Debug, Clone)]
pub struct ClassifyService<S> {
    inner: S,
}

impl<S> Service<ApiRequest> for ClassifyService<S>
where
    S: Service<ApiRequest, Response = ApiResponse, Error = TransportError> + Send,
    S::Future: Send + 'static,
{
    type Response = ApiResponse;
    type Error = TransportError;
    type Future = BoxFuture<ApiResponse>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: ApiRequest) -> Self::Future {
        let fut = self.inner.call(req);
        Box::pin(async move { classify(fut.await?) })
    }
}

/// Classifies a single response.
///
/// # Errors
///
/// Returns the failure matching the response status.
pub fn classify(response: ApiResponse) -> Result<ApiResponse, TransportError> {
    if response.status.is_success() {
        return Ok(response);
    }
    let message = response.error_message();
    if response.status == StatusCode::UNAUTHORIZED {
        Err(TransportError::Unauthorized(message))
    } else {
        Err(TransportError::Status {
            status: response.status.as_u16(),
            message,
        })
    }
}
