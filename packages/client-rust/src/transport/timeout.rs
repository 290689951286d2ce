//! Per-attempt timeout for HTTP requests.
//!
//! Rejects attempts that exceed their deadline with
//! [`TransportError::Timeout`]. The deadline is the request's own
//! [`ApiRequest::timeout`] when set, else the layer default.

use std::task::{Context, Poll};
use std::time::Duration;

use tower::{Layer, Service};

use super::error::TransportError;
use super::request::{ApiRequest, ApiResponse};
use super::BoxFuture;

// ---------------------------------------------------------------------------
// TimeoutLayer
// ---------------------------------------------------------------------------

/// Tower layer enforcing a deadline on every attempt.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutLayer {
    default: Duration,
}

impl TimeoutLayer {
    #[must_use]
    pub fn new(default: Duration) -> Self {
        Self { default }
    }
}

impl<S> Layer<S> for TimeoutLayer {
    type Service = TimeoutService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TimeoutService {
            inner,
            default: self.default,
        }
    }
}

// ---------------------------------------------------------------------------
// TimeoutService
// ---------------------------------------------------------------------------

/// Service wrapper that enforces per-attempt timeouts.
#[derive(Debug, Clone)]
pub struct TimeoutService<S> {
    inner: S,
    default: Duration,
}

impl<S> Service<ApiRequest> for TimeoutService<S>
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
        let duration = req.timeout.unwrap_or(self.default);
        let fut = self.inner.call(req);
        Box::pin(async move {
            match tokio::time::timeout(duration, fut).await {
                Ok(result) => result,
                Err(_elapsed) => Err(TransportError::Timeout {
                    timeout_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
                }),
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use http::{Method, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::transport::testing::Scripted;

    #[tokio::test(start_paused = true)]
    async fn completes_within_timeout() {
        let inner = Scripted::new([StatusCode::OK]).with_delay(Duration::from_millis(999));
        let svc = TimeoutLayer::new(Duration::from_secs(1)).layer(inner);
        let resp = svc
            .oneshot(ApiRequest::new(Method::GET, ["api"]))
            .await
            .unwrap();
        assert_eq!(resp.status, StatusCode::OK);
    }

    #[tokio::test(start_paused = true)]
    async fn exceeds_timeout_returns_error() {
        let inner = Scripted::new([StatusCode::OK]).with_delay(Duration::from_secs(60));
        let svc = TimeoutLayer::new(Duration::from_secs(1)).layer(inner);
        let mut req = ApiRequest::new(Method::GET, ["api"]);
        req.timeout = Some(Duration::from_millis(50));
        let err = svc.oneshot(req).await.unwrap_err();
        assert_eq!(err, TransportError::Timeout { timeout_ms: 50 });
    }
}
