//! Request tracing middleware.
//!
//! Wraps every call in an `api_request` span and records duration, status
//! and outcome on completion.

use std::task::{Context, Poll};
use std::time::Instant;

use tower::{Layer, Service};
use tracing::{info_span, Instrument};

use super::error::TransportError;
use super::request::{ApiRequest, ApiResponse};
use super::BoxFuture;

// ---------------------------------------------------------------------------
// TraceLayer
// ---------------------------------------------------------------------------

/// Tower layer that instruments API calls with `tracing` spans.
#[derive(Debug, Clone, Copy)]
pub struct TraceLayer;

impl<S> Layer<S> for TraceLayer {
    type Service = TraceService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TraceService { inner }
    }
}

// ---------------------------------------------------------------------------
// TraceService
// ---------------------------------------------------------------------------

/// Service wrapper that records call duration and outcome.
#[derive(Debug, Clone)]
pub struct TraceService<S> {
    inner: S,
}

impl<S> Service<ApiRequest> for TraceService<S>
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
        let method = req.method.clone();
        let path = req.path();
        let request_id = req.request_id.clone();

        let span = info_span!(
            "api_request",
            method = %method,
            path = %path,
            request_id = %request_id,
            status = tracing::field::Empty,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        let fut = self.inner.call(req);

        Box::pin(
            async move {
                let start = Instant::now();
                let result = fut.await;
                let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

                let span = tracing::Span::current();
                span.record("duration_ms", duration_ms);
                match &result {
                    Ok(resp) => {
                        span.record("status", resp.status.as_u16());
                        span.record("outcome", "ok");
                        tracing::debug!(%method, %path, status = resp.status.as_u16(), duration_ms, "api request complete");
                    }
                    Err(err) => {
                        if let Some(status) = err.status() {
                            span.record("status", status.as_u16());
                        }
                        span.record("outcome", "error");
                        tracing::info!(%method, %path, duration_ms, error = %err, "api request failed");
                    }
                }

                result
            }
            .instrument(span),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
