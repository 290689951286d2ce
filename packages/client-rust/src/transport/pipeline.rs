//! Pipeline composition: combines the transport layers into one service.

use std::sync::Arc;
use std::time::Duration;

use tower::util::BoxCloneSyncService;
use tower::{Service, ServiceBuilder};

use super::auth::BearerAuthLayer;
use super::classify::ClassifyLayer;
use super::error::TransportError;
use super::request::{ApiRequest, ApiResponse};
use super::retry::RefreshRetryLayer;
use super::timeout::TimeoutLayer;
use super::trace::TraceLayer;
use crate::session::CredentialSource;

/// The composed, type-erased transport service.
pub type TransportService = BoxCloneSyncService<ApiRequest, ApiResponse, TransportError>;

/// Wraps `inner` (normally [`super::HttpService`]) with the transport layers.
///
/// Layer order (outermost to innermost):
/// 1. `TraceLayer` -- one span per logical call, retries included
/// 2. `ClassifyLayer` -- non-2xx responses become `TransportError`
/// 3. `RefreshRetryLayer` -- a single forced-refresh retry on `401`
/// 4. `BearerAuthLayer` -- attach the session credential to each attempt
/// 5. `TimeoutLayer` -- bound each attempt (closest to the wire)
#[must_use]
pub fn build_transport_pipeline<S>(
    inner: S,
    credentials: Arc<dyn CredentialSource>,
    request_timeout: Duration,
) -> TransportService
where
    S: Service<ApiRequest, Response = ApiResponse, Error = TransportError> + Clone + Send + Sync + 'static,
    S::Future: Send + 'static,
{
    let service = ServiceBuilder::new()
        .layer(TraceLayer)
        .layer(ClassifyLayer)
        .layer(RefreshRetryLayer::new(Arc::clone(&credentials)))
        .layer(BearerAuthLayer::new(credentials))
        .layer(TimeoutLayer::new(request_timeout))
        .service(inner);
    BoxCloneSyncService::new(service)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
