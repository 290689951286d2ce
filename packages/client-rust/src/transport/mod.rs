//! HTTP transport: a tower pipeline of request decorators and response
//! classifiers in front of a `reqwest` client.
//!
//! - [`http`]: the innermost `reqwest`-backed service
//! - [`timeout`]: per-attempt deadline
//! - [`auth`]: bearer credential attachment
//! - [`retry`]: single refresh-and-retry on `401`
//! - [`classify`]: non-2xx responses to [`TransportError`]
//! - [`trace`]: per-call `tracing` spans
//! - [`pipeline`]: composes all layers into one service

use std::future::Future;
use std::pin::Pin;

pub mod auth;
pub mod classify;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod request;
pub mod retry;
pub mod timeout;
pub mod trace;

#[cfg(test)]
pub(crate) mod testing;

pub use self::http::HttpService;
pub use auth::BearerAuthLayer;
pub use classify::ClassifyLayer;
pub use error::TransportError;
pub use pipeline::{build_transport_pipeline, TransportService};
pub use request::{ApiRequest, ApiResponse, CredentialMode};
pub use retry::RefreshRetryLayer;
pub use timeout::TimeoutLayer;
pub use trace::TraceLayer;

/// Boxed future returned by every pipeline service.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, TransportError>> + Send>>;
