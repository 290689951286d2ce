//! Stub services and credential sources shared by the transport tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;
use parking_lot::Mutex;
use tower::Service;

use super::error::TransportError;
use super::request::{ApiRequest, ApiResponse};
use super::BoxFuture;
use crate::session::CredentialSource;

/// Credential source with fixed cached and refreshed tokens.
pub(crate) struct FixedCredentials {
    session: bool,
    cached: &'static str,
    fresh: &'static str,
    fail: bool,
}

impl FixedCredentials {
    pub(crate) fn signed_in(cached: &'static str, fresh: &'static str) -> Self {
        Self {
            session: true,
            cached,
            fresh,
            fail: false,
        }
    }

    pub(crate) fn signed_out() -> Self {
        Self {
            session: false,
            cached: "",
            fresh: "",
            fail: false,
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            session: true,
            cached: "",
            fresh: "",
            fail: true,
        }
    }
}

#[async_trait]
impl CredentialSource for FixedCredentials {
    fn has_session(&self) -> bool {
        self.session
    }

    async fn bearer_token(&self, force_refresh: bool) -> anyhow::Result<Option<String>> {
        if self.fail {
            anyhow::bail!("identity provider unreachable");
        }
        if !self.session {
            return Ok(None);
        }
        let token = if force_refresh { self.fresh } else { self.cached };
        Ok(Some(token.to_string()))
    }
}

/// Responds `200` with the attached bearer token as the body.
#[derive(Clone)]
pub(crate) struct EchoBearer;

impl Service<ApiRequest> for EchoBearer {
    type Response = ApiResponse;
    type Error = TransportError;
    type Future = BoxFuture<ApiResponse>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ApiRequest) -> Self::Future {
        let body = req.bearer.unwrap_or_default();
        Box::pin(async move { Ok(ApiResponse::new(StatusCode::OK, body)) })
    }
}

/// Replays a fixed sequence of statuses and records every request.
#[derive(Clone)]
pub(crate) struct Scripted {
    statuses: Arc<Mutex<VecDeque<StatusCode>>>,
    seen: Arc<Mutex<Vec<ApiRequest>>>,
    delay: Duration,
}

impl Scripted {
    pub(crate) fn new(statuses: impl IntoIterator<Item = StatusCode>) -> Self {
        Self {
            statuses: Arc::new(Mutex::new(statuses.into_iter().collect())),
            seen: Arc::new(Mutex::new(Vec::new())),
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.seen.lock().clone()
    }
}

impl Service<ApiRequest> for Scripted {
    type Response = ApiResponse;
    type Error = TransportError;
    type Future = BoxFuture<ApiResponse>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ApiRequest) -> Self::Future {
        self.seen.lock().push(req);
        let status = self
            .statuses
            .lock()
            .pop_front()
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let delay = self.delay;
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok(ApiResponse::new(status, "{}"))
        })
    }
}
