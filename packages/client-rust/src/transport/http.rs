//! Innermost pipeline service: executes an [`ApiRequest`] with `reqwest`.

use std::task::{Context, Poll};

use http::header::{HeaderValue, CONTENT_TYPE};
use reqwest::Url;
use tower::Service;

use super::error::TransportError;
use super::request::{ApiRequest, ApiResponse};
use super::BoxFuture;

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Sends requests to the configured backend origin.
///
/// Any HTTP status is a successful response at this level; classification
/// happens further out in the pipeline.
#[derive(Debug, Clone)]
pub struct HttpService {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpService {
    /// Creates the service for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidRequest`] if `base_url` is not an
    /// absolute URL that can carry path segments.
    pub fn new(client: reqwest::Client, base_url: &str) -> Result<Self, TransportError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| TransportError::InvalidRequest(format!("base url {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(TransportError::InvalidRequest(format!(
                "base url {base_url} cannot carry a path"
            )));
        }
        Ok(Self { client, base_url })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, segments: &[String]) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| TransportError::InvalidRequest("base url cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl Service<ApiRequest> for HttpService {
    type Response = ApiResponse;
    type Error = TransportError;
    type Future = BoxFuture<ApiResponse>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ApiRequest) -> Self::Future {
        let url = self.url_for(&req.segments);
        let client = self.client.clone();
        Box::pin(async move {
            let url = url?;
            let mut builder = client
                .request(req.method.clone(), url)
                .header(REQUEST_ID_HEADER, &req.request_id);
            if !req.query.is_empty() {
                builder = builder.query(&req.query);
            }
            if let Some(token) = &req.bearer {
                builder = builder.bearer_auth(token);
            }
            if let Some(body) = &req.body {
                builder = builder
                    .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                    .body(body.to_string());
            }

            let response = builder.send().await?;
            let status = response.status();
            let body = response.bytes().await?;
            Ok(ApiResponse { status, body })
        })
    }
}
