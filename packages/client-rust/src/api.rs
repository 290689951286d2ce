//! Typed employee API over the transport pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use directory_core::{build_query, Attributes, PageResponse, QueryParams, Record, SchemaResult, UpsertRequest};
use http::Method;
use tower::ServiceExt;

use crate::config::ClientConfig;
use crate::session::CredentialSource;
use crate::transport::{
    build_transport_pipeline, ApiRequest, ApiResponse, HttpService, TransportError, TransportService,
};

const API: &str = "api";
const EMPLOYEES: &str = "employees";
const SCHEMA: &str = "schema";

/// Backend operations used by the schema store and the list controller.
#[async_trait]
pub trait EmployeeBackend: Send + Sync {
    /// `GET /api/schema`
    async fn fetch_schema(&self) -> Result<SchemaResult, TransportError>;

    /// `GET /api/employees` with the built query.
    async fn list(&self, params: &QueryParams) -> Result<PageResponse<Record>, TransportError>;

    /// `POST /api/employees`
    async fn create(&self, attributes: Attributes) -> Result<Record, TransportError>;

    /// `PUT /api/employees/{id}`
    async fn replace(&self, id: &str, attributes: Attributes) -> Result<Record, TransportError>;

    /// `PATCH /api/employees/{id}`
    async fn patch(&self, id: &str, attributes: Attributes) -> Result<Record, TransportError>;

    /// `DELETE /api/employees/{id}?soft={soft}`
    async fn delete(&self, id: &str, soft: bool) -> Result<(), TransportError>;
}

/// [`EmployeeBackend`] that talks HTTP through the transport pipeline.
#[derive(Clone)]
pub struct ApiClient {
    service: TransportService,
}

impl ApiClient {
    /// Builds the `reqwest` client and the full pipeline from configuration.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built or the base URL is invalid.
    pub fn new(
        config: &ClientConfig,
        credentials: Arc<dyn CredentialSource>,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("directory-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(TransportError::from)?;
        let http = HttpService::new(client, &config.base_url)?;
        Ok(Self::from_service(build_transport_pipeline(
            http,
            credentials,
            config.request_timeout,
        )))
    }

    /// Wraps an already-composed transport service.
    #[must_use]
    pub fn from_service(service: TransportService) -> Self {
        Self { service }
    }

    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.service.clone().oneshot(request).await
    }

    fn upsert(method: Method, id: Option<&str>, attributes: Attributes) -> Result<ApiRequest, TransportError> {
        let mut segments = vec![API, EMPLOYEES];
        segments.extend(id);
        ApiRequest::new(method, segments).with_json(&UpsertRequest::from(attributes))
    }
}

#[async_trait]
impl EmployeeBackend for ApiClient {
    async fn fetch_schema(&self) -> Result<SchemaResult, TransportError> {
        self.send(ApiRequest::new(Method::GET, [API, SCHEMA]))
            .await?
            .json()
    }

    async fn list(&self, params: &QueryParams) -> Result<PageResponse<Record>, TransportError> {
        let request = ApiRequest::new(Method::GET, [API, EMPLOYEES]).with_query(build_query(params));
        self.send(request).await?.json()
    }

    async fn create(&self, attributes: Attributes) -> Result<Record, TransportError> {
        self.send(Self::upsert(Method::POST, None, attributes)?)
            .await?
            .json()
    }

    async fn replace(&self, id: &str, attributes: Attributes) -> Result<Record, TransportError> {
        self.send(Self::upsert(Method::PUT, Some(id), attributes)?)
            .await?
            .json()
    }

    async fn patch(&self, id: &str, attributes: Attributes) -> Result<Record, TransportError> {
        self.send(Self::upsert(Method::PATCH, Some(id), attributes)?)
            .await?
            .json()
    }

    async fn delete(&self, id: &str, soft: bool) -> Result<(), TransportError> {
        let request = ApiRequest::new(Method::DELETE, [API, EMPLOYEES, id])
            .with_query(vec![("soft".to_string(), soft.to_string())]);
        self.send(request).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use parking_lot::Mutex;
    use serde_json::json;
    use tower::util::BoxCloneSyncService;

    use super::*;

    const RECORD: &str = r#"{"id":"r1","attributes":{"name":"Ada"},"deleted":false,
        "createdAt":"2024-03-01T10:00:00Z","updatedAt":"2024-03-01T10:00:00Z"}"#;

    fn client(body: &'static str) -> (ApiClient, Arc<Mutex<Vec<ApiRequest>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let service = tower::service_fn(move |req: ApiRequest| {
            recorder.lock().push(req);
            async move { Ok::<_, TransportError>(ApiResponse::new(StatusCode::OK, body)) }
        });
        (ApiClient::from_service(BoxCloneSyncService::new(service)), seen)
    }

    #[tokio::test]
    async fn list_sends_built_query() {
        let body = r#"{"content":[],"totalElements":0,"page":0,"size":5,"totalPages":0,"hasNext":false,"hasPrevious":false}"#;
        let (api, seen) = client(body);
        let params = QueryParams {
            page: Some(0),
            size: Some(5),
            ..QueryParams::default()
        };
        let page = api.list(&params).await.unwrap();
        assert_eq!(page.size, 5);

        let requests = seen.lock();
        assert_eq!(requests[0].method, Method::GET);
        assert_eq!(requests[0].path(), "/api/employees");
        assert_eq!(requests[0].query, build_query(&params));
    }

    #[tokio::test]
    async fn upserts_wrap_attributes_and_target_id() {
        let (api, seen) = client(RECORD);
        let mut attributes = Attributes::new();
        attributes.insert("name".to_string(), json!("Ada"));

        api.create(attributes.clone()).await.unwrap();
        api.replace("r1", attributes.clone()).await.unwrap();
        let patched = api.patch("r1", attributes).await.unwrap();
        assert_eq!(patched.id, "r1");

        let requests = seen.lock();
        let shapes: Vec<_> = requests
            .iter()
            .map(|r| (r.method.clone(), r.path()))
            .collect();
        assert_eq!(
            shapes,
            vec![
                (Method::POST, "/api/employees".to_string()),
                (Method::PUT, "/api/employees/r1".to_string()),
                (Method::PATCH, "/api/employees/r1".to_string()),
            ]
        );
        assert_eq!(requests[0].body, Some(json!({"attributes": {"name": "Ada"}})));
    }

    #[tokio::test]
    async fn delete_passes_soft_flag() {
        let (api, seen) = client("");
        api.delete("r1", true).await.unwrap();
        api.delete("r1", false).await.unwrap();

        let requests = seen.lock();
        assert_eq!(requests[0].query, vec![("soft".to_string(), "true".to_string())]);
        assert_eq!(requests[1].query, vec![("soft".to_string(), "false".to_string())]);
        assert_eq!(requests[1].method, Method::DELETE);
    }

    #[tokio::test]
    async fn malformed_body_is_decode_error() {
        let (api, _) = client("not json");
        let err = api.fetch_schema().await.unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)));
    }
}
