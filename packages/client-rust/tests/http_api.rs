//! End-to-end checks of the reqwest pipeline against an in-process backend.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get};
use axum::{Json, Router};
use directory_client::{
    ApiClient, ClientConfig, EmployeeBackend, IdentityProvider, Session, SessionService,
    TransportError,
};
use directory_core::{Attributes, FilterOperator, FilterSet, QueryParams};
use parking_lot::Mutex;
use serde_json::{json, Value};

const FRESH_TOKEN: &str = "fresh";

#[derive(Default)]
struct Backend {
    list_queries: Mutex<Vec<HashMap<String, String>>>,
    deletes: Mutex<Vec<(String, String)>>,
    request_ids: Mutex<Vec<String>>,
    unauthorized: AtomicU32,
}

type Shared = Arc<Backend>;

/// Rejects everything but the fresh token with 401.
fn check_auth(backend: &Backend, headers: &HeaderMap) -> Result<(), StatusCode> {
    if let Some(id) = headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
        backend.request_ids.lock().push(id.to_string());
    }
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if bearer == Some(FRESH_TOKEN) {
        Ok(())
    } else {
        backend.unauthorized.fetch_add(1, Ordering::SeqCst);
        Err(StatusCode::UNAUTHORIZED)
    }
}

async fn schema(State(backend): State<Shared>, headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    check_auth(&backend, &headers)?;
    Ok(Json(json!({
        "collection": "employees",
        "sampleSize": 2,
        "generatedAt": "2024-03-01T10:00:00Z",
        "fields": {
            "age": {"name": "age", "type": "NUMBER", "required": false, "nullable": true},
            "name": {"name": "name", "type": "STRING", "required": true, "nullable": false},
            "tags": {"name": "tags", "type": "ARRAY", "required": false, "arrayItemType": "STRING"}
        }
    })))
}

async fn list(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    check_auth(&backend, &headers)?;
    backend.list_queries.lock().push(query);
    Ok(Json(json!({
        "content": [{
            "id": "e1",
            "attributes": {"name": "Ada", "age": 36},
            "deleted": false,
            "createdAt": "2024-03-01T10:00:00Z",
            "updatedAt": "2024-03-01T10:00:00Z"
        }],
        "totalElements": 1,
        "page": 0,
        "size": 10,
        "totalPages": 1,
        "hasNext": false,
        "hasPrevious": false
    })))
}

async fn create(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    check_auth(&backend, &headers).map_err(|s| (s, Json(json!({}))))?;
    if body["attributes"]["name"].as_str().unwrap_or_default().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"status": 400, "message": "name is required"})),
        ));
    }
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": "e2",
            "attributes": body["attributes"],
            "deleted": false,
            "createdAt": "2024-03-01T10:00:00Z",
            "updatedAt": "2024-03-01T10:00:00Z"
        })),
    ))
}

async fn remove(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> StatusCode {
    if let Err(status) = check_auth(&backend, &headers) {
        return status;
    }
    let soft = query.get("soft").cloned().unwrap_or_default();
    backend.deletes.lock().push((id, soft));
    StatusCode::NO_CONTENT
}

async fn serve(backend: Shared) -> SocketAddr {
    let app = Router::new()
        .route("/api/schema", get(schema))
        .route("/api/employees", get(list).post(create))
        .route("/api/employees/{id}", delete(remove))
        .with_state(backend);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Hands out a stale token until asked to refresh.
struct RotatingProvider {
    refreshes: AtomicU32,
}

#[async_trait]
impl IdentityProvider for RotatingProvider {
    async fn restore(&self) -> anyhow::Result<Option<Session>> {
        Ok(Some(Session {
            user_id: "u1".to_string(),
            email: Some("ada@example.com".to_string()),
        }))
    }

    async fn sign_in(&self, _email: &str, _password: &str) -> anyhow::Result<Session> {
        anyhow::bail!("not supported")
    }

    async fn sign_out(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn id_token(&self, force_refresh: bool) -> anyhow::Result<String> {
        if force_refresh {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            return Ok(FRESH_TOKEN.to_string());
        }
        Ok("stale".to_string())
    }
}

async fn client(addr: SocketAddr) -> (ApiClient, Arc<RotatingProvider>) {
    let provider = Arc::new(RotatingProvider {
        refreshes: AtomicU32::new(0),
    });
    let session = Arc::new(SessionService::new(provider.clone()));
    session.initialize().await;
    let config = ClientConfig {
        base_url: format!("http://{addr}"),
        ..ClientConfig::default()
    };
    (ApiClient::new(&config, session).unwrap(), provider)
}

#[tokio::test]
async fn stale_credential_is_refreshed_once_and_retried() {
    let backend = Shared::default();
    let addr = serve(backend.clone()).await;
    let (api, provider) = client(addr).await;

    let schema = api.fetch_schema().await.unwrap();
    let names: Vec<_> = schema.ordered_fields().into_iter().map(|f| f.name).collect();
    assert_eq!(names, ["name", "age", "tags"]);

    assert_eq!(provider.refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(backend.unauthorized.load(Ordering::SeqCst), 1);

    let ids = backend.request_ids.lock().clone();
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[0], ids[1], "retry keeps the request id");
}

#[tokio::test]
async fn unauthenticated_requests_surface_unauthorized() {
    let backend = Shared::default();
    let addr = serve(backend.clone()).await;
    let session = Arc::new(SessionService::new(Arc::new(
        directory_client::session::StaticTokenProvider::new(None),
    )));
    session.initialize().await;
    let config = ClientConfig {
        base_url: format!("http://{addr}"),
        ..ClientConfig::default()
    };
    let api = ApiClient::new(&config, session).unwrap();

    let err = api.list(&QueryParams::default()).await.unwrap_err();
    assert!(matches!(err, TransportError::Unauthorized(_)));
    assert_eq!(backend.unauthorized.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn list_query_carries_paging_search_and_filters() {
    let backend = Shared::default();
    let addr = serve(backend.clone()).await;
    let (api, _) = client(addr).await;

    let mut filters = FilterSet::new();
    filters.apply("age", FilterOperator::Gt, "30");
    filters.apply("name", FilterOperator::Contains, "a b&c");
    let params = QueryParams {
        page: Some(2),
        size: Some(10),
        filters,
        ..QueryParams::default()
    }
    .with_search("  ada ");

    let page = api.list(&params).await.unwrap();
    assert_eq!(page.content[0].attributes["name"], json!("Ada"));

    let queries = backend.list_queries.lock().clone();
    let query = queries.last().unwrap();
    assert_eq!(query.get("page").map(String::as_str), Some("2"));
    assert_eq!(query.get("size").map(String::as_str), Some("10"));
    assert_eq!(query.get("search").map(String::as_str), Some("ada"));
    assert_eq!(query.get("age").map(String::as_str), Some("gt:30"));
    assert_eq!(query.get("name").map(String::as_str), Some("contains:a b&c"));
    assert!(!query.contains_key("sort"));
}

#[tokio::test]
async fn delete_sends_soft_flag() {
    let backend = Shared::default();
    let addr = serve(backend.clone()).await;
    let (api, _) = client(addr).await;

    api.delete("e1", true).await.unwrap();
    api.delete("e1", false).await.unwrap();

    assert_eq!(
        backend.deletes.lock().as_slice(),
        [
            ("e1".to_string(), "true".to_string()),
            ("e1".to_string(), "false".to_string()),
        ]
    );
}

#[tokio::test]
async fn create_surfaces_backend_message() {
    let backend = Shared::default();
    let addr = serve(backend.clone()).await;
    let (api, _) = client(addr).await;

    let mut attributes = Attributes::new();
    attributes.insert("name".to_string(), json!("Grace"));
    let created = api.create(attributes).await.unwrap();
    assert_eq!(created.id, "e2");

    let err = api.create(Attributes::new()).await.unwrap_err();
    assert_eq!(
        err,
        TransportError::Status {
            status: 400,
            message: "name is required".to_string(),
        }
    );
}
