use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::clients::{Client, ClientRepository, RepoError};
use crate::http::response::ApiError;
use crate::load_balancer::{Backend, BackendPool, BackendStatus};

/// Read-only view of backend liveness for operators.
pub trait BackendDirectory: Send + Sync {
    fn statuses(&self) -> Vec<BackendStatus>;
}

impl<B: Backend> BackendDirectory for BackendPool<B> {
    fn statuses(&self) -> Vec<BackendStatus> {
        BackendPool::statuses(self)
    }
}

#[derive(Clone)]
pub struct AdminState {
    pub clients: Arc<dyn ClientRepository>,
    pub backends: Arc<dyn BackendDirectory>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientRequest {
    pub client_id: String,
    pub capacity: u32,
    pub rate_per_sec: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientResponse {
    pub client_id: String,
    pub capacity: u32,
    pub current_tokens: u32,
    pub rate_per_sec: u32,
}

impl From<Client> for ClientResponse {
    fn from(client: Client) -> Self {
        Self {
            capacity: client.bucket.capacity(),
            current_tokens: client.bucket.current(),
            rate_per_sec: client.bucket.rate(),
            client_id: client.id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ClientQuery {
    pub client_id: Option<String>,
}

fn parse_body(
    payload: Result<Json<ClientRequest>, JsonRejection>,
    op: &'static str,
) -> Result<ClientRequest, ApiError> {
    let Json(request) = payload.map_err(|e| {
        tracing::debug!(op, error = %e, "Cannot decode body");
        ApiError::bad_request("invalid JSON")
    })?;
    if request.client_id.is_empty() {
        return Err(ApiError::bad_request("client_id is required"));
    }
    Ok(request)
}

fn require_id(query: ClientQuery) -> Result<String, ApiError> {
    query
        .client_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("client_id is required"))
}

fn repo_error(op: &'static str, e: RepoError) -> ApiError {
    tracing::info!(op, error = %e, "Client operation rejected");
    match e {
        RepoError::NotFound(_) => ApiError::not_found("client not found"),
        RepoError::AlreadyExists(_) => ApiError::new(StatusCode::CONFLICT, "client already exists"),
    }
}

/// POST /clients
pub async fn create_client(
    State(state): State<AdminState>,
    payload: Result<Json<ClientRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ClientResponse>), ApiError> {
    let request = parse_body(payload, "create")?;
    let client = state
        .clients
        .create_client(&request.client_id, request.capacity, request.rate_per_sec)
        .map_err(|e| repo_error("create", e))?;
    Ok((StatusCode::CREATED, Json(client.into())))
}

/// GET /clients?client_id=…
pub async fn get_client(
    State(state): State<AdminState>,
    Query(query): Query<ClientQuery>,
) -> Result<Json<ClientResponse>, ApiError> {
    let id = require_id(query)?;
    let client = state
        .clients
        .get_client(&id)
        .ok_or_else(|| repo_error("get", RepoError::NotFound(id)))?;
    Ok(Json(client.into()))
}

/// PUT /clients
pub async fn update_client(
    State(state): State<AdminState>,
    payload: Result<Json<ClientRequest>, JsonRejection>,
) -> Result<Json<ClientResponse>, ApiError> {
    let request = parse_body(payload, "update")?;
    let client = state
        .clients
        .update_client(&request.client_id, request.capacity, request.rate_per_sec)
        .map_err(|e| repo_error("update", e))?;
    Ok(Json(client.into()))
}

/// DELETE /clients?client_id=…
pub async fn delete_client(
    State(state): State<AdminState>,
    Query(query): Query<ClientQuery>,
) -> Result<StatusCode, ApiError> {
    let id = require_id(query)?;
    state
        .clients
        .delete_client(&id)
        .map_err(|e| repo_error("delete", e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /backends
pub async fn get_backends(State(state): State<AdminState>) -> Json<Vec<BackendStatus>> {
    Json(state.backends.statuses())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::setup_admin_router;
    use crate::clients::MemoryRepository;
    use crate::http::response::ErrorBody;
    use crate::load_balancer::{fake::FakeBackend, RoundRobin};
    use axum::{
        body::Body,
        http::{header, Method, Request},
        Router,
    };
    use tower::ServiceExt;

    fn router(api_key: Option<&str>) -> (Router, Arc<MemoryRepository>) {
        let repo = Arc::new(MemoryRepository::new(10, 1));
        let backends = FakeBackend::set(&["a", "b"]);
        backends[1].set_alive(false);
        let pool = BackendPool::from_backends(Box::new(RoundRobin::new()), backends).unwrap();
        let state = AdminState {
            clients: repo.clone(),
            backends: Arc::new(pool),
        };
        (setup_admin_router(state, api_key.map(String::from)), repo)
    }

    fn json_request(method: Method, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri("/clients")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_conflict() {
        let (app, repo) = router(None);
        let body = r#"{"client_id":"u1","capacity":3,"rate_per_sec":1}"#;

        let res = app.clone().oneshot(json_request(Method::POST, body)).await.unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let created: ClientResponse = read(res).await;
        assert_eq!(created.current_tokens, 3);
        assert!(repo.get_client("u1").is_some());

        let res = app.oneshot(json_request(Method::POST, body)).await.unwrap();
        assert_eq!(res.status(), StatusCode::CONFLICT);
        let err: ErrorBody = read(res).await;
        assert_eq!(err.code, 409);
    }

    #[tokio::test]
    async fn test_bad_bodies() {
        let (app, _) = router(None);

        let res = app.clone().oneshot(json_request(Method::POST, "{nope")).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let err: ErrorBody = read(res).await;
        assert_eq!(err.message, "invalid JSON");

        let res = app
            .oneshot(json_request(Method::PUT, r#"{"capacity":3}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let err: ErrorBody = read(res).await;
        assert_eq!(err.message, "client_id is required");
    }

    #[tokio::test]
    async fn test_missing_query_id() {
        let (app, _) = router(None);
        let res = app
            .oneshot(Request::builder().uri("/clients").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_client() {
        let (app, _) = router(None);

        let res = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/clients?client_id=ghost")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = app
            .clone()
            .oneshot(json_request(
                Method::PUT,
                r#"{"client_id":"ghost","capacity":1,"rate_per_sec":1}"#,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = app
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri("/clients?client_id=ghost")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let (app, _) = router(None);
        let res = app
            .oneshot(
                Request::builder()
                    .method(Method::PATCH)
                    .uri("/clients")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(res.headers().contains_key(header::ALLOW));
    }

    #[tokio::test]
    async fn test_backends_listing() {
        let (app, _) = router(None);
        let res = app
            .oneshot(Request::builder().uri("/backends").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let statuses: serde_json::Value = read(res).await;
        assert_eq!(
            statuses,
            serde_json::json!([
                {"address": "a", "alive": true},
                {"address": "b", "alive": false},
            ])
        );
    }

    #[tokio::test]
    async fn test_api_key_required() {
        let (app, _) = router(Some("secret"));

        let res = app
            .clone()
            .oneshot(Request::builder().uri("/backends").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = app
            .oneshot(
                Request::builder()
                    .uri("/backends")
                    .header(header::AUTHORIZATION, "Bearer secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
