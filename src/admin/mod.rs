//! Management API.
//!
//! # Routes
//! - `POST /clients`, `GET /clients?client_id=`, `PUT /clients`,
//!   `DELETE /clients?client_id=`: CRUD over rate-limit clients
//! - `GET /backends`: backend liveness snapshot
//!
//! All routes require `Authorization: Bearer <admin.api_key>` when a key is configured.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;

pub use handlers::{AdminState, BackendDirectory, ClientRequest, ClientResponse};

pub fn setup_admin_router(state: AdminState, api_key: Option<String>) -> Router {
    let router = Router::new()
        .route(
            "/clients",
            get(get_client)
                .post(create_client)
                .put(update_client)
                .delete(delete_client),
        )
        .route("/backends", get(get_backends));

    let router = match api_key {
        Some(key) => router.route_layer(middleware::from_fn_with_state(
            Arc::<str>::from(key),
            admin_auth_middleware,
        )),
        None => router,
    };

    router.with_state(state)
}
