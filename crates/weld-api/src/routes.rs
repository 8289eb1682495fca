//! API route definitions

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
    Router,
};

use crate::handlers;
use crate::middleware::{
    logging_middleware, login_middleware, rate_limit_middleware, request_id_middleware,
};
use crate::state::AppState;

/// Create the full API router with application state.
///
/// Health endpoints skip the login middleware; everything under
/// `/api/v1` requires a bearer token.
pub fn create_router_with_state(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        .with_state(state.clone())
        .nest("/api/v1", api_v1_routes(state))
        .layer(from_fn(logging_middleware))
        .layer(from_fn(request_id_middleware))
}

/// API v1 routes. Every subtree runs the login middleware; the auth
/// subtree additionally sits behind the per-IP rate limiter.
fn api_v1_routes(state: AppState) -> Router {
    let login = from_fn_with_state(state.clone(), login_middleware);

    let auth = auth_routes(state.clone())
        .layer(login.clone())
        .layer(from_fn_with_state(state.clone(), rate_limit_middleware));

    Router::new()
        .nest("/auth", auth)
        .nest("/spaces", space_routes(state.clone()).layer(login.clone()))
        .nest("/mappings", mapping_routes(state.clone()).layer(login.clone()))
        .nest("/permissions", permission_routes(state).layer(login))
}

fn auth_routes(state: AppState) -> Router {
    Router::new()
        .route("/me", get(handlers::auth::me))
        .with_state(state)
}

/// Space CRUD and membership routes
fn space_routes(state: AppState) -> Router {
    Router::new()
        .route("/", post(handlers::spaces::create_space))
        .route("/{id}", get(handlers::spaces::get_space))
        .route("/{id}", put(handlers::spaces::rename_space))
        .route("/{id}", delete(handlers::spaces::delete_space))
        .route("/{id}/members", post(handlers::spaces::add_member))
        .route(
            "/{id}/members/{user_id}",
            delete(handlers::spaces::remove_member),
        )
        .route("/{id}/moderator", put(handlers::spaces::change_moderator))
        .with_state(state)
}

/// Group-mapping administration routes
fn mapping_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::mappings::list_mappings))
        .route("/", post(handlers::mappings::add_mapping))
        .route("/{id}", delete(handlers::mappings::deactivate_mapping))
        .with_state(state)
}

fn permission_routes(state: AppState) -> Router {
    Router::new()
        .route("/batch", post(handlers::permissions::batch_permissions))
        .with_state(state)
}
