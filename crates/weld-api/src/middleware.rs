//! API middleware for request identification, rate limiting, and login
//!
//! Every authenticated route runs the login middleware: the bearer token
//! is verified locally, the identity directory is consulted for group
//! keys, and the reconciliation engine runs before the handler sees the
//! request. The resolved user rides in the request extensions as
//! [`AuthContext`].

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::clock::Clock;
use serde::Serialize;
use std::net::SocketAddr;
use tracing::{info, warn};
use uuid::Uuid;

use weld_core::{IdentityDirectory, ProvisioningRequest, UserId, WeldError};

use crate::state::{AppState, RATE_LIMIT_BURST, RATE_LIMIT_PER_SECOND};

// =============================================================================
// Types
// =============================================================================

/// Authenticated user context attached to every request that passed the
/// login middleware.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: UserId,
    pub email: String,
}

/// Error payload for authentication failures.
#[derive(Debug, Serialize)]
pub struct AuthError {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Rate limit exceeded error with standard headers.
#[derive(Debug, Serialize)]
pub struct RateLimitError {
    pub error: String,
    pub message: String,
    pub retry_after_seconds: u64,
    pub limit: u32,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let retry_after = self.retry_after_seconds.to_string();
        let body = Json(&self);
        let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();

        let headers = response.headers_mut();
        headers.insert("Retry-After", HeaderValue::from_str(&retry_after).unwrap());
        headers.insert(
            "X-RateLimit-Limit",
            HeaderValue::from_str(&self.limit.to_string()).unwrap(),
        );
        headers.insert("X-RateLimit-Remaining", HeaderValue::from_static("0"));

        response
    }
}

// =============================================================================
// Request ID Middleware
// =============================================================================

/// Request ID wrapper for extensions.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Add a unique request ID to every request and response.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = Uuid::now_v7().to_string();

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    response
        .headers_mut()
        .insert("X-Request-ID", HeaderValue::from_str(&request_id).unwrap());

    response
}

// =============================================================================
// Rate Limiting Middleware
// =============================================================================

/// Per-IP rate limiting with governor's token bucket.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    let client_ip = addr.ip().to_string();

    match state.rate_limiter.check_key(&client_ip) {
        Ok(_) => {
            let mut response = next.run(request).await;
            add_rate_limit_headers(response.headers_mut());
            Ok(response)
        }
        Err(not_until) => {
            let clock = governor::clock::DefaultClock::default();
            let retry_after = not_until.wait_time_from(clock.now());
            warn!(
                client_ip = %client_ip,
                retry_after_ms = %retry_after.as_millis(),
                "Rate limit exceeded"
            );
            Err(RateLimitError {
                error: "rate_limit_exceeded".to_string(),
                message: "Too many requests. Please slow down.".to_string(),
                retry_after_seconds: retry_after.as_secs().max(1),
                limit: RATE_LIMIT_PER_SECOND,
            })
        }
    }
}

/// Advertised limits on successful responses. Remaining is approximate;
/// governor does not expose per-key counters.
fn add_rate_limit_headers(headers: &mut axum::http::HeaderMap) {
    headers.insert(
        "X-RateLimit-Limit",
        HeaderValue::from_str(&RATE_LIMIT_PER_SECOND.to_string()).unwrap(),
    );
    headers.insert(
        "X-RateLimit-Remaining",
        HeaderValue::from_str(&RATE_LIMIT_BURST.to_string()).unwrap(),
    );
}

// =============================================================================
// Login Middleware
// =============================================================================

/// Verify the bearer token, reconcile the login with the identity
/// directory, and attach the resolved user to the request.
pub async fn login_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<AuthError>)> {
    let request_id = request.extensions().get::<RequestId>().map(|r| r.0.clone());

    let token = match bearer_token(&request) {
        Some(token) => token.to_string(),
        None => {
            warn!("Missing or invalid Authorization header");
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(AuthError {
                    error: "missing_token".to_string(),
                    message: "Authorization header with Bearer token required".to_string(),
                    request_id,
                }),
            ));
        }
    };

    let claims = state.token_verifier.verify(&token).map_err(|e| {
        warn!(error = %e, "Token verification failed");
        (
            StatusCode::UNAUTHORIZED,
            Json(AuthError {
                error: "invalid_token".to_string(),
                message: "Token verification failed".to_string(),
                request_id: request_id.clone(),
            }),
        )
    })?;

    let identity = state
        .directory
        .get_identity_data(&token)
        .await
        .map_err(|e| {
            warn!(error = %e, email = %claims.email, "Directory lookup failed during login");
            login_failure(&e, request_id.clone())
        })?;

    let provisioning = ProvisioningRequest {
        email: claims.email.clone(),
        display_name: claims.name.clone(),
        picture_url: identity.picture_url.clone(),
        group_keys: identity.group_keys,
        source: claims.iss.clone(),
    };

    let user_id = state
        .provisioner
        .ensure_user(&provisioning)
        .await
        .map_err(|e| {
            warn!(error = %e, email = %claims.email, "Login reconciliation failed");
            login_failure(&e, request_id)
        })?;

    request.extensions_mut().insert(AuthContext {
        user_id,
        email: claims.email,
    });

    Ok(next.run(request).await)
}

/// Auth and validation failures map to 401; everything else is a server
/// error.
fn login_failure(error: &WeldError, request_id: Option<String>) -> (StatusCode, Json<AuthError>) {
    let (status, code) = match error {
        WeldError::AuthenticationFailed { .. } | WeldError::InvalidEmail { .. } => {
            (StatusCode::UNAUTHORIZED, "login_rejected")
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "login_failed"),
    };
    (
        status,
        Json(AuthError {
            error: code.to_string(),
            message: "Login could not be completed".to_string(),
            request_id,
        }),
    )
}

// =============================================================================
// Logging Middleware
// =============================================================================

/// Request logging with request ID and latency.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_else(|| "unknown".to_string());

    let start = std::time::Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %status.as_u16(),
        latency_ms = %latency.as_millis(),
        "Request completed"
    );

    response
}

// =============================================================================
// Helpers
// =============================================================================

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}
