//! Health check handlers
//!
//! Kubernetes-style probes:
//! - /health - comprehensive status with per-component latency
//! - /health/live - is the process running?
//! - /health/ready - can it serve traffic?

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::state::AppState;

/// Overall health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Individual component health
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub latency_ms: u64,
}

/// Comprehensive health response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: Vec<ComponentHealth>,
}

/// Simple health response for liveness/readiness probes
#[derive(Serialize)]
pub struct SimpleHealthResponse {
    pub status: String,
}

/// Start time for uptime calculation
static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

fn get_uptime_seconds() -> u64 {
    let start = START_TIME.get_or_init(Instant::now);
    start.elapsed().as_secs()
}

/// Comprehensive health check over PostgreSQL and the authorization
/// store.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let mut components = Vec::new();
    let mut overall_status = HealthStatus::Healthy;

    let store_health = check_authorization_store(&state).await;
    if store_health.status != HealthStatus::Healthy {
        overall_status = HealthStatus::Degraded;
    }
    components.push(store_health);

    let db_health = check_database(&state).await;
    if db_health.status == HealthStatus::Unhealthy {
        overall_status = HealthStatus::Unhealthy;
    }
    components.push(db_health);

    let response = HealthResponse {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: get_uptime_seconds(),
        components,
    };

    let status_code = match overall_status {
        // Degraded still serves traffic.
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(response))
}

/// Check the authorization store by reading back the published model.
async fn check_authorization_store(state: &AppState) -> ComponentHealth {
    let start = Instant::now();

    match tokio::time::timeout(Duration::from_secs(5), state.authz.ping()).await {
        Ok(true) => {
            debug!("Authorization store health check passed");
            ComponentHealth {
                name: "openfga".to_string(),
                status: HealthStatus::Healthy,
                message: None,
                latency_ms: start.elapsed().as_millis() as u64,
            }
        }
        Ok(false) => {
            warn!("Authorization store health check failed");
            ComponentHealth {
                name: "openfga".to_string(),
                status: HealthStatus::Unhealthy,
                message: Some("Model read failed".to_string()),
                latency_ms: start.elapsed().as_millis() as u64,
            }
        }
        Err(_) => {
            warn!("Authorization store health check timed out");
            ComponentHealth {
                name: "openfga".to_string(),
                status: HealthStatus::Unhealthy,
                message: Some("Health check timed out after 5 seconds".to_string()),
                latency_ms: 5000,
            }
        }
    }
}

/// Check database health with a round-trip query.
async fn check_database(state: &AppState) -> ComponentHealth {
    let start = Instant::now();

    match tokio::time::timeout(
        Duration::from_secs(5),
        sqlx::query("SELECT 1").fetch_one(&state.db_pool),
    )
    .await
    {
        Ok(Ok(_)) => {
            debug!("Database health check passed");
            ComponentHealth {
                name: "database".to_string(),
                status: HealthStatus::Healthy,
                message: None,
                latency_ms: start.elapsed().as_millis() as u64,
            }
        }
        Ok(Err(e)) => {
            warn!("Database health check failed: {}", e);
            ComponentHealth {
                name: "database".to_string(),
                status: HealthStatus::Unhealthy,
                message: Some(format!("Query failed: {}", e)),
                latency_ms: start.elapsed().as_millis() as u64,
            }
        }
        Err(_) => {
            warn!("Database health check timed out");
            ComponentHealth {
                name: "database".to_string(),
                status: HealthStatus::Unhealthy,
                message: Some("Health check timed out after 5 seconds".to_string()),
                latency_ms: 5000,
            }
        }
    }
}

/// Kubernetes liveness probe. Never touches external dependencies.
pub async fn liveness() -> (StatusCode, Json<SimpleHealthResponse>) {
    (
        StatusCode::OK,
        Json(SimpleHealthResponse {
            status: "alive".to_string(),
        }),
    )
}

/// Kubernetes readiness probe. Both stores must answer.
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<SimpleHealthResponse>) {
    let store_ok = matches!(
        tokio::time::timeout(Duration::from_secs(2), state.authz.ping()).await,
        Ok(true)
    );

    let db_ok = matches!(
        tokio::time::timeout(
            Duration::from_secs(2),
            sqlx::query("SELECT 1").fetch_one(&state.db_pool)
        )
        .await,
        Ok(Ok(_))
    );

    if store_ok && db_ok {
        (
            StatusCode::OK,
            Json(SimpleHealthResponse {
                status: "ready".to_string(),
            }),
        )
    } else {
        let mut issues = Vec::new();
        if !store_ok {
            issues.push("openfga");
        }
        if !db_ok {
            issues.push("database");
        }

        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(SimpleHealthResponse {
                status: format!("not ready: {} unavailable", issues.join(", ")),
            }),
        )
    }
}
