//! Weld provisioning platform - main server

use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

mod config;

use config::Settings;
use weld_api::AppState;
use weld_core::OrganizationId;
use weld_db::{create_pool, run_migrations, DatabaseConfig};
use weld_identity::{HttpIdentityDirectory, TokenVerifier};
use weld_openfga::{FgaAuthorizationStore, FgaConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_tracing();

    let settings = Settings::load().context("Failed to load configuration")?;

    info!(
        "Starting Weld provisioning platform v{}",
        env!("CARGO_PKG_VERSION")
    );

    let state = initialize_services(&settings).await?;

    let app = create_app(state);

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("Invalid server address")?;

    info!("Server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    // ConnectInfo feeds the per-IP rate limiter.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,weld=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .init();
}

async fn initialize_services(settings: &Settings) -> Result<AppState> {
    info!("Connecting to PostgreSQL...");
    let db_config = DatabaseConfig {
        url: settings.database.url.clone(),
        max_connections: settings.database.max_connections,
        ..Default::default()
    };
    let db_pool = create_pool(&db_config)
        .await
        .context("Failed to connect to PostgreSQL")?;
    info!("PostgreSQL connection established");

    run_migrations(&db_pool)
        .await
        .context("Failed to run database migrations")?;

    let fga_config = FgaConfig {
        endpoint: settings.openfga.endpoint.clone(),
        token: settings.openfga.token.clone(),
        use_tls: settings.openfga.use_tls,
        store_name: settings.openfga.store_name.clone(),
        store_id: settings.openfga.store_id.clone(),
        ..Default::default()
    };
    let authz = FgaAuthorizationStore::connect(&fga_config)
        .await
        .context("Failed to connect to OpenFGA")?;

    // Creates the store when none is pinned, then publishes the model.
    authz
        .bootstrap()
        .await
        .context("Failed to bootstrap the authorization store")?;

    let organization_id = OrganizationId::from_uuid(
        Uuid::parse_str(&settings.organization.id).context("Invalid organization id")?,
    );

    let token_verifier = TokenVerifier::new(
        settings.auth.token_secret.clone(),
        settings.auth.issuer.clone(),
        settings.auth.audience.clone(),
    );

    let directory = HttpIdentityDirectory::new(
        settings.directory.endpoint.clone(),
        settings.directory.timeout_secs,
    )
    .context("Failed to build the identity directory client")?;

    let state = AppState::new(
        db_pool,
        Arc::new(authz),
        token_verifier,
        directory,
        organization_id,
    );

    info!("All services initialized successfully");
    Ok(state)
}

fn create_app(state: AppState) -> Router {
    let app = weld_api::create_router_with_state(state);

    app.layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
