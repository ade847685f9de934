//! Route assembly, shared state, and the server loop.

use std::sync::Arc;

use axum::extract::State;
use axum::middleware;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::store::SqliteStore;

use super::auth;
use super::types::HealthResponse;
use super::{activities, courses, reprogramming, subtasks, users};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: SqliteStore,
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let store = SqliteStore::open(config.db_path()).await?;

    if config.dev_mode {
        let guest = auth::ensure_guest(&store).await?;
        tracing::info!(
            "Dev mode: requests without a valid token act as {}",
            guest.email
        );
    }

    let state = Arc::new(AppState {
        config: config.clone(),
        store,
    });

    let public_routes = Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/token", post(auth::login))
        .route("/api/auth/token/refresh", post(auth::refresh))
        .route("/api/auth/users", post(users::register));

    let protected_routes = Router::new()
        .route(
            "/api/auth/users/me",
            get(users::me).put(users::update_me).patch(users::update_me),
        )
        .nest("/api/course", courses::routes())
        .nest("/api/activity", activities::routes())
        .nest("/api/subtask", subtasks::routes())
        .nest("/api/reprogramming_log", reprogramming::routes())
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_auth,
        ));

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::clone(&state));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        dev_mode: state.config.dev_mode,
        auth_required: !state.config.dev_mode,
    })
}
