// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::routing::{get, post};
use tokio_util::sync::CancellationToken;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use tidyread_config::model::GatewayConfig;
use tidyread_core::{AuditSink, ChatBackend, TidyreadError};
use tidyread_queue::{DeadLetterLog, JobQueue};
use tidyread_rules::{RuleResolver, RuleSimulator};

use crate::handlers;

/// Upper bound on requests served at once.
const MAX_CONCURRENT_REQUESTS: usize = 64;

/// Renders collected metrics in Prometheus text format.
pub type MetricsRender = Arc<dyn Fn() -> String + Send + Sync>;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub resolver: Arc<RuleResolver>,
    pub simulator: Arc<RuleSimulator>,
    pub backend: Arc<dyn ChatBackend>,
    pub audit: Arc<dyn AuditSink>,
    pub queue: JobQueue,
    pub dead_letters: DeadLetterLog,
    /// Process start time for uptime calculation.
    pub start_time: Instant,
    /// `/metrics` answers 404 without a renderer.
    pub metrics_render: Option<MetricsRender>,
}

/// Build the application router.
///
/// Routes:
/// - GET /health, GET /metrics
/// - GET /api/queue/failed, POST /api/queue/clear
/// - GET /api/rules, POST /api/rules/autoread/toggle, POST /api/rules/autoread/apply_all
/// - GET /api/rules/autoreact, POST /api/rules/autoreact/config
/// - POST /api/debug/process
/// - GET /api/logs
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/metrics", get(handlers::get_metrics))
        .route("/api/queue/failed", get(handlers::get_failed_jobs))
        .route("/api/queue/clear", post(handlers::post_clear_failed))
        .route("/api/rules", get(handlers::get_rules))
        .route("/api/rules/autoread/toggle", post(handlers::post_toggle_autoread))
        .route("/api/rules/autoread/apply_all", post(handlers::post_apply_autoread_all))
        .route("/api/rules/autoreact", get(handlers::get_autoreact))
        .route("/api/rules/autoreact/config", post(handlers::post_autoreact_config))
        .route("/api/debug/process", post(handlers::post_debug_process))
        .route("/api/logs", get(handlers::get_logs))
        .with_state(state)
        .layer(GlobalConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve the gateway until `cancel` fires.
pub async fn start_server(
    config: &GatewayConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), TidyreadError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| TidyreadError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    info!("gateway listening on {addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| TidyreadError::Internal(format!("gateway server error: {e}")))?;

    info!("gateway stopped");
    Ok(())
}
