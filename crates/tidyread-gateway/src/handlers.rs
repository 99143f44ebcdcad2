// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway JSON API.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::warn;

use tidyread_core::types::{ActionLog, ChatId, Rule, RuleConfig, RuleType, TopicId};
use tidyread_core::TidyreadError;
use tidyread_rules::Simulation;
use tidyread_storage::DeadLetter;

use crate::server::GatewayState;

const DEFAULT_LIST_LIMIT: usize = 50;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler error rendered as `{"error": ...}` with a matching status.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(TidyreadError),
}

impl From<TidyreadError> for ApiError {
    fn from(e: TidyreadError) -> Self {
        Self::Internal(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Internal(e) => {
                let status = match &e {
                    TidyreadError::NotFound { .. } => StatusCode::NOT_FOUND,
                    TidyreadError::Rejected { .. } | TidyreadError::Config(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    TidyreadError::NotConnected | TidyreadError::RateLimited { .. } => {
                        StatusCode::SERVICE_UNAVAILABLE
                    }
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status.is_server_error() {
                    warn!(error = %e, "gateway request failed");
                }
                (status, e.to_string())
            }
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn required<T>(value: Option<T>, name: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::BadRequest(format!("{name} required")))
}

fn default_true() -> bool {
    true
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub backend_connected: bool,
    /// Job rows per status.
    pub jobs: BTreeMap<String, i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct FailedJobsResponse {
    pub jobs: Vec<DeadLetter>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl StatusResponse {
    fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            count: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RulesResponse {
    pub rules: Vec<Rule>,
}

/// Body for POST /api/rules/autoread/toggle.
#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    #[serde(default)]
    pub chat_id: Option<ChatId>,
    #[serde(default)]
    pub topic_id: Option<TopicId>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Body for POST /api/rules/autoread/apply_all.
#[derive(Debug, Deserialize)]
pub struct ApplyAllRequest {
    #[serde(default)]
    pub forum_id: Option<ChatId>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Body for POST /api/rules/autoreact/config.
#[derive(Debug, Deserialize)]
pub struct AutoReactRequest {
    #[serde(default)]
    pub chat_id: Option<ChatId>,
    #[serde(default)]
    pub topic_id: Option<TopicId>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub config: RuleConfig,
}

#[derive(Debug, Deserialize)]
pub struct ScopeQuery {
    #[serde(default)]
    pub chat_id: Option<ChatId>,
    #[serde(default)]
    pub topic_id: Option<TopicId>,
}

#[derive(Debug, Serialize)]
pub struct AutoReactResponse {
    pub enabled: bool,
    pub config: RuleConfig,
}

/// Body for POST /api/debug/process.
#[derive(Debug, Deserialize)]
pub struct SimulateRequest {
    #[serde(default)]
    pub chat_id: Option<ChatId>,
    #[serde(default)]
    pub topic_id: Option<TopicId>,
    #[serde(default)]
    pub msg_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub logs: Vec<ActionLog>,
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    let (status, jobs) = match state.queue.stats().await {
        Ok(rows) => (
            "ok",
            rows.into_iter()
                .map(|(status, n)| (status.to_string(), n))
                .collect(),
        ),
        Err(e) => {
            warn!(error = %e, "health check could not read job stats");
            ("degraded", BTreeMap::new())
        }
    };
    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        backend_connected: state.backend.is_connected().await,
        jobs,
    })
}

/// GET /metrics
pub async fn get_metrics(State(state): State<GatewayState>) -> Response {
    match &state.metrics_render {
        Some(render) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// GET /api/queue/failed?limit=
pub async fn get_failed_jobs(
    State(state): State<GatewayState>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<FailedJobsResponse> {
    let jobs = state
        .dead_letters
        .list(query.limit.unwrap_or(DEFAULT_LIST_LIMIT))
        .await?;
    Ok(Json(FailedJobsResponse { jobs }))
}

/// POST /api/queue/clear
pub async fn post_clear_failed(State(state): State<GatewayState>) -> ApiResult<StatusResponse> {
    let removed = state.dead_letters.clear().await?;
    Ok(Json(StatusResponse {
        status: "cleared".to_string(),
        count: Some(removed),
    }))
}

/// GET /api/rules
pub async fn get_rules(State(state): State<GatewayState>) -> ApiResult<RulesResponse> {
    let rules = state.resolver.list_rules().await?;
    Ok(Json(RulesResponse { rules }))
}

/// POST /api/rules/autoread/toggle
pub async fn post_toggle_autoread(
    State(state): State<GatewayState>,
    Json(body): Json<ToggleRequest>,
) -> ApiResult<StatusResponse> {
    let chat_id = required(body.chat_id, "chat_id")?;
    state
        .resolver
        .toggle_rule(chat_id, body.topic_id, RuleType::Autoread, body.enabled, None)
        .await?;
    Ok(Json(StatusResponse::ok()))
}

/// POST /api/rules/autoread/apply_all
pub async fn post_apply_autoread_all(
    State(state): State<GatewayState>,
    Json(body): Json<ApplyAllRequest>,
) -> ApiResult<StatusResponse> {
    let forum_id = required(body.forum_id, "forum_id")?;
    let touched = state
        .resolver
        .apply_to_all_topics(state.backend.as_ref(), forum_id, RuleType::Autoread, body.enabled)
        .await?;
    Ok(Json(StatusResponse {
        status: "ok".to_string(),
        count: Some(touched),
    }))
}

/// POST /api/rules/autoreact/config
pub async fn post_autoreact_config(
    State(state): State<GatewayState>,
    Json(body): Json<AutoReactRequest>,
) -> ApiResult<StatusResponse> {
    let chat_id = required(body.chat_id, "chat_id")?;
    state
        .resolver
        .toggle_rule(
            chat_id,
            body.topic_id,
            RuleType::Autoreact,
            body.enabled,
            Some(body.config),
        )
        .await?;
    Ok(Json(StatusResponse::ok()))
}

/// GET /api/rules/autoreact?chat_id=&topic_id=
pub async fn get_autoreact(
    State(state): State<GatewayState>,
    Query(query): Query<ScopeQuery>,
) -> ApiResult<AutoReactResponse> {
    let chat_id = required(query.chat_id, "chat_id")?;
    let rule = state
        .resolver
        .get_rule(chat_id, query.topic_id, RuleType::Autoreact)
        .await?;
    Ok(Json(match rule {
        Some(rule) => AutoReactResponse {
            enabled: true,
            config: rule.config,
        },
        None => AutoReactResponse {
            enabled: false,
            config: RuleConfig::new(),
        },
    }))
}

/// POST /api/debug/process
pub async fn post_debug_process(
    State(state): State<GatewayState>,
    Json(body): Json<SimulateRequest>,
) -> ApiResult<Simulation> {
    let chat_id = required(body.chat_id, "chat_id")?;
    let msg_id = required(body.msg_id, "msg_id")?;
    let simulation = state.simulator.simulate(chat_id, body.topic_id, msg_id).await?;
    Ok(Json(simulation))
}

/// GET /api/logs?limit=
pub async fn get_logs(
    State(state): State<GatewayState>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<LogsResponse> {
    let logs = state
        .audit
        .recent_logs(query.limit.unwrap_or(DEFAULT_LIST_LIMIT))
        .await?;
    Ok(Json(LogsResponse { logs }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_request_defaults_to_enabled() {
        let req: ToggleRequest = serde_json::from_str(r#"{"chat_id": 5}"#).unwrap();
        assert_eq!(req.chat_id, Some(5));
        assert!(req.topic_id.is_none());
        assert!(req.enabled);
    }

    #[test]
    fn autoreact_request_defaults_to_disabled() {
        let req: AutoReactRequest =
            serde_json::from_str(r#"{"chat_id": 5, "config": {"emoji": "👍"}}"#).unwrap();
        assert!(!req.enabled);
        assert_eq!(req.config["emoji"], "👍");
    }

    #[test]
    fn status_response_omits_missing_count() {
        let json = serde_json::to_string(&StatusResponse::ok()).unwrap();
        assert_eq!(json, r#"{"status":"ok"}"#);
    }

    #[test]
    fn not_found_maps_to_404() {
        let response = ApiError::from(TidyreadError::NotFound {
            what: "message 1".into(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
