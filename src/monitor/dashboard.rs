//! Operator HTTP API
//!
//! Thin axum layer over [`BotSession`]: every route maps to one session operation.

use crate::agent::protocol::PageReport;
use crate::driver::{LoginOutcome, TabReport};
use crate::error::BotError;
use crate::session::{BotSession, StatusReport, TelegramProbe};
use crate::types::{BetResult, LogEntry, SettingsUpdate};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_LOG_LIMIT: usize = 50;

/// Error body returned by every failing route
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

pub struct ApiError(BotError);

impl From<BotError> for ApiError {
    fn from(e: BotError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            BotError::InvalidConfig(_) | BotError::Parse(_) => StatusCode::BAD_REQUEST,
            BotError::Browser(_) | BotError::AgentUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            BotError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            BotError::Http(_) | BotError::Telegram(_) | BotError::Conflict => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::warn!("Request failed: {}", self.0);
        }
        (status, Json(ErrorBody { error: self.0.to_string() })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
struct LogsQuery {
    limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ManualBetRequest {
    amount: Option<Decimal>,
}

#[derive(Debug, Serialize)]
struct MarkerCleared {
    cleared: Option<String>,
}

async fn health_check() -> &'static str {
    "OK"
}

async fn get_status(State(session): State<Arc<BotSession>>) -> ApiResult<StatusReport> {
    Ok(Json(session.status().await?))
}

async fn get_logs(
    State(session): State<Arc<BotSession>>,
    Query(query): Query<LogsQuery>,
) -> Json<Vec<LogEntry>> {
    Json(session.logs(query.limit.unwrap_or(DEFAULT_LOG_LIMIT)).await)
}

async fn save_config(
    State(session): State<Arc<BotSession>>,
    Json(update): Json<SettingsUpdate>,
) -> ApiResult<StatusReport> {
    session.save_settings(update).await?;
    Ok(Json(session.status().await?))
}

async fn login(State(session): State<Arc<BotSession>>) -> ApiResult<LoginOutcome> {
    Ok(Json(session.login().await?))
}

async fn start(State(session): State<Arc<BotSession>>) -> ApiResult<StatusReport> {
    session.start().await?;
    Ok(Json(session.status().await?))
}

async fn stop(State(session): State<Arc<BotSession>>) -> ApiResult<StatusReport> {
    session.stop().await?;
    Ok(Json(session.status().await?))
}

async fn test_telegram(State(session): State<Arc<BotSession>>) -> ApiResult<TelegramProbe> {
    Ok(Json(session.test_telegram().await?))
}

async fn manual_bet(
    State(session): State<Arc<BotSession>>,
    request: Option<Json<ManualBetRequest>>,
) -> ApiResult<BetResult> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    Ok(Json(session.manual_bet(request.amount).await?))
}

async fn debug_tabs(State(session): State<Arc<BotSession>>) -> ApiResult<Vec<TabReport>> {
    Ok(Json(session.debug_tabs().await?))
}

async fn debug_page(State(session): State<Arc<BotSession>>) -> ApiResult<PageReport> {
    Ok(Json(session.debug_page().await?))
}

async fn clear_marker(State(session): State<Arc<BotSession>>) -> ApiResult<MarkerCleared> {
    Ok(Json(MarkerCleared {
        cleared: session.clear_marker().await?,
    }))
}

/// Create dashboard router
pub fn create_router(session: Arc<BotSession>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(get_status))
        .route("/logs", get(get_logs))
        .route("/config", post(save_config))
        .route("/login", post(login))
        .route("/start", post(start))
        .route("/stop", post(stop))
        .route("/test-telegram", post(test_telegram))
        .route("/manual-bet", post(manual_bet))
        .route("/debug/tabs", get(debug_tabs))
        .route("/debug/page", get(debug_page))
        .route("/marker/clear", post(clear_marker))
        .with_state(session)
}

/// Serve the operator API until the process exits
pub async fn start_dashboard(session: Arc<BotSession>, bind: &str) -> anyhow::Result<()> {
    let app = create_router(session);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("Dashboard listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
