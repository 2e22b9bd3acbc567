//! HTTP gateway for metrics ingest and secure report access.
//!
//! Two surfaces: test runners POST their metrics summary to
//! `/api/test-results`, which stores the summary and runs alert dispatch;
//! alert recipients follow the signed link to
//! `/api/test-results/secure/{report_id}`, which is gated by a report-access
//! token instead of a login session.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use alerting::{AlertDispatcher, DispatchResult, MetricsSummary};
use report_access::{AccessTokenService, AuthError};

/// Shared application state, built once at startup.
pub struct AppState {
    /// Alert dispatcher holding the immutable channel set.
    pub alerts: AlertDispatcher,
    /// Token service; absent when `JWT_SECRET` is not set.
    pub tokens: Option<Arc<AccessTokenService>>,
    /// Most recent summary per report id. Deliberately not persisted.
    pub reports: RwLock<HashMap<String, MetricsSummary>>,
}

impl AppState {
    #[must_use]
    pub fn new(alerts: AlertDispatcher, tokens: Option<Arc<AccessTokenService>>) -> Self {
        Self {
            alerts,
            tokens,
            reports: RwLock::new(HashMap::new()),
        }
    }
}

/// Build the HTTP router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/api/test-results", post(ingest_handler))
        .route(
            "/api/test-results/secure/{report_id}",
            get(secure_report_handler),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
///
/// # Errors
///
/// Returns an error if the server fails to bind or serve.
pub async fn run_server(state: Arc<AppState>, addr: &str) -> anyhow::Result<()> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("gateway listening on {addr}");

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

async fn ready_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ready",
        "configuredChannels": state.alerts.configured_channels(),
        "signedUrls": state.tokens.is_some(),
    }))
}

// ============================================================================
// Request/Response types
// ============================================================================

/// Response to a metrics ingest.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IngestResponse {
    status: &'static str,
    triggered: bool,
    dispatch: DispatchResult,
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
}

fn unauthorized(error: &'static str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(ErrorBody { error })).into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// Accept a metrics summary from a test runner and run alert dispatch.
///
/// The runner's request succeeds once the summary parses; alert delivery
/// failures are reported in the body, never as an HTTP error, so the calling
/// pipeline always completes.
async fn ingest_handler(
    State(state): State<Arc<AppState>>,
    Json(summary): Json<MetricsSummary>,
) -> Json<IngestResponse> {
    info!(report_id = %summary.report_id, "metrics summary received");

    state
        .reports
        .write()
        .await
        .insert(summary.report_id.clone(), summary.clone());

    let dispatch = state.alerts.dispatch(&summary).await;

    Json(IngestResponse {
        status: "accepted",
        triggered: dispatch.triggered,
        dispatch,
    })
}

/// Serve a stored report to holders of a valid access token.
async fn secure_report_handler(
    State(state): State<Arc<AppState>>,
    Path(report_id): Path<String>,
    Query(query): Query<TokenQuery>,
) -> Response {
    let Some(tokens) = &state.tokens else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorBody {
                error: "signed_urls_disabled",
            }),
        )
            .into_response();
    };

    let Some(token) = query.token else {
        return unauthorized("missing_token");
    };

    let claims = match tokens.verify(&token) {
        Ok(claims) => claims,
        Err(AuthError::Expired) => {
            info!(%report_id, "stale report link rejected");
            return unauthorized("token_expired");
        }
        Err(AuthError::Signature) => {
            warn!(%report_id, "report link failed signature verification, possible tampering");
            return unauthorized("invalid_token");
        }
        Err(e) => {
            warn!(%report_id, error = %e, "report link rejected");
            return unauthorized("invalid_token");
        }
    };

    if claims.report_id != report_id {
        warn!(
            %report_id,
            token_report = %claims.report_id,
            "token is scoped to a different report"
        );
        return unauthorized("report_mismatch");
    }

    match state.reports.read().await.get(&report_id) {
        Some(summary) => Json(summary.clone()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                error: "report_not_found",
            }),
        )
            .into_response(),
    }
}
