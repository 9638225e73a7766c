//! HTTP API for the cache analytics dashboard
//!
//! - `GET  /api/cache/analytics` - live snapshot
//! - `GET  /api/cache/analytics?daily=true&days=N` - daily history keyed by date
//! - `POST /api/cache/clear` - flush every key
//! - `GET  /health` - backing store health

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::DEFAULT_RETENTION_DAYS;
use crate::error::CacheError;
use crate::rollup::DailyStatFields;
use crate::CacheAnalyticsSystem;

/// `{ "success": true, "data": ... }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    #[serde(default)]
    pub daily: bool,
    /// Kept as text so out-of-range values clamp instead of failing extraction
    #[serde(default)]
    pub days: Option<String>,
}

/// Day count from the `days` query value
///
/// Negative numbers become 0, numbers past `usize::MAX` saturate, anything
/// non-numeric falls back to the default window.
fn parse_days(raw: &str) -> usize {
    let raw = raw.trim();
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        debug!(days = %raw, "Ignoring non-numeric days parameter");
        return DEFAULT_RETENTION_DAYS;
    }
    if negative {
        return 0;
    }
    digits.parse().unwrap_or(usize::MAX)
}

/// Error body `{ "success": false, "error": "..." }` with a fitting status
pub struct ApiError(CacheError);

impl From<CacheError> for ApiError {
    fn from(error: CacheError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_unavailable() {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        error!(status = %status, error = %self.0, "Cache API request failed");
        let body = json!({ "success": false, "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

pub async fn get_analytics(
    State(system): State<Arc<CacheAnalyticsSystem>>,
    Query(query): Query<AnalyticsQuery>,
) -> Response {
    if query.daily {
        let days = query
            .days
            .as_deref()
            .map_or(DEFAULT_RETENTION_DAYS, parse_days);
        let data: BTreeMap<String, DailyStatFields> = system
            .reporter()
            .get_daily_stats(days)
            .into_iter()
            .map(|record| (record.date.format("%Y-%m-%d").to_string(), record.fields()))
            .collect();
        Json(ApiResponse::ok(data)).into_response()
    } else {
        let snapshot = system.reporter().get_current_stats().await;
        Json(ApiResponse::ok(snapshot)).into_response()
    }
}

pub async fn clear_cache(
    State(system): State<Arc<CacheAnalyticsSystem>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let cleared = system.invalidation().clear_all().await?;
    info!(cleared = cleared, "Cache cleared via API");
    Ok(Json(json!({ "success": true, "cleared": cleared })))
}

pub async fn health(State(system): State<Arc<CacheAnalyticsSystem>>) -> StatusCode {
    if system.health_check().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Routes for the analytics and invalidation endpoints
pub fn router(system: Arc<CacheAnalyticsSystem>) -> Router {
    Router::new()
        .route("/api/cache/analytics", get(get_analytics))
        .route("/api/cache/clear", post(clear_cache))
        .route("/health", get(health))
        .with_state(system)
}

/// Serve the API until Ctrl-C
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(system: Arc<CacheAnalyticsSystem>, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Cache analytics API listening");

    axum::serve(listener, router(system))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down cache analytics API");
        })
        .await?;
    Ok(())
}
