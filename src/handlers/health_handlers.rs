//! Health, readiness and stats handlers.
//!
//! - GET /healthz  -> liveness plus the storage counters
//! - GET /readyz   -> readiness that checks disk I/O under the storage root
//! - GET /stats    -> storage counters, derived rates and backup stats

use crate::{
    models::stats::{Rates, Stats},
    state::AppState,
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

/// `GET /healthz`
///
/// Cheap liveness probe. Never performs I/O.
pub async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            uptime: format!("{:?}", state.started_at.elapsed()),
            stats: state.media.stats(),
            timestamp: Utc::now(),
        }),
    )
}

/// `GET /readyz`
///
/// Performs a best-effort write/read/delete under the storage root.
/// HTTP 200 when the check passes, HTTP 503 otherwise.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let root = state.media.local().root();
    let tmp_path = root.join(format!(".readyz-{}", Uuid::new_v4()));
    let disk_check = match fs::write(&tmp_path, b"readyz").await {
        Ok(_) => match fs::read(&tmp_path).await {
            Ok(bytes) if bytes == b"readyz" => match fs::remove_file(&tmp_path).await {
                Ok(_) => (true, None::<String>),
                Err(e) => (true, Some(format!("could not remove tmp file: {}", e))),
            },
            Ok(_) => {
                let _ = fs::remove_file(&tmp_path).await;
                (false, Some("file content mismatch".to_string()))
            }
            Err(e) => {
                let _ = fs::remove_file(&tmp_path).await;
                (false, Some(format!("could not read tmp file: {}", e)))
            }
        },
        Err(e) => (false, Some(format!("could not write tmp file: {}", e))),
    };

    let disk_ok = disk_check.0;
    let mut checks = HashMap::new();
    checks.insert(
        "disk",
        CheckStatus {
            ok: disk_ok,
            error: disk_check.1,
        },
    );

    let body = ReadyResponse {
        status: if disk_ok { "ok" } else { "error" },
        checks,
    };
    let status = if disk_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

/// `GET /stats`
pub async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    debug!("serving stats");
    let file_stats = state.media.stats();
    Json(StatsResponse {
        status: "ok",
        uptime: format!("{:?}", state.started_at.elapsed()),
        rates: file_stats.rates_at(Utc::now()),
        file_stats,
        cloud_stats: state.media.cloud_stats(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime: String,
    stats: Stats,
    timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: &'static str,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    status: &'static str,
    uptime: String,
    file_stats: Stats,
    rates: Rates,
    cloud_stats: Value,
}
