//! HTTP intake for media.
//! Both routes pass the admission gate first; bodies are streamed straight
//! to disk through `MediaStore`.

use crate::{errors::AppError, models::media::MediaKind, state::AppState};
use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use futures::StreamExt;
use serde::Serialize;
use std::io;
use tracing::{info, warn};
use uuid::Uuid;

/// Optional correlation id supplied by the producer.
pub const SOURCE_ID_HEADER: &str = "x-source-id";

#[derive(Debug, Serialize)]
pub struct SavedMedia {
    pub path: String,
    pub bytes: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedDownload {
    pub source_id: String,
    pub kind: MediaKind,
    pub status: &'static str,
}

/// Reject with 429 and a retry hint once the bucket is empty.
fn admit(state: &AppState) -> Result<(), AppError> {
    if state.gate.allow() {
        return Ok(());
    }
    let retry_after = state.gate.reset_in();
    warn!(retry_after = ?retry_after, "rate limit exceeded");
    Err(AppError::too_many_requests(retry_after))
}

fn parse_kind(kind: &str) -> Result<MediaKind, AppError> {
    kind.parse::<MediaKind>()
        .map_err(|err| AppError::bad_request(err.to_string()))
}

/// `POST /media/{kind}`: store the request body.
pub async fn upload_media(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse, AppError> {
    admit(&state)?;
    let kind = parse_kind(&kind)?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let source_id = headers
        .get(SOURCE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let stream = body
        .into_data_stream()
        .map(|chunk| chunk.map_err(io::Error::other));

    let (path, bytes) = state
        .media
        .save_media(&source_id, kind, &content_type, stream)
        .await?;
    state.media.log_backup_outcome(&source_id, path.clone());

    Ok((
        StatusCode::CREATED,
        Json(SavedMedia {
            path: path.display().to_string(),
            bytes,
        }),
    ))
}

/// `POST /media/{kind}/{source_id}/fetch`: queue a background download
/// from the configured content source.
pub async fn fetch_media(
    State(state): State<AppState>,
    Path((kind, source_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    admit(&state)?;
    let kind = parse_kind(&kind)?;

    state.media.queue_download(source_id.clone(), kind)?;
    info!(source_id = %source_id, %kind, "accepted download request");

    Ok((
        StatusCode::ACCEPTED,
        Json(QueuedDownload {
            source_id,
            kind,
            status: "queued",
        }),
    ))
}
