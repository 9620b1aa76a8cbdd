//! Defines routes for media intake, health and stats.
//!
//! ## Structure
//! - **Probe endpoints**
//!   - `GET  /healthz`: liveness plus counters
//!   - `GET  /readyz` : disk readiness
//!   - `GET  /stats`  : counters, rates, backup stats
//!
//! - **Intake endpoints** (behind the admission gate)
//!   - `POST /media/{kind}`: store the request body
//!   - `POST /media/{kind}/{source_id}/fetch`: queue a download from the content source

use crate::{
    handlers::{
        health_handlers::{healthz, readyz, stats},
        media_handlers::{fetch_media, upload_media},
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build the router. Handlers share `AppState`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/stats", get(stats))
        .route("/media/{kind}", post(upload_media))
        .route("/media/{kind}/{source_id}/fetch", post(fetch_media))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{
        admission::AdmissionGate,
        backup::{DisabledBackup, MirrorBackup},
        local_store::LocalStore,
        media_store::MediaStore,
        replication::{ReplicationConfig, Replicator},
    };
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::{sync::Arc, time::Duration};
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn app(dir: &TempDir, rate: u32) -> Router {
        let replicator =
            Replicator::start(Arc::new(DisabledBackup), ReplicationConfig::default()).await;
        let media = MediaStore::new(LocalStore::new(dir.path()), replicator);
        let gate = AdmissionGate::new(rate, Duration::from_secs(60));
        routes().with_state(AppState::new(media, gate))
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn upload(kind: &str, content_type: &str, body: &'static str) -> Request<Body> {
        Request::post(format!("/media/{kind}"))
            .header(header::CONTENT_TYPE, content_type)
            .header("x-source-id", "msg-123")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn upload_stores_body_and_updates_stats() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, 10).await;

        let response = app
            .clone()
            .oneshot(upload("image", "image/jpeg", "jpeg-bytes"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["bytes"], 10);
        let path = body["path"].as_str().unwrap();
        assert!(path.ends_with(".jpg"));
        assert_eq!(tokio::fs::read(path).await.unwrap(), b"jpeg-bytes");

        let response = app
            .oneshot(Request::get("/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let stats = json_body(response).await;
        assert_eq!(stats["fileStats"]["imageCount"], 1);
        assert_eq!(stats["fileStats"]["totalBytes"], 10);
        assert_eq!(stats["cloudStats"]["enabled"], false);
    }

    #[tokio::test]
    async fn upload_with_backup_reports_outcome() {
        let dir = TempDir::new().unwrap();
        let mirror = TempDir::new().unwrap();
        let config = ReplicationConfig {
            backoff_unit: Duration::from_millis(1),
            ..ReplicationConfig::default()
        };
        let replicator = Replicator::start(Arc::new(MirrorBackup::new(mirror.path())), config).await;
        let media = MediaStore::new(LocalStore::new(dir.path()), replicator.clone());
        let app = routes().with_state(AppState::new(
            media.clone(),
            AdmissionGate::new(10, Duration::from_secs(60)),
        ));

        let response = app
            .oneshot(upload("audio", "audio/mpeg", "mp3-bytes"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        let path = std::path::PathBuf::from(body["path"].as_str().unwrap());

        media.wait_for_all().await;
        let date = path.parent().unwrap().file_name().unwrap();
        let copied = mirror
            .path()
            .join("MediaCatcher")
            .join(date)
            .join(path.file_name().unwrap());
        assert_eq!(tokio::fs::read(copied).await.unwrap(), b"mp3-bytes");
        assert_eq!(media.cloud_stats()["uploadCount"], 1);
        assert_eq!(replicator.parked(), (0, 0));
    }

    #[tokio::test]
    async fn unknown_kind_is_bad_request() {
        let dir = TempDir::new().unwrap();
        let response = app(&dir, 10)
            .await
            .oneshot(upload("sticker", "image/png", "x"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn admission_gate_returns_429_with_retry_after() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, 1).await;

        let first = app
            .clone()
            .oneshot(upload("file", "application/pdf", "pdf"))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = app
            .oneshot(upload("file", "application/pdf", "pdf"))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        let retry_after: u64 = second.headers()[header::RETRY_AFTER]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!((1..=60).contains(&retry_after));
    }

    #[tokio::test]
    async fn fetch_without_content_source_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let response = app(&dir, 10)
            .await
            .oneshot(
                Request::post("/media/video/12345/fetch")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn probes_report_ok() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, 10).await;

        let health = app
            .clone()
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(health.status(), StatusCode::OK);
        assert_eq!(json_body(health).await["status"], "ok");

        let ready = app
            .oneshot(Request::get("/readyz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(ready.status(), StatusCode::OK);
        // The probe file is cleaned up.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
