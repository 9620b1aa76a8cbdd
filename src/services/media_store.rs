//! src/services/media_store.rs
//!
//! MediaStore: the pipeline facade. For every inbound item it writes the
//! payload to local disk, records the counters, and hands the file to the
//! replicator. The caller only waits for the local write; replication and
//! queued downloads run in the background and can be joined with the
//! `wait_for_*` methods.

use crate::{
    models::{media::MediaKind, stats::Stats},
    services::{
        content_source::{ContentSource, SourceError},
        in_flight::InFlight,
        local_store::{LocalStore, StoreError},
        replication::{Replicator, UploadCallback, UploadEvent, UploadOutcome},
        stats::StatsAggregator,
    },
};
use bytes::Bytes;
use futures::Stream;
use serde_json::Value;
use std::{io, path::PathBuf, sync::Arc};
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum MediaError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("no content source is configured")]
    NoContentSource,
}

pub type MediaResult<T> = Result<T, MediaError>;

#[derive(Clone)]
pub struct MediaStore {
    local: LocalStore,
    stats: Arc<StatsAggregator>,
    replicator: Replicator,
    content_source: Option<Arc<dyn ContentSource>>,
    downloads: InFlight,
}

impl MediaStore {
    /// The stats clock starts here.
    pub fn new(local: LocalStore, replicator: Replicator) -> Self {
        Self {
            local,
            stats: Arc::new(StatsAggregator::new()),
            replicator,
            content_source: None,
            downloads: InFlight::new(),
        }
    }

    pub fn with_content_source(mut self, source: Arc<dyn ContentSource>) -> Self {
        self.content_source = Some(source);
        self
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    /// Write `payload` to disk, count it, and queue it for replication.
    ///
    /// Returns once the file is durably on disk. Local failures are returned
    /// as-is and leave every counter untouched.
    pub async fn save_media<S>(
        &self,
        source_id: &str,
        kind: MediaKind,
        content_type: &str,
        payload: S,
    ) -> Result<(PathBuf, u64), StoreError>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        debug!(source_id, %kind, content_type, "saving media");

        let stored = self.local.store(kind, content_type, payload).await?;
        self.stats.record(kind, stored.bytes);

        info!(
            source_id,
            %kind,
            bytes = stored.bytes,
            path = %stored.path.display(),
            "saved media file"
        );

        self.replicator.enqueue(stored.path.clone(), stored.date_bucket);

        Ok((stored.path, stored.bytes))
    }

    /// Fetch `source_id` from the content source and save it. Provider errors
    /// are returned verbatim without retry.
    pub async fn fetch_and_save(&self, source_id: &str, kind: MediaKind) -> MediaResult<PathBuf> {
        let source = self
            .content_source
            .as_ref()
            .ok_or(MediaError::NoContentSource)?;
        let content = source.fetch(source_id).await?;
        debug!(source_id, content_type = %content.content_type, "fetched media content");
        let (path, _) = self
            .save_media(source_id, kind, &content.content_type, content.body)
            .await?;
        Ok(path)
    }

    /// Run [`fetch_and_save`](Self::fetch_and_save) on a background task.
    /// Failures are logged; `wait_for_downloads` joins the task.
    pub fn queue_download(&self, source_id: String, kind: MediaKind) -> MediaResult<()> {
        if self.content_source.is_none() {
            return Err(MediaError::NoContentSource);
        }
        info!(source_id = %source_id, %kind, "queuing media download");

        let guard = self.downloads.start();
        let store = self.clone();
        tokio::spawn(async move {
            let _guard = guard;
            match store.fetch_and_save(&source_id, kind).await {
                Ok(path) => {
                    info!(source_id = %source_id, path = %path.display(), "downloaded and saved media");
                    store.log_backup_outcome(&source_id, path);
                }
                Err(err) => error!(source_id = %source_id, error = %err, "failed to download media"),
            }
        });
        Ok(())
    }

    /// Notify `callback` once replication of `path` succeeds or permanently
    /// fails. Dropped without a call when replication is disabled.
    pub fn register_upload_callback(&self, path: PathBuf, callback: UploadCallback) {
        self.replicator.register_callback(path, callback);
    }

    /// Log the backup link for `path` against the item it came from once
    /// replication settles.
    pub fn log_backup_outcome(&self, source_id: &str, path: PathBuf) {
        let source_id = source_id.to_string();
        self.register_upload_callback(
            path,
            Box::new(move |event: &UploadEvent| -> anyhow::Result<()> {
                match &event.outcome {
                    UploadOutcome::Uploaded { remote_id, link } => info!(
                        source_id = %source_id,
                        path = %event.local_path.display(),
                        remote_id = %remote_id,
                        link = link.as_deref().unwrap_or("-"),
                        "backup link ready"
                    ),
                    UploadOutcome::Failed { error } => error!(
                        source_id = %source_id,
                        path = %event.local_path.display(),
                        error = %error,
                        "media was not backed up"
                    ),
                }
                Ok(())
            }),
        );
    }

    pub async fn wait_for_downloads(&self) {
        if self.downloads.pending() > 0 {
            info!("waiting for pending downloads to complete");
        }
        self.downloads.wait().await;
        debug!("all downloads completed");
    }

    pub async fn wait_for_uploads(&self) {
        if !self.replicator.is_enabled() {
            return;
        }
        if self.replicator.pending() > 0 {
            info!("waiting for pending backup uploads to complete");
        }
        self.replicator.wait_idle().await;
        debug!("all backup uploads completed");
    }

    /// Downloads first, since a finishing download may still queue an upload.
    pub async fn wait_for_all(&self) {
        self.wait_for_downloads().await;
        self.wait_for_uploads().await;
    }

    pub fn stats(&self) -> Stats {
        self.stats.snapshot()
    }

    pub fn cloud_stats(&self) -> Value {
        self.replicator.cloud_stats()
    }
}
