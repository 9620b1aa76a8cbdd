//! LocalStore: writes media payloads beneath
//! `{root}/{YYYY-MM-DD}/{kind}_{millis}_{hex}{ext}`.
//!
//! Nothing here retries. A failure is reported upward with the stage that
//! failed so the caller can decide what to do with the inbound item.

use crate::{
    models::media::{MediaKind, StoredFile},
    services::naming::{date_bucket, extension_for_content_type, generate_filename},
};
use bytes::Bytes;
use futures::{Stream, StreamExt, pin_mut};
use std::{
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{
    fs::{self, OpenOptions},
    io::AsyncWriteExt,
};
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to create storage directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("failed to generate filename: {0}")]
    Naming(#[from] getrandom::Error),
    #[error("failed to create file {}: {source}", path.display())]
    CreateFile { path: PathBuf, source: io::Error },
    #[error("failed to write file {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Clone, Debug)]
pub struct LocalStore {
    /// Root directory; date buckets are created beneath it.
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for a date bucket. Does not check for existence.
    pub fn bucket_dir(&self, date_bucket: &str) -> PathBuf {
        self.root.join(date_bucket)
    }

    /// Stream `payload` into a newly named file under today's bucket.
    ///
    /// The file is opened with create-new semantics, so an existing file with
    /// the same name is never truncated. The partial file is removed when the
    /// copy fails.
    pub async fn store<S>(
        &self,
        kind: MediaKind,
        content_type: &str,
        payload: S,
    ) -> StoreResult<StoredFile>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        let bucket = date_bucket();
        let dir = self.bucket_dir(&bucket);
        fs::create_dir_all(&dir)
            .await
            .map_err(|source| StoreError::CreateDir {
                path: dir.clone(),
                source,
            })?;

        let filename = generate_filename(kind, extension_for_content_type(content_type))?;
        let path = dir.join(filename);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|source| StoreError::CreateFile {
                path: path.clone(),
                source,
            })?;

        let mut bytes: u64 = 0;
        pin_mut!(payload);
        let copied: io::Result<()> = async {
            while let Some(chunk) = payload.next().await {
                let chunk = chunk?;
                file.write_all(&chunk).await?;
                bytes += chunk.len() as u64;
            }
            file.flush().await?;
            file.sync_all().await
        }
        .await;

        if let Err(source) = copied {
            drop(file);
            if let Err(err) = fs::remove_file(&path).await {
                debug!("could not remove partial file {}: {}", path.display(), err);
            }
            return Err(StoreError::Write { path, source });
        }

        Ok(StoredFile {
            path,
            bytes,
            date_bucket: bucket,
        })
    }
}
