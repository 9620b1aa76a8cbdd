//! Backup destinations that stored files are replicated to.
//!
//! A destination is a capability set: initialize once, resolve folders,
//! upload a local file into a folder. `DisabledBackup` stands in when no
//! destination is configured so the replicator needs no special casing.

pub mod mirror;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::{io, path::Path};
use thiserror::Error;

pub use mirror::MirrorBackup;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("backup destination is disabled")]
    Disabled,
    #[error("invalid remote path `{0}`")]
    InvalidPath(String),
    #[error("{context}: {source}")]
    Io { context: String, source: io::Error },
    #[error("backup destination rejected request: {0}")]
    Rejected(String),
}

impl BackupError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

pub type BackupResult<T> = Result<T, BackupError>;

/// A folder resolved on the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFolder {
    /// Identifier to upload into.
    pub id: String,
    /// True when this call created the folder; "already exists" is success.
    pub created: bool,
}

#[async_trait]
pub trait BackupDestination: Send + Sync {
    /// Short provider name for logs and stats.
    fn name(&self) -> &'static str;

    fn is_enabled(&self) -> bool {
        true
    }

    /// Called once at startup. A failure disables replication for the
    /// lifetime of the process.
    async fn initialize(&self) -> BackupResult<()>;

    /// Resolve (creating if needed) the folder at `path`, `/`-separated.
    async fn ensure_folder(&self, path: &str) -> BackupResult<RemoteFolder>;

    /// Upload `local_path` into the folder and return its remote identifier.
    ///
    /// Every call must open its own read handle on the local file.
    async fn upload(&self, local_path: &Path, folder_id: &str) -> BackupResult<String>;

    /// Shareable link for an uploaded file, if the provider has one.
    fn file_link(&self, _remote_id: &str) -> Option<String> {
        None
    }

    /// Provider specific values merged into the cloud stats response.
    fn provider_stats(&self) -> Map<String, Value> {
        Map::new()
    }
}

/// Null destination used when no backup is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledBackup;

#[async_trait]
impl BackupDestination for DisabledBackup {
    fn name(&self) -> &'static str {
        "disabled"
    }

    fn is_enabled(&self) -> bool {
        false
    }

    async fn initialize(&self) -> BackupResult<()> {
        Err(BackupError::Disabled)
    }

    async fn ensure_folder(&self, _path: &str) -> BackupResult<RemoteFolder> {
        Err(BackupError::Disabled)
    }

    async fn upload(&self, _local_path: &Path, _folder_id: &str) -> BackupResult<String> {
        Err(BackupError::Disabled)
    }
}

/// Join a base folder and a sub path into a normalized `/`-separated path.
pub fn join_remote(base: &str, sub: &str) -> String {
    base.split('/')
        .chain(sub.split('/'))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
