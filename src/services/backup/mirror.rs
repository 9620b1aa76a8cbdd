//! Directory-mirror backup destination.
//!
//! Replicates into a second directory tree, typically a mounted network
//! share. Folder identifiers are paths relative to the mirror root.

use super::{BackupDestination, BackupError, BackupResult, RemoteFolder};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File, OpenOptions},
    io::{self, AsyncWriteExt},
};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct MirrorBackup {
    root: PathBuf,
}

impl MirrorBackup {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Reject absolute paths and anything that could climb out of the root.
    fn ensure_path_safe(path: &str) -> BackupResult<()> {
        if path.starts_with('/')
            || path.split('/').any(|part| part == ".." || part == ".")
            || path.bytes().any(|b| b.is_ascii_control() || b == b'\\')
        {
            return Err(BackupError::InvalidPath(path.to_string()));
        }
        Ok(())
    }

    fn resolve(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |acc, part| acc.join(part))
    }
}

#[async_trait]
impl BackupDestination for MirrorBackup {
    fn name(&self) -> &'static str {
        "mirror"
    }

    /// Create the root and prove it is writable with a throwaway probe file.
    async fn initialize(&self) -> BackupResult<()> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            BackupError::io(format!("creating mirror root {}", self.root.display()), e)
        })?;

        let probe = self.root.join(format!(".probe-{}", Uuid::new_v4()));
        fs::write(&probe, b"probe")
            .await
            .map_err(|e| BackupError::io("mirror root is not writable", e))?;
        if let Err(err) = fs::remove_file(&probe).await {
            debug!("could not remove probe file {}: {}", probe.display(), err);
        }
        Ok(())
    }

    async fn ensure_folder(&self, path: &str) -> BackupResult<RemoteFolder> {
        Self::ensure_path_safe(path)?;
        let dir = self.resolve(path);

        let created = match fs::create_dir(&dir).await {
            Ok(()) => true,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => false,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                fs::create_dir_all(&dir)
                    .await
                    .map_err(|e| BackupError::io(format!("creating folder `{path}`"), e))?;
                true
            }
            Err(err) => return Err(BackupError::io(format!("creating folder `{path}`"), err)),
        };

        if !fs::metadata(&dir).await.map(|m| m.is_dir()).unwrap_or(false) {
            return Err(BackupError::Rejected(format!("`{path}` is not a folder")));
        }

        Ok(RemoteFolder {
            id: path.trim_matches('/').to_string(),
            created,
        })
    }

    async fn upload(&self, local_path: &Path, folder_id: &str) -> BackupResult<String> {
        Self::ensure_path_safe(folder_id)?;
        let filename = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| BackupError::InvalidPath(local_path.display().to_string()))?;

        let mut source = File::open(local_path).await.map_err(|e| {
            BackupError::io(format!("opening {} for upload", local_path.display()), e)
        })?;

        let target = self.resolve(folder_id).join(filename);
        let mut dest = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&target)
            .await
            .map_err(|e| BackupError::io(format!("creating {}", target.display()), e))?;

        io::copy(&mut source, &mut dest)
            .await
            .map_err(|e| BackupError::io(format!("copying into {}", target.display()), e))?;
        dest.flush()
            .await
            .map_err(|e| BackupError::io(format!("flushing {}", target.display()), e))?;

        Ok(if folder_id.is_empty() {
            filename.to_string()
        } else {
            format!("{}/{}", folder_id.trim_matches('/'), filename)
        })
    }

    fn file_link(&self, remote_id: &str) -> Option<String> {
        Some(format!("file://{}", self.resolve(remote_id).display()))
    }

    fn provider_stats(&self) -> Map<String, Value> {
        let mut stats = Map::new();
        stats.insert("provider".into(), Value::from(self.name()));
        stats.insert(
            "root".into(),
            Value::from(self.root.display().to_string()),
        );
        stats
    }
}
