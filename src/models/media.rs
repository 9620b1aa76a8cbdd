//! Represents an inbound media item and the file it becomes on disk.

use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, str::FromStr};
use thiserror::Error;

/// The kind of media a messaging provider announced.
///
/// The lowercase name is part of the on-disk filename, so the `Display`
/// output must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    File,
}

impl MediaKind {
    pub const ALL: [MediaKind; 4] = [
        MediaKind::Image,
        MediaKind::Video,
        MediaKind::Audio,
        MediaKind::File,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::File => "file",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unsupported media kind `{0}`")]
pub struct UnknownMediaKind(pub String);

impl FromStr for MediaKind {
    type Err = UnknownMediaKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            "audio" => Ok(MediaKind::Audio),
            "file" => Ok(MediaKind::File),
            _ => Err(UnknownMediaKind(s.to_string())),
        }
    }
}

/// A payload durably written under the storage root.
#[derive(Debug, Clone, Serialize)]
pub struct StoredFile {
    /// `{storage_root}/{date_bucket}/{filename}`
    pub path: PathBuf,

    /// Exact number of bytes written.
    pub bytes: u64,

    /// `YYYY-MM-DD` directory the file was placed in.
    pub date_bucket: String,
}
