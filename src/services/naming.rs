//! Filename and directory naming for stored media.
//!
//! Files are named `{kind}_{unix_millis}_{16 hex chars}{ext}`. The random
//! suffix comes from the OS CSPRNG, which makes same-millisecond collisions
//! statistically negligible.

use crate::models::media::MediaKind;
use chrono::{Local, Utc};

/// Extension used when the content type is missing or unrecognized.
pub const FALLBACK_EXTENSION: &str = ".bin";

const RANDOM_SUFFIX_BYTES: usize = 8;

/// Build a fresh filename for `kind` with the given extension.
///
/// `extension` may be given with or without its leading dot; an empty
/// extension yields a name without one.
pub fn generate_filename(kind: MediaKind, extension: &str) -> Result<String, getrandom::Error> {
    let timestamp = Utc::now().timestamp_millis();

    let mut random = [0u8; RANDOM_SUFFIX_BYTES];
    getrandom::fill(&mut random)?;
    let suffix = hex::encode(random);

    let extension = match extension {
        "" => String::new(),
        ext if ext.starts_with('.') => ext.to_string(),
        ext => format!(".{ext}"),
    };

    Ok(format!("{kind}_{timestamp}_{suffix}{extension}"))
}

/// Map a MIME type to a storage extension. Never fails.
///
/// Parameters such as `; charset=binary` are ignored and the comparison is
/// case-insensitive.
pub fn extension_for_content_type(content_type: &str) -> &'static str {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        "video/mp4" => ".mp4",
        "video/3gpp" => ".3gp",
        "audio/mp4" | "audio/mpeg" | "audio/mp3" => ".mp3",
        _ => FALLBACK_EXTENSION,
    }
}

/// Today's date bucket in the local timezone, `YYYY-MM-DD`.
pub fn date_bucket() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}
