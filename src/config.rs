use crate::services::replication::ReplicationConfig;
use anyhow::{Context, Result};
use clap::Parser;
use std::{env, fmt, path::PathBuf, str::FromStr, time::Duration};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: PathBuf,
    pub log_dir: Option<PathBuf>,
    pub debug: bool,
    pub rate_limit: u32,
    pub rate_interval: Duration,
    pub content: Option<ContentConfig>,
    pub backup: Option<BackupConfig>,
}

/// Where provider message content is fetched from.
#[derive(Clone)]
pub struct ContentConfig {
    pub base_url: String,
    pub token: Option<String>,
}

// The token must never reach the startup log.
impl fmt::Debug for ContentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Mirror backup settings; present only when a backup directory is set.
#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub dir: PathBuf,
    pub folder: String,
    pub retries: u32,
    pub workers: usize,
}

impl BackupConfig {
    pub fn replication(&self) -> ReplicationConfig {
        ReplicationConfig {
            base_folder: self.folder.clone(),
            max_retries: self.retries,
            workers: self.workers,
            ..ReplicationConfig::default()
        }
    }
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Captures messaging media to disk and replicates it")]
pub struct Args {
    /// Host to bind to (overrides MEDIA_CATCHER_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides MEDIA_CATCHER_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where media is stored (overrides MEDIA_CATCHER_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<PathBuf>,

    /// Directory for daily log files (overrides MEDIA_CATCHER_LOG_DIR)
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Enable debug logging (same as MEDIA_CATCHER_DEBUG=true)
    #[arg(long)]
    pub debug: bool,

    /// Mirror backup directory; enables replication (overrides MEDIA_CATCHER_BACKUP_DIR)
    #[arg(long)]
    pub backup_dir: Option<PathBuf>,

    /// Content API base URL (overrides MEDIA_CATCHER_CONTENT_URL)
    #[arg(long)]
    pub content_url: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::resolve(Args::parse(), |key| env::var(key).ok())
    }

    /// Merge CLI args over values from `lookup`, falling back to defaults.
    pub fn resolve(args: Args, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = args
            .host
            .or_else(|| var("MEDIA_CATCHER_HOST"))
            .unwrap_or_else(|| "0.0.0.0".into());
        let port = match args.port {
            Some(port) => port,
            None => parse_var(&var, "MEDIA_CATCHER_PORT", 8080)?,
        };
        let storage_dir = args
            .storage_dir
            .or_else(|| var("MEDIA_CATCHER_STORAGE_DIR").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("./storage"));
        let log_dir = args
            .log_dir
            .or_else(|| var("MEDIA_CATCHER_LOG_DIR").map(PathBuf::from));
        let debug = args.debug || var("MEDIA_CATCHER_DEBUG").is_some_and(|v| v == "true");

        let rate_limit: u32 = parse_var(&var, "MEDIA_CATCHER_RATE_LIMIT", 60)?;
        anyhow::ensure!(rate_limit > 0, "MEDIA_CATCHER_RATE_LIMIT must be positive");
        let rate_interval_secs: u64 = parse_var(&var, "MEDIA_CATCHER_RATE_INTERVAL_SECS", 60)?;
        anyhow::ensure!(
            rate_interval_secs > 0,
            "MEDIA_CATCHER_RATE_INTERVAL_SECS must be positive"
        );

        let content = args
            .content_url
            .or_else(|| var("MEDIA_CATCHER_CONTENT_URL"))
            .map(|base_url| ContentConfig {
                base_url,
                token: var("MEDIA_CATCHER_CONTENT_TOKEN"),
            });

        let backup = match args
            .backup_dir
            .or_else(|| var("MEDIA_CATCHER_BACKUP_DIR").map(PathBuf::from))
        {
            Some(dir) => Some(BackupConfig {
                dir,
                folder: var("MEDIA_CATCHER_BACKUP_FOLDER").unwrap_or_else(|| "MediaCatcher".into()),
                retries: parse_var(&var, "MEDIA_CATCHER_BACKUP_RETRIES", 3)?,
                workers: parse_var(&var, "MEDIA_CATCHER_BACKUP_WORKERS", 4)?,
            }),
            None => None,
        };

        Ok(Self {
            host,
            port,
            storage_dir,
            log_dir,
            debug,
            rate_limit,
            rate_interval: Duration::from_secs(rate_interval_secs),
            content,
            backup,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(var: impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        None => Ok(default),
    }
}
