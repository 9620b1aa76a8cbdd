//! Replicator: pushes stored files to the backup destination.
//!
//! Files are queued and picked up by a fixed pool of workers, so the number
//! of concurrent remote calls is capped while enqueueing never blocks the
//! caller. Each file is uploaded into `{base_folder}/{date_bucket}`, the same
//! layout used on local disk, with bounded exponential-backoff retries.
//!
//! Locking: the folder cache, the stats, and the callback registry each have
//! their own mutex. None is held across I/O or while another is held.

use crate::services::{
    backup::{BackupDestination, BackupError, join_remote},
    in_flight::{InFlight, InFlightGuard},
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use std::{
    collections::{HashMap, VecDeque},
    panic::{AssertUnwindSafe, catch_unwind},
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Callbacks waiting on a file, and outcomes waiting on a callback, are each
/// capped at this many entries. The oldest entry is dropped first.
const MAX_PARKED: usize = 1024;

/// Largest exponent used for the backoff delay.
const MAX_BACKOFF_EXPONENT: u32 = 16;

#[derive(Debug, Clone)]
pub struct ReplicationConfig {
    /// Remote folder every date bucket is created under.
    pub base_folder: String,
    /// Additional attempts after the first failed upload.
    pub max_retries: u32,
    /// Retry `n` waits `2^n` of these.
    pub backoff_unit: Duration,
    /// Number of concurrent upload workers.
    pub workers: usize,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            base_folder: "MediaCatcher".into(),
            max_retries: 3,
            backoff_unit: Duration::from_secs(1),
            workers: 4,
        }
    }
}

/// Counters owned by the replicator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplicationStats {
    pub total_uploaded: u64,
    pub upload_count: u64,
    pub failed_uploads: u64,
    pub retry_count: u64,
    pub folder_created_count: u64,
    pub total_upload_time: Duration,
    pub last_upload_time: Option<DateTime<Utc>>,
}

impl ReplicationStats {
    /// Mean end-to-end latency of successful uploads, retries included.
    pub fn average_upload_time(&self) -> Duration {
        if self.upload_count == 0 {
            return Duration::ZERO;
        }
        self.total_upload_time.div_f64(self.upload_count as f64)
    }

    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("totalUploaded".into(), json!(self.total_uploaded));
        map.insert("uploadCount".into(), json!(self.upload_count));
        map.insert("failedUploads".into(), json!(self.failed_uploads));
        map.insert("retryCount".into(), json!(self.retry_count));
        map.insert("folderCreatedCount".into(), json!(self.folder_created_count));
        map.insert(
            "averageUploadTime".into(),
            json!(format!("{:?}", self.average_upload_time())),
        );
        if let Some(at) = self.last_upload_time {
            map.insert("lastUploadTime".into(), json!(at.to_rfc3339()));
        }
        map
    }
}

/// How a file's replication ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded {
        remote_id: String,
        link: Option<String>,
    },
    Failed {
        error: String,
    },
}

/// Delivered to a registered callback once per file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadEvent {
    pub local_path: PathBuf,
    pub outcome: UploadOutcome,
}

/// Completion handler. Runs on a replication worker task; errors it returns
/// are logged and otherwise ignored.
pub type UploadCallback = Box<dyn FnOnce(&UploadEvent) -> anyhow::Result<()> + Send + 'static>;

struct ReplicationTask {
    local_path: PathBuf,
    date_bucket: String,
    _pending: InFlightGuard,
}

/// Insertion-ordered map keyed by local path that forgets its oldest entry
/// once it holds `MAX_PARKED` entries.
struct Parked<V> {
    entries: HashMap<PathBuf, V>,
    order: VecDeque<PathBuf>,
}

impl<V> Default for Parked<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }
}

impl<V> Parked<V> {
    /// Returns the entry evicted to make room, if any.
    fn insert(&mut self, path: PathBuf, value: V) -> Option<(PathBuf, V)> {
        if self.entries.insert(path.clone(), value).is_some() {
            return None;
        }
        let evicted = if self.order.len() >= MAX_PARKED {
            self.order
                .pop_front()
                .and_then(|oldest| self.entries.remove(&oldest).map(|v| (oldest, v)))
        } else {
            None
        };
        self.order.push_back(path);
        evicted
    }

    fn remove(&mut self, path: &Path) -> Option<V> {
        let value = self.entries.remove(path)?;
        self.order.retain(|p| p != path);
        Some(value)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Default)]
struct CallbackRegistry {
    waiting: Parked<UploadCallback>,
    unclaimed: Parked<UploadEvent>,
}

struct Shared {
    destination: Arc<dyn BackupDestination>,
    config: ReplicationConfig,
    folders: Mutex<HashMap<String, String>>,
    stats: Mutex<ReplicationStats>,
    callbacks: Mutex<CallbackRegistry>,
}

/// Handle to the replication pool. Cheap to clone.
#[derive(Clone)]
pub struct Replicator {
    shared: Arc<Shared>,
    queue: Option<mpsc::UnboundedSender<ReplicationTask>>,
    pending: InFlight,
}

impl Replicator {
    /// Initialize `destination` and start the worker pool.
    ///
    /// When the destination is disabled, fails to initialize, or cannot
    /// create the base folder, the returned replicator is permanently
    /// disabled and every enqueue is a no-op.
    pub async fn start(destination: Arc<dyn BackupDestination>, config: ReplicationConfig) -> Self {
        let shared = Arc::new(Shared {
            destination,
            config,
            folders: Mutex::new(HashMap::new()),
            stats: Mutex::new(ReplicationStats::default()),
            callbacks: Mutex::new(CallbackRegistry::default()),
        });
        let disabled = Self {
            shared: shared.clone(),
            queue: None,
            pending: InFlight::new(),
        };

        let provider = shared.destination.name();
        if !shared.destination.is_enabled() {
            info!("backup replication disabled");
            return disabled;
        }
        if let Err(err) = shared.destination.initialize().await {
            error!(provider, error = %err, "failed to initialize backup destination");
            warn!("backup replication will be disabled");
            return disabled;
        }
        let base = join_remote(&shared.config.base_folder, "");
        if let Err(err) = shared.ensure_folder(&base).await {
            error!(provider, folder = %base, error = %err, "failed to create backup base folder");
            warn!("backup replication will be disabled");
            return disabled;
        }

        let (tx, rx) = mpsc::unbounded_channel::<ReplicationTask>();
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let workers = shared.config.workers.max(1);
        for worker in 0..workers {
            let rx = rx.clone();
            let shared = shared.clone();
            tokio::spawn(async move {
                loop {
                    let next = rx.lock().await.recv().await;
                    match next {
                        Some(task) => shared.replicate(task).await,
                        None => break,
                    }
                }
                debug!(worker, "replication worker stopped");
            });
        }
        info!(provider, workers, "backup replication enabled");

        Self {
            shared,
            queue: Some(tx),
            pending: InFlight::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.queue.is_some()
    }

    /// Queue `local_path` for upload into `{base_folder}/{date_bucket}`.
    /// Returns immediately.
    pub fn enqueue(&self, local_path: PathBuf, date_bucket: String) {
        let Some(queue) = &self.queue else {
            return;
        };
        let task = ReplicationTask {
            local_path,
            date_bucket,
            _pending: self.pending.start(),
        };
        if let Err(err) = queue.send(task) {
            error!(path = %err.0.local_path.display(), "replication queue closed, dropping upload");
        }
    }

    /// Call `callback` once `local_path` has been replicated or has
    /// permanently failed. If that already happened the callback runs on a
    /// background task straight away.
    pub fn register_callback(&self, local_path: PathBuf, callback: UploadCallback) {
        if !self.is_enabled() {
            debug!(path = %local_path.display(), "backup disabled, dropping upload callback");
            return;
        }
        let evicted = {
            let mut registry = self.shared.callbacks.lock();
            match registry.unclaimed.remove(&local_path) {
                Some(event) => {
                    tokio::spawn(async move { run_callback(callback, &event) });
                    return;
                }
                None => registry.waiting.insert(local_path, callback),
            }
        };
        if let Some((path, _callback)) = evicted {
            debug!(path = %path.display(), "too many pending upload callbacks, dropping oldest");
        }
    }

    /// Resolve once every upload queued before this call is done.
    pub async fn wait_idle(&self) {
        self.pending.wait().await;
    }

    pub fn pending(&self) -> usize {
        self.pending.pending()
    }

    /// Registered callbacks still waiting, and outcomes nobody claimed yet.
    #[cfg(test)]
    pub(crate) fn parked(&self) -> (usize, usize) {
        let registry = self.shared.callbacks.lock();
        (registry.waiting.len(), registry.unclaimed.len())
    }

    /// `None` while disabled.
    pub fn stats(&self) -> Option<ReplicationStats> {
        self.is_enabled().then(|| self.shared.stats.lock().clone())
    }

    /// `{enabled: false}` or `{enabled: true, ...counters, ...provider}`.
    pub fn cloud_stats(&self) -> Value {
        let Some(stats) = self.stats() else {
            return json!({ "enabled": false });
        };
        let mut map = stats.to_map();
        map.extend(self.shared.destination.provider_stats());
        map.insert("enabled".into(), Value::Bool(true));
        Value::Object(map)
    }
}

impl Shared {
    /// Resolve a remote folder through the path cache.
    async fn ensure_folder(&self, path: &str) -> Result<String, BackupError> {
        if let Some(id) = self.folders.lock().get(path).cloned() {
            return Ok(id);
        }
        let folder = self.destination.ensure_folder(path).await?;
        if folder.created {
            self.stats.lock().folder_created_count += 1;
            debug!(folder = %path, id = %folder.id, "created backup folder");
        }
        self.folders
            .lock()
            .insert(path.to_string(), folder.id.clone());
        Ok(folder.id)
    }

    async fn replicate(&self, task: ReplicationTask) {
        let started = Instant::now();
        let path = task.local_path.as_path();
        let remote_folder = join_remote(&self.config.base_folder, &task.date_bucket);
        debug!(path = %path.display(), folder = %remote_folder, "starting backup upload");

        let result = match self.ensure_folder(&remote_folder).await {
            Ok(folder_id) => self.upload_with_retry(path, &folder_id).await,
            Err(err) => Err(err),
        };

        let outcome = match result {
            Ok(remote_id) => {
                let size = tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0);
                let elapsed = started.elapsed();
                {
                    let mut stats = self.stats.lock();
                    stats.upload_count += 1;
                    stats.total_uploaded += size;
                    stats.total_upload_time += elapsed;
                    stats.last_upload_time = Some(Utc::now());
                }
                info!(
                    path = %path.display(),
                    remote_id = %remote_id,
                    bytes = size,
                    elapsed = ?elapsed,
                    "uploaded file to backup"
                );
                let link = self.destination.file_link(&remote_id);
                UploadOutcome::Uploaded { remote_id, link }
            }
            Err(err) => {
                self.stats.lock().failed_uploads += 1;
                error!(path = %path.display(), error = %err, "backup upload failed permanently");
                UploadOutcome::Failed {
                    error: err.to_string(),
                }
            }
        };

        self.settle(UploadEvent {
            local_path: task.local_path.clone(),
            outcome,
        });
    }

    /// Up to `max_retries + 1` sequential attempts. Attempt `n > 0` waits
    /// `2^n * backoff_unit` first.
    async fn upload_with_retry(&self, path: &Path, folder_id: &str) -> Result<String, BackupError> {
        let max_retries = self.config.max_retries;
        let mut attempt: u32 = 0;
        loop {
            if attempt > 0 {
                self.stats.lock().retry_count += 1;
                let delay = self.config.backoff_unit * 2u32.pow(attempt.min(MAX_BACKOFF_EXPONENT));
                warn!(
                    path = %path.display(),
                    attempt,
                    max_retries,
                    delay = ?delay,
                    "retrying backup upload"
                );
                tokio::time::sleep(delay).await;
            }

            match self.destination.upload(path, folder_id).await {
                Ok(remote_id) => return Ok(remote_id),
                Err(err) if attempt >= max_retries => return Err(err),
                Err(err) => {
                    debug!(path = %path.display(), attempt, error = %err, "backup upload attempt failed");
                    attempt += 1;
                }
            }
        }
    }

    /// Hand the event to its callback, or park it until one registers.
    fn settle(&self, event: UploadEvent) {
        let callback = {
            let mut registry = self.callbacks.lock();
            match registry.waiting.remove(&event.local_path) {
                Some(callback) => callback,
                None => {
                    registry.unclaimed.insert(event.local_path.clone(), event);
                    return;
                }
            }
        };
        run_callback(callback, &event);
    }
}

/// Callbacks run on pool workers, so a panic is contained here and logged
/// like a returned error.
fn run_callback(callback: UploadCallback, event: &UploadEvent) {
    let path = event.local_path.display();
    match catch_unwind(AssertUnwindSafe(move || callback(event))) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => error!(path = %path, error = %err, "upload callback failed"),
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".into());
            error!(path = %path, panic = %message, "upload callback panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::backup::{BackupResult, DisabledBackup, MirrorBackup, RemoteFolder};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Fails the first `failures` uploads, then succeeds.
    struct FlakyBackup {
        failures: usize,
        attempts: AtomicUsize,
        folder_calls: AtomicUsize,
        fail_init: bool,
        fail_folders: bool,
    }

    impl FlakyBackup {
        fn new(failures: usize) -> Self {
            Self {
                failures,
                attempts: AtomicUsize::new(0),
                folder_calls: AtomicUsize::new(0),
                fail_init: false,
                fail_folders: false,
            }
        }
    }

    #[async_trait]
    impl BackupDestination for FlakyBackup {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn initialize(&self) -> BackupResult<()> {
            if self.fail_init {
                return Err(BackupError::Rejected("missing credentials".into()));
            }
            Ok(())
        }

        async fn ensure_folder(&self, path: &str) -> BackupResult<RemoteFolder> {
            let calls = self.folder_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_folders {
                return Err(BackupError::Rejected("folder quota exceeded".into()));
            }
            Ok(RemoteFolder {
                id: format!("id:{path}"),
                created: calls == 0,
            })
        }

        async fn upload(&self, local_path: &Path, folder_id: &str) -> BackupResult<String> {
            // Every attempt must be able to open the file on its own.
            tokio::fs::File::open(local_path)
                .await
                .map_err(|e| BackupError::io("open", e))?;
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.failures {
                return Err(BackupError::Rejected("rate limited".into()));
            }
            Ok(format!("{folder_id}/{attempt}"))
        }

        fn file_link(&self, remote_id: &str) -> Option<String> {
            Some(format!("https://backup.test/{remote_id}"))
        }
    }

    fn fast_config(max_retries: u32) -> ReplicationConfig {
        ReplicationConfig {
            base_folder: "Backups".into(),
            max_retries,
            backoff_unit: Duration::from_millis(1),
            workers: 2,
        }
    }

    async fn local_file(dir: &TempDir, name: &str, body: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        tokio::fs::write(&path, body).await.unwrap();
        path
    }

    #[tokio::test]
    async fn always_failing_destination_gets_max_retries_plus_one_attempts() {
        let dir = TempDir::new().unwrap();
        let backup = Arc::new(FlakyBackup::new(usize::MAX));
        let replicator = Replicator::start(backup.clone(), fast_config(3)).await;

        let path = local_file(&dir, "image_1_aa.jpg", b"data").await;
        replicator.enqueue(path, "2025-03-01".into());
        replicator.wait_idle().await;

        assert_eq!(backup.attempts.load(Ordering::SeqCst), 4);
        let stats = replicator.stats().unwrap();
        assert_eq!(stats.failed_uploads, 1);
        assert_eq!(stats.retry_count, 3);
        assert_eq!(stats.upload_count, 0);

        // Nothing else happens afterwards.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(backup.attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn transient_failure_recovers_and_records_stats() {
        let dir = TempDir::new().unwrap();
        let backup = Arc::new(FlakyBackup::new(2));
        let replicator = Replicator::start(backup.clone(), fast_config(3)).await;

        let path = local_file(&dir, "video_1_bb.mp4", b"0123456789").await;
        replicator.enqueue(path, "2025-03-01".into());
        replicator.wait_idle().await;

        let stats = replicator.stats().unwrap();
        assert_eq!(backup.attempts.load(Ordering::SeqCst), 3);
        assert_eq!(stats.upload_count, 1);
        assert_eq!(stats.failed_uploads, 0);
        assert_eq!(stats.retry_count, 2);
        assert_eq!(stats.total_uploaded, 10);
        assert!(stats.last_upload_time.is_some());
        assert!(stats.average_upload_time() > Duration::ZERO);
    }

    #[tokio::test]
    async fn folders_are_resolved_once_per_path() {
        let dir = TempDir::new().unwrap();
        let backup = Arc::new(FlakyBackup::new(0));
        let replicator = Replicator::start(backup.clone(), fast_config(0)).await;

        for i in 0..5 {
            let path = local_file(&dir, &format!("file_{i}.bin"), b"x").await;
            replicator.enqueue(path, "2025-03-01".into());
        }
        replicator.wait_idle().await;

        // Base folder at startup plus at most one lookup per concurrent worker
        // racing on the date folder.
        let calls = backup.folder_calls.load(Ordering::SeqCst);
        assert!((2..=3).contains(&calls), "folder calls = {calls}");
        let stats = replicator.stats().unwrap();
        assert_eq!(stats.upload_count, 5);
        assert_eq!(stats.folder_created_count, 1);
    }

    #[tokio::test]
    async fn callback_receives_remote_link() {
        let dir = TempDir::new().unwrap();
        let backup = Arc::new(FlakyBackup::new(0));
        let replicator = Replicator::start(backup, fast_config(0)).await;
        let path = local_file(&dir, "audio_1_cc.mp3", b"abc").await;

        let (tx, rx) = tokio::sync::oneshot::channel();
        replicator.register_callback(
            path.clone(),
            Box::new(move |event: &UploadEvent| -> anyhow::Result<()> {
                tx.send(event.clone()).ok();
                Ok(())
            }),
        );
        replicator.enqueue(path.clone(), "2025-03-01".into());

        let event = rx.await.unwrap();
        assert_eq!(event.local_path, path);
        match event.outcome {
            UploadOutcome::Uploaded { remote_id, link } => {
                assert_eq!(remote_id, "id:Backups/2025-03-01/0");
                assert_eq!(link.unwrap(), "https://backup.test/id:Backups/2025-03-01/0");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn late_callback_still_fires() {
        let dir = TempDir::new().unwrap();
        let backup = Arc::new(FlakyBackup::new(usize::MAX));
        let replicator = Replicator::start(backup, fast_config(0)).await;
        let path = local_file(&dir, "file_1_dd.bin", b"abc").await;

        replicator.enqueue(path.clone(), "2025-03-01".into());
        replicator.wait_idle().await;

        let (tx, rx) = tokio::sync::oneshot::channel();
        replicator.register_callback(
            path,
            Box::new(move |event: &UploadEvent| -> anyhow::Result<()> {
                tx.send(event.outcome.clone()).ok();
                anyhow::bail!("callback errors are only logged")
            }),
        );

        assert!(matches!(rx.await.unwrap(), UploadOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn failed_initialization_disables_replication() {
        let dir = TempDir::new().unwrap();
        let mut flaky = FlakyBackup::new(0);
        flaky.fail_init = true;
        let backup = Arc::new(flaky);
        let replicator = Replicator::start(backup.clone(), fast_config(0)).await;

        assert!(!replicator.is_enabled());
        let path = local_file(&dir, "image_2_ee.jpg", b"abc").await;
        replicator.enqueue(path, "2025-03-01".into());
        replicator.wait_idle().await;

        assert_eq!(backup.attempts.load(Ordering::SeqCst), 0);
        assert_eq!(replicator.cloud_stats(), json!({ "enabled": false }));
    }

    #[tokio::test]
    async fn base_folder_failure_disables_replication() {
        let dir = TempDir::new().unwrap();
        let mut flaky = FlakyBackup::new(0);
        flaky.fail_folders = true;
        let backup = Arc::new(flaky);
        let replicator = Replicator::start(backup.clone(), fast_config(0)).await;

        assert!(!replicator.is_enabled());
        assert_eq!(backup.folder_calls.load(Ordering::SeqCst), 1);

        let path = local_file(&dir, "video_2_ab.mp4", b"abc").await;
        replicator.enqueue(path, "2025-03-01".into());
        replicator.wait_idle().await;
        assert_eq!(backup.attempts.load(Ordering::SeqCst), 0);
        assert_eq!(replicator.cloud_stats(), json!({ "enabled": false }));
    }

    #[tokio::test]
    async fn panicking_callback_does_not_stop_the_pool() {
        let dir = TempDir::new().unwrap();
        let backup = Arc::new(FlakyBackup::new(0));
        let config = ReplicationConfig {
            workers: 1,
            ..fast_config(0)
        };
        let replicator = Replicator::start(backup.clone(), config).await;

        let first = local_file(&dir, "image_4_aa.jpg", b"a").await;
        let second = local_file(&dir, "image_4_bb.jpg", b"b").await;
        replicator.register_callback(
            first.clone(),
            Box::new(|_: &UploadEvent| -> anyhow::Result<()> { panic!("callback blew up") }),
        );
        replicator.enqueue(first, "2025-03-01".into());
        replicator.wait_idle().await;

        replicator.enqueue(second, "2025-03-01".into());
        replicator.wait_idle().await;

        let stats = replicator.stats().unwrap();
        assert_eq!(stats.upload_count, 2);
        assert_eq!(stats.failed_uploads, 0);
        assert_eq!(backup.attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn callbacks_for_unknown_files_are_capped() {
        let backup = Arc::new(FlakyBackup::new(0));
        let replicator = Replicator::start(backup, fast_config(0)).await;

        for i in 0..MAX_PARKED + 10 {
            replicator.register_callback(
                PathBuf::from(format!("/never/queued/{i}.bin")),
                Box::new(|_: &UploadEvent| -> anyhow::Result<()> { Ok(()) }),
            );
        }
        assert_eq!(replicator.parked(), (MAX_PARKED, 0));
    }

    #[tokio::test]
    async fn disabled_backup_is_a_no_op() {
        let replicator = Replicator::start(Arc::new(DisabledBackup), fast_config(0)).await;
        assert!(!replicator.is_enabled());
        assert!(replicator.stats().is_none());
        replicator.enqueue(PathBuf::from("/nowhere"), "2025-03-01".into());
        assert_eq!(replicator.pending(), 0);
    }

    #[tokio::test]
    async fn mirror_backup_end_to_end() {
        let local_dir = TempDir::new().unwrap();
        let mirror_dir = TempDir::new().unwrap();
        let replicator =
            Replicator::start(Arc::new(MirrorBackup::new(mirror_dir.path())), fast_config(1)).await;

        let path = local_file(&local_dir, "image_3_ff.png", b"png").await;
        replicator.enqueue(path, "2025-03-02".into());
        replicator.wait_idle().await;

        let copied = mirror_dir
            .path()
            .join("Backups")
            .join("2025-03-02")
            .join("image_3_ff.png");
        assert_eq!(tokio::fs::read(copied).await.unwrap(), b"png");

        let cloud = replicator.cloud_stats();
        assert_eq!(cloud["enabled"], json!(true));
        assert_eq!(cloud["uploadCount"], json!(1));
        assert_eq!(cloud["provider"], json!("mirror"));
        // Base folder and date folder.
        assert_eq!(cloud["folderCreatedCount"], json!(2));
    }
}
