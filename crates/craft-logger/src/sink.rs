//! Dual-stream rotating file sink.
//!
//! Two streams under one logs directory: `app.YYYY-MM-DD.log` receives every
//! level, `app-error.YYYY-MM-DD.log` receives Warn and above. Each stream
//! rotates by calendar day and by size cap, and prunes files past its
//! retention age. Appends go over a channel to a writer task, so the logging
//! caller never touches disk I/O; write failures are reported once per
//! incident on an out-of-band watch channel instead of being thrown back.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error};

use crate::level::LogLevel;
use crate::record::LogRecord;

/// Rotation and retention parameters for one stream.
#[derive(Debug, Clone, Copy)]
pub struct RotationPolicy {
    pub max_bytes: u64,
    pub retention_days: i64,
}

/// Sink configuration: one directory, two stream policies.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub logs_dir: PathBuf,
    pub general: RotationPolicy,
    pub high_severity: RotationPolicy,
}

impl SinkConfig {
    /// Default policies: general stream 10 MiB / 30 days, high-severity
    /// stream 5 MiB / 60 days.
    pub fn new(logs_dir: impl Into<PathBuf>) -> Self {
        Self {
            logs_dir: logs_dir.into(),
            general: RotationPolicy {
                max_bytes: 10 * 1024 * 1024,
                retention_days: 30,
            },
            high_severity: RotationPolicy {
                max_bytes: 5 * 1024 * 1024,
                retention_days: 60,
            },
        }
    }
}

enum SinkCmd {
    Append(LogRecord),
    Flush(oneshot::Sender<()>),
}

/// Append-only persistence for structured log records.
///
/// Performs no deduplication: appending the same record twice persists two
/// entries.
#[derive(Clone)]
pub struct RotatingSink {
    tx: mpsc::UnboundedSender<SinkCmd>,
    errors: watch::Receiver<Option<String>>,
}

impl RotatingSink {
    pub fn new(config: SinkConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (err_tx, err_rx) = watch::channel(None);
        tokio::spawn(writer_task(config, rx, err_tx));
        Self { tx, errors: err_rx }
    }

    /// Queue a record for persistence. Never blocks and never fails the
    /// caller; a dead writer task is traced instead.
    pub fn append(&self, record: LogRecord) {
        if self.tx.send(SinkCmd::Append(record)).is_err() {
            error!("log sink writer gone, record dropped");
        }
    }

    /// Wait until every previously queued record has been written.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(SinkCmd::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// Out-of-band sink failure channel. Holds the latest failure message,
    /// `None` while healthy.
    pub fn subscribe_errors(&self) -> watch::Receiver<Option<String>> {
        self.errors.clone()
    }
}

struct StreamState {
    dir: PathBuf,
    /// File name prefix: `app` or `app-error`.
    prefix: &'static str,
    policy: RotationPolicy,
    /// Minimum level rank accepted, `None` accepts everything.
    min_rank: Option<u8>,
    date: NaiveDate,
    written: u64,
    failed: bool,
}

impl StreamState {
    async fn open(dir: &Path, prefix: &'static str, policy: RotationPolicy, min_rank: Option<u8>) -> Self {
        let mut stream = Self {
            dir: dir.to_path_buf(),
            prefix,
            policy,
            min_rank,
            date: Local::now().date_naive(),
            written: 0,
            failed: false,
        };
        stream.written = fs::metadata(stream.current_path())
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        stream.prune().await;
        stream
    }

    fn current_path(&self) -> PathBuf {
        self.dir
            .join(format!("{}.{}.log", self.prefix, self.date.format("%Y-%m-%d")))
    }

    fn accepts(&self, level: LogLevel) -> bool {
        match self.min_rank {
            Some(min) => level.rank() >= min,
            None => true,
        }
    }

    async fn append_line(&mut self, line: &str, err_tx: &watch::Sender<Option<String>>) {
        let today = Local::now().date_naive();
        if today != self.date {
            self.date = today;
            self.written = 0;
            self.prune().await;
        }

        let len = line.len() as u64;
        if self.written > 0 && self.written + len > self.policy.max_bytes {
            self.rotate_capped(err_tx).await;
        }

        let result = async {
            let mut file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.current_path())
                .await?;
            file.write_all(line.as_bytes()).await?;
            file.flush().await?;
            Ok::<_, std::io::Error>(())
        }
        .await;

        match result {
            Ok(()) => {
                self.written += len;
                self.failed = false;
            }
            Err(e) => self.report(&e, err_tx),
        }
    }

    /// Size cap reached: move the current file aside under the next free
    /// index and start a fresh one. The rename is atomic; an in-progress
    /// append can never interleave with it because the writer task is the
    /// only writer.
    async fn rotate_capped(&mut self, err_tx: &watch::Sender<Option<String>>) {
        let current = self.current_path();
        let mut index = 1u32;
        let target = loop {
            let candidate = self.dir.join(format!(
                "{}.{}.{}.log",
                self.prefix,
                self.date.format("%Y-%m-%d"),
                index
            ));
            if !candidate.exists() {
                break candidate;
            }
            index += 1;
        };
        match fs::rename(&current, &target).await {
            Ok(()) => {
                debug!(from = %current.display(), to = %target.display(), "rotated log file");
                self.written = 0;
            }
            Err(e) => self.report(&e, err_tx),
        }
    }

    /// Delete files of this stream older than the retention window.
    async fn prune(&self) {
        let Ok(mut entries) = fs::read_dir(&self.dir).await else {
            return;
        };
        let today = Local::now().date_naive();
        let prefix = format!("{}.", self.prefix);
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(rest) = name.strip_prefix(&prefix) else {
                continue;
            };
            let Some(date_part) = rest.get(..10) else { continue };
            let Ok(date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") else {
                continue;
            };
            if (today - date).num_days() > self.policy.retention_days {
                if let Err(e) = fs::remove_file(entry.path()).await {
                    debug!(file = %name, error = %e, "failed to prune log file");
                } else {
                    debug!(file = %name, "pruned expired log file");
                }
            }
        }
    }

    fn report(&mut self, e: &std::io::Error, err_tx: &watch::Sender<Option<String>>) {
        // One report per incident; healthy writes reset the latch.
        if !self.failed {
            self.failed = true;
            let message = format!("{} stream: {e}", self.prefix);
            error!(stream = self.prefix, error = %e, "log sink write failed");
            let _ = err_tx.send(Some(message));
        }
    }
}

async fn writer_task(
    config: SinkConfig,
    mut rx: mpsc::UnboundedReceiver<SinkCmd>,
    err_tx: watch::Sender<Option<String>>,
) {
    if let Err(e) = fs::create_dir_all(&config.logs_dir).await {
        error!(dir = %config.logs_dir.display(), error = %e, "failed to create logs directory");
        let _ = err_tx.send(Some(format!("logs dir: {e}")));
    }

    let mut general =
        StreamState::open(&config.logs_dir, "app", config.general, None).await;
    let mut high_severity = StreamState::open(
        &config.logs_dir,
        "app-error",
        config.high_severity,
        Some(LogLevel::Warn.rank()),
    )
    .await;

    while let Some(cmd) = rx.recv().await {
        match cmd {
            SinkCmd::Append(record) => {
                if record.level == LogLevel::None {
                    continue;
                }
                let mut line = match serde_json::to_string(&record) {
                    Ok(line) => line,
                    Err(e) => {
                        error!(error = %e, "unserializable log record dropped");
                        continue;
                    }
                };
                line.push('\n');
                general.append_line(&line, &err_tx).await;
                if high_severity.accepts(record.level) {
                    high_severity.append_line(&line, &err_tx).await;
                }
            }
            SinkCmd::Flush(ack) => {
                // Commands are processed in order; everything queued before
                // this flush has already hit the filesystem.
                let _ = ack.send(());
            }
        }
    }
}
