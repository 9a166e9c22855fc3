//! Completion log watcher
//!
//! The setup script appends progress lines to a shared log and finishes with
//! either `DONE` or `ERROR <message>`. A [`LogWatch`] observes lines appended
//! after it was attached and resolves on the first terminal line.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::errors::DeployerError;
use crate::filesys::file::File;

const LINE_BUFFER: usize = 64;

/// Terminal outcome reported by the setup script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionSignal {
    Done,
    Failed(String),
}

/// Classify a single log line, `None` for progress output
pub fn classify(line: &str) -> Option<CompletionSignal> {
    if let Some(rest) = line.strip_prefix("ERROR") {
        let message = rest.trim_start_matches([':', ' ']).trim();
        Some(CompletionSignal::Failed(message.to_string()))
    } else if line.starts_with("DONE") {
        Some(CompletionSignal::Done)
    } else {
        None
    }
}

/// Watcher options
#[derive(Debug, Clone)]
pub struct Options {
    /// Path of the completion log
    pub log_file: PathBuf,

    /// How often the log is checked for new lines
    pub poll_interval: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            log_file: PathBuf::from("../ndb-setup/deployer/deploy-log.txt"),
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// Attaches watches to the completion log
#[derive(Debug, Clone)]
pub struct CompletionWatcher {
    log_file: File,
    poll_interval: Duration,
}

impl CompletionWatcher {
    pub fn new(options: &Options) -> Self {
        Self {
            log_file: File::new(options.log_file.clone()),
            poll_interval: options.poll_interval,
        }
    }

    /// Start observing lines appended from now on
    pub async fn attach(&self) -> Result<LogWatch, DeployerError> {
        let offset = self.log_file.len().await?;
        debug!(
            "Watching {} from offset {}",
            self.log_file.path().display(),
            offset
        );

        let (tx, rx) = mpsc::channel(LINE_BUFFER);
        let tail = tokio::spawn(tail_lines(
            self.log_file.clone(),
            offset,
            self.poll_interval,
            tx,
        ));

        Ok(LogWatch {
            lines: rx,
            tail: Some(tail),
        })
    }
}

/// A single subscription to the completion log
///
/// Resolves at most once. The subscription is released on resolution and
/// when the watch is dropped.
pub struct LogWatch {
    lines: mpsc::Receiver<String>,
    tail: Option<JoinHandle<()>>,
}

impl LogWatch {
    /// Watch lines from an arbitrary source
    pub fn from_lines(lines: mpsc::Receiver<String>) -> Self {
        Self { lines, tail: None }
    }

    /// Wait for the first terminal line
    pub async fn outcome(mut self) -> Result<CompletionSignal, DeployerError> {
        while let Some(line) = self.lines.recv().await {
            match classify(&line) {
                Some(signal) => {
                    self.close();
                    info!("Completion log reported {:?}", signal);
                    return Ok(signal);
                }
                None => debug!("provisioning: {}", line),
            }
        }

        warn!("Completion log closed before a terminal line");
        Err(DeployerError::WatchClosed)
    }

    fn close(&mut self) {
        self.lines.close();
        if let Some(tail) = self.tail.take() {
            tail.abort();
        }
    }
}

impl Drop for LogWatch {
    fn drop(&mut self) {
        self.close();
    }
}

async fn tail_lines(
    log_file: File,
    mut offset: u64,
    interval: Duration,
    tx: mpsc::Sender<String>,
) {
    // Only complete lines are decoded
    let mut pending: Vec<u8> = Vec::new();

    loop {
        tokio::select! {
            _ = tx.closed() => return,
            _ = tokio::time::sleep(interval) => {}
        }

        let (bytes, len) = match log_file.read_from(offset).await {
            Ok(read) => read,
            Err(e) => {
                error!("Failed to read completion log: {}", e);
                continue;
            }
        };

        if len < offset {
            debug!("Completion log shrank, reading from the start");
            offset = 0;
            pending.clear();
            continue;
        }
        offset = len;
        pending.extend_from_slice(&bytes);

        while let Some(end) = pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = pending.drain(..=end).collect();
            let line = String::from_utf8_lossy(&raw[..end])
                .trim_end_matches('\r')
                .to_string();
            if tx.send(line).await.is_err() {
                return;
            }
        }
    }
}
