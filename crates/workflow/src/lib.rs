//! Cross-process progress tracking for multi-step analysis runs.
//!
//! The progress file is shared state that external processes may race on,
//! so every read-modify-write cycle acquires an exclusive-create lock
//! file (with timeout and polling retry) and replaces the file via a
//! temp-file + atomic rename. This pattern applies wherever persisted
//! shared state crosses process boundaries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Default progress file name inside a project folder.
pub const PROGRESS_FILE: &str = "code_analysis_progress.json";

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(100);
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("unable to acquire lock for progress file: {0}")]
    LockTimeout(String),

    #[error("I/O error on progress file: {0}")]
    Io(#[from] std::io::Error),

    #[error("progress file is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Lifecycle state of one analysis step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Failed,
}

/// One step's persisted record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
}

/// Reads and updates the shared progress file safely across processes.
pub struct ProgressTracker {
    path: PathBuf,
    lock_timeout: Duration,
}

impl ProgressTracker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the current progress map. A missing file reads as empty.
    pub fn load(&self) -> Result<BTreeMap<String, StepRecord>, WorkflowError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Record a step's status (and optional outcome text) under the lock.
    pub fn update(
        &self,
        step_name: &str,
        status: StepStatus,
        outcome: Option<String>,
    ) -> Result<(), WorkflowError> {
        let _guard = LockGuard::acquire(&self.lock_path(), self.lock_timeout)?;

        let mut progress = self.load()?;
        progress.insert(step_name.to_string(), StepRecord { status, outcome });
        self.replace(&progress)
    }

    /// Name of the first step that is not yet completed, in map order.
    pub fn next_pending(&self) -> Result<Option<String>, WorkflowError> {
        Ok(self
            .load()?
            .into_iter()
            .find(|(_, record)| record.status != StepStatus::Completed)
            .map(|(name, _)| name))
    }

    fn lock_path(&self) -> PathBuf {
        let mut os = self.path.clone().into_os_string();
        os.push(".lock");
        PathBuf::from(os)
    }

    /// Write via a temp sibling, then atomically rename over the target.
    fn replace(&self, progress: &BTreeMap<String, StepRecord>) -> Result<(), WorkflowError> {
        let mut os = self.path.clone().into_os_string();
        os.push(".tmp");
        let tmp = PathBuf::from(os);

        std::fs::write(&tmp, serde_json::to_string_pretty(progress)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Advisory cross-process lock held for the duration of one
/// read-modify-write cycle. Acquired by exclusively creating the lock
/// file; released (best-effort) on drop.
struct LockGuard {
    path: PathBuf,
}

impl LockGuard {
    fn acquire(path: &Path, timeout: Duration) -> Result<Self, WorkflowError> {
        let start = Instant::now();
        loop {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(_) => {
                    return Ok(Self {
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if start.elapsed() >= timeout {
                        return Err(WorkflowError::LockTimeout(path.display().to_string()));
                    }
                    std::thread::sleep(LOCK_POLL_INTERVAL);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release lock file");
        }
    }
}
