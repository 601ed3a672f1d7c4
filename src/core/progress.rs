//! Caller-owned progress tracking for ingestion scans

use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::pool::lock;

pub type ProgressCallback = Arc<dyn Fn(&ProgressInfo) + Send + Sync>;

/// Scan lifecycle: Idle -> Collecting -> Processing -> Done
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ScanPhase {
    #[default]
    Idle,
    Collecting,
    Processing,
    Done,
}

/// How one path ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Processed,
    Skipped,
    Errored,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgressInfo {
    pub total_files: usize,
    pub processed_files: usize,
    pub skipped_files: usize,
    pub error_files: usize,
    pub current_file: Option<PathBuf>,
    pub is_complete: bool,
    pub phase: ScanPhase,
}

impl ProgressInfo {
    pub fn completed(&self) -> usize {
        self.processed_files + self.skipped_files + self.error_files
    }

    pub fn percentage(&self) -> f64 {
        if self.total_files == 0 {
            return 0.0;
        }
        self.completed() as f64 / self.total_files as f64 * 100.0
    }
}

/// Progress counters of one scan, behind their own lock.
///
/// The callback runs synchronously on the thread that finished the path,
/// after the lock is released.
pub struct ProgressTracker {
    state: Mutex<ProgressInfo>,
    callback: Option<ProgressCallback>,
    created: Instant,
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("state", &self.snapshot())
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ProgressInfo::default()),
            callback: None,
            created: Instant::now(),
        }
    }

    pub fn with_callback(callback: Option<ProgressCallback>) -> Self {
        Self {
            callback,
            ..Self::new()
        }
    }

    pub fn snapshot(&self) -> ProgressInfo {
        lock(&self.state).clone()
    }

    pub fn age(&self) -> Duration {
        self.created.elapsed()
    }

    pub fn set_phase(&self, phase: ScanPhase) {
        lock(&self.state).phase = phase;
    }

    pub fn start(&self, total_files: usize) {
        let mut state = lock(&self.state);
        state.total_files = total_files;
        state.phase = ScanPhase::Processing;
    }

    /// Counts one finished path and notifies the callback.
    pub fn record(&self, outcome: FileOutcome, path: &Path) {
        let snapshot = {
            let mut state = lock(&self.state);
            match outcome {
                FileOutcome::Processed => state.processed_files += 1,
                FileOutcome::Skipped => state.skipped_files += 1,
                FileOutcome::Errored => state.error_files += 1,
            }
            state.current_file = Some(path.to_path_buf());
            state.clone()
        };
        self.notify(&snapshot);
    }

    pub fn finish(&self) {
        let snapshot = {
            let mut state = lock(&self.state);
            state.is_complete = true;
            state.phase = ScanPhase::Done;
            state.current_file = None;
            state.clone()
        };
        self.notify(&snapshot);
    }

    fn notify(&self, snapshot: &ProgressInfo) {
        if let Some(callback) = &self.callback {
            callback(snapshot);
        }
    }
}

/// Registry of scan jobs, owned and passed around by the caller.
#[derive(Debug, Default)]
pub struct ProgressRegistry {
    jobs: Mutex<HashMap<String, Arc<ProgressTracker>>>,
}

impl ProgressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fresh tracker under `id`, replacing any previous one.
    pub fn create(&self, id: impl Into<String>, callback: Option<ProgressCallback>) -> Arc<ProgressTracker> {
        let tracker = Arc::new(ProgressTracker::with_callback(callback));
        lock(&self.jobs).insert(id.into(), Arc::clone(&tracker));
        tracker
    }

    pub fn get(&self, id: &str) -> Option<Arc<ProgressTracker>> {
        lock(&self.jobs).get(id).cloned()
    }

    pub fn snapshot(&self, id: &str) -> Option<ProgressInfo> {
        self.get(id).map(|t| t.snapshot())
    }

    pub fn remove(&self, id: &str) -> Option<Arc<ProgressTracker>> {
        lock(&self.jobs).remove(id)
    }

    /// Drops completed jobs older than `max_age`. Returns how many were dropped.
    pub fn expire(&self, max_age: Duration) -> usize {
        let mut jobs = lock(&self.jobs);
        let before = jobs.len();
        jobs.retain(|_, tracker| !(tracker.snapshot().is_complete && tracker.age() >= max_age));
        before - jobs.len()
    }

    pub fn len(&self) -> usize {
        lock(&self.jobs).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
