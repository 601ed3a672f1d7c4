//! Concurrent file ingestion
//!
//! Collect eligible paths into one queue, then drain it with a bounded pool
//! of workers that read and classify each file. Completion order, and so the
//! order of returned records, is not deterministic.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::{ProcessorConfig, SummaryConfig};
use crate::core::pool::{OsThreadSpawner, WorkQueue, WorkerSpawner, lock, run_pool};
use crate::core::progress::{ProgressCallback, ProgressInfo, ProgressTracker, ScanPhase};
use crate::core::types::{FileRecord, SkipReason};
use crate::error::ScanError;
use crate::fs::pattern::PatternMatcher;
use crate::fs::read::FileReader;
use crate::fs::{collect_parallel, collect_sequential};
use crate::utils::binary::file_is_binary;
use crate::utils::summary::Summarizer;

pub struct FileProcessor {
    matcher: Arc<PatternMatcher>,
    config: ProcessorConfig,
    summarizer: Summarizer,
    spawner: Arc<dyn WorkerSpawner>,
    progress_callback: Option<ProgressCallback>,
}

impl std::fmt::Debug for FileProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileProcessor")
            .field("config", &self.config)
            .field("spawner", &self.spawner)
            .finish_non_exhaustive()
    }
}

impl FileProcessor {
    pub fn new(matcher: PatternMatcher, config: ProcessorConfig) -> Self {
        Self {
            matcher: Arc::new(matcher),
            config,
            summarizer: Summarizer::new(SummaryConfig::default()),
            spawner: Arc::new(OsThreadSpawner),
            progress_callback: None,
        }
    }

    pub fn with_summary_config(mut self, config: SummaryConfig) -> Self {
        self.summarizer = Summarizer::new(config);
        self
    }

    /// Replaces the thread factory used for collectors and workers.
    pub fn with_spawner(mut self, spawner: Arc<dyn WorkerSpawner>) -> Self {
        self.spawner = spawner;
        self
    }

    pub fn set_progress_callback<F>(&mut self, callback: F)
    where
        F: Fn(&ProgressInfo) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
    }

    pub fn matcher(&self) -> &PatternMatcher {
        &self.matcher
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn summarizer(&self) -> &Summarizer {
        &self.summarizer
    }

    /// Walks `root` and returns every eligible file path, sorted.
    pub fn collect_files(&self, root: &Path, parallel: bool) -> Result<Vec<PathBuf>, ScanError> {
        ScanError::check_root(root)?;
        let files = if parallel {
            let collectors = match self.config.parallel_collectors {
                0 => self.config.effective_threads(),
                n => n,
            };
            collect_parallel(
                root,
                Arc::clone(&self.matcher),
                collectors,
                self.config.collector_batch_size,
                self.config.follow_symlinks,
                self.spawner.as_ref(),
            )
        } else {
            collect_sequential(root, Arc::clone(&self.matcher), self.config.follow_symlinks)
        };
        tracing::debug!("Collected {} files under {}", files.len(), root.display());
        Ok(files)
    }

    /// Collects and processes every eligible file under `root`.
    pub fn process_directory(&self, root: &Path, parallel: bool) -> Result<Vec<FileRecord>, ScanError> {
        self.process_directory_with_tracker(root, parallel, self.new_tracker())
    }

    /// A fresh tracker reporting to this processor's progress callback.
    pub fn new_tracker(&self) -> Arc<ProgressTracker> {
        Arc::new(ProgressTracker::with_callback(self.progress_callback.clone()))
    }

    /// Like `process_directory`, reporting into a caller-owned tracker.
    pub fn process_directory_with_tracker(
        &self,
        root: &Path,
        parallel: bool,
        tracker: Arc<ProgressTracker>,
    ) -> Result<Vec<FileRecord>, ScanError> {
        tracker.set_phase(ScanPhase::Collecting);
        let files = match self.collect_files(root, parallel) {
            Ok(files) => files,
            Err(e) => {
                tracker.finish();
                return Err(e);
            }
        };
        Ok(self.process_paths(files, tracker))
    }

    /// Processes an explicit list of paths with the worker pool.
    pub fn process_paths(&self, paths: Vec<PathBuf>, tracker: Arc<ProgressTracker>) -> Vec<FileRecord> {
        let total = paths.len();
        tracker.start(total);
        if total == 0 {
            tracker.finish();
            return Vec::new();
        }

        let queue = WorkQueue::new(paths);
        let results: Mutex<Vec<FileRecord>> = Mutex::new(Vec::with_capacity(total));
        let workers = self.config.effective_threads().min(total);
        let mmap_threshold = self.config.mmap_threshold;
        let max_size = self.config.effective_max_file_size();

        let used = run_pool(self.spawner.as_ref(), "worker", workers, || {
            let reader = FileReader::new(mmap_threshold);
            while let Some(path) = queue.pop() {
                let record = read_record(path, &reader, max_size);
                let outcome = record.outcome();
                let path = record.path.clone();
                lock(&results).push(record);
                tracker.record(outcome, &path);
            }
        });

        tracker.finish();
        let records = results.into_inner().unwrap_or_else(PoisonError::into_inner);
        let progress = tracker.snapshot();
        tracing::info!(
            "Processed {} files with {} worker(s): {} ok, {} skipped, {} errors",
            records.len(),
            used.max(1),
            progress.processed_files,
            progress.skipped_files,
            progress.error_files
        );
        records
    }

    /// Reads and classifies a single file.
    pub fn process_file(&self, path: &Path) -> FileRecord {
        let reader = FileReader::new(self.config.mmap_threshold);
        read_record(path.to_path_buf(), &reader, self.config.effective_max_file_size())
    }

    /// Summary text of a record under this processor's summary settings.
    pub fn summarize(&self, record: &FileRecord) -> String {
        self.summarizer.summarize(record)
    }
}

/// Per-file logic shared by every worker and by `process_file`.
/// Failures are recorded on the returned record, never propagated.
fn read_record(path: PathBuf, reader: &FileReader, max_size: u64) -> FileRecord {
    let metadata = match std::fs::metadata(&path) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!("Cannot stat {}: {}", path.display(), e);
            return FileRecord::errored(path, e);
        }
    };
    if !metadata.is_file() {
        return FileRecord::skipped(path, 0, SkipReason::NotAFile);
    }

    let size = metadata.len();
    if size > max_size {
        tracing::debug!("Skipping {} ({} bytes, over limit)", path.display(), size);
        return FileRecord::skipped(path, size, SkipReason::TooLarge);
    }

    match file_is_binary(&path) {
        Ok(true) => {
            tracing::debug!("Skipping binary file {}", path.display());
            return FileRecord::skipped(path, size, SkipReason::Binary);
        }
        Ok(false) => {}
        Err(e) => {
            tracing::warn!("Cannot sample {}: {}", path.display(), e);
            return FileRecord::errored(path, e);
        }
    }

    match reader.read(&path, size) {
        Ok(content) => FileRecord::processed(path, content),
        Err(e) => {
            tracing::warn!("Cannot read {}: {}", path.display(), e);
            FileRecord::errored(path, e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pool::tests::FailingSpawner;
    use crate::core::progress::FileOutcome;
    use std::fs;
    use tempfile::TempDir;

    fn repo(n: usize) -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src/nested")).unwrap();
        for i in 0..n {
            let dir = if i % 2 == 0 { "src" } else { "src/nested" };
            fs::write(
                temp.path().join(dir).join(format!("f{}.rs", i)),
                format!("fn f{}() {{}}\n", i),
            )
            .unwrap();
        }
        temp
    }

    fn processor(threads: usize) -> FileProcessor {
        FileProcessor::new(
            PatternMatcher::with_defaults(),
            ProcessorConfig {
                threads,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_process_directory_parallel_and_sequential() {
        let temp = repo(12);
        for parallel in [true, false] {
            let records = processor(4).process_directory(temp.path(), parallel).unwrap();
            assert_eq!(records.len(), 12);
            assert!(records.iter().all(|r| r.processed && r.line_count == 1));
        }
    }

    #[test]
    fn test_thread_creation_failure_falls_back() {
        let temp = repo(5);
        fs::write(temp.path().join("blob.dat"), [1u8, 0, 2, 3]).unwrap();

        let proc = processor(4).with_spawner(Arc::new(FailingSpawner));
        let records = proc.process_directory(temp.path(), true).unwrap();
        assert_eq!(records.len(), 6);
        let processed = records.iter().filter(|r| r.processed).count();
        let skipped = records.iter().filter(|r| r.skipped).count();
        let errored = records.iter().filter(|r| r.error.is_some()).count();
        assert_eq!(processed + skipped + errored, 6);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_binary_and_oversized_are_skipped() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("ok.txt"), "hello\n").unwrap();
        fs::write(temp.path().join("bin.dat"), b"abc\0def").unwrap();
        fs::write(temp.path().join("big.txt"), "x".repeat(2048)).unwrap();

        let proc = FileProcessor::new(
            PatternMatcher::new(),
            ProcessorConfig {
                threads: 2,
                max_file_size: 1024,
                ..Default::default()
            },
        );
        let mut records = proc.process_directory(temp.path(), false).unwrap();
        records.sort_by(|a, b| a.path.cmp(&b.path));

        assert_eq!(records[0].skip_reason, Some(SkipReason::TooLarge));
        assert_eq!(records[1].skip_reason, Some(SkipReason::Binary));
        assert!(records[2].processed);
        assert_eq!(records[2].content.as_deref(), Some(&b"hello\n"[..]));
    }

    #[test]
    fn test_vanished_file_is_an_error_record() {
        let temp = TempDir::new().unwrap();
        let keep = temp.path().join("keep.txt");
        fs::write(&keep, "x").unwrap();
        let gone = temp.path().join("gone.txt");

        let proc = processor(2);
        let tracker = Arc::new(ProgressTracker::new());
        let records = proc.process_paths(vec![keep, gone.clone()], Arc::clone(&tracker));
        assert_eq!(records.len(), 2);
        let err = records.iter().find(|r| r.path == gone).unwrap();
        assert_eq!(err.outcome(), FileOutcome::Errored);

        let progress = tracker.snapshot();
        assert_eq!(progress.error_files, 1);
        assert_eq!(progress.processed_files, 1);
        assert!(progress.is_complete);
        assert_eq!(progress.percentage(), 100.0);
    }

    #[test]
    fn test_progress_callback_invoked_per_file() {
        let temp = repo(3);
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        let mut proc = processor(2);
        proc.set_progress_callback(move |info| sink.lock().unwrap().push(info.completed()));
        proc.process_directory(temp.path(), false).unwrap();

        let mut calls = calls.lock().unwrap().clone();
        calls.sort();
        // one call per file plus the final completion notice
        assert_eq!(calls, vec![1, 2, 3, 3]);
    }

    #[test]
    fn test_missing_root_fails_the_call() {
        let err = processor(1).process_directory(Path::new("/no/such/repo/root"), true);
        assert!(matches!(err, Err(ScanError::RootNotFound(_))));
    }

    #[test]
    fn test_empty_directory_is_ok() {
        let temp = TempDir::new().unwrap();
        let records = processor(2).process_directory(temp.path(), true).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_process_file_mapped_equals_buffered() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.txt");
        fs::write(&path, "line\n".repeat(1000)).unwrap();

        let mapped = FileProcessor::new(
            PatternMatcher::new(),
            ProcessorConfig {
                mmap_threshold: 16,
                ..Default::default()
            },
        )
        .process_file(&path);
        let buffered = processor(1).process_file(&path);
        assert_eq!(mapped.content, buffered.content);
        assert_eq!(mapped.line_count, 1000);
    }
}
