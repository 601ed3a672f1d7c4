//! Eligible-file collection, sequential or with parallel collectors
//!
//! Parallel collectors share a directory queue guarded by a condition
//! variable and push discovered files in batches. Both modes return the same
//! sorted list.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

use super::pattern::PatternMatcher;
use super::{build_walker, is_walked_file, relative_path_str};
use crate::core::pool::{WorkerSpawner, lock, run_pool};

/// Lists one directory and splits its eligible entries into subdirectories
/// and files. An unreadable directory yields nothing.
fn scan_dir(
    root: &Path,
    dir: &Path,
    matcher: &Arc<PatternMatcher>,
    follow_symlinks: bool,
) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let mut dirs = Vec::new();
    let mut files = Vec::new();

    for result in build_walker(root, dir, Arc::clone(matcher), Some(1)) {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Cannot read entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }
        if entry.file_type().is_some_and(|ft| ft.is_dir()) {
            // already accepted by the walker's directory filter
            dirs.push(entry.into_path());
        } else if is_walked_file(&entry, follow_symlinks)
            && matcher.should_process(&relative_path_str(root, entry.path()))
        {
            files.push(entry.into_path());
        }
    }

    (dirs, files)
}

/// Single-threaded collection with one recursive walker.
pub fn collect_sequential(root: &Path, matcher: Arc<PatternMatcher>, follow_symlinks: bool) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for result in build_walker(root, root, Arc::clone(&matcher), None) {
        match result {
            Ok(entry) => {
                if is_walked_file(&entry, follow_symlinks)
                    && matcher.should_process(&relative_path_str(root, entry.path()))
                {
                    files.push(entry.into_path());
                }
            }
            Err(e) => tracing::warn!("Error walking {}: {}", root.display(), e),
        }
    }

    files.sort();
    files
}

#[derive(Debug)]
struct DirQueueState {
    dirs: VecDeque<PathBuf>,
    /// Collectors currently scanning a directory
    active: usize,
    done: bool,
}

/// Directory queue shared by collectors.
///
/// Collection is finished once the queue is empty and no collector is
/// scanning, since only an active collector can discover more directories.
#[derive(Debug)]
struct DirQueue {
    state: Mutex<DirQueueState>,
    ready: Condvar,
}

impl DirQueue {
    fn new(root: PathBuf) -> Self {
        Self {
            state: Mutex::new(DirQueueState {
                dirs: VecDeque::from([root]),
                active: 0,
                done: false,
            }),
            ready: Condvar::new(),
        }
    }

    /// Blocks until a directory is available or collection is finished.
    fn next(&self) -> Option<PathBuf> {
        let mut state = lock(&self.state);
        loop {
            if let Some(dir) = state.dirs.pop_front() {
                state.active += 1;
                return Some(dir);
            }
            if state.done || state.active == 0 {
                state.done = true;
                self.ready.notify_all();
                return None;
            }
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Marks one directory as scanned and publishes its subdirectories.
    fn complete(&self, discovered: Vec<PathBuf>) {
        let mut state = lock(&self.state);
        state.dirs.extend(discovered);
        state.active = state.active.saturating_sub(1);
        if state.dirs.is_empty() && state.active == 0 {
            state.done = true;
        }
        drop(state);
        self.ready.notify_all();
    }
}

/// Collects eligible files with `collectors` threads. Falls back to
/// draining the directory queue on the calling thread when no thread can be
/// created.
pub fn collect_parallel(
    root: &Path,
    matcher: Arc<PatternMatcher>,
    collectors: usize,
    batch_size: usize,
    follow_symlinks: bool,
    spawner: &dyn WorkerSpawner,
) -> Vec<PathBuf> {
    let queue = DirQueue::new(root.to_path_buf());
    let sink: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());
    let batch_size = batch_size.max(1);

    run_pool(spawner, "collector", collectors, || {
        let mut batch = Vec::with_capacity(batch_size);
        while let Some(dir) = queue.next() {
            let (subdirs, found) = scan_dir(root, &dir, &matcher, follow_symlinks);
            batch.extend(found);
            if batch.len() >= batch_size {
                lock(&sink).append(&mut batch);
            }
            queue.complete(subdirs);
        }
        if !batch.is_empty() {
            lock(&sink).append(&mut batch);
        }
    });

    let mut files = sink.into_inner().unwrap_or_else(PoisonError::into_inner);
    files.sort();
    files
}
