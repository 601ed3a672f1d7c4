//! Core module for reposift
//!
//! Shared types, the worker pool, progress tracking and the ingestion
//! pipeline.

pub mod pool;
pub mod processor;
pub mod progress;
pub mod types;

pub use pool::{OsThreadSpawner, WorkQueue, WorkerSpawner, run_pool};
pub use processor::FileProcessor;
pub use progress::{FileOutcome, ProgressCallback, ProgressInfo, ProgressRegistry, ProgressTracker, ScanPhase};
pub use types::*;
