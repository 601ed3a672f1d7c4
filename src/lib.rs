pub mod config;
pub mod core;
pub mod error;
pub mod format;
pub mod fs;
pub mod ner;
pub mod utils;

// Re-export key items for convenience
pub use config::{NerConfig, ProcessorConfig, ReposiftConfig, ScoringConfig, SummaryConfig};
pub use core::{FileProcessor, FileRecord, ProgressInfo, ProgressRegistry, ProgressTracker, ScoredFile};
pub use error::{ConfigError, NerError, ScanError};
pub use fs::PatternMatcher;
pub use utils::{DependencyGraph, FileScorer, Summarizer};
