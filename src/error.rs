//! Error types for the reposift library
//!
//! Per-file problems never surface here: they are recorded on the affected
//! `FileRecord`. Only whole-call failures (bad root, unreadable config) do.

use std::path::PathBuf;
use thiserror::Error;

/// Failure of a whole repository-level call.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("repository root does not exist: {0}")]
    RootNotFound(PathBuf),

    #[error("repository root is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Validates that `root` exists and is a directory.
    pub fn check_root(root: &std::path::Path) -> Result<(), ScanError> {
        let metadata = std::fs::metadata(root).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ScanError::RootNotFound(root.to_path_buf())
            } else {
                ScanError::Io {
                    path: root.to_path_buf(),
                    source,
                }
            }
        })?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }
        Ok(())
    }
}

/// Outcome of an entity-recognition backend that could not do its job.
///
/// These never escape `EntityExtractor::extract_entities`; they drive the
/// fallback to the next-simplest strategy.
#[derive(Debug, Error)]
pub enum NerError {
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("unsupported language for {0}")]
    UnsupportedLanguage(String),

    #[error("failed to parse {0}")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_check_root_missing() {
        let err = ScanError::check_root(std::path::Path::new("no_such_dir_reposift_42")).unwrap_err();
        assert!(matches!(err, ScanError::RootNotFound(_)));
    }

    #[test]
    fn test_check_root_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.txt");
        std::fs::write(&file, "x").unwrap();
        assert!(matches!(
            ScanError::check_root(&file),
            Err(ScanError::NotADirectory(_))
        ));
        assert!(ScanError::check_root(temp.path()).is_ok());
    }
}
