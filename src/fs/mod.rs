//! Filesystem access: pattern matching, collection, reading

pub mod collect;
pub mod ignore_file;
pub mod pattern;
pub mod read;

pub use collect::{collect_parallel, collect_sequential};
pub use pattern::{PathPattern, PatternMatcher};

use ignore::{DirEntry, Walk, WalkBuilder};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::ScanError;

/// `/`-separated path of `path` relative to `root`.
pub fn relative_path_str(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Walker over `dir` whose directories are pruned by `matcher`, with paths
/// taken relative to `root`.
///
/// Only the matcher decides eligibility: the `ignore` crate's own gitignore
/// and hidden-file filters are turned off. Symlinked directories are never
/// entered.
pub(crate) fn build_walker(root: &Path, dir: &Path, matcher: Arc<PatternMatcher>, max_depth: Option<usize>) -> Walk {
    let filter_root = root.to_path_buf();
    WalkBuilder::new(dir)
        .standard_filters(false)
        .follow_links(false)
        .max_depth(max_depth)
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            if entry.file_type().is_some_and(|ft| ft.is_dir()) {
                matcher.should_descend(&relative_path_str(&filter_root, entry.path()))
            } else {
                true
            }
        })
        .build()
}

/// Regular files, plus symlinks to regular files when `follow_symlinks` is set.
pub(crate) fn is_walked_file(entry: &DirEntry, follow_symlinks: bool) -> bool {
    match entry.file_type() {
        Some(ft) if ft.is_file() => true,
        Some(ft) if ft.is_symlink() => {
            follow_symlinks && std::fs::metadata(entry.path()).is_ok_and(|m| m.is_file())
        }
        _ => false,
    }
}

/// Synchronous walk of a repository returning eligible files, sorted.
pub fn walk_directory(
    root: &Path,
    matcher: Arc<PatternMatcher>,
    follow_symlinks: bool,
) -> Result<Vec<PathBuf>, ScanError> {
    ScanError::check_root(root)?;
    Ok(collect_sequential(root, matcher, follow_symlinks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::TempDir;

    #[test]
    fn test_walk_directory_ignore_logic() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();

        File::create(root.join("include.rs"))?;
        File::create(root.join("exclude.env"))?;
        fs::create_dir_all(root.join("build/obj"))?;
        File::create(root.join("build/obj/main.o"))?;
        fs::create_dir_all(root.join(".hidden"))?;
        File::create(root.join(".hidden/kept.txt"))?;

        let mut matcher = PatternMatcher::new();
        matcher.add_ignore("*.env");
        matcher.add_ignore("build/");
        let paths = walk_directory(root, Arc::new(matcher), true)?;

        let rels: Vec<String> = paths.iter().map(|p| relative_path_str(root, p)).collect();
        assert_eq!(rels, vec![".hidden/kept.txt", "include.rs"]);
        Ok(())
    }

    #[test]
    fn test_walk_missing_root() {
        let err = walk_directory(Path::new("/definitely/not/here"), Arc::new(PatternMatcher::new()), true);
        assert!(matches!(err, Err(ScanError::RootNotFound(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_symlinked_files() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        fs::create_dir_all(root.join("shared"))?;
        fs::write(root.join("shared/real.rs"), "fn real() {}\n")?;
        std::os::unix::fs::symlink(root.join("shared/real.rs"), root.join("linked.rs"))?;
        std::os::unix::fs::symlink(root.join("shared"), root.join("linked_dir"))?;

        let matcher = Arc::new(PatternMatcher::new());
        let followed = walk_directory(root, Arc::clone(&matcher), true)?;
        let rels: Vec<String> = followed.iter().map(|p| relative_path_str(root, p)).collect();
        assert_eq!(rels, vec!["linked.rs", "shared/real.rs"]);

        let plain = walk_directory(root, matcher, false)?;
        let rels: Vec<String> = plain.iter().map(|p| relative_path_str(root, p)).collect();
        assert_eq!(rels, vec!["shared/real.rs"]);
        Ok(())
    }

    #[test]
    fn test_relative_path_str() {
        let root = Path::new("/repo");
        assert_eq!(relative_path_str(root, Path::new("/repo/src/a.rs")), "src/a.rs");
        assert_eq!(relative_path_str(root, Path::new("/repo/a.rs")), "a.rs");
    }
}
