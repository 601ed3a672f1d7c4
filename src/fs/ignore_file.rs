//! Ignore-file support: `.gitignore` and project-specific `.reposiftignore`

use std::fs;
use std::path::Path;

/// Project-specific ignore file looked up at the repository root
pub const REPOSIFT_IGNORE: &str = ".reposiftignore";

/// Reads pattern lines from an ignore file.
/// Blank lines and `#` comments are dropped, the rest is trimmed.
/// Returns `None` when the file cannot be read.
pub fn read_ignore_lines(path: &Path) -> Option<Vec<String>> {
    let content = fs::read_to_string(path).ok()?;
    Some(
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(String::from)
            .collect(),
    )
}

/// Load ignore patterns from `.reposiftignore` in the project root.
/// Returns an empty list if the file doesn't exist.
pub fn load_reposiftignore(root: &Path) -> Vec<String> {
    let ignore_file = root.join(REPOSIFT_IGNORE);
    if !ignore_file.exists() {
        return Vec::new();
    }
    read_ignore_lines(&ignore_file).unwrap_or_default()
}
