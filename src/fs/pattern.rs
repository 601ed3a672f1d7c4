//! Glob compilation and include/exclude matching
//!
//! Supported subset: `*` (run of non-separator characters), `?` (one
//! non-separator character), `**` (anything, separators included), `**/`
//! (zero or more whole segments), a leading `/` anchoring at the repository
//! root and a trailing `/` marking a directory. Everything else is literal.
//!
//! Anchoring: a pattern without any `/` matches a name at any depth, a pattern
//! with an inner `/` is anchored at the root. Literal names and directory
//! patterns also match everything below them.

use regex::{Regex, RegexBuilder};
use std::borrow::Cow;
use std::path::Path;

use super::ignore_file::read_ignore_lines;

#[derive(Debug, Clone)]
enum Matcher {
    /// `*.ext` shortcut: plain suffix comparison
    Suffix(String),
    Regex(Regex),
    /// Last resort when the translated expression is rejected by the regex engine
    Literal(String),
}

/// A compiled glob predicate over `/`-separated relative paths.
#[derive(Debug, Clone)]
pub struct PathPattern {
    glob: String,
    case_insensitive: bool,
    matcher: Matcher,
}

impl PathPattern {
    /// Compiles a glob. Never fails: anything outside the supported subset is
    /// matched literally.
    pub fn compile(glob: &str) -> Self {
        Self::compile_with(glob, false)
    }

    pub fn compile_case_insensitive(glob: &str) -> Self {
        Self::compile_with(glob, true)
    }

    pub fn compile_with(glob: &str, case_insensitive: bool) -> Self {
        let normalized = glob.trim().replace('\\', "/");
        let matcher = match extension_shortcut(&normalized) {
            Some(suffix) if case_insensitive => Matcher::Suffix(suffix.to_lowercase()),
            Some(suffix) => Matcher::Suffix(suffix),
            None => general_matcher(&normalized, case_insensitive),
        };
        Self {
            glob: normalized,
            case_insensitive,
            matcher,
        }
    }

    /// Compiles without the `*.ext` shortcut. The shortcut must agree with this
    /// for every input.
    pub fn compile_general(glob: &str) -> Self {
        let normalized = glob.trim().replace('\\', "/");
        let matcher = general_matcher(&normalized, false);
        Self {
            glob: normalized,
            case_insensitive: false,
            matcher,
        }
    }

    pub fn glob(&self) -> &str {
        &self.glob
    }

    pub fn is_suffix_shortcut(&self) -> bool {
        matches!(self.matcher, Matcher::Suffix(_))
    }

    pub fn matches(&self, path: &str) -> bool {
        let path = normalize_path(path);
        match &self.matcher {
            Matcher::Suffix(suffix) => {
                if self.case_insensitive {
                    path.to_lowercase().ends_with(suffix.as_str())
                } else {
                    path.ends_with(suffix.as_str())
                }
            }
            Matcher::Regex(re) => re.is_match(&path),
            Matcher::Literal(literal) => {
                if self.case_insensitive {
                    path.eq_ignore_ascii_case(literal)
                } else {
                    path == literal.as_str()
                }
            }
        }
    }
}

/// `*.ext` where `ext` holds no wildcard or separator
fn extension_shortcut(glob: &str) -> Option<String> {
    let ext = glob.strip_prefix("*.")?;
    if ext.is_empty() || ext.contains(['*', '?', '/']) {
        return None;
    }
    Some(format!(".{}", ext))
}

fn general_matcher(glob: &str, case_insensitive: bool) -> Matcher {
    let expression = glob_to_regex(glob);
    match RegexBuilder::new(&expression)
        .case_insensitive(case_insensitive)
        .build()
    {
        Ok(re) => Matcher::Regex(re),
        Err(e) => {
            tracing::debug!("Glob {:?} degraded to literal match: {}", glob, e);
            Matcher::Literal(glob.to_string())
        }
    }
}

/// Translates a glob into an anchored regular expression.
pub(crate) fn glob_to_regex(glob: &str) -> String {
    let mut body = glob;
    let dir_only = body.len() > 1 && body.ends_with('/');
    if dir_only {
        body = &body[..body.len() - 1];
    }

    let mut re = String::from("^");
    if let Some(rest) = body.strip_prefix('/') {
        body = rest;
    } else if let Some(rest) = body.strip_prefix("**/") {
        re.push_str("(?:.*/)?");
        body = rest;
    } else if !body.contains('/') {
        re.push_str("(?:.*/)?");
    }

    let chars: Vec<char> = body.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    re.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    re.push_str(".*");
                    i += 2;
                }
                continue;
            }
            '*' => re.push_str("[^/]*"),
            '?' => re.push_str("[^/]"),
            '/' => re.push('/'),
            c => re.push_str(&regex::escape(c.encode_utf8(&mut [0u8; 4]))),
        }
        i += 1;
    }

    let last_segment = body.rsplit('/').next().unwrap_or(body);
    if dir_only || !last_segment.contains(['*', '?']) {
        re.push_str("(?:/.*)?");
    }
    re.push('$');
    re
}

/// Normalizes a path for matching: forward slashes, no leading `./` or `/`.
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    let path: Cow<'_, str> = if path.contains('\\') {
        Cow::Owned(path.replace('\\', "/"))
    } else {
        Cow::Borrowed(path)
    };
    let trimmed = path.trim_start_matches("./").trim_start_matches('/');
    if trimmed.len() == path.len() {
        path
    } else {
        Cow::Owned(trimmed.to_string())
    }
}

/// Ordered ignore and include sets deciding per-path eligibility.
///
/// Built once at startup and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct PatternMatcher {
    ignore: Vec<PathPattern>,
    include: Vec<PathPattern>,
}

impl PatternMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matcher preloaded with the default ignore list.
    pub fn with_defaults() -> Self {
        let mut matcher = Self::new();
        matcher.add_ignores(crate::config::default_ignore_patterns());
        matcher
    }

    pub fn from_patterns(ignore: &[String], include: &[String]) -> Self {
        let mut matcher = Self::new();
        matcher.add_ignores(ignore.iter());
        matcher.add_includes(include.iter());
        matcher
    }

    pub fn compile(glob: &str) -> PathPattern {
        PathPattern::compile(glob)
    }

    pub fn add_ignore(&mut self, glob: &str) {
        if glob.trim().is_empty() {
            return;
        }
        self.ignore.push(PathPattern::compile(glob));
    }

    pub fn add_include(&mut self, glob: &str) {
        if glob.trim().is_empty() {
            return;
        }
        self.include.push(PathPattern::compile(glob));
    }

    pub fn add_ignores<I, S>(&mut self, globs: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for glob in globs {
            self.add_ignore(glob.as_ref());
        }
    }

    pub fn add_includes<I, S>(&mut self, globs: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for glob in globs {
            self.add_include(glob.as_ref());
        }
    }

    /// Adds every pattern line of an ignore file. A missing or unreadable
    /// file only logs a warning. Returns the number of patterns added.
    pub fn load_ignore_file(&mut self, path: &Path) -> usize {
        let Some(lines) = read_ignore_lines(path) else {
            tracing::warn!("Could not read ignore file {}", path.display());
            return 0;
        };
        let mut added = 0;
        for line in lines {
            if line.starts_with('!') {
                tracing::debug!("Negated pattern {:?} is not supported, skipping", line);
                continue;
            }
            self.add_ignore(&line);
            added += 1;
        }
        added
    }

    /// Loads `.gitignore` from the repository root, if present.
    pub fn load_gitignore(&mut self, root: &Path) -> usize {
        let path = root.join(".gitignore");
        if !path.exists() {
            tracing::debug!("No .gitignore at {}", root.display());
            return 0;
        }
        self.load_ignore_file(&path)
    }

    pub fn ignore_patterns(&self) -> &[PathPattern] {
        &self.ignore
    }

    pub fn include_patterns(&self) -> &[PathPattern] {
        &self.include
    }

    pub fn is_ignored(&self, path: &str) -> bool {
        self.ignore.iter().any(|p| p.matches(path))
    }

    pub fn is_included(&self, path: &str) -> bool {
        self.include.is_empty() || self.include.iter().any(|p| p.matches(path))
    }

    /// Ignore matches always win over include matches.
    pub fn should_process(&self, path: &str) -> bool {
        !self.is_ignored(path) && self.is_included(path)
    }

    /// Directories are only pruned by ignore rules; include rules target files.
    pub fn should_descend(&self, path: &str) -> bool {
        !self.is_ignored(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn ignored_by(glob: &str, path: &str) -> bool {
        let mut m = PatternMatcher::new();
        m.add_ignore(glob);
        m.is_ignored(path)
    }

    #[test]
    fn test_extension_patterns_any_depth() {
        assert!(ignored_by("*.ext", "c.ext"));
        assert!(ignored_by("*.ext", "a/b/c.ext"));
        assert!(!ignored_by("*.ext", "a/b/c.extra"));
        assert!(!ignored_by("*.ext", "a/b.ext/c"));
        assert!(ignored_by("*.tar.gz", "dist/pkg.tar.gz"));
    }

    #[test]
    fn test_extension_shortcut_matches_general_regex() {
        let paths = [
            "a.rs",
            "x/.rs",
            ".rs",
            "a/b/c.rs",
            "a.rs/b",
            "a.rsx",
            "rs",
            "a/rs",
            "a.r.s",
            "dir.rs/inner.rs",
            "a\\b.rs",
            "./a.rs",
            "",
        ];
        for glob in ["*.rs", "*.tar.gz", "*.o", "*.d.ts"] {
            let fast = PathPattern::compile(glob);
            let general = PathPattern::compile_general(glob);
            assert!(fast.is_suffix_shortcut());
            assert!(!general.is_suffix_shortcut());
            for path in paths {
                assert_eq!(
                    fast.matches(path),
                    general.matches(path),
                    "glob {glob} path {path}"
                );
            }
        }
    }

    #[test]
    fn test_recursive_directory_pattern() {
        assert!(ignored_by("build/**", "build/main.o"));
        assert!(ignored_by("build/**", "build/obj/main.o"));
        assert!(!ignored_by("build/**", "src/build.cpp"));
        assert!(!ignored_by("dir/**", "otherdir/dir/x"));
    }

    #[test]
    fn test_double_star_slash() {
        assert!(ignored_by("**/tests/**", "tests/a.rs"));
        assert!(ignored_by("**/tests/**", "crate/tests/a.rs"));
        assert!(ignored_by("a/**/b", "a/b"));
        assert!(ignored_by("a/**/b", "a/x/y/b"));
        assert!(!ignored_by("a/**/b", "a/x/y/bc"));
        assert!(ignored_by("**", "anything/at/all"));
    }

    #[test]
    fn test_bare_names_match_segments() {
        assert!(ignored_by("node_modules", "node_modules"));
        assert!(ignored_by("node_modules", "web/node_modules/react/index.js"));
        assert!(!ignored_by("node_modules", "src/node_modules_helper.js"));
        assert!(ignored_by("build/", "build/out.o"));
        assert!(!ignored_by("build", "src/build.cpp"));
    }

    #[test]
    fn test_single_segment_wildcards() {
        assert!(ignored_by("src/*.rs", "src/main.rs"));
        assert!(!ignored_by("src/*.rs", "src/bin/main.rs"));
        assert!(ignored_by("file?.txt", "docs/file1.txt"));
        assert!(!ignored_by("file?.txt", "docs/file12.txt"));
        assert!(ignored_by("npm-debug.log*", "npm-debug.log.1"));
    }

    #[test]
    fn test_anchored_pattern() {
        assert!(ignored_by("/config.json", "config.json"));
        assert!(!ignored_by("/config.json", "sub/config.json"));
    }

    #[test]
    fn test_metacharacters_are_literal() {
        assert!(ignored_by("a+b(1).txt", "a+b(1).txt"));
        assert!(!ignored_by("a+b(1).txt", "aab1.txt"));
        assert!(ignored_by("[abc].md", "[abc].md"));
        assert!(!ignored_by("[abc].md", "a.md"));
        assert!(!ignored_by("a.c", "abc"));
    }

    #[test]
    fn test_compile_is_deterministic() {
        let a = glob_to_regex("src/**/*.ts");
        let b = glob_to_regex("src/**/*.ts");
        assert_eq!(a, b);
        assert_eq!(a, r"^src/(?:.*/)?[^/]*\.ts$");
    }

    #[test]
    fn test_ignore_precedence_over_include() {
        let mut m = PatternMatcher::new();
        m.add_include("*.rs");
        m.add_ignore("generated/**");
        assert!(m.should_process("src/lib.rs"));
        assert!(!m.should_process("generated/lib.rs"));
        assert!(!m.should_process("README.md"));
        assert!(m.should_descend("docs"));
    }

    #[test]
    fn test_empty_include_set_accepts_everything() {
        let m = PatternMatcher::new();
        assert!(m.should_process("anything.bin"));
    }

    #[test]
    fn test_case_insensitive_compile() {
        let p = PathPattern::compile_case_insensitive("readme*");
        assert!(p.matches("README.md"));
        assert!(p.matches("docs/Readme.txt"));
        let e = PathPattern::compile_case_insensitive("*.MD");
        assert!(e.matches("notes.md"));
    }

    #[test]
    fn test_load_ignore_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".gitignore");
        {
            let mut f = std::fs::File::create(&path).unwrap();
            writeln!(f, "# comment").unwrap();
            writeln!(f).unwrap();
            writeln!(f, "  *.tmp  ").unwrap();
            writeln!(f, "!keep.tmp").unwrap();
            writeln!(f, "cache/").unwrap();
        }
        let mut m = PatternMatcher::new();
        assert_eq!(m.load_gitignore(temp.path()), 2);
        assert!(m.is_ignored("x/y.tmp"));
        assert!(m.is_ignored("cache/data.bin"));
        assert!(!m.is_ignored("src/main.rs"));
    }

    #[test]
    fn test_missing_ignore_file_is_not_fatal() {
        let temp = TempDir::new().unwrap();
        let mut m = PatternMatcher::new();
        assert_eq!(m.load_ignore_file(&temp.path().join("nope")), 0);
        assert_eq!(m.load_gitignore(temp.path()), 0);
    }
}
