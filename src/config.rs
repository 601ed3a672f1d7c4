use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::fs::PatternMatcher;
use crate::fs::ignore_file::load_reposiftignore;

/// Files above this size are rejected without being read, whatever the config says.
pub const HARD_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Entity recognition backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NerMethod {
    #[default]
    Pattern,
    Structural,
    Learned,
    Hybrid,
}

/// Code density computation backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DensityAnalyzerKind {
    #[default]
    Line,
    Structural,
}

/// Main configuration for reposift
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReposiftConfig {
    /// Glob patterns to ignore (e.g. "*.log")
    pub ignore_patterns: Vec<String>,
    /// Glob patterns to include; empty means everything not ignored
    pub include_patterns: Vec<String>,
    /// Also read `.gitignore` at the repository root
    pub use_gitignore: bool,
    /// Select files through the scorer instead of taking everything
    pub scoring_enabled: bool,
    pub processor: ProcessorConfig,
    pub summary: SummaryConfig,
    pub scoring: ScoringConfig,
}

impl ReposiftConfig {
    /// Loads configuration from an explicit TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Matcher for `root`: configured patterns, then `.gitignore` when
    /// enabled, then `.reposiftignore`.
    pub fn build_matcher(&self, root: &Path) -> PatternMatcher {
        let mut matcher = PatternMatcher::from_patterns(&self.ignore_patterns, &self.include_patterns);
        if self.use_gitignore {
            matcher.load_gitignore(root);
        }
        matcher.add_ignores(load_reposiftignore(root));
        matcher
    }

    /// Attempts to load configuration from `reposift.toml` in the current directory.
    pub fn load_from_file() -> Option<Self> {
        let path = Path::new("reposift.toml");
        if !path.exists() {
            return None;
        }
        match Self::load(path) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("Ignoring auto-discovered config: {}", e);
                None
            }
        }
    }
}

impl Default for ReposiftConfig {
    fn default() -> Self {
        Self {
            ignore_patterns: default_ignore_patterns(),
            include_patterns: Vec::new(),
            use_gitignore: true,
            scoring_enabled: false,
            processor: ProcessorConfig::default(),
            summary: SummaryConfig::default(),
            scoring: ScoringConfig::default(),
        }
    }
}

pub fn default_ignore_patterns() -> Vec<String> {
    let defaults = vec![
        // Version Control
        ".git",
        ".hg",
        ".svn",
        ".bzr",
        // IDEs
        ".idea",
        ".vscode",
        ".vs",
        "*.swp",
        "*.swo",
        // Build / Dependency
        "node_modules",
        "target",
        "dist",
        "build",
        "out",
        "vendor",
        "venv",
        ".venv",
        ".tox",
        "__pycache__",
        "*.pyc",
        "*.class",
        "*.o",
        "*.obj",
        // Lockfiles
        "package-lock.json",
        "yarn.lock",
        "pnpm-lock.yaml",
        "Cargo.lock",
        "Gemfile.lock",
        "composer.lock",
        // System
        ".DS_Store",
        "Thumbs.db",
        // Logs
        "*.log",
        // Binary / Media / Compressed
        "*.exe",
        "*.dll",
        "*.so",
        "*.dylib",
        "*.bin",
        "*.jpg",
        "*.jpeg",
        "*.png",
        "*.gif",
        "*.ico",
        "*.webp",
        "*.mp3",
        "*.mp4",
        "*.pdf",
        "*.zip",
        "*.tar",
        "*.tar.gz",
        "*.7z",
        "*.db",
        "*.sqlite",
    ];
    defaults.into_iter().map(String::from).collect()
}

/// Ingestion pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Worker threads; 0 means one per available core
    pub threads: usize,
    /// Collector threads used when collecting in parallel; 0 means `threads`
    pub parallel_collectors: usize,
    /// Discovered files are pushed to the shared queue in batches of this size
    pub collector_batch_size: usize,
    /// Files at or above this size are read through a memory map
    pub mmap_threshold: u64,
    /// Files above this size are skipped (never above `HARD_MAX_FILE_SIZE`)
    pub max_file_size: u64,
    /// Follow symlinked files (symlinked directories are never followed)
    pub follow_symlinks: bool,
}

impl ProcessorConfig {
    pub fn effective_threads(&self) -> usize {
        if self.threads > 0 {
            self.threads
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }

    pub fn effective_max_file_size(&self) -> u64 {
        self.max_file_size.min(HARD_MAX_FILE_SIZE)
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            parallel_collectors: 0,
            collector_batch_size: 64,
            mmap_threshold: 1024 * 1024,
            max_file_size: HARD_MAX_FILE_SIZE,
            follow_symlinks: true,
        }
    }
}

/// Options for summarizing large files
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    pub enabled: bool,
    /// Files larger than this (bytes) are summarized
    pub size_threshold: u64,
    /// README files are always emitted in full
    pub include_readme: bool,
    pub first_lines: bool,
    pub first_lines_count: usize,
    pub signatures: bool,
    pub comments: bool,
    pub max_comments: usize,
    pub snippets: bool,
    pub snippet_count: usize,
    pub snippet_lines: usize,
    pub ner: NerConfig,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            size_threshold: 10 * 1024,
            include_readme: true,
            first_lines: true,
            first_lines_count: 20,
            signatures: true,
            comments: true,
            max_comments: 20,
            snippets: true,
            snippet_count: 3,
            snippet_lines: 5,
            ner: NerConfig::default(),
        }
    }
}

/// Entity recognition options used by the summarizer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NerConfig {
    pub enabled: bool,
    pub method: NerMethod,
    pub include_classes: bool,
    pub include_functions: bool,
    pub include_variables: bool,
    pub include_enums: bool,
    pub include_imports: bool,
    /// Maximum entities listed; 0 means unlimited
    pub max_entities: usize,
    pub group_by_type: bool,
    /// Cache learned-model results per file path
    pub cache: bool,
    /// Soft wall-clock budget for one learned-model extraction
    pub learned_time_budget_ms: u64,
    /// Hybrid dispatch picks the learned model only above this size (bytes)
    pub learned_size_threshold: u64,
    pub hybrid_use_learned: bool,
    pub hybrid_use_structural: bool,
    /// Directory holding `model.onnx`, `tokenizer.json` and `labels.json`
    pub model_path: Option<PathBuf>,
}

impl Default for NerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            method: NerMethod::Pattern,
            include_classes: true,
            include_functions: true,
            include_variables: false,
            include_enums: true,
            include_imports: false,
            max_entities: 50,
            group_by_type: true,
            cache: true,
            learned_time_budget_ms: 5_000,
            learned_size_threshold: 50 * 1024,
            hybrid_use_learned: true,
            hybrid_use_structural: true,
            model_path: None,
        }
    }
}

/// Component weights of the importance score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub structure: f64,
    pub file_type: f64,
    pub recency: f64,
    pub size: f64,
    pub code_density: f64,
    pub dependency: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            structure: 0.25,
            file_type: 0.25,
            recency: 0.15,
            size: 0.10,
            code_density: 0.15,
            dependency: 0.10,
        }
    }
}

/// File scoring configuration. Replace the whole record to change it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoringWeights,
    pub inclusion_threshold: f64,
    pub recency_days: f64,
    pub large_file_bytes: u64,
    /// Relative type weights, multiplied by `weights.file_type`
    pub source_type_weight: f64,
    pub config_type_weight: f64,
    pub docs_type_weight: f64,
    pub test_type_weight: f64,
    pub important_files: Vec<String>,
    pub important_dirs: Vec<String>,
    pub entry_points: Vec<String>,
    pub source_extensions: Vec<String>,
    pub config_extensions: Vec<String>,
    pub docs_extensions: Vec<String>,
    pub test_patterns: Vec<String>,
    pub density_analyzer: DensityAnalyzerKind,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            weights: ScoringWeights::default(),
            inclusion_threshold: 0.3,
            recency_days: 30.0,
            large_file_bytes: 100 * 1024,
            source_type_weight: 1.0,
            config_type_weight: 0.8,
            docs_type_weight: 0.6,
            test_type_weight: 0.3,
            important_files: strings(&[
                "readme*",
                "license*",
                "contributing*",
                "changelog*",
                "package.json",
                "cargo.toml",
                "go.mod",
                "pyproject.toml",
                "setup.py",
                "requirements.txt",
                "pom.xml",
                "build.gradle",
                "makefile",
                "cmakelists.txt",
                "dockerfile",
                "docker-compose.yml",
                "tsconfig.json",
            ]),
            important_dirs: strings(&[
                "src/", "lib/", "app/", "core/", "include/", "pkg/", "cmd/", "internal/",
            ]),
            entry_points: strings(&[
                "main.*",
                "index.*",
                "app.*",
                "server.*",
                "start.*",
                "init.*",
                "bootstrap.*",
            ]),
            source_extensions: strings(&[
                "rs", "py", "js", "jsx", "ts", "tsx", "go", "c", "h", "cpp", "cc", "cxx", "hpp",
                "hh", "java", "kt", "scala", "cs", "rb", "php", "swift", "m", "mm", "sh", "lua",
            ]),
            config_extensions: strings(&[
                "json", "yaml", "yml", "toml", "ini", "cfg", "conf", "xml", "properties", "env",
                "gradle", "cmake",
            ]),
            docs_extensions: strings(&["md", "markdown", "rst", "txt", "adoc", "org"]),
            test_patterns: strings(&[
                "test_*",
                "*_test.*",
                "*.test.*",
                "*.spec.*",
                "**/test/**",
                "**/tests/**",
                "**/__tests__/**",
            ]),
            density_analyzer: DensityAnalyzerKind::Line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("reposift.toml");
        std::fs::write(
            &path,
            r#"
scoring_enabled = true

[scoring]
inclusion_threshold = 0.5

[summary.ner]
enabled = true
method = "hybrid"
"#,
        )
        .unwrap();

        let config = ReposiftConfig::load(&path).unwrap();
        assert!(config.scoring_enabled);
        assert_eq!(config.scoring.inclusion_threshold, 0.5);
        assert_eq!(config.scoring.recency_days, 30.0);
        assert_eq!(config.summary.ner.method, NerMethod::Hybrid);
        assert!(config.ignore_patterns.contains(&"node_modules".to_string()));
    }

    #[test]
    fn test_bad_toml_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.toml");
        std::fs::write(&path, "scoring_enabled = [").unwrap();
        assert!(matches!(
            ReposiftConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_max_file_size_never_exceeds_hard_cap() {
        let config = ProcessorConfig {
            max_file_size: u64::MAX,
            ..Default::default()
        };
        assert_eq!(config.effective_max_file_size(), HARD_MAX_FILE_SIZE);
    }

    #[test]
    fn test_build_matcher_layers_ignore_files() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(".gitignore"), "*.tmp\n!keep.tmp\n").unwrap();
        std::fs::write(temp.path().join(".reposiftignore"), "# local\nfixtures/\n").unwrap();

        let config = ReposiftConfig::default();
        let matcher = config.build_matcher(temp.path());
        assert!(matcher.is_ignored("a/b.tmp"));
        assert!(matcher.is_ignored("fixtures/x.json"));
        assert!(matcher.is_ignored("build/main.o"));
        assert!(matcher.should_process("src/main.cpp"));

        let no_git = ReposiftConfig {
            use_gitignore: false,
            ..Default::default()
        };
        assert!(!no_git.build_matcher(temp.path()).is_ignored("a/b.tmp"));
    }
}
