//! Multi-factor file importance scoring
//!
//! A score is the sum of six weighted components (structure, file type,
//! recency, size, code density, dependency connectivity) clamped to
//! `[0, 1]`. Files at or above the inclusion threshold are selected.

use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use super::density::{DensityAnalyzer, create_density_analyzer};
use super::dependencies::build_dependency_graph;
use super::graph::DependencyGraph;
use crate::config::ScoringConfig;
use crate::core::types::{ScoredFile, component};
use crate::error::ScanError;
use crate::fs::{PathPattern, PatternMatcher, relative_path_str, walk_directory};

/// Share of the structure weight granted per signal
const ROOT_BONUS: f64 = 0.4;
const IMPORTANT_FILE_BONUS: f64 = ROOT_BONUS / 2.0;
const IMPORTANT_DIR_BONUS: f64 = 0.4;
const ENTRY_POINT_BONUS: f64 = 0.3;

const SECONDS_PER_DAY: f64 = 86_400.0;

fn compile_all(globs: &[String]) -> Vec<PathPattern> {
    globs
        .iter()
        .map(|g| PathPattern::compile_case_insensitive(g))
        .collect()
}

fn has_extension(list: &[String], ext: &str) -> bool {
    !ext.is_empty() && list.iter().any(|e| e.eq_ignore_ascii_case(ext))
}

/// Scores files of a repository.
///
/// Holds only the configuration, compiled patterns and a fixed reference
/// time, so scoring the same unchanged file twice gives identical results.
pub struct FileScorer {
    config: ScoringConfig,
    matcher: Arc<PatternMatcher>,
    important_files: Vec<PathPattern>,
    entry_points: Vec<PathPattern>,
    test_patterns: Vec<PathPattern>,
    density: Box<dyn DensityAnalyzer>,
    reference_time: SystemTime,
    follow_symlinks: bool,
}

impl std::fmt::Debug for FileScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileScorer")
            .field("config", &self.config)
            .field("density", &self.density.name())
            .field("reference_time", &self.reference_time)
            .field("follow_symlinks", &self.follow_symlinks)
            .finish()
    }
}

impl FileScorer {
    pub fn new(config: ScoringConfig, matcher: PatternMatcher) -> Self {
        Self {
            important_files: compile_all(&config.important_files),
            entry_points: compile_all(&config.entry_points),
            test_patterns: compile_all(&config.test_patterns),
            density: create_density_analyzer(config.density_analyzer),
            matcher: Arc::new(matcher),
            reference_time: SystemTime::now(),
            follow_symlinks: true,
            config,
        }
    }

    /// Measures recency against `time` instead of the construction time.
    pub fn with_reference_time(mut self, time: SystemTime) -> Self {
        self.reference_time = time;
        self
    }

    /// Whether symlinks to files are scored. Matches the ingestion default.
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Replaces the whole configuration.
    pub fn set_config(&mut self, config: ScoringConfig) {
        self.important_files = compile_all(&config.important_files);
        self.entry_points = compile_all(&config.entry_points);
        self.test_patterns = compile_all(&config.test_patterns);
        self.density = create_density_analyzer(config.density_analyzer);
        self.config = config;
    }

    /// Scores every eligible file under `root`, highest score first.
    ///
    /// Equal scores are ordered by path. The dependency graph is built once
    /// per call and only when its weight is nonzero.
    pub fn score_repository(&self, root: &Path) -> Result<Vec<ScoredFile>, ScanError> {
        let files = walk_directory(root, Arc::clone(&self.matcher), self.follow_symlinks)?;

        let graph = if self.config.weights.dependency > 0.0 {
            Some(build_dependency_graph(root, &files, &self.config.source_extensions))
        } else {
            None
        };

        let mut scored: Vec<ScoredFile> = files
            .iter()
            .map(|path| self.score_file_with_graph(path, root, graph.as_ref()))
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.path.cmp(&b.path)));

        tracing::info!(
            "Scored {} files under {} ({} selected)",
            scored.len(),
            root.display(),
            scored.iter().filter(|s| s.included()).count()
        );
        Ok(scored)
    }

    /// Scores one file without dependency information.
    pub fn score_file(&self, path: &Path, root: &Path) -> ScoredFile {
        self.score_file_with_graph(path, root, None)
    }

    pub fn score_file_with_graph(&self, path: &Path, root: &Path, graph: Option<&DependencyGraph>) -> ScoredFile {
        let full = if path.is_absolute() { path.to_path_buf() } else { root.join(path) };
        let rel = relative_path_str(root, &full);
        let metadata = std::fs::metadata(&full).ok();
        let weights = &self.config.weights;

        let mut components = BTreeMap::new();
        components.insert(component::STRUCTURE.to_string(), self.structure_score(&rel));
        components.insert(component::FILE_TYPE.to_string(), self.type_score(&rel));
        components.insert(
            component::RECENCY.to_string(),
            metadata
                .as_ref()
                .and_then(|m| m.modified().ok())
                .map(|modified| self.recency_score(modified))
                .unwrap_or(0.0),
        );
        components.insert(
            component::SIZE.to_string(),
            metadata.as_ref().map(|m| self.size_score(m.len())).unwrap_or(0.0),
        );
        components.insert(component::CODE_DENSITY.to_string(), self.density_score(&full, &rel));
        components.insert(
            component::DEPENDENCY.to_string(),
            match graph {
                Some(graph) if weights.dependency > 0.0 => weights.dependency * graph.connectivity(&rel),
                _ => 0.0,
            },
        );

        ScoredFile::new(rel, components, self.config.inclusion_threshold)
    }

    /// Relative paths of the selected files, in input order.
    pub fn get_selected_files(&self, scored: &[ScoredFile]) -> Vec<PathBuf> {
        scored
            .iter()
            .filter(|s| s.included())
            .map(|s| PathBuf::from(&s.path))
            .collect()
    }

    /// JSON report: configuration echo, per-file components and totals.
    pub fn report(&self, scored: &[ScoredFile]) -> Value {
        let included = scored.iter().filter(|s| s.included()).count();
        let average = if scored.is_empty() {
            0.0
        } else {
            scored.iter().map(|s| s.score).sum::<f64>() / scored.len() as f64
        };
        let files: Vec<Value> = scored
            .iter()
            .map(|s| {
                json!({
                    "path": s.path,
                    "score": s.score,
                    "included": s.included(),
                    "components": s.components,
                })
            })
            .collect();

        json!({
            "config": serde_json::to_value(&self.config).unwrap_or(Value::Null),
            "files": files,
            "summary": {
                "total": scored.len(),
                "included": included,
                "excluded": scored.len() - included,
                "threshold": self.config.inclusion_threshold,
                "average_score": average,
            },
        })
    }

    fn structure_score(&self, rel: &str) -> f64 {
        let weight = self.config.weights.structure;
        let mut share = 0.0;
        if !rel.contains('/') {
            share += ROOT_BONUS;
            if self.important_files.iter().any(|p| p.matches(rel)) {
                share += IMPORTANT_FILE_BONUS;
            }
        }
        let lower = rel.to_lowercase();
        if self
            .config
            .important_dirs
            .iter()
            .any(|dir| lower.starts_with(&dir.to_lowercase()))
        {
            share += IMPORTANT_DIR_BONUS;
        }
        if self.entry_points.iter().any(|p| p.matches(rel)) {
            share += ENTRY_POINT_BONUS;
        }
        weight * share
    }

    fn type_score(&self, rel: &str) -> f64 {
        let config = &self.config;
        let ext = rel
            .rsplit('/')
            .next()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext)
            .unwrap_or("");

        let relative_weight = if has_extension(&config.source_extensions, ext) {
            config.source_type_weight
        } else if has_extension(&config.config_extensions, ext) {
            config.config_type_weight
        } else if has_extension(&config.docs_extensions, ext) {
            config.docs_type_weight
        } else {
            return 0.0;
        };

        if self.test_patterns.iter().any(|p| p.matches(rel)) {
            config.weights.file_type * config.test_type_weight
        } else {
            config.weights.file_type * relative_weight
        }
    }

    fn recency_score(&self, modified: SystemTime) -> f64 {
        let window = self.config.recency_days;
        if window <= 0.0 {
            return 0.0;
        }
        // modification times in the future count as age zero
        let age_days = self
            .reference_time
            .duration_since(modified)
            .map(|d| d.as_secs_f64() / SECONDS_PER_DAY)
            .unwrap_or(0.0);
        self.config.weights.recency * (1.0 - age_days / window).max(0.0)
    }

    fn size_score(&self, size: u64) -> f64 {
        let large = self.config.large_file_bytes;
        if large == 0 || size >= large {
            return 0.0;
        }
        self.config.weights.size * (1.0 - size as f64 / large as f64)
    }

    fn density_score(&self, full: &Path, rel: &str) -> f64 {
        let weight = self.config.weights.code_density;
        let ext = full.extension().and_then(|e| e.to_str()).unwrap_or("");
        if weight <= 0.0 || !has_extension(&self.config.source_extensions, ext) {
            return 0.0;
        }
        match std::fs::read(full) {
            Ok(bytes) => weight * self.density.density(&String::from_utf8_lossy(&bytes), Path::new(rel)),
            Err(e) => {
                tracing::debug!("No density for {}: {}", full.display(), e);
                0.0
            }
        }
    }
}
