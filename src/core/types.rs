//! Core types shared across reposift modules

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use super::progress::FileOutcome;

/// Why a file was skipped without being read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    Binary,
    TooLarge,
    NotAFile,
}

/// One ingested path.
///
/// Built by the worker that processed it and never modified afterwards;
/// summarization produces a new record instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileRecord {
    pub path: PathBuf,
    #[serde(skip)]
    pub content: Option<Vec<u8>>,
    pub byte_size: u64,
    pub line_count: usize,
    pub processed: bool,
    pub skipped: bool,
    pub skip_reason: Option<SkipReason>,
    pub error: Option<String>,
    pub summarized: bool,
    pub first_lines: Option<String>,
    pub snippets: Option<Vec<String>>,
    pub entities: Vec<NamedEntity>,
    pub formatted_entities: Option<String>,
}

impl FileRecord {
    pub fn processed(path: PathBuf, content: Vec<u8>) -> Self {
        Self {
            byte_size: content.len() as u64,
            line_count: crate::fs::read::count_lines(&content),
            path,
            content: Some(content),
            processed: true,
            ..Default::default()
        }
    }

    pub fn skipped(path: PathBuf, byte_size: u64, reason: SkipReason) -> Self {
        Self {
            path,
            byte_size,
            skipped: true,
            skip_reason: Some(reason),
            ..Default::default()
        }
    }

    pub fn errored(path: PathBuf, error: impl fmt::Display) -> Self {
        Self {
            path,
            error: Some(error.to_string()),
            ..Default::default()
        }
    }

    pub fn outcome(&self) -> FileOutcome {
        if self.error.is_some() {
            FileOutcome::Errored
        } else if self.skipped {
            FileOutcome::Skipped
        } else {
            FileOutcome::Processed
        }
    }

    /// Content decoded as UTF-8, invalid sequences replaced.
    pub fn text(&self) -> Cow<'_, str> {
        match &self.content {
            Some(bytes) => String::from_utf8_lossy(bytes),
            None => Cow::Borrowed(""),
        }
    }

    pub fn file_name(&self) -> &str {
        self.path.file_name().and_then(|n| n.to_str()).unwrap_or("")
    }

    pub fn extension(&self) -> &str {
        self.path.extension().and_then(|e| e.to_str()).unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityType {
    Class,
    Function,
    Variable,
    Enum,
    Import,
    Other,
}

impl EntityType {
    /// Maps a model label suffix (`CLASS`, `FUNC`, ...) to an entity type.
    pub fn from_label(label: &str) -> Self {
        match label.to_ascii_uppercase().as_str() {
            "CLASS" | "CLS" | "STRUCT" | "INTERFACE" | "TRAIT" | "TYPE" => EntityType::Class,
            "FUNCTION" | "FUNC" | "FN" | "METHOD" => EntityType::Function,
            "VARIABLE" | "VAR" | "CONST" | "FIELD" => EntityType::Variable,
            "ENUM" => EntityType::Enum,
            "IMPORT" | "MODULE" | "MOD" | "PACKAGE" => EntityType::Import,
            _ => EntityType::Other,
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            EntityType::Class => "Classes",
            EntityType::Function => "Functions",
            EntityType::Variable => "Variables",
            EntityType::Enum => "Enums",
            EntityType::Import => "Imports",
            EntityType::Other => "Other",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityType::Class => "class",
            EntityType::Function => "function",
            EntityType::Variable => "variable",
            EntityType::Enum => "enum",
            EntityType::Import => "import",
            EntityType::Other => "other",
        };
        f.write_str(label)
    }
}

/// A named code entity found in a file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedEntity {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
}

impl NamedEntity {
    pub fn new(name: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            name: name.into(),
            entity_type,
        }
    }
}

/// Names of the score components, in report order
pub mod component {
    pub const STRUCTURE: &str = "structure";
    pub const FILE_TYPE: &str = "file_type";
    pub const RECENCY: &str = "recency";
    pub const SIZE: &str = "size";
    pub const CODE_DENSITY: &str = "code_density";
    pub const DEPENDENCY: &str = "dependency";

    pub const ALL: [&str; 6] = [STRUCTURE, FILE_TYPE, RECENCY, SIZE, CODE_DENSITY, DEPENDENCY];
}

/// Importance score of one file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredFile {
    /// Path relative to the repository root, `/`-separated
    pub path: String,
    pub score: f64,
    pub components: BTreeMap<String, f64>,
    included: bool,
}

impl ScoredFile {
    /// Sums the components, clamps to [0, 1] and derives inclusion.
    pub fn new(path: String, components: BTreeMap<String, f64>, inclusion_threshold: f64) -> Self {
        let score = components.values().sum::<f64>().clamp(0.0, 1.0);
        Self {
            path,
            score,
            components,
            included: score >= inclusion_threshold,
        }
    }

    pub fn included(&self) -> bool {
        self.included
    }

    pub fn component(&self, name: &str) -> f64 {
        self.components.get(name).copied().unwrap_or(0.0)
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.path)
    }
}
