//! Reduced representations of large files
//!
//! A summary is built from independently toggleable sections: named
//! entities, leading lines, signatures, comments and spaced snippets.

pub mod comments;
pub mod signatures;
pub mod snippets;

use std::path::Path;
use std::sync::OnceLock;

use crate::config::SummaryConfig;
use crate::core::types::{FileRecord, NamedEntity};
use crate::ner::{self, EntityExtractor};
use crate::utils::lang::Language;

pub use comments::extract_comments;
pub use signatures::extract_signatures;
pub use snippets::extract_snippets;

/// README files are kept whole when `include_readme` is set.
pub fn is_readme(path: &Path) -> bool {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    matches!(name.as_str(), "readme" | "readme.md" | "readme.txt") || name.starts_with("readme.")
}

fn first_lines(content: &str, count: usize) -> String {
    content.lines().take(count).collect::<Vec<_>>().join("\n")
}

pub struct Summarizer {
    config: SummaryConfig,
    /// Built on first use so that a model load only happens when needed
    extractor: OnceLock<Box<dyn EntityExtractor>>,
}

impl std::fmt::Debug for Summarizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Summarizer")
            .field("config", &self.config)
            .field("extractor", &self.extractor.get().map(|e| e.name()))
            .finish()
    }
}

impl Summarizer {
    pub fn new(config: SummaryConfig) -> Self {
        Self {
            config,
            extractor: OnceLock::new(),
        }
    }

    /// Uses `extractor` instead of the backend selected by the configuration.
    pub fn with_extractor(config: SummaryConfig, extractor: Box<dyn EntityExtractor>) -> Self {
        Self {
            config,
            extractor: OnceLock::from(extractor),
        }
    }

    pub fn config(&self) -> &SummaryConfig {
        &self.config
    }

    /// Whether `record` is emitted as a summary rather than in full.
    pub fn should_summarize(&self, record: &FileRecord) -> bool {
        if !self.config.enabled || record.byte_size <= self.config.size_threshold {
            return false;
        }
        !(self.config.include_readme && is_readme(&record.path))
    }

    fn extractor(&self) -> &dyn EntityExtractor {
        self.extractor
            .get_or_init(|| ner::create_extractor(&self.config.ner))
            .as_ref()
    }

    /// Entities of `record` after kind filtering and truncation.
    pub fn entities_for(&self, record: &FileRecord) -> Vec<NamedEntity> {
        let content = record.text();
        let found = self.extractor().extract_entities(&content, &record.path);
        ner::select_entities(&found, &self.config.ner)
    }

    fn entities_if_enabled(&self, record: &FileRecord) -> Vec<NamedEntity> {
        if self.config.ner.enabled {
            self.entities_for(record)
        } else {
            Vec::new()
        }
    }

    /// Summary text of `record`. Sections with nothing to show are omitted.
    pub fn summarize(&self, record: &FileRecord) -> String {
        self.compose(record, &self.entities_if_enabled(record))
    }

    fn compose(&self, record: &FileRecord, entities: &[NamedEntity]) -> String {
        let content = record.text();
        let language = Language::from_path(&record.path);
        let mut sections = vec![format!(
            "File: {} ({} bytes, {} lines)",
            record.path.display(),
            record.byte_size,
            record.line_count
        )];

        if self.config.ner.enabled {
            let listing = ner::format_entities(entities, self.config.ner.group_by_type);
            if !listing.is_empty() {
                sections.push(format!("Entities:\n{}", listing));
            }
        }

        if self.config.first_lines && self.config.first_lines_count > 0 {
            let head = first_lines(&content, self.config.first_lines_count);
            if !head.is_empty() {
                sections.push(format!(
                    "First {} lines:\n{}",
                    self.config.first_lines_count, head
                ));
            }
        }

        if self.config.signatures {
            let signatures = extract_signatures(&content, language);
            if !signatures.is_empty() {
                sections.push(format!("Signatures:\n{}", signatures.join("\n")));
            }
        }

        if self.config.comments {
            let comments = extract_comments(&content, language, self.config.max_comments);
            if !comments.is_empty() {
                sections.push(format!("Comments:\n{}", comments.join("\n\n")));
            }
        }

        if self.config.snippets {
            if let Some(snippets) =
                extract_snippets(&content, self.config.snippet_count, self.config.snippet_lines)
            {
                sections.push(format!("Snippets:\n{}", snippets.join("\n")));
            }
        }

        sections.join("\n\n")
    }

    /// Full text, or the summary when [`Self::should_summarize`] holds.
    pub fn render(&self, record: &FileRecord) -> String {
        if self.should_summarize(record) {
            self.summarize(record)
        } else {
            record.text().into_owned()
        }
    }

    /// A copy of `record` carrying its summary as content, or an unchanged
    /// copy when it is emitted in full.
    pub fn summarized(&self, record: &FileRecord) -> FileRecord {
        if !self.should_summarize(record) {
            return record.clone();
        }
        let content = record.text();
        let entities = self.entities_if_enabled(record);
        let formatted = (!entities.is_empty())
            .then(|| ner::format_entities(&entities, self.config.ner.group_by_type));
        let summary = self.compose(record, &entities);

        FileRecord {
            content: Some(summary.into_bytes()),
            summarized: true,
            first_lines: self
                .config
                .first_lines
                .then(|| first_lines(&content, self.config.first_lines_count)),
            snippets: if self.config.snippets {
                extract_snippets(&content, self.config.snippet_count, self.config.snippet_lines)
            } else {
                None
            },
            entities,
            formatted_entities: formatted,
            ..record.clone()
        }
    }
}
