//! Named entity recognition over source files
//!
//! Four interchangeable extractors: regex patterns, tree-sitter queries, a
//! learned sequence labeler, and a hybrid dispatcher choosing among them per
//! file. Every backend degrades to the pattern extractor instead of failing.

pub mod hybrid;
pub mod learned;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod pattern;
pub mod structural;

pub use hybrid::HybridDispatcher;
pub use learned::{LearnedExtractor, SequenceLabeler};
pub use pattern::PatternExtractor;
pub use structural::StructuralExtractor;

use std::path::Path;

use crate::config::{NerConfig, NerMethod};
use crate::core::types::{EntityType, NamedEntity};

pub trait EntityExtractor: Send + Sync + std::fmt::Debug {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Named entities of `content`, in order of first appearance.
    fn extract_entities(&self, content: &str, path: &Path) -> Vec<NamedEntity>;
}

/// Builds the extractor selected by `config.method`, falling back to
/// patterns when the selected backend cannot be constructed.
pub fn create_extractor(config: &NerConfig) -> Box<dyn EntityExtractor> {
    match config.method {
        NerMethod::Pattern => Box::new(PatternExtractor),
        NerMethod::Structural => match StructuralExtractor::new() {
            Ok(extractor) => Box::new(extractor),
            Err(e) => {
                tracing::warn!("Structural entity recognition unavailable: {}", e);
                Box::new(PatternExtractor)
            }
        },
        NerMethod::Learned => match LearnedExtractor::from_config(config) {
            Ok(extractor) => Box::new(extractor),
            Err(e) => {
                tracing::warn!("Learned entity recognition unavailable: {}", e);
                Box::new(PatternExtractor)
            }
        },
        NerMethod::Hybrid => Box::new(HybridDispatcher::new(config)),
    }
}

const KIND_ORDER: [EntityType; 5] = [
    EntityType::Class,
    EntityType::Function,
    EntityType::Variable,
    EntityType::Enum,
    EntityType::Import,
];

fn kind_enabled(config: &NerConfig, kind: EntityType) -> bool {
    match kind {
        EntityType::Class => config.include_classes,
        EntityType::Function => config.include_functions,
        EntityType::Variable => config.include_variables,
        EntityType::Enum => config.include_enums,
        EntityType::Import => config.include_imports,
        EntityType::Other => false,
    }
}

/// Concatenates the enabled kinds (classes, functions, variables, enums,
/// imports) and truncates to `max_entities` (0 keeps everything).
pub fn select_entities(entities: &[NamedEntity], config: &NerConfig) -> Vec<NamedEntity> {
    let mut selected: Vec<NamedEntity> = KIND_ORDER
        .iter()
        .filter(|&&kind| kind_enabled(config, kind))
        .flat_map(|&kind| entities.iter().filter(move |e| e.entity_type == kind).cloned())
        .collect();
    if config.max_entities > 0 {
        selected.truncate(config.max_entities);
    }
    selected
}

/// Renders entities either as `Classes: A, B` lines per kind or as one
/// `name (kind)` list.
pub fn format_entities(entities: &[NamedEntity], group_by_type: bool) -> String {
    if !group_by_type {
        return entities
            .iter()
            .map(|e| format!("{} ({})", e.name, e.entity_type))
            .collect::<Vec<_>>()
            .join(", ");
    }

    let mut lines = Vec::new();
    for kind in KIND_ORDER.iter().chain(std::iter::once(&EntityType::Other)) {
        let names: Vec<&str> = entities
            .iter()
            .filter(|e| e.entity_type == *kind)
            .map(|e| e.name.as_str())
            .collect();
        if !names.is_empty() {
            lines.push(format!("{}: {}", kind.plural(), names.join(", ")));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<NamedEntity> {
        vec![
            NamedEntity::new("os", EntityType::Import),
            NamedEntity::new("run", EntityType::Function),
            NamedEntity::new("App", EntityType::Class),
            NamedEntity::new("LIMIT", EntityType::Variable),
            NamedEntity::new("stop", EntityType::Function),
        ]
    }

    #[test]
    fn test_select_respects_kinds_and_cap() {
        let config = NerConfig::default();
        let selected = select_entities(&sample(), &config);
        let names: Vec<_> = selected.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["App", "run", "stop"]);

        let capped = NerConfig {
            max_entities: 2,
            include_imports: true,
            ..Default::default()
        };
        assert_eq!(select_entities(&sample(), &capped).len(), 2);
    }

    #[test]
    fn test_format_grouped_and_flat() {
        let entities = select_entities(&sample(), &NerConfig::default());
        assert_eq!(
            format_entities(&entities, true),
            "Classes: App\nFunctions: run, stop"
        );
        assert_eq!(
            format_entities(&entities, false),
            "App (class), run (function), stop (function)"
        );
        assert_eq!(format_entities(&[], true), "");
    }

    #[test]
    fn test_create_extractor_per_method() {
        let mut config = NerConfig::default();
        assert_eq!(create_extractor(&config).name(), "pattern");
        config.method = NerMethod::Structural;
        assert_eq!(create_extractor(&config).name(), "structural");
        config.method = NerMethod::Hybrid;
        assert_eq!(create_extractor(&config).name(), "hybrid");
        config.method = NerMethod::Learned;
        // no model directory configured
        assert_eq!(create_extractor(&config).name(), "pattern");
    }
}
