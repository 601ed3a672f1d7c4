//! Syntax-tree entity extraction with tree-sitter queries

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::OnceLock;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Query, QueryCursor};

use super::EntityExtractor;
use super::pattern::PatternExtractor;
use crate::core::types::{EntityType, NamedEntity};
use crate::error::NerError;
use crate::utils::syntax::Grammar;

fn query_source(grammar: Grammar) -> &'static str {
    match grammar {
        Grammar::Rust => {
            r#"
            (struct_item name: (_) @class)
            (trait_item name: (_) @class)
            (enum_item name: (_) @enum)
            (function_item name: (_) @function)
            (const_item name: (_) @variable)
            (static_item name: (_) @variable)
            (use_declaration argument: (_) @import)
            (mod_item name: (_) @import)
            "#
        }
        Grammar::Python => {
            r#"
            (class_definition name: (_) @class)
            (function_definition name: (_) @function)
            (module (expression_statement (assignment left: (identifier) @variable)))
            (import_statement name: (_) @import)
            (import_from_statement module_name: (_) @import)
            "#
        }
        Grammar::JavaScript => {
            r#"
            (class_declaration name: (_) @class)
            (function_declaration name: (_) @function)
            (method_definition name: (_) @function)
            (variable_declarator name: (identifier) @variable)
            (import_statement source: (string) @import)
            "#
        }
        Grammar::TypeScript | Grammar::Tsx => {
            r#"
            (class_declaration name: (_) @class)
            (abstract_class_declaration name: (_) @class)
            (interface_declaration name: (_) @class)
            (enum_declaration name: (_) @enum)
            (function_declaration name: (_) @function)
            (method_definition name: (_) @function)
            (variable_declarator name: (identifier) @variable)
            (import_statement source: (string) @import)
            "#
        }
        Grammar::Go => {
            r#"
            (type_spec name: (_) @class)
            (function_declaration name: (_) @function)
            (method_declaration name: (_) @function)
            (const_spec name: (_) @variable)
            (var_spec name: (_) @variable)
            (import_spec path: (_) @import)
            "#
        }
        Grammar::C => {
            r#"
            (struct_specifier name: (_) @class)
            (enum_specifier name: (_) @enum)
            (function_definition declarator: (function_declarator declarator: (identifier) @function))
            (preproc_include path: (_) @import)
            "#
        }
        Grammar::Cpp => {
            r#"
            (class_specifier name: (_) @class)
            (struct_specifier name: (_) @class)
            (enum_specifier name: (_) @enum)
            (function_definition declarator: (function_declarator declarator: (_) @function))
            (preproc_include path: (_) @import)
            "#
        }
    }
}

fn capture_type(capture_name: &str) -> EntityType {
    match capture_name {
        "class" => EntityType::Class,
        "function" => EntityType::Function,
        "variable" => EntityType::Variable,
        "enum" => EntityType::Enum,
        "import" => EntityType::Import,
        _ => EntityType::Other,
    }
}

fn clean_capture(text: &str, entity_type: EntityType) -> String {
    let text = text.trim();
    if entity_type != EntityType::Import {
        return text.to_string();
    }
    let text = text.trim_matches(|c| c == '"' || c == '\'' || c == '<' || c == '>');
    match text.find(" as ") {
        Some(idx) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Query-based extractor over the linked tree-sitter grammars.
///
/// Queries are compiled once, on first use. Unsupported languages and parse
/// failures fall back to [`PatternExtractor`].
#[derive(Default)]
pub struct StructuralExtractor {
    queries: OnceLock<HashMap<Grammar, Query>>,
    fallback: PatternExtractor,
}

impl std::fmt::Debug for StructuralExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructuralExtractor")
            .field("queries_compiled", &self.queries.get().map(HashMap::len))
            .finish()
    }
}

impl StructuralExtractor {
    /// Checks that the parser backend can be initialized.
    pub fn new() -> Result<Self, NerError> {
        Grammar::Rust.parser()?;
        Ok(Self::default())
    }

    fn queries(&self) -> &HashMap<Grammar, Query> {
        self.queries.get_or_init(|| {
            let mut queries = HashMap::new();
            for grammar in Grammar::ALL {
                match Query::new(&grammar.language(), query_source(grammar)) {
                    Ok(query) => {
                        queries.insert(grammar, query);
                    }
                    Err(e) => tracing::warn!("Entity query for {:?} does not compile: {}", grammar, e),
                }
            }
            queries
        })
    }

    /// Structural extraction without the pattern fallback.
    pub fn try_extract(&self, content: &str, path: &Path) -> Result<Vec<NamedEntity>, NerError> {
        let grammar = Grammar::for_path(path)
            .ok_or_else(|| NerError::UnsupportedLanguage(path.display().to_string()))?;
        let query = self
            .queries()
            .get(&grammar)
            .ok_or_else(|| NerError::BackendUnavailable(format!("no query for {:?}", grammar)))?;
        let tree = grammar.parse(content)?;

        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(query, tree.root_node(), content.as_bytes());
        let mut seen = HashSet::new();
        let mut entities = Vec::new();

        while let Some(m) = matches.next() {
            for capture in m.captures {
                let entity_type = capture_type(query.capture_names()[capture.index as usize]);
                let Ok(text) = capture.node.utf8_text(content.as_bytes()) else {
                    continue;
                };
                let name = clean_capture(text, entity_type);
                if name.is_empty() {
                    continue;
                }
                let entity = NamedEntity::new(name, entity_type);
                if seen.insert(entity.clone()) {
                    entities.push(entity);
                }
            }
        }

        Ok(entities)
    }
}

impl EntityExtractor for StructuralExtractor {
    fn name(&self) -> &'static str {
        "structural"
    }

    fn extract_entities(&self, content: &str, path: &Path) -> Vec<NamedEntity> {
        match self.try_extract(content, path) {
            Ok(entities) => entities,
            Err(e) => {
                tracing::debug!("Structural extraction fell back for {}: {}", path.display(), e);
                self.fallback.extract_entities(content, path)
            }
        }
    }
}
