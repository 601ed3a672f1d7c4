//! Tree-sitter grammar selection and parsing

use std::path::Path;
use tree_sitter::{Node, Parser, Tree};

use crate::error::NerError;

/// Languages with a linked tree-sitter grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grammar {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Tsx,
    Go,
    C,
    Cpp,
}

impl Grammar {
    pub const ALL: [Grammar; 8] = [
        Grammar::Rust,
        Grammar::Python,
        Grammar::JavaScript,
        Grammar::TypeScript,
        Grammar::Tsx,
        Grammar::Go,
        Grammar::C,
        Grammar::Cpp,
    ];

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "rs" => Some(Grammar::Rust),
            "py" | "pyi" => Some(Grammar::Python),
            "js" | "jsx" | "mjs" | "cjs" => Some(Grammar::JavaScript),
            "ts" | "mts" | "cts" => Some(Grammar::TypeScript),
            "tsx" => Some(Grammar::Tsx),
            "go" => Some(Grammar::Go),
            "c" | "h" => Some(Grammar::C),
            "cpp" | "hpp" | "cc" | "cxx" | "hh" | "hxx" => Some(Grammar::Cpp),
            _ => None,
        }
    }

    pub fn for_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn language(&self) -> tree_sitter::Language {
        match self {
            Grammar::Rust => tree_sitter_rust::LANGUAGE.into(),
            Grammar::Python => tree_sitter_python::LANGUAGE.into(),
            Grammar::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Grammar::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Grammar::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Grammar::Go => tree_sitter_go::LANGUAGE.into(),
            Grammar::C => tree_sitter_c::LANGUAGE.into(),
            Grammar::Cpp => tree_sitter_cpp::LANGUAGE.into(),
        }
    }

    /// Creates a parser for this grammar. Fails on ABI mismatch.
    pub fn parser(&self) -> Result<Parser, NerError> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language())
            .map_err(|e| NerError::BackendUnavailable(format!("{:?} grammar: {}", self, e)))?;
        Ok(parser)
    }

    pub fn parse(&self, content: &str) -> Result<Tree, NerError> {
        self.parser()?
            .parse(content, None)
            .ok_or_else(|| NerError::Parse(format!("{:?} source", self)))
    }
}

/// Pre-order walk over every node of the tree.
pub fn walk_nodes<F: FnMut(Node<'_>)>(tree: &Tree, mut visit: F) {
    let mut cursor = tree.walk();
    loop {
        visit(cursor.node());
        if cursor.goto_first_child() || cursor.goto_next_sibling() {
            continue;
        }
        loop {
            if !cursor.goto_parent() {
                return;
            }
            if cursor.goto_next_sibling() {
                break;
            }
        }
    }
}
