//! Code density estimation
//!
//! Two interchangeable analyzers: a per-line classifier that works for any
//! language, and a syntax-tree counter for the grammars we ship. The tree
//! counter falls back to the line classifier whenever parsing is not
//! possible.

use std::path::Path;

use crate::config::DensityAnalyzerKind;
use crate::core::types::EntityType;
use crate::ner::pattern::declaration_kind;
use crate::utils::lang::Language;
use crate::utils::syntax::{Grammar, walk_nodes};

pub trait DensityAnalyzer: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    /// Density of `content` in `[0, 1]`.
    fn density(&self, content: &str, path: &Path) -> f64;
}

pub fn create_density_analyzer(kind: DensityAnalyzerKind) -> Box<dyn DensityAnalyzer> {
    match kind {
        DensityAnalyzerKind::Line => Box::new(LineClassifier),
        DensityAnalyzerKind::Structural => Box::new(StructuralDensity::default()),
    }
}

/// Line counts of one file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineStats {
    pub total: usize,
    pub code: usize,
    pub comment: usize,
    pub blank: usize,
    pub functions: usize,
    pub classes: usize,
    pub imports: usize,
    /// Deepest `{` nesting seen on code lines
    pub max_depth: usize,
}

impl LineStats {
    pub fn collect(content: &str, language: Language) -> Self {
        let syntax = language.comment_syntax();
        let mut stats = LineStats::default();
        let mut block_end: Option<&'static str> = None;
        let mut depth: usize = 0;

        for line in content.lines() {
            stats.total += 1;
            let trimmed = line.trim();

            if let Some(end) = block_end {
                stats.comment += 1;
                if trimmed.contains(end) {
                    block_end = None;
                }
                continue;
            }
            if trimmed.is_empty() {
                stats.blank += 1;
                continue;
            }
            if let Some((open, close)) = syntax.block {
                if let Some(rest) = trimmed.strip_prefix(open) {
                    stats.comment += 1;
                    if !rest.contains(close) {
                        block_end = Some(close);
                    }
                    continue;
                }
            }
            if syntax.docstrings {
                let quote = ["\"\"\"", "'''"].into_iter().find(|q| trimmed.starts_with(*q));
                if let Some(quote) = quote {
                    stats.comment += 1;
                    if !trimmed[quote.len()..].contains(quote) {
                        block_end = Some(quote);
                    }
                    continue;
                }
            }
            if syntax.line.iter().any(|marker| trimmed.starts_with(marker)) {
                stats.comment += 1;
                continue;
            }

            stats.code += 1;
            match declaration_kind(line, language) {
                Some(EntityType::Function) => stats.functions += 1,
                Some(EntityType::Class) | Some(EntityType::Enum) => stats.classes += 1,
                Some(EntityType::Import) => stats.imports += 1,
                _ => {}
            }
            for c in trimmed.chars() {
                match c {
                    '{' => {
                        depth += 1;
                        stats.max_depth = stats.max_depth.max(depth);
                    }
                    '}' => depth = depth.saturating_sub(1),
                    _ => {}
                }
            }
        }
        stats
    }

    /// Share of code lines adjusted by definition, comment and import
    /// signals, clamped to `[0, 1]`.
    pub fn density(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let code = self.code as f64;
        let mut density = code / self.total as f64;

        density += ((self.functions + self.classes) as f64 * 0.02).min(0.2);
        if self.comment == 0 && self.code > 20 {
            density -= 0.1;
        }
        if self.code > 0 {
            let ratio = self.comment as f64 / code;
            if (0.1..=0.3).contains(&ratio) {
                density += 0.1;
            }
        }
        if self.imports as f64 > code * 0.3 {
            density -= 0.15;
        }
        density.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LineClassifier;

impl DensityAnalyzer for LineClassifier {
    fn name(&self) -> &'static str {
        "line"
    }

    fn density(&self, content: &str, path: &Path) -> f64 {
        LineStats::collect(content, Language::from_path(path)).density()
    }
}

const FUNCTION_NODES: &[&str] = &[
    "function_item",
    "function_definition",
    "function_declaration",
    "method_declaration",
    "method_definition",
    "function_expression",
    "arrow_function",
    "func_literal",
];

const CLASS_NODES: &[&str] = &[
    "struct_item",
    "enum_item",
    "trait_item",
    "impl_item",
    "class_definition",
    "class_declaration",
    "class_specifier",
    "struct_specifier",
    "interface_declaration",
    "enum_declaration",
    "type_spec",
];

const CONDITIONAL_NODES: &[&str] = &[
    "if_expression",
    "if_statement",
    "elif_clause",
    "match_expression",
    "match_statement",
    "switch_statement",
    "switch_expression",
    "expression_switch_statement",
    "type_switch_statement",
    "conditional_expression",
    "ternary_expression",
];

/// Declaration counts from a syntax tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeCounts {
    pub functions: usize,
    pub classes: usize,
    pub conditionals: usize,
}

impl NodeCounts {
    pub fn collect(content: &str, grammar: Grammar) -> Result<Self, crate::error::NerError> {
        let tree = grammar.parse(content)?;
        let mut counts = NodeCounts::default();
        walk_nodes(&tree, |node| {
            let kind = node.kind();
            if FUNCTION_NODES.contains(&kind) {
                counts.functions += 1;
            } else if CLASS_NODES.contains(&kind) {
                counts.classes += 1;
            } else if CONDITIONAL_NODES.contains(&kind) {
                counts.conditionals += 1;
            }
        });
        Ok(counts)
    }
}

/// Averages the code-line share with a structure score
/// `min(1, 4 * (2 * classes + functions + conditionals / 2) / non_blank)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralDensity {
    fallback: LineClassifier,
}

impl DensityAnalyzer for StructuralDensity {
    fn name(&self) -> &'static str {
        "structural"
    }

    fn density(&self, content: &str, path: &Path) -> f64 {
        let Some(grammar) = Grammar::for_path(path) else {
            return self.fallback.density(content, path);
        };
        let counts = match NodeCounts::collect(content, grammar) {
            Ok(counts) => counts,
            Err(e) => {
                tracing::debug!("Line density for {}: {}", path.display(), e);
                return self.fallback.density(content, path);
            }
        };

        let stats = LineStats::collect(content, Language::from_path(path));
        if stats.total == 0 {
            return 0.0;
        }
        let non_blank = (stats.total - stats.blank).max(1) as f64;
        let weighted = 2.0 * counts.classes as f64
            + counts.functions as f64
            + 0.5 * counts.conditionals as f64;
        let structure = (4.0 * weighted / non_blank).min(1.0);
        let code_share = stats.code as f64 / stats.total as f64;
        ((code_share + structure) / 2.0).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_stats() {
        let code = "use std::io;\n\n// reads\n/* block\n   comment */\nfn read() {\n    if x {\n        y();\n    }\n}\n";
        let stats = LineStats::collect(code, Language::Rust);
        assert_eq!(
            stats,
            LineStats {
                total: 10,
                code: 6,
                comment: 3,
                blank: 1,
                functions: 1,
                classes: 0,
                imports: 1,
                max_depth: 2,
            }
        );
    }

    #[test]
    fn test_python_docstring_lines() {
        let code = "\"\"\"Module.\n\nMore.\n\"\"\"\nimport os\n# note\ndef f():\n    return 1\n";
        let stats = LineStats::collect(code, Language::Python);
        assert_eq!(stats.comment, 5);
        assert_eq!(stats.code, 3);
        assert_eq!(stats.imports, 1);
        assert_eq!(stats.functions, 1);
    }

    #[test]
    fn test_density_adjustments() {
        // 0.8 base + 0.04 definitions + 0.1 healthy comments
        let stats = LineStats {
            total: 50,
            code: 40,
            comment: 8,
            blank: 2,
            functions: 2,
            ..Default::default()
        };
        assert!((stats.density() - 0.94).abs() < 1e-9);

        // uncommented and mostly imports: 1.0 - 0.1 - 0.15
        let glue = LineStats {
            total: 30,
            code: 30,
            imports: 20,
            ..Default::default()
        };
        assert!((glue.density() - 0.75).abs() < 1e-9);

        assert_eq!(LineStats::default().density(), 0.0);
    }

    #[test]
    fn test_node_counts() {
        let code = "struct A;\nimpl A {\n    fn f(&self) { if true {} }\n}\nfn g() { match 1 { _ => {} } }\n";
        let counts = NodeCounts::collect(code, Grammar::Rust).unwrap();
        assert_eq!(
            counts,
            NodeCounts {
                functions: 2,
                classes: 2,
                conditionals: 2,
            }
        );
    }

    #[test]
    fn test_structural_falls_back_for_unknown_grammar() {
        let code = "local x = 1\n-- note\nfunction f() end\n";
        let path = Path::new("a.lua");
        assert_eq!(
            StructuralDensity::default().density(code, path),
            LineClassifier.density(code, path)
        );
    }

    #[test]
    fn test_structural_density_in_range() {
        let code = "fn a() {}\nfn b() {}\n\n// end\n";
        let d = StructuralDensity::default().density(code, Path::new("x.rs"));
        // code share 0.5, structure capped at 1.0
        assert!((d - 0.75).abs() < 1e-9);
        assert_eq!(create_density_analyzer(DensityAnalyzerKind::Structural).name(), "structural");
        assert_eq!(create_density_analyzer(DensityAnalyzerKind::Line).name(), "line");
    }
}
