//! Regex-based entity extraction
//!
//! Works line by line with one regex family per language group. Never fails,
//! which makes it the fallback of every other extractor.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;

use super::EntityExtractor;
use crate::core::types::{EntityType, NamedEntity};
use crate::utils::lang::Language;

/// Regexes of one language group. Every regex captures the name in group 1.
struct Rules {
    imports: Vec<Regex>,
    enums: Vec<Regex>,
    classes: Vec<Regex>,
    functions: Vec<Regex>,
    variables: Vec<Regex>,
    /// Parenthesized import block: opening line, entry line, closing line
    import_block: Option<(Regex, Regex, Regex)>,
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("valid entity regex"))
        .collect()
}

impl Rules {
    fn new(
        imports: &[&str],
        enums: &[&str],
        classes: &[&str],
        functions: &[&str],
        variables: &[&str],
    ) -> Self {
        Self {
            imports: compile(imports),
            enums: compile(enums),
            classes: compile(classes),
            functions: compile(functions),
            variables: compile(variables),
            import_block: None,
        }
    }

    fn with_import_block(mut self, start: &str, entry: &str, end: &str) -> Self {
        self.import_block = Some((
            Regex::new(start).expect("valid block regex"),
            Regex::new(entry).expect("valid block regex"),
            Regex::new(end).expect("valid block regex"),
        ));
        self
    }

    /// First declaration on the line, checked in import, enum, class,
    /// function, variable order.
    fn classify(&self, line: &str) -> Option<NamedEntity> {
        let families = [
            (EntityType::Import, &self.imports),
            (EntityType::Enum, &self.enums),
            (EntityType::Class, &self.classes),
            (EntityType::Function, &self.functions),
            (EntityType::Variable, &self.variables),
        ];
        for (entity_type, regexes) in families {
            for re in regexes.iter() {
                let Some(name) = re.captures(line).and_then(|c| c.get(1)) else {
                    continue;
                };
                let name = clean_name(name.as_str());
                if name.is_empty() || (entity_type != EntityType::Import && is_keyword(name)) {
                    continue;
                }
                return Some(NamedEntity::new(name, entity_type));
            }
        }
        None
    }
}

fn clean_name(raw: &str) -> &str {
    raw.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim_end_matches(':')
}

lazy_static! {
    static ref KEYWORDS: HashSet<&'static str> = [
        "if", "else", "elif", "for", "foreach", "while", "do", "switch", "case", "return",
        "catch", "try", "finally", "throw", "sizeof", "typeof", "function", "class", "struct",
        "enum", "with", "loop", "fn", "def", "yield", "await", "async", "super", "this", "self",
        "import", "from", "export", "static", "public", "private", "protected", "const", "let",
        "var", "void", "int", "char", "float", "double", "bool", "auto", "unsafe", "in", "of",
        "not", "and", "or", "is", "lambda", "pass", "using", "namespace", "template", "typename", "defined",
    ]
    .into_iter()
    .collect();

    static ref RUST: Rules = Rules::new(
        &[
            r"^\s*(?:pub(?:\([^)]*\))?\s+)?use\s+((?:::)?[A-Za-z_][\w:]*)",
            r"^\s*(?:pub(?:\([^)]*\))?\s+)?mod\s+([A-Za-z_]\w*)\s*;",
            r"^\s*extern\s+crate\s+([A-Za-z_]\w*)",
        ],
        &[r"^\s*(?:pub(?:\([^)]*\))?\s+)?enum\s+([A-Za-z_]\w*)"],
        &[r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:unsafe\s+)?(?:struct|trait|union|type)\s+([A-Za-z_]\w*)"],
        &[r#"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:(?:const|async|unsafe|extern\s+"[^"]*")\s+)*fn\s+([A-Za-z_]\w*)"#],
        &[r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:const|static)\s+(?:mut\s+)?([A-Za-z_]\w*)\s*:"],
    );

    static ref PYTHON: Rules = Rules::new(
        &[
            r"^\s*import\s+([\w.]+)",
            r"^\s*from\s+(\.*[\w.]*)\s+import\b",
        ],
        &[r"^\s*class\s+([A-Za-z_]\w*)\s*\(\s*(?:[\w.]*\.)?(?:Int|Str)?(?:Enum|Flag)\s*\)"],
        &[r"^\s*class\s+([A-Za-z_]\w*)"],
        &[r"^\s*(?:async\s+)?def\s+([A-Za-z_]\w*)"],
        &[r"^([A-Za-z_]\w*)\s*(?::[^=]*)?=(?:[^=]|$)"],
    );

    static ref SCRIPT: Rules = Rules::new(
        &[
            r#"^\s*import\s+(?:type\s+)?(?:[\w*{}\s,$]+\s+from\s+)?['"]([^'"]+)['"]"#,
            r#"^\s*export\s+(?:\*|\{[^}]*\})\s+from\s+['"]([^'"]+)['"]"#,
            r#"\brequire\(\s*['"]([^'"]+)['"]\s*\)"#,
        ],
        &[r"^\s*(?:export\s+)?(?:declare\s+)?(?:const\s+)?enum\s+([A-Za-z_$][\w$]*)"],
        &[
            r"^\s*(?:export\s+)?(?:default\s+)?(?:declare\s+)?(?:abstract\s+)?(?:class|interface)\s+([A-Za-z_$][\w$]*)",
            r"^\s*(?:export\s+)?type\s+([A-Za-z_$][\w$]*)\s*(?:<[^>]*>)?\s*=",
        ],
        &[
            r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)",
            r"^\s*(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*(?:async\s+)?(?:function\b|\([^)]*\)\s*(?::[^=]+)?=>|[A-Za-z_$][\w$]*\s*=>)",
            r"^\s+(?:(?:public|private|protected|static|readonly|async|get|set)\s+)*([A-Za-z_$][\w$]*)\s*\([^)]*\)\s*(?::\s*[^{]+)?\{\s*$",
        ],
        &[r"^\s*(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)"],
    );

    static ref GO: Rules = Rules::new(
        &[r#"^\s*import\s+(?:[\w.]+\s+)?"([^"]+)""#],
        &[],
        &[r"^\s*type\s+([A-Za-z_]\w*)\s+(?:struct|interface)\b"],
        &[r"^\s*func\s+(?:\([^)]*\)\s*)?([A-Za-z_]\w*)"],
        &[r"^\s*(?:var|const)\s+([A-Za-z_]\w*)"],
    )
    .with_import_block(
        r"^\s*import\s*\(\s*$",
        r#"^\s*(?:[\w.]+\s+)?"([^"]+)""#,
        r"^\s*\)",
    );

    static ref C_FAMILY: Rules = Rules::new(
        &[
            r#"^\s*#\s*include\s*[<"]([^>"]+)[>"]"#,
            r"^\s*import\s+(?:static\s+)?([\w.]+(?:\.\*)?)",
            r"^\s*using\s+(?:static\s+)?([\w.]+)\s*;",
            r#"^\s*(?:require|include)(?:_once)?\s*\(?\s*['"]([^'"]+)['"]"#,
        ],
        &[r"^\s*(?:(?:public|private|protected|internal|static|export)\s+)*enum\s+(?:class\s+|struct\s+)?([A-Za-z_]\w*)"],
        &[r"^\s*(?:template\s*<[^>]*>\s*)?(?:(?:public|private|protected|internal|abstract|final|static|sealed|partial|open|data|inline|export)\s+)*(?:class|struct|interface|record|trait|object|protocol|union)\s+([A-Za-z_]\w*)"],
        &[
            r"^\s*(?:(?:public|private|protected|internal|static|abstract|final|override|suspend|inline|open|operator|infix|tailrec)\s+)*fun\s+(?:<[^>]*>\s*)?(?:[\w.]+\.)?([A-Za-z_]\w*)",
            r"^\s*(?:(?:public|private|protected|static|final|abstract)\s+)*function\s+&?([A-Za-z_]\w*)",
            r"^\s*(?:(?:public|private|internal|fileprivate|open|static|override|mutating|class)\s+)*func\s+([A-Za-z_]\w*)",
            r"^\s*(?:(?:override|private|protected|final|implicit)\s+)*def\s+([A-Za-z_]\w*)",
            r"^\s*(?:[A-Za-z_][\w:<>,\[\]]*[\s\*&]+)+\**&?([A-Za-z_]\w*(?:::[A-Za-z_~]\w*)*)\s*\([^;]*$",
        ],
        &[
            r"^\s*#\s*define\s+([A-Za-z_]\w*)",
            r"^\s*(?:(?:private|public|internal|protected)\s+)?(?:val|var|let)\s+([A-Za-z_]\w*)",
            r"^\s*(?:(?:public|private|protected|internal|static|final|const|readonly|constexpr)\s+)+(?:[\w<>,\[\]]+\s+)?([A-Za-z_]\w*)\s*(?:=|;)",
        ],
    );

    static ref GENERIC: Rules = Rules::new(
        &[
            r#"^\s*require(?:_relative)?\s*\(?\s*['"]([^'"]+)['"]"#,
            r#"^\s*source\s+['"]?([^\s'"]+)"#,
        ],
        &[r"^\s*enum\s+([A-Za-z_]\w*)"],
        &[r"^\s*(?:class|module|struct|interface|trait)\s+([A-Za-z_][\w:]*)"],
        &[
            r"^\s*(?:local\s+)?(?:function|def|fn|func|sub)\s+(?:self\.)?([A-Za-z_][\w.:]*)",
            r"^\s*([A-Za-z_][\w-]*)\s*\(\)\s*\{?\s*$",
        ],
        &[r"^\s*(?:local\s+|export\s+|readonly\s+)?([A-Z_][A-Z0-9_]*)\s*="],
    );
}

fn rules_for(language: Language) -> &'static Rules {
    match language {
        Language::Rust => &RUST,
        Language::Python => &PYTHON,
        Language::JavaScript | Language::TypeScript => &SCRIPT,
        Language::Go => &GO,
        Language::C
        | Language::Cpp
        | Language::Java
        | Language::Kotlin
        | Language::Scala
        | Language::CSharp
        | Language::Swift
        | Language::Php => &C_FAMILY,
        Language::Ruby | Language::Shell | Language::Lua | Language::Unknown => &GENERIC,
    }
}

pub(crate) fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(name)
}

/// Kind of declaration a single line holds, if any.
pub fn declaration_kind(line: &str, language: Language) -> Option<EntityType> {
    rules_for(language).classify(line).map(|e| e.entity_type)
}

/// Extracts entities in order of first appearance, without duplicates.
pub fn extract(content: &str, language: Language) -> Vec<NamedEntity> {
    let rules = rules_for(language);
    let mut seen = HashSet::new();
    let mut entities = Vec::new();
    let mut in_import_block = false;

    for line in content.lines() {
        let found = match &rules.import_block {
            Some((_, entry, end)) if in_import_block => {
                if end.is_match(line) {
                    in_import_block = false;
                    None
                } else {
                    entry
                        .captures(line)
                        .and_then(|c| c.get(1))
                        .map(|m| NamedEntity::new(clean_name(m.as_str()), EntityType::Import))
                }
            }
            Some((start, _, _)) if start.is_match(line) => {
                in_import_block = true;
                None
            }
            _ => rules.classify(line),
        };

        if let Some(entity) = found {
            if seen.insert(entity.clone()) {
                entities.push(entity);
            }
        }
    }

    entities
}

/// Line-oriented regex extractor. Always produces a result.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternExtractor;

impl PatternExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl EntityExtractor for PatternExtractor {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn extract_entities(&self, content: &str, path: &Path) -> Vec<NamedEntity> {
        extract(content, Language::from_path(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(entities: &[NamedEntity], kind: EntityType) -> Vec<&str> {
        entities
            .iter()
            .filter(|e| e.entity_type == kind)
            .map(|e| e.name.as_str())
            .collect()
    }

    #[test]
    fn test_rust_entities() {
        let code = r#"
use std::collections::HashMap;
mod config;

const MAX_DEPTH: usize = 3;

pub struct Scanner {
    depth: usize,
}

pub enum Mode {
    Fast,
}

impl Scanner {
    pub fn new() -> Self {
        Self { depth: 0 }
    }

    pub(crate) async fn run(&self) {}
}
"#;
        let entities = PatternExtractor.extract_entities(code, Path::new("src/scan.rs"));
        assert_eq!(names(&entities, EntityType::Class), vec!["Scanner"]);
        assert_eq!(names(&entities, EntityType::Enum), vec!["Mode"]);
        assert_eq!(names(&entities, EntityType::Function), vec!["new", "run"]);
        assert_eq!(names(&entities, EntityType::Variable), vec!["MAX_DEPTH"]);
        assert_eq!(
            names(&entities, EntityType::Import),
            vec!["std::collections::HashMap", "config"]
        );
    }

    #[test]
    fn test_python_entities() {
        let code = r#"
import os
from .models import User

TIMEOUT = 30

class Color(Enum):
    RED = 1

class Service:
    def start(self):
        if self.ready:
            pass

async def main():
    pass
"#;
        let entities = extract(code, Language::Python);
        assert_eq!(names(&entities, EntityType::Enum), vec!["Color"]);
        assert_eq!(names(&entities, EntityType::Class), vec!["Service"]);
        assert_eq!(names(&entities, EntityType::Function), vec!["start", "main"]);
        assert_eq!(names(&entities, EntityType::Variable), vec!["TIMEOUT"]);
        assert_eq!(names(&entities, EntityType::Import), vec!["os", ".models"]);
    }

    #[test]
    fn test_script_entities() {
        let code = r#"
import React from 'react';
export class Widget extends Base {
  render() {
    if (this.ready) {
      return null;
    }
  }
}
export function mount(el) {}
const handler = async (e) => {};
let count = 0;
export enum Kind { A, B }
"#;
        let entities = extract(code, Language::TypeScript);
        assert_eq!(names(&entities, EntityType::Class), vec!["Widget"]);
        assert_eq!(names(&entities, EntityType::Function), vec!["render", "mount", "handler"]);
        assert_eq!(names(&entities, EntityType::Variable), vec!["count"]);
        assert_eq!(names(&entities, EntityType::Enum), vec!["Kind"]);
        assert_eq!(names(&entities, EntityType::Import), vec!["react"]);
    }

    #[test]
    fn test_keywords_never_become_functions() {
        let code = r#"
#include <stdio.h>
#define LIMIT 10
struct Point { int x; };
int main(int argc, char **argv) {
    if (argc > 1) {
        while (1) {
        }
    }
    else if (argc == 0) {
    }
    return 0;
}
"#;
        let entities = extract(code, Language::C);
        assert_eq!(names(&entities, EntityType::Function), vec!["main"]);
        assert_eq!(names(&entities, EntityType::Class), vec!["Point"]);
        assert_eq!(names(&entities, EntityType::Import), vec!["stdio.h"]);
        assert_eq!(names(&entities, EntityType::Variable), vec!["LIMIT"]);
    }

    #[test]
    fn test_go_import_block() {
        let code = "package main\n\nimport (\n\t\"fmt\"\n\tlog \"github.com/x/log\"\n)\n\ntype Server struct {}\n\nfunc (s *Server) Serve() {}\n";
        let entities = extract(code, Language::Go);
        assert_eq!(
            names(&entities, EntityType::Import),
            vec!["fmt", "github.com/x/log"]
        );
        assert_eq!(names(&entities, EntityType::Class), vec!["Server"]);
        assert_eq!(names(&entities, EntityType::Function), vec!["Serve"]);
    }

    #[test]
    fn test_duplicates_and_empty_input() {
        let code = "def a():\n    pass\ndef a():\n    pass\n";
        assert_eq!(extract(code, Language::Python).len(), 1);
        assert!(extract("", Language::Rust).is_empty());
        assert!(extract("just some prose\n", Language::Unknown).is_empty());
    }

    #[test]
    fn test_declaration_kind() {
        assert_eq!(declaration_kind("fn go() {", Language::Rust), Some(EntityType::Function));
        assert_eq!(declaration_kind("let x = 1;", Language::Rust), None);
        assert_eq!(declaration_kind("import os", Language::Python), Some(EntityType::Import));
    }
}
