//! Import scanning and resolution into a [`DependencyGraph`]
//!
//! Imports are found by line-oriented regexes per language, so the scan
//! works on files no parser accepts. Each raw import becomes one or more
//! path specifiers which are resolved against an index of every file in
//! the repository. Anything that does not resolve is dropped.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use super::graph::DependencyGraph;
use crate::fs::relative_path_str;
use crate::utils::lang::Language;

/// Extensions tried after a specifier that names no existing file
const RESOLVE_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "d.ts", "js", "jsx", "mjs", "cjs", "py", "pyi", "rs", "go", "c", "h", "cc", "cpp",
    "hpp", "java", "kt", "scala", "cs", "swift", "rb", "php", "lua", "sh",
];

/// Files standing in for a directory-style import
const INDEX_FILES: &[&str] = &[
    "index.ts",
    "index.tsx",
    "index.js",
    "index.jsx",
    "__init__.py",
    "mod.rs",
    "lib.rs",
];

lazy_static! {
    static ref SCRIPT_IMPORT: Regex =
        Regex::new(r#"^\s*(?:import|export)\b[^'"]*?\bfrom\s*['"]([^'"]+)['"]"#).expect("valid import regex");
    static ref SCRIPT_BARE_IMPORT: Regex =
        Regex::new(r#"^\s*import\s*['"]([^'"]+)['"]"#).expect("valid import regex");
    static ref SCRIPT_REQUIRE: Regex =
        Regex::new(r#"\b(?:require|import)\s*\(\s*['"]([^'"]+)['"]\s*\)"#).expect("valid import regex");
    static ref SCRIPT_BLOCK_START: Regex =
        Regex::new(r"^\s*(?:import|export)\s+(?:type\s+)?\{[^}]*$").expect("valid import regex");
    static ref SCRIPT_BLOCK_END: Regex =
        Regex::new(r#"\}\s*from\s*['"]([^'"]+)['"]"#).expect("valid import regex");

    static ref PY_IMPORT: Regex = Regex::new(r"^\s*import\s+(.+)$").expect("valid import regex");
    static ref PY_FROM: Regex =
        Regex::new(r"^\s*from\s+(\S+)\s+import\s+(.*)$").expect("valid import regex");

    static ref RUST_USE: Regex =
        Regex::new(r"^\s*(?:pub(?:\([^)]*\))?\s+)?use\s+([\w:]+?)(?:::\{(.*)|\s*;|\s+as\s)").expect("valid import regex");
    static ref RUST_MOD: Regex =
        Regex::new(r"^\s*(?:pub(?:\([^)]*\))?\s+)?mod\s+(\w+)\s*;").expect("valid import regex");

    static ref GO_IMPORT: Regex =
        Regex::new(r#"^\s*import\s+(?:[\w.]+\s+)?"([^"]+)""#).expect("valid import regex");
    static ref GO_BLOCK_START: Regex = Regex::new(r"^\s*import\s*\(\s*$").expect("valid import regex");
    static ref GO_BLOCK_ENTRY: Regex =
        Regex::new(r#"^\s*(?:[\w.]+\s+)?"([^"]+)""#).expect("valid import regex");

    static ref C_INCLUDE: Regex =
        Regex::new(r#"^\s*#\s*(?:include|import)\s*["<]([^">]+)[">]"#).expect("valid import regex");
    static ref JVM_IMPORT: Regex =
        Regex::new(r"^\s*import\s+(?:static\s+)?([\w.]+)").expect("valid import regex");
    static ref CSHARP_USING: Regex =
        Regex::new(r"^\s*using\s+(?:static\s+)?([\w.]+)\s*;").expect("valid import regex");
    static ref SWIFT_IMPORT: Regex = Regex::new(r"^\s*import\s+(\w+)").expect("valid import regex");
    static ref PHP_REQUIRE: Regex =
        Regex::new(r#"\b(?:require|include)(?:_once)?\s*\(?\s*['"]([^'"]+)['"]"#).expect("valid import regex");
    static ref PHP_USE: Regex = Regex::new(r"^\s*use\s+([\w\\]+)").expect("valid import regex");
    static ref RUBY_REQUIRE: Regex =
        Regex::new(r#"^\s*(require|require_relative|load)\s*\(?\s*['"]([^'"]+)['"]"#).expect("valid import regex");
    static ref LUA_REQUIRE: Regex =
        Regex::new(r#"\brequire\s*\(?\s*['"]([^'"]+)['"]"#).expect("valid import regex");
    static ref SHELL_SOURCE: Regex =
        Regex::new(r#"^\s*(?:source|\.)\s+['"]?([^'"\s;]+)"#).expect("valid import regex");
}

/// Path specifier produced from one import
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportSpec {
    /// Relative to the importing file's directory only (`./x`, `../x`)
    Relative(String),
    /// Tried from the repository root, then the importer's directory, then
    /// by bare file name
    Path(String),
}

fn split_names(list: &str) -> impl Iterator<Item = String> + '_ {
    list.split(',').filter_map(|part| {
        let name = part
            .trim()
            .trim_matches(|c| c == '(' || c == ')' || c == '{' || c == '}' || c == ';')
            .split(" as ")
            .next()
            .unwrap_or("")
            .trim();
        (!name.is_empty() && name != "*" && name != "self").then(|| name.to_string())
    })
}

/// Raw import sources of `content`, in order, duplicates removed.
///
/// Python names imported from a module are reported as `module.name` after
/// the module itself. Rust brace groups likewise add `path::name` entries.
pub fn scan_imports(content: &str, language: Language) -> Vec<String> {
    let mut found = Vec::new();
    match language {
        Language::JavaScript | Language::TypeScript => scan_script(content, &mut found),
        Language::Python => scan_python(content, &mut found),
        Language::Rust => scan_rust(content, &mut found),
        Language::Go => scan_go(content, &mut found),
        _ => {
            for line in content.lines() {
                scan_simple_line(line, language, &mut found);
            }
        }
    }
    let mut seen = BTreeSet::new();
    found.retain(|s| seen.insert(s.clone()));
    found
}

fn scan_script(content: &str, found: &mut Vec<String>) {
    let mut in_block = false;
    for line in content.lines() {
        if in_block {
            if let Some(c) = SCRIPT_BLOCK_END.captures(line) {
                found.push(c[1].to_string());
                in_block = false;
            } else if line.contains(';') {
                in_block = false;
            }
            continue;
        }
        if let Some(c) = SCRIPT_IMPORT
            .captures(line)
            .or_else(|| SCRIPT_BARE_IMPORT.captures(line))
        {
            found.push(c[1].to_string());
            continue;
        }
        if SCRIPT_BLOCK_START.is_match(line) {
            in_block = true;
            continue;
        }
        for c in SCRIPT_REQUIRE.captures_iter(line) {
            found.push(c[1].to_string());
        }
    }
}

fn scan_python(content: &str, found: &mut Vec<String>) {
    // module of an open import, and whether it closes with `)`
    let mut open: Option<(String, bool)> = None;
    for line in content.lines() {
        let code = line.split('#').next().unwrap_or("").trim_end();
        if let Some((module, paren)) = &open {
            let (body, done) = if *paren {
                (code.split(')').next().unwrap_or(""), code.contains(')'))
            } else {
                (code.trim_end_matches('\\'), !code.ends_with('\\'))
            };
            for name in split_names(body) {
                found.push(join_python(module, &name));
            }
            if done {
                open = None;
            }
            continue;
        }
        if let Some(c) = PY_FROM.captures(code) {
            let module = c[1].to_string();
            let names = c[2].trim();
            found.push(module.clone());
            let (body, continuation) = match names.strip_prefix('(') {
                Some(rest) => match rest.find(')') {
                    Some(end) => (&rest[..end], None),
                    None => (rest, Some(true)),
                },
                None if names.ends_with('\\') => (names.trim_end_matches('\\'), Some(false)),
                None => (names, None),
            };
            for name in split_names(body) {
                found.push(join_python(&module, &name));
            }
            if let Some(paren) = continuation {
                open = Some((module, paren));
            }
            continue;
        }
        if let Some(c) = PY_IMPORT.captures(code) {
            found.extend(split_names(&c[1]));
        }
    }
}

fn join_python(module: &str, name: &str) -> String {
    if module.ends_with('.') {
        format!("{}{}", module, name)
    } else {
        format!("{}.{}", module, name)
    }
}

fn scan_rust(content: &str, found: &mut Vec<String>) {
    let mut open: Option<String> = None;
    for line in content.lines() {
        if let Some(prefix) = &open {
            let body = line.split('}').next().unwrap_or("");
            for name in split_names(body) {
                found.push(format!("{}::{}", prefix, name));
            }
            if line.contains('}') {
                open = None;
            }
            continue;
        }
        if let Some(c) = RUST_MOD.captures(line) {
            found.push(format!("mod {}", &c[1]));
            continue;
        }
        if let Some(c) = RUST_USE.captures(line) {
            let prefix = c[1].to_string();
            found.push(prefix.clone());
            if let Some(group) = c.get(2) {
                let group = group.as_str();
                let body = group.split('}').next().unwrap_or("");
                for name in split_names(body) {
                    found.push(format!("{}::{}", prefix, name));
                }
                if !group.contains('}') {
                    open = Some(prefix);
                }
            }
        }
    }
}

fn scan_go(content: &str, found: &mut Vec<String>) {
    let mut in_block = false;
    for line in content.lines() {
        if in_block {
            if line.trim_start().starts_with(')') {
                in_block = false;
            } else if let Some(c) = GO_BLOCK_ENTRY.captures(line) {
                found.push(c[1].to_string());
            }
            continue;
        }
        if GO_BLOCK_START.is_match(line) {
            in_block = true;
        } else if let Some(c) = GO_IMPORT.captures(line) {
            found.push(c[1].to_string());
        }
    }
}

fn scan_simple_line(line: &str, language: Language, found: &mut Vec<String>) {
    let capture = |re: &Regex, group: usize| re.captures(line).map(|c| c[group].to_string());
    let hit = match language {
        Language::C | Language::Cpp => capture(&C_INCLUDE, 1),
        Language::Java | Language::Kotlin | Language::Scala => capture(&JVM_IMPORT, 1),
        Language::CSharp => capture(&CSHARP_USING, 1),
        Language::Swift => capture(&SWIFT_IMPORT, 1),
        Language::Php => capture(&PHP_REQUIRE, 1).or_else(|| capture(&PHP_USE, 1)),
        Language::Ruby => RUBY_REQUIRE.captures(line).map(|c| {
            if &c[1] == "require_relative" && !c[2].starts_with('.') {
                format!("./{}", &c[2])
            } else {
                c[2].to_string()
            }
        }),
        Language::Lua => capture(&LUA_REQUIRE, 1),
        Language::Shell => capture(&SHELL_SOURCE, 1),
        _ => None,
    };
    found.extend(hit);
}

fn relative_or_path(spec: String) -> ImportSpec {
    if spec.starts_with("./") || spec.starts_with("../") {
        ImportSpec::Relative(spec)
    } else {
        ImportSpec::Path(spec.trim_start_matches('/').to_string())
    }
}

/// Directory of the crate source tree containing `importer`.
fn rust_source_root(importer: &str) -> String {
    let segments: Vec<&str> = importer.split('/').collect();
    match segments.iter().rposition(|s| *s == "src") {
        Some(idx) => segments[..=idx].join("/"),
        None => "src".to_string(),
    }
}

fn is_module_root(importer: &str) -> bool {
    let name = importer.rsplit('/').next().unwrap_or(importer);
    matches!(name, "mod.rs" | "lib.rs" | "main.rs")
}

fn importer_stem(importer: &str) -> &str {
    let name = importer.rsplit('/').next().unwrap_or(importer);
    name.strip_suffix(".rs").unwrap_or(name)
}

fn rust_specs(raw: &str, importer: &str) -> Vec<ImportSpec> {
    if let Some(name) = raw.strip_prefix("mod ") {
        let spec = if is_module_root(importer) {
            format!("./{}", name)
        } else {
            format!("./{}/{}", importer_stem(importer), name)
        };
        return vec![ImportSpec::Relative(spec)];
    }

    let mut parts: Vec<&str> = raw.split("::").filter(|p| !p.is_empty()).collect();
    let base = match parts.first().copied() {
        Some("crate") => {
            parts.remove(0);
            format!("/{}", rust_source_root(importer))
        }
        Some("super") => {
            parts.remove(0);
            if is_module_root(importer) { "..".to_string() } else { ".".to_string() }
        }
        Some("self") => {
            parts.remove(0);
            if is_module_root(importer) {
                ".".to_string()
            } else {
                format!("./{}", importer_stem(importer))
            }
        }
        // external crate
        _ => return Vec::new(),
    };
    while parts.first() == Some(&"super") {
        parts.remove(0);
    }

    // longest module path first; trailing segments may be items
    (1..=parts.len())
        .rev()
        .map(|n| {
            let path = format!("{}/{}", base, parts[..n].join("/"));
            match path.strip_prefix('/') {
                Some(root_relative) => ImportSpec::Path(root_relative.to_string()),
                None => ImportSpec::Relative(path),
            }
        })
        .collect()
}

fn python_specs(raw: &str) -> Vec<ImportSpec> {
    let dots = raw.chars().take_while(|c| *c == '.').count();
    let rest = raw[dots..].replace('.', "/");
    if dots == 0 {
        return vec![ImportSpec::Path(rest)];
    }
    let mut spec = if dots == 1 {
        ".".to_string()
    } else {
        vec![".."; dots - 1].join("/")
    };
    if !rest.is_empty() {
        spec = format!("{}/{}", spec, rest);
    }
    vec![ImportSpec::Relative(spec)]
}

/// Specifiers to try, in order, for one raw import of `importer`.
pub fn import_specs(raw: &str, language: Language, importer: &str) -> Vec<ImportSpec> {
    match language {
        Language::Rust => rust_specs(raw, importer),
        Language::Python => python_specs(raw),
        Language::Java | Language::Kotlin | Language::Scala | Language::CSharp => {
            let path = raw.trim_end_matches(".*").replace('.', "/");
            vec![ImportSpec::Path(path)]
        }
        Language::Php => vec![relative_or_path(raw.replace('\\', "/"))],
        Language::Lua => vec![relative_or_path(raw.replace('.', "/"))],
        _ => vec![relative_or_path(raw.to_string())],
    }
}

/// Collapses `.` and `..` segments. `None` when the path leaves the root.
fn normalize(path: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }
    Some(segments.join("/"))
}

fn parent_dir(path: &str) -> &str {
    path.rfind('/').map(|idx| &path[..idx]).unwrap_or("")
}

fn join(dir: &str, spec: &str) -> String {
    if dir.is_empty() {
        spec.to_string()
    } else {
        format!("{}/{}", dir, spec)
    }
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.split('/')
        .zip(b.split('/'))
        .take_while(|(x, y)| x == y)
        .count()
}

/// Every repository file, indexed by relative path, file name and stem
#[derive(Debug, Default)]
pub struct FileIndex {
    files: BTreeSet<String>,
    by_name: HashMap<String, Vec<String>>,
    by_stem: HashMap<String, Vec<String>>,
}

impl FileIndex {
    pub fn new<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut index = Self::default();
        for file in files {
            let file = file.into();
            let name = file.rsplit('/').next().unwrap_or(&file).to_string();
            let stem = name.split('.').next().unwrap_or(&name).to_string();
            index.by_name.entry(name).or_default().push(file.clone());
            if !stem.is_empty() {
                index.by_stem.entry(stem).or_default().push(file.clone());
            }
            index.files.insert(file);
        }
        index
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Literal path, then with each known extension, then index files.
    fn probe(&self, path: &str) -> Option<String> {
        let path = normalize(path)?;
        if path.is_empty() {
            return None;
        }
        if self.files.contains(&path) {
            return Some(path);
        }
        RESOLVE_EXTENSIONS
            .iter()
            .map(|ext| format!("{}.{}", path, ext))
            .chain(INDEX_FILES.iter().map(|index| format!("{}/{}", path, index)))
            .find(|candidate| self.files.contains(candidate))
    }

    /// File name or stem match. Candidates whose path ends with `spec` win,
    /// then those sharing the longest directory prefix with `importer`, then
    /// the lexicographically first.
    fn lookup_bare(&self, spec: &str, importer: &str) -> Option<String> {
        let spec = spec.trim_end_matches('/');
        let key = spec.rsplit('/').next().unwrap_or(spec);
        if key.is_empty() || key == "." || key == ".." {
            return None;
        }
        let candidates = self
            .by_name
            .get(key)
            .or_else(|| self.by_stem.get(key))?;
        let importer_dir = parent_dir(importer);
        candidates
            .iter()
            .filter(|c| c.as_str() != importer)
            .max_by(|a, b| {
                let suffix = |c: &str| {
                    let stem = c.rsplit_once('.').map(|(s, _)| s).unwrap_or(c);
                    stem.ends_with(spec) || c.ends_with(spec)
                };
                suffix(a)
                    .cmp(&suffix(b))
                    .then_with(|| {
                        common_prefix_len(parent_dir(a), importer_dir)
                            .cmp(&common_prefix_len(parent_dir(b), importer_dir))
                    })
                    .then_with(|| b.cmp(a))
            })
            .cloned()
    }

    /// Resolves `spec` as imported by `importer`.
    pub fn resolve(&self, spec: &ImportSpec, importer: &str) -> Option<String> {
        let dir = parent_dir(importer);
        match spec {
            ImportSpec::Relative(rel) => self.probe(&join(dir, rel)),
            ImportSpec::Path(path) => self
                .probe(path)
                .or_else(|| self.probe(&join(dir, path)))
                .or_else(|| self.lookup_bare(path, importer)),
        }
    }
}

/// Builds the import graph over `files` (absolute paths under `root`).
///
/// Every file becomes a node and is indexed for resolution; only files with
/// an extension in `source_extensions` are scanned for imports.
pub fn build_dependency_graph(root: &Path, files: &[PathBuf], source_extensions: &[String]) -> DependencyGraph {
    let relative: Vec<String> = files.iter().map(|f| relative_path_str(root, f)).collect();
    // the index must be complete before any resolution
    let index = FileIndex::new(relative.iter().cloned());
    let mut graph = DependencyGraph::new();

    for (path, rel) in files.iter().zip(&relative) {
        graph.add_node(rel.clone());
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        if !source_extensions.iter().any(|s| s.eq_ignore_ascii_case(&ext)) {
            continue;
        }
        let content = match std::fs::read(path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                tracing::debug!("Skipping imports of {}: {}", path.display(), e);
                continue;
            }
        };

        let language = Language::from_extension(&ext);
        for raw in scan_imports(&content, language) {
            let target = import_specs(&raw, language, rel)
                .iter()
                .find_map(|spec| index.resolve(spec, rel));
            if let Some(target) = target {
                graph.add_edge(rel.clone(), target);
            }
        }
    }

    tracing::debug!(
        "Dependency graph: {} files, {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    graph
}
