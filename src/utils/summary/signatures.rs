//! Function and type signatures with bodies elided

use lazy_static::lazy_static;
use regex::Regex;

use crate::utils::lang::Language;

/// Lines a signature may span before its body delimiter
const MAX_SIGNATURE_LINES: usize = 6;

lazy_static! {
    static ref RUST_SIG: Regex = Regex::new(
        r#"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:(?:const|async|unsafe|extern\s+"[^"]*")\s+)*(?:fn|struct|enum|trait|impl|union|mod)\b"#
    )
    .expect("valid signature regex");
    static ref PYTHON_SIG: Regex =
        Regex::new(r"^\s*(?:async\s+)?(?:def|class)\s+[A-Za-z_]").expect("valid signature regex");
    static ref SCRIPT_SIG: Regex = Regex::new(
        r"^\s*(?:export\s+)?(?:default\s+)?(?:declare\s+)?(?:abstract\s+)?(?:async\s+)?(?:function\b|class\s|interface\s|enum\s)"
    )
    .expect("valid signature regex");
    static ref GO_SIG: Regex = Regex::new(r"^\s*(?:func|type)\s").expect("valid signature regex");
    static ref C_TYPE_SIG: Regex = Regex::new(
        r"^\s*(?:template\s*<[^>]*>\s*)?(?:(?:public|private|protected|internal|abstract|final|static|sealed|partial|open|data|export)\s+)*(?:class|struct|interface|enum|namespace|record|trait|object)\s+[A-Za-z_]"
    )
    .expect("valid signature regex");
    static ref C_FUNC_SIG: Regex = Regex::new(
        r"^\s*(?:[A-Za-z_][\w:<>,\[\]]*[\s\*&]+)+\**&?([A-Za-z_]\w*(?:::[A-Za-z_~]\w*)*)\s*\([^;]*$"
    )
    .expect("valid signature regex");
    static ref KEYWORD_FUNC_SIG: Regex = Regex::new(
        r"^\s*(?:(?:public|private|protected|internal|static|abstract|final|override|suspend|open|mutating)\s+)*(?:fun|func|function|def)\s+[A-Za-z_]"
    )
    .expect("valid signature regex");
    static ref GENERIC_SIG: Regex = Regex::new(
        r"^\s*(?:local\s+)?(?:def|class|module|function|fn|func|sub)\s+[A-Za-z_]"
    )
    .expect("valid signature regex");
}

fn starts_signature(line: &str, language: Language) -> bool {
    match language {
        Language::Rust => RUST_SIG.is_match(line),
        Language::Python => PYTHON_SIG.is_match(line),
        Language::JavaScript | Language::TypeScript => SCRIPT_SIG.is_match(line),
        Language::Go => GO_SIG.is_match(line),
        Language::C
        | Language::Cpp
        | Language::Java
        | Language::Kotlin
        | Language::Scala
        | Language::CSharp
        | Language::Swift
        | Language::Php => {
            if C_TYPE_SIG.is_match(line) || KEYWORD_FUNC_SIG.is_match(line) {
                return true;
            }
            C_FUNC_SIG
                .captures(line)
                .and_then(|c| c.get(1))
                .is_some_and(|name| !crate::ner::pattern::is_keyword(name.as_str()))
        }
        Language::Ruby | Language::Shell | Language::Lua | Language::Unknown => GENERIC_SIG.is_match(line),
    }
}

/// Scans one line of a Python header. `depth` carries bracket nesting
/// across continuation lines.
///
/// Returns the offset of the `:` that closes the header, if this line has
/// it, and the end of the line's code before any `#` comment.
fn python_header_end(line: &str, depth: &mut usize) -> (Option<usize>, usize) {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (idx, ch) in line.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            '#' => return (None, idx),
            '(' | '[' | '{' => *depth += 1,
            ')' | ']' | '}' => *depth = depth.saturating_sub(1),
            ':' if *depth == 0 => return (Some(idx), idx),
            _ => {}
        }
    }
    (None, line.len())
}

/// Signature text up to the body delimiter, followed by an elided body.
/// Returns the signature and the number of lines it spanned.
fn capture_signature(lines: &[&str], start: usize, language: Language) -> Option<(String, usize)> {
    let mut parts: Vec<&str> = Vec::new();
    let mut depth = 0;
    for (offset, line) in lines[start..].iter().take(MAX_SIGNATURE_LINES).enumerate() {
        let spanned = offset + 1;
        if language == Language::Python {
            let (close, code_end) = python_header_end(line, &mut depth);
            if let Some(idx) = close {
                parts.push(line[..idx].trim());
                return Some((format!("{}: ...", parts.join(" ")), spanned));
            }
            let code = line[..code_end].trim();
            if !code.is_empty() {
                parts.push(code);
            }
            continue;
        }
        if language.uses_braces() {
            if let Some(idx) = line.find('{') {
                let head = line[..idx].trim();
                if !head.is_empty() {
                    parts.push(head);
                }
                return Some((format!("{} {{ ... }}", parts.join(" ")), spanned));
            }
            if let Some(idx) = line.find(';') {
                parts.push(line[..=idx].trim());
                return Some((parts.join(" "), spanned));
            }
            parts.push(line.trim());
            continue;
        }
        // keyword-delimited languages: the header line is the signature
        return Some((line.trim().to_string(), spanned));
    }
    None
}

/// Declaration signatures of `content` in source order.
pub fn extract_signatures(content: &str, language: Language) -> Vec<String> {
    let lines: Vec<&str> = content.lines().collect();
    let mut signatures = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if starts_signature(lines[i], language) {
            if let Some((signature, spanned)) = capture_signature(&lines, i, language) {
                signatures.push(signature);
                i += spanned;
                continue;
            }
        }
        i += 1;
    }
    signatures
}
