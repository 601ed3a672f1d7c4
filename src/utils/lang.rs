//! Source language detection and per-language comment syntax

use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Go,
    C,
    Cpp,
    Java,
    Kotlin,
    Scala,
    CSharp,
    Swift,
    Ruby,
    Php,
    Shell,
    Lua,
    Unknown,
}

/// Comment markers of a language
#[derive(Debug, Clone, Copy)]
pub struct CommentSyntax {
    pub line: &'static [&'static str],
    pub block: Option<(&'static str, &'static str)>,
    /// Triple-quoted strings double as documentation blocks
    pub docstrings: bool,
}

const C_STYLE: CommentSyntax = CommentSyntax {
    line: &["//"],
    block: Some(("/*", "*/")),
    docstrings: false,
};

impl Language {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "rs" => Language::Rust,
            "py" | "pyw" | "pyi" => Language::Python,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "ts" | "tsx" | "mts" | "cts" => Language::TypeScript,
            "go" => Language::Go,
            "c" | "h" => Language::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" | "ino" => Language::Cpp,
            "java" => Language::Java,
            "kt" | "kts" => Language::Kotlin,
            "scala" | "sc" => Language::Scala,
            "cs" => Language::CSharp,
            "swift" => Language::Swift,
            "rb" | "rake" => Language::Ruby,
            "php" => Language::Php,
            "sh" | "bash" | "zsh" => Language::Shell,
            "lua" => Language::Lua,
            _ => Language::Unknown,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Self::from_extension(ext)
    }

    pub fn comment_syntax(&self) -> CommentSyntax {
        match self {
            Language::Python => CommentSyntax {
                line: &["#"],
                block: None,
                docstrings: true,
            },
            Language::Ruby => CommentSyntax {
                line: &["#"],
                block: Some(("=begin", "=end")),
                docstrings: false,
            },
            Language::Shell => CommentSyntax {
                line: &["#"],
                block: None,
                docstrings: false,
            },
            Language::Lua => CommentSyntax {
                line: &["--"],
                block: Some(("--[[", "]]")),
                docstrings: false,
            },
            Language::Php => CommentSyntax {
                line: &["//", "#"],
                block: Some(("/*", "*/")),
                docstrings: false,
            },
            Language::Unknown => CommentSyntax {
                line: &["//", "#"],
                block: Some(("/*", "*/")),
                docstrings: false,
            },
            _ => C_STYLE,
        }
    }

    /// Languages whose bodies open with `{`
    pub fn uses_braces(&self) -> bool {
        !matches!(
            self,
            Language::Python | Language::Ruby | Language::Shell | Language::Lua | Language::Unknown
        )
    }
}
