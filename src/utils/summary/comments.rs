//! Comment and docstring collection

use crate::utils::lang::{CommentSyntax, Language};

fn line_comment_body<'a>(trimmed: &'a str, syntax: &CommentSyntax) -> Option<&'a str> {
    syntax
        .line
        .iter()
        .find_map(|marker| trimmed.strip_prefix(marker))
        .map(|rest| rest.trim_start_matches(['/', '!', '#', '-']).trim())
}

/// Comment blocks of `content` in source order, at most `max` of them.
///
/// Consecutive line comments join into one block. Shebang lines are not
/// comments. Python triple-quoted strings count as documentation.
pub fn extract_comments(content: &str, language: Language, max: usize) -> Vec<String> {
    let syntax = language.comment_syntax();
    let mut comments = Vec::new();
    let mut group: Vec<String> = Vec::new();
    let mut lines = content.lines().enumerate();

    let flush = |group: &mut Vec<String>, comments: &mut Vec<String>| {
        let text = group.join("\n").trim().to_string();
        group.clear();
        if !text.is_empty() {
            comments.push(text);
        }
    };

    while let Some((idx, line)) = lines.next() {
        if comments.len() >= max {
            break;
        }
        let trimmed = line.trim();

        if idx == 0 && trimmed.starts_with("#!") {
            continue;
        }

        let block_open = syntax
            .block
            .and_then(|(open, close)| trimmed.strip_prefix(open).map(|rest| (rest, close)));
        if block_open.is_none() {
            if let Some(body) = line_comment_body(trimmed, &syntax) {
                group.push(body.to_string());
                continue;
            }
        }
        flush(&mut group, &mut comments);
        if comments.len() >= max {
            break;
        }

        if let Some((rest, close)) = block_open {
            let mut body = Vec::new();
            if let Some(end) = rest.find(close) {
                body.push(rest[..end].to_string());
            } else {
                body.push(rest.to_string());
                for (_, next) in lines.by_ref() {
                    match next.find(close) {
                        Some(end) => {
                            body.push(next[..end].to_string());
                            break;
                        }
                        None => body.push(next.to_string()),
                    }
                }
            }
            let text = body
                .iter()
                .map(|l| l.trim().trim_start_matches('*').trim())
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            if !text.is_empty() {
                comments.push(text);
            }
            continue;
        }

        if syntax.docstrings {
            let quote = ["\"\"\"", "'''"].into_iter().find(|q| trimmed.starts_with(*q));
            if let Some(quote) = quote {
                let rest = &trimmed[quote.len()..];
                let mut body = Vec::new();
                if let Some(end) = rest.find(quote) {
                    body.push(rest[..end].to_string());
                } else {
                    body.push(rest.to_string());
                    for (_, next) in lines.by_ref() {
                        match next.find(quote) {
                            Some(end) => {
                                body.push(next[..end].to_string());
                                break;
                            }
                            None => body.push(next.to_string()),
                        }
                    }
                }
                let text = body
                    .iter()
                    .map(|l| l.trim())
                    .filter(|l| !l.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n");
                if !text.is_empty() {
                    comments.push(text);
                }
            }
        }
    }
    if comments.len() < max {
        flush(&mut group, &mut comments);
    }
    comments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_comments_group() {
        let code = "// Cache layer\n// with eviction\nfn a() {}\n/// Reads a key\nfn get() {}\n";
        let comments = extract_comments(code, Language::Rust, 10);
        assert_eq!(comments, vec!["Cache layer\nwith eviction", "Reads a key"]);
    }

    #[test]
    fn test_block_comments() {
        let code = "/**\n * Entry point.\n * Parses args.\n */\nint main() {}\n/* inline */\n";
        let comments = extract_comments(code, Language::C, 10);
        assert_eq!(comments, vec!["Entry point.\nParses args.", "inline"]);
    }

    #[test]
    fn test_python_docstrings_and_shebang() {
        let code = "#!/usr/bin/env python\n\"\"\"Module docs.\"\"\"\n# note\nx = 1\ndef f():\n    '''\n    Does f.\n    '''\n";
        let comments = extract_comments(code, Language::Python, 10);
        assert_eq!(comments, vec!["Module docs.", "note", "Does f."]);
    }

    #[test]
    fn test_cap() {
        let code = "// a\nx\n// b\ny\n// c\n";
        assert_eq!(extract_comments(code, Language::Go, 2), vec!["a", "b"]);
        assert!(extract_comments(code, Language::Go, 0).is_empty());
    }
}
