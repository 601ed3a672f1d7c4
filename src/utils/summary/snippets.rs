//! Evenly spaced excerpts of a file

/// Fewest lines a snippet may have before the whole section is dropped
pub const MIN_SNIPPET_LINES: usize = 3;

/// `count` excerpts centered in equal segments of the file, each headed by
/// its 1-based line range. `None` when the file is too short to give every
/// excerpt at least [`MIN_SNIPPET_LINES`] lines.
pub fn extract_snippets(content: &str, count: usize, snippet_lines: usize) -> Option<Vec<String>> {
    if count == 0 {
        return None;
    }
    let lines: Vec<&str> = content.lines().collect();
    let total = lines.len();
    let per_snippet = snippet_lines.min(total / count);
    if per_snippet < MIN_SNIPPET_LINES {
        return None;
    }

    let segment = total / count;
    let snippets = (0..count)
        .map(|i| {
            let center = i * segment + segment / 2;
            let start = center.saturating_sub(per_snippet / 2).min(total - per_snippet);
            let end = start + per_snippet;
            format!(
                "--- lines {}-{} ---\n{}",
                start + 1,
                end,
                lines[start..end].join("\n")
            )
        })
        .collect();
    Some(snippets)
}
