//! Plain-text rendering of search results

use std::fmt::Write as _;

/// Characters of each page text shown by `search`
const PREVIEW_CHARS: usize = 400;

/// Numbered page previews, one block per text
pub fn snippets(texts: &[String]) -> String {
    let mut out = String::new();
    for (i, text) in texts.iter().enumerate() {
        let _ = writeln!(out, "[{}] {}\n", i + 1, preview(text));
    }
    out
}

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let mut cut: String = flat.chars().take(PREVIEW_CHARS).collect();
    cut.push('…');
    cut
}
