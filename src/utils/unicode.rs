//! UTF-8 helpers for cursor handling and terminal widths.

use unicode_width::UnicodeWidthChar;

/// Byte offset of the `n`th character; `s.len()` past the end.
pub fn char_to_byte_index(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map_or(s.len(), |(i, _)| i)
}

/// Cut `s` to at most `max` terminal columns, marking the cut with `…`.
pub fn truncate_to_width(s: &str, max: usize) -> String {
    let total: usize = s.chars().filter_map(UnicodeWidthChar::width).sum();
    if total <= max {
        return s.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push('…');
    out
}
