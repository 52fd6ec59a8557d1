//! Bounded, word-boundary-aware document summaries.
//!
//! Indexing is by `char`, so a preview never splits a multi-byte character.
//! Grapheme clusters are not considered.

/// Default maximum preview length in characters.
pub const PREVIEW_LIMIT: usize = 150;
/// Default minimum character position a word break must exceed to be used.
pub const PREVIEW_MIN_BREAK: usize = 100;
/// Marker appended to every truncated preview.
pub const ELLIPSIS: &str = "...";

/// Derives a preview with the default limits.
pub fn preview(content: &str) -> String {
    preview_with(content, PREVIEW_LIMIT, PREVIEW_MIN_BREAK)
}

/// Derives a preview of at most `limit` characters plus an ellipsis.
///
/// Truncates at the last space inside the first `limit` characters when that
/// space sits after `min_break`; otherwise keeps the full `limit` slice.
pub fn preview_with(content: &str, limit: usize, min_break: usize) -> String {
    let Some((cut_byte, _)) = content.char_indices().nth(limit) else {
        return content.to_string();
    };

    let head = &content[..cut_byte];
    let break_at = head
        .char_indices()
        .enumerate()
        .filter(|(_, (_, ch))| *ch == ' ')
        .last()
        .filter(|(char_pos, _)| *char_pos > min_break)
        .map(|(_, (byte_pos, _))| byte_pos);

    let mut out = match break_at {
        Some(byte_pos) => head[..byte_pos].to_string(),
        None => head.to_string(),
    };
    out.push_str(ELLIPSIS);
    out
}

#[cfg(test)]
mod tests {
    use super::{preview, preview_with, ELLIPSIS};

    #[test]
    fn short_content_is_returned_unchanged() {
        let text = "x".repeat(150);
        assert_eq!(preview(&text), text);
    }

    #[test]
    fn truncates_at_late_space() {
        let mut text = "a".repeat(120);
        text.push(' ');
        text.push_str(&"b".repeat(79));
        assert_eq!(text.chars().count(), 200);

        let out = preview(&text);
        assert_eq!(out, format!("{}{ELLIPSIS}", "a".repeat(120)));
    }

    #[test]
    fn keeps_full_limit_when_space_is_too_early() {
        let mut text = "a".repeat(50);
        text.push(' ');
        text.push_str(&"b".repeat(149));

        let out = preview(&text);
        assert_eq!(out.chars().count(), 150 + ELLIPSIS.len());
        assert!(out.starts_with(&"a".repeat(50)));
    }

    #[test]
    fn space_exactly_at_min_break_is_not_used() {
        let mut text = "a".repeat(100);
        text.push(' ');
        text.push_str(&"c".repeat(80));
        let out = preview_with(&text, 150, 100);
        assert_eq!(out.chars().count(), 153);
    }

    #[test]
    fn multibyte_text_is_cut_on_char_boundaries() {
        let text = "文".repeat(200);
        let out = preview(&text);
        assert_eq!(out, format!("{}{ELLIPSIS}", "文".repeat(150)));
    }
}
