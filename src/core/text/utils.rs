//! Truncation and padding for fixed-width layout.

use unicode_segmentation::UnicodeSegmentation;

use super::ansi::{segments, Segment};
use super::width::{grapheme_width, visible_width};

/// Longest prefix of `text` whose visible width fits in `max_width`.
///
/// Escape sequences are zero-width and always copied, including those after
/// the cut, so styles opened in the kept prefix are still closed. A string
/// that already fits is returned unchanged.
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    if visible_width(text) <= max_width {
        return text.to_string();
    }

    let mut truncated = String::with_capacity(text.len());
    let mut current_width = 0;
    let mut cut = false;
    for segment in segments(text) {
        match segment {
            Segment::Escape(code) => truncated.push_str(code.code),
            Segment::Text(_) if cut => {}
            Segment::Text(run) => {
                for grapheme in run.graphemes(true) {
                    let width = grapheme_width(grapheme);
                    if current_width + width > max_width {
                        cut = true;
                        break;
                    }
                    truncated.push_str(grapheme);
                    current_width += width;
                }
            }
        }
    }
    truncated
}

/// Right-pads `line` with spaces to exactly `width` columns when it is narrower.
pub fn pad_to_width(line: &str, width: usize) -> String {
    let padding = width.saturating_sub(visible_width(line));
    let mut padded = String::with_capacity(line.len() + padding);
    padded.push_str(line);
    padded.extend(std::iter::repeat(' ').take(padding));
    padded
}

/// Truncates then pads, yielding a string exactly `width` columns wide unless a
/// wide glyph straddles the edge.
pub fn fit_to_width(line: &str, width: usize) -> String {
    pad_to_width(&truncate_to_width(line, width), width)
}

#[cfg(test)]
mod tests {
    use super::{fit_to_width, pad_to_width, truncate_to_width};
    use crate::core::text::width::visible_width;

    #[test]
    fn truncate_returns_original_when_shorter() {
        assert_eq!(truncate_to_width("hello", 6), "hello");
        assert_eq!(truncate_to_width("\x1b[31mhello\x1b[0m", 5), "\x1b[31mhello\x1b[0m");
    }

    #[test]
    fn truncate_keeps_escapes_after_the_cut() {
        let truncated = truncate_to_width("\x1b[31mhello\x1b[0m world", 4);
        assert_eq!(truncated, "\x1b[31mhell\x1b[0m");
        assert_eq!(visible_width(&truncated), 4);
    }

    #[test]
    fn truncate_never_splits_wide_glyphs() {
        assert_eq!(truncate_to_width("a漢b", 2), "a");
        assert_eq!(truncate_to_width("漢字", 0), "");
    }

    #[test]
    fn truncate_is_idempotent() {
        let once = truncate_to_width("\x1b[2mgit status --short\x1b[0m", 10);
        assert_eq!(truncate_to_width(&once, 10), once);
    }

    #[test]
    fn pad_and_fit_reach_exact_width() {
        assert_eq!(pad_to_width("hi", 4), "hi  ");
        assert_eq!(pad_to_width("toolong", 4), "toolong");
        assert_eq!(fit_to_width("toolong", 4), "tool");
        assert_eq!(visible_width(&fit_to_width("\x1b[1mx\x1b[0m", 3)), 3);
    }
}
