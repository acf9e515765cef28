//! ANSI-aware greedy word wrapping.

use unicode_segmentation::UnicodeSegmentation;

use super::ansi::{segments, Segment, SgrTracker};
use super::width::{grapheme_width, visible_width};

fn is_break_char(ch: char) -> bool {
    ch == ' ' || ch == '\t'
}

/// Wraps `text` to `width` columns and joins the lines with `\n`.
///
/// A zero width returns the input unchanged.
pub fn word_wrap(text: &str, width: usize) -> String {
    if width == 0 {
        return text.to_string();
    }
    wrap_text_with_ansi(text, width).join("\n")
}

/// Wraps `text` into lines no wider than `width` columns.
///
/// Spaces and tabs are break opportunities and are dropped at wrap points, so
/// no line starts with the whitespace that caused the break. Words wider than
/// `width` are hard-broken by grapheme. Existing newlines are kept as forced
/// breaks, escape sequences are zero-width and never split, and an active SGR
/// style is reopened at the start of each continuation line.
pub fn wrap_text_with_ansi(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }
    if text.is_empty() {
        return vec![String::new()];
    }

    let mut result = Vec::new();
    let mut tracker = SgrTracker::default();

    for input_line in text.split('\n') {
        let line = if result.is_empty() {
            input_line.to_string()
        } else {
            format!("{}{}", tracker.active_codes(), input_line)
        };
        result.extend(wrap_single_line(&line, width));
        tracker.observe_text(input_line);
    }

    result
}

fn wrap_single_line(line: &str, width: usize) -> Vec<String> {
    if line.is_empty() {
        return vec![String::new()];
    }
    if visible_width(line) <= width {
        return vec![line.to_string()];
    }

    let mut tracker = SgrTracker::default();
    let mut wrapped = Vec::new();
    let mut current_line = String::new();
    let mut current_width = 0;

    for token in split_into_tokens(line) {
        let token_width = visible_width(&token.text);

        if token.whitespace {
            if current_width + token_width > width {
                if current_width > 0 {
                    current_line.push_str(&token.escapes());
                    finish_line(&mut wrapped, &current_line, &tracker);
                }
                tracker.observe_text(&token.text);
                current_line = tracker.active_codes();
                current_width = 0;
            } else {
                current_line.push_str(&token.text);
                current_width += token_width;
                tracker.observe_text(&token.text);
            }
            continue;
        }

        if token_width > width {
            if current_width > 0 {
                finish_line(&mut wrapped, &current_line, &tracker);
                current_line.clear();
            }
            let prefix = if current_width > 0 {
                tracker.active_codes()
            } else {
                std::mem::take(&mut current_line)
            };
            let mut pieces = break_long_word(&token.text, width, prefix, &mut tracker);
            if let Some(last) = pieces.pop() {
                wrapped.extend(pieces);
                current_width = visible_width(&last);
                current_line = last;
            }
            continue;
        }

        if current_width + token_width > width && current_width > 0 {
            finish_line(&mut wrapped, &current_line, &tracker);
            current_line = tracker.active_codes();
            current_width = 0;
        }
        current_line.push_str(&token.text);
        current_width += token_width;
        tracker.observe_text(&token.text);
    }

    if !current_line.is_empty() || wrapped.is_empty() {
        wrapped.push(current_line);
    }
    wrapped
}

fn finish_line(wrapped: &mut Vec<String>, line: &str, tracker: &SgrTracker) {
    let mut finished = trim_trailing_breaks(line);
    finished.push_str(tracker.line_end_reset());
    wrapped.push(finished);
}

/// Drops trailing spaces/tabs while keeping any escapes that follow them.
fn trim_trailing_breaks(line: &str) -> String {
    let mut text_end = 0;
    let mut offset = 0;
    for segment in segments(line) {
        match segment {
            Segment::Escape(code) => offset += code.len(),
            Segment::Text(text) => {
                let trimmed = text.trim_end_matches(is_break_char);
                if !trimmed.is_empty() {
                    text_end = offset + trimmed.len();
                }
                offset += text.len();
            }
        }
    }

    let mut out = String::with_capacity(line.len());
    out.push_str(&line[..text_end]);
    for segment in segments(&line[text_end..]) {
        if let Segment::Escape(code) = segment {
            out.push_str(code.code);
        }
    }
    out
}

struct Token {
    text: String,
    whitespace: bool,
}

impl Token {
    fn escapes(&self) -> String {
        segments(&self.text)
            .filter_map(|segment| match segment {
                Segment::Escape(code) => Some(code.code),
                Segment::Text(_) => None,
            })
            .collect()
    }
}

/// Splits a line into alternating word and whitespace runs. Escapes attach to
/// the run of the character that follows them.
fn split_into_tokens(line: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut pending_escapes = String::new();
    let mut in_whitespace = false;

    for segment in segments(line) {
        let text = match segment {
            Segment::Escape(code) => {
                pending_escapes.push_str(code.code);
                continue;
            }
            Segment::Text(text) => text,
        };

        for ch in text.chars() {
            let is_space = is_break_char(ch);
            if is_space != in_whitespace && !current.is_empty() {
                tokens.push(Token {
                    text: std::mem::take(&mut current),
                    whitespace: in_whitespace,
                });
            }
            current.push_str(&pending_escapes);
            pending_escapes.clear();
            in_whitespace = is_space;
            current.push(ch);
        }
    }

    current.push_str(&pending_escapes);
    if !current.is_empty() {
        tokens.push(Token {
            text: current,
            whitespace: in_whitespace,
        });
    }
    tokens
}

/// Hard-breaks one word into `width`-column pieces.
fn break_long_word(
    word: &str,
    width: usize,
    prefix: String,
    tracker: &mut SgrTracker,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = prefix;
    let mut current_width = 0;

    for segment in segments(word) {
        match segment {
            Segment::Escape(code) => {
                current_line.push_str(code.code);
                tracker.process(&code);
            }
            Segment::Text(text) => {
                for grapheme in text.graphemes(true) {
                    let grapheme_cols = grapheme_width(grapheme);
                    if current_width > 0 && current_width + grapheme_cols > width {
                        current_line.push_str(tracker.line_end_reset());
                        lines.push(std::mem::replace(&mut current_line, tracker.active_codes()));
                        current_width = 0;
                    }
                    current_line.push_str(grapheme);
                    current_width += grapheme_cols;
                }
            }
        }
    }

    lines.push(current_line);
    lines
}
