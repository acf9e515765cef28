//! Frame layout. A pure function of session state and terminal width.

use unicode_segmentation::UnicodeSegmentation;

use crate::core::text::ansi::{segments, Segment, SgrTracker};
use crate::core::text::slice::wrap_text_with_ansi;
use crate::core::text::utils::{fit_to_width, truncate_to_width};
use crate::core::text::width::{grapheme_width, visible_width};

use super::state::{SessionConfig, SessionState, Status};

pub const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
pub const SUCCESS_MARKER: &str = "✓";
pub const ERROR_MARKER: &str = "✗";
pub const IDLE_MARKER: &str = "·";
pub const INTERRUPT_MARKER: &str = "^C";
pub const ACCEPT_HINT: &str = "Tab or → to accept the suggestion";

const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Every non-ASCII glyph the renderer itself draws; probed before the session starts.
pub const RENDER_GLYPHS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏✓✗·╭╮╰╯│─→";

/// Rows to draw plus where the cursor belongs, relative to the first row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    pub lines: Vec<String>,
    pub cursor_row: usize,
    pub cursor_col: usize,
}

pub fn status_marker(status: Status) -> &'static str {
    match status {
        Status::Idle => IDLE_MARKER,
        Status::InFlight { frame } => SPINNER_FRAMES[frame % SPINNER_FRAMES.len()],
        Status::Success => SUCCESS_MARKER,
        Status::Error => ERROR_MARKER,
    }
}

/// Lays out `state` for a terminal `width` columns wide.
///
/// Input rows are hard-wrapped at the terminal width so row accounting never
/// depends on the terminal's own autowrap. Once the session has terminated only
/// the entered lines are drawn.
pub fn render(state: &SessionState, config: &SessionConfig, width: usize) -> Frame {
    let width = width.max(1);
    let mut lines = Vec::new();

    let prior = state.prior_lines();
    for (index, line) in prior.iter().enumerate() {
        let prefix = if index == 0 {
            state.prompt.as_str()
        } else {
            config.continuation.as_str()
        };
        lines.extend(hard_wrap(&format!("{prefix}{line}"), "", width).rows);
    }

    let prefix = if prior.is_empty() {
        state.prompt.as_str()
    } else {
        config.continuation.as_str()
    };
    let split = state.cursor_byte();
    let before = format!("{prefix}{}", &state.buffer[..split]);
    let mut after = state.buffer[split..].to_string();
    if let Some(ghost) = state.visible_suggestion() {
        after.push_str(DIM);
        after.push_str(ghost);
        after.push_str(RESET);
    }
    if state.interrupted {
        after.push_str(INTERRUPT_MARKER);
    }

    let input = hard_wrap(&before, &after, width);
    let cursor_row = lines.len() + input.cursor_row;
    let cursor_col = input.cursor_col;
    lines.extend(input.rows);

    if !state.terminated {
        lines.extend(render_box(state, width));
    }

    Frame {
        lines,
        cursor_row,
        cursor_col,
    }
}

fn box_body(state: &SessionState) -> Vec<String> {
    let mut body = Vec::new();
    if let Some(error) = state.current_error() {
        body.push(format!("{RED}{error}{RESET}"));
    } else if let Some(help) = &state.help {
        body.push(help.clone());
    } else if !state.completions.is_empty() {
        body.push(state.completions.join("  "));
    } else if let Some(explanation) = &state.active_explanation {
        body.push(explanation.clone());
    }
    if state.idle_hint {
        body.push(format!("{DIM}{ACCEPT_HINT}{RESET}"));
    }
    body
}

fn render_box(state: &SessionState, width: usize) -> Vec<String> {
    let body = box_body(state);
    if body.is_empty() && state.status == Status::Idle && state.snapshot.is_none() {
        return Vec::new();
    }
    // Narrower than "╭─ x ╮" cannot hold a border.
    if width < 6 {
        return Vec::new();
    }
    let inner = width - 4;

    let marker = status_marker(state.status);
    let mut lines = Vec::with_capacity(body.len() + 3);
    let top = format!("╭─ {marker} ");
    let top_fill = width.saturating_sub(visible_width(&top) + 1);
    lines.push(format!("{top}{}╮", "─".repeat(top_fill)));

    for text in &body {
        for line in wrap_text_with_ansi(text, inner) {
            lines.push(format!("│ {} │", fit_to_width(&line, inner)));
        }
    }

    match &state.snapshot {
        Some(snapshot) => {
            let footer = truncate_to_width(
                &format!(" {}: {} ", snapshot.source, snapshot.summary),
                width - 4,
            );
            let fill = width.saturating_sub(visible_width(&footer) + 3);
            lines.push(format!("╰─{DIM}{footer}{RESET}{}╯", "─".repeat(fill)));
        }
        None => lines.push(format!("╰{}╯", "─".repeat(width - 2))),
    }
    lines
}

struct Wrapped {
    rows: Vec<String>,
    cursor_row: usize,
    cursor_col: usize,
}

/// Breaks `before` + `after` into rows of at most `width` columns, recording
/// where `before` ends.
fn hard_wrap(before: &str, after: &str, width: usize) -> Wrapped {
    let mut rows = Vec::new();
    let mut current = String::new();
    let mut col = 0;
    let mut tracker = SgrTracker::default();
    let mut cursor = (0, 0);

    for (part, text) in [before, after].into_iter().enumerate() {
        for segment in segments(text) {
            match segment {
                Segment::Escape(code) => {
                    tracker.process(&code);
                    current.push_str(code.code);
                }
                Segment::Text(run) => {
                    for grapheme in run.graphemes(true) {
                        let glyph_width = grapheme_width(grapheme);
                        if col + glyph_width > width && col > 0 {
                            current.push_str(tracker.line_end_reset());
                            rows.push(std::mem::take(&mut current));
                            current.push_str(&tracker.active_codes());
                            col = 0;
                        }
                        current.push_str(grapheme);
                        col += glyph_width;
                    }
                }
            }
        }
        if part == 0 {
            cursor = (rows.len(), col);
        }
    }
    rows.push(current);

    // A cursor sitting just past a full row lives at the start of the next one.
    if cursor.1 >= width {
        cursor = (cursor.0 + 1, 0);
        if rows.len() <= cursor.0 {
            rows.push(String::new());
        }
    }

    Wrapped {
        rows,
        cursor_row: cursor.0,
        cursor_col: cursor.1,
    }
}
