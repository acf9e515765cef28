//! Multiline command accumulation and completeness detection.

use crate::core::quiet::catch_quietly;

use super::grammar::{self, GrammarVerdict};
use super::scan::{ends_with_function_header, scan};

/// Upper bound on accumulated text; past it the command is forced complete.
pub const MAX_ACCUMULATED_BYTES: usize = 1024 * 1024;

/// Why the accumulated text still needs more lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pending {
    Backslash,
    Quote,
    Heredoc,
    CommandSubstitution,
    Backtick,
    Parenthesis,
    /// `${` without its closing brace.
    Parameter,
    /// A function header still waiting for its body.
    FunctionBody,
    Grammar,
    Brace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStatus {
    Complete,
    Incomplete(Pending),
}

impl LineStatus {
    pub fn is_complete(self) -> bool {
        self == Self::Complete
    }
}

/// Lines of a command being assembled across continuation prompts.
///
/// The accumulator only grows until [`complete`](Self::complete) or
/// [`reset`](Self::reset) empties it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultilineAccumulator {
    lines: Vec<String>,
    bytes: usize,
    continuing: bool,
}

impl MultilineAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `line` and judges whether the whole text is a complete command.
    ///
    /// Never fails: oversize input and internal faults both report
    /// [`LineStatus::Complete`] so the session always makes progress.
    pub fn add_line(&mut self, line: &str) -> LineStatus {
        if !self.lines.is_empty() {
            self.bytes += 1;
        }
        self.bytes += line.len();
        self.lines.push(line.to_string());

        if self.bytes > MAX_ACCUMULATED_BYTES {
            tracing::warn!(
                bytes = self.bytes,
                "multiline input exceeded the size cap; forcing completion"
            );
            self.continuing = false;
            return LineStatus::Complete;
        }

        let text = self.lines.join("\n");
        let status = match catch_quietly(|| analyze(line, &text)) {
            Ok(status) => status,
            Err(_) => {
                tracing::warn!("completeness analysis panicked; treating input as complete");
                LineStatus::Complete
            }
        };
        tracing::debug!(lines = self.lines.len(), ?status, "multiline line added");

        self.continuing = !status.is_complete();
        status
    }

    /// Returns the newline-joined command and empties the accumulator.
    pub fn complete(&mut self) -> String {
        let text = self.lines.join("\n");
        self.reset();
        text
    }

    pub fn reset(&mut self) {
        self.lines.clear();
        self.bytes = 0;
        self.continuing = false;
    }

    /// Raw lines entered so far, for display next to their prompts.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// True while a continuation prompt should be shown.
    pub fn is_continuing(&self) -> bool {
        self.continuing
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Checks run in priority order; the first one that finds an open construct wins.
fn analyze(line: &str, text: &str) -> LineStatus {
    if ends_with_line_continuation(line) {
        return LineStatus::Incomplete(Pending::Backslash);
    }

    let open = scan(text);
    if open.open_quote.is_some() {
        return LineStatus::Incomplete(Pending::Quote);
    }
    if !open.open_heredocs.is_empty() {
        return LineStatus::Incomplete(Pending::Heredoc);
    }
    if open.open_substitutions > 0 {
        return LineStatus::Incomplete(Pending::CommandSubstitution);
    }
    if open.open_backtick {
        return LineStatus::Incomplete(Pending::Backtick);
    }
    if open.open_parens > 0 {
        return LineStatus::Incomplete(Pending::Parenthesis);
    }
    if open.open_parameters > 0 {
        return LineStatus::Incomplete(Pending::Parameter);
    }
    if ends_with_function_header(text) {
        return LineStatus::Incomplete(Pending::FunctionBody);
    }

    match grammar::check(text) {
        GrammarVerdict::Complete => return LineStatus::Complete,
        GrammarVerdict::Incomplete => return LineStatus::Incomplete(Pending::Grammar),
        GrammarVerdict::Undecided => {}
    }

    if open.open_braces > 0 || text.trim_end().ends_with('{') {
        return LineStatus::Incomplete(Pending::Brace);
    }
    LineStatus::Complete
}

/// A trailing backslash that is not itself escaped.
fn ends_with_line_continuation(line: &str) -> bool {
    let trimmed = line.trim_end_matches([' ', '\t']);
    let backslashes = trimmed.chars().rev().take_while(|&ch| ch == '\\').count();
    backslashes % 2 == 1
}
