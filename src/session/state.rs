//! Session state and terminal outcomes.

use suggest_provider::StatusSnapshot;

use crate::config::PromptConfig;
use crate::shell::MultilineAccumulator;

use super::event::Generation;

const MAX_HISTORY: usize = 100;

/// Reducer policy that does not change during a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Buffers whose first non-blank character is this are agent/control
    /// syntax and are never sent to the predictor.
    pub agent_sentinel: char,
    pub continuation: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&PromptConfig::default())
    }
}

impl From<&PromptConfig> for SessionConfig {
    fn from(config: &PromptConfig) -> Self {
        Self {
            agent_sentinel: config.agent_sentinel,
            continuation: config.continuation.clone(),
        }
    }
}

impl SessionConfig {
    pub fn is_agent_input(&self, buffer: &str) -> bool {
        buffer.trim_start().starts_with(self.agent_sentinel)
    }
}

/// In-flight indicator shown on the box border.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Idle,
    InFlight {
        frame: usize,
    },
    Success,
    Error,
}

impl Status {
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::InFlight { .. })
    }
}

/// The most recent failure and the generation it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastError {
    pub generation: Generation,
    pub message: String,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The complete command, newline-joined for multi-line entry. May be empty.
    Committed(String),
    /// Ctrl-C. `lines` are the finished lines of a multi-line entry (empty for
    /// a single-line prompt) and `partial` the line being typed.
    Interrupted { lines: Vec<String>, partial: String },
    /// End of input on a blank line.
    Exit,
}

impl SessionOutcome {
    pub const EXIT_SENTINEL: &'static str = "exit";

    /// What was on screen when the session ended, one entry per line, with the
    /// interrupted line marked by `^C`.
    pub fn display_lines(&self) -> Vec<String> {
        match self {
            Self::Committed(text) => text.split('\n').map(str::to_string).collect(),
            Self::Interrupted { lines, partial } => {
                let mut display = lines.clone();
                display.push(format!("{partial}^C"));
                display
            }
            Self::Exit => vec![Self::EXIT_SENTINEL.to_string()],
        }
    }

    /// Text handed back to the caller's shell.
    pub fn result_text(&self) -> &str {
        match self {
            Self::Committed(text) => text,
            Self::Interrupted { .. } => "",
            Self::Exit => Self::EXIT_SENTINEL,
        }
    }
}

/// Up/down navigation over prior entries, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    entries: Vec<String>,
    /// -1 while editing the draft.
    index: isize,
    draft: String,
}

impl History {
    /// `entries` are in chronological order, oldest first.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut history = Self {
            entries: Vec::new(),
            index: -1,
            draft: String::new(),
        };
        for entry in entries {
            history.push(&entry.into());
        }
        history
    }

    pub fn push(&mut self, text: &str) {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }
        if self.entries.first().is_some_and(|item| item == trimmed) {
            return;
        }
        self.entries.insert(0, trimmed.to_string());
        if self.entries.len() > MAX_HISTORY {
            self.entries.pop();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Moves one step (`1` = older, `-1` = newer) and returns the text to show,
    /// or `None` at either end.
    pub fn navigate(&mut self, direction: isize, current: &str) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        let new_index = self.index + direction;
        if new_index < -1 || new_index >= self.entries.len() as isize {
            return None;
        }
        if self.index == -1 {
            self.draft = current.to_string();
        }
        self.index = new_index;
        if self.index == -1 {
            return Some(std::mem::take(&mut self.draft));
        }
        self.entries.get(self.index as usize).cloned()
    }

    /// Leaves navigation mode; the next Up starts from the newest entry again.
    pub fn reset_navigation(&mut self) {
        self.index = -1;
    }
}

/// Everything the reducer knows about one input episode.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub prompt: String,
    pub buffer: String,
    /// Char index into `buffer`.
    pub cursor: usize,
    pub generation: Generation,
    pub active_prediction: Option<String>,
    pub active_explanation: Option<String>,
    /// Context returned with the accepted prediction, forwarded to analytics.
    pub context: Option<String>,
    pub suppressed: bool,
    pub dirty: bool,
    pub terminated: bool,
    pub interrupted: bool,
    pub status: Status,
    pub last_error: Option<LastError>,
    pub default_hint: Option<String>,
    /// Ghost text shown while the buffer is empty.
    pub hint: Option<String>,
    pub history: History,
    pub accumulator: MultilineAccumulator,
    /// Lines above the last one once a multiline command has been committed.
    pub committed_lines: Vec<String>,
    pub completions: Vec<String>,
    pub help: Option<String>,
    pub snapshot: Option<StatusSnapshot>,
    pub idle_check_pending: bool,
    pub idle_hint: bool,
    pub outcome: Option<SessionOutcome>,
}

impl SessionState {
    pub fn new(prompt: impl Into<String>, history: History, default_hint: Option<String>) -> Self {
        Self {
            prompt: prompt.into(),
            buffer: String::new(),
            cursor: 0,
            generation: 0,
            active_prediction: None,
            active_explanation: None,
            context: None,
            suppressed: false,
            dirty: false,
            terminated: false,
            interrupted: false,
            status: Status::Idle,
            last_error: None,
            hint: default_hint.clone(),
            default_hint,
            history,
            accumulator: MultilineAccumulator::new(),
            committed_lines: Vec::new(),
            completions: Vec::new(),
            help: None,
            snapshot: None,
            idle_check_pending: false,
            idle_hint: false,
            outcome: None,
        }
    }

    /// Ghost text to draw after the buffer, if any.
    pub fn visible_suggestion(&self) -> Option<&str> {
        if self.suppressed || self.terminated {
            return None;
        }
        if self.buffer.is_empty() {
            return self.hint.as_deref().filter(|hint| !hint.is_empty());
        }
        self.active_prediction
            .as_deref()
            .and_then(|prediction| prediction.strip_prefix(self.buffer.as_str()))
            .filter(|suffix| !suffix.is_empty())
    }

    /// The error to display; errors from retired generations are not shown.
    pub fn current_error(&self) -> Option<&str> {
        self.last_error
            .as_ref()
            .filter(|error| error.generation == self.generation)
            .map(|error| error.message.as_str())
    }

    pub fn cursor_at_end(&self) -> bool {
        self.cursor >= self.buffer.chars().count()
    }

    /// Lines drawn above the current input row.
    pub fn prior_lines(&self) -> &[String] {
        if self.accumulator.is_empty() {
            &self.committed_lines
        } else {
            self.accumulator.lines()
        }
    }

    /// Byte offset of the char cursor.
    pub fn cursor_byte(&self) -> usize {
        byte_offset(&self.buffer, self.cursor)
    }
}

pub(crate) fn byte_offset(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map_or(text.len(), |(offset, _)| offset)
}

#[cfg(test)]
mod tests {
    use super::{byte_offset, History, SessionConfig, SessionOutcome, SessionState};

    #[test]
    fn history_navigation_restores_draft() {
        let mut history = History::new(["ls", "git status"]);
        assert_eq!(history.entries(), ["git status", "ls"]);

        assert_eq!(history.navigate(1, "gi").as_deref(), Some("git status"));
        assert_eq!(history.navigate(1, "git status").as_deref(), Some("ls"));
        assert_eq!(history.navigate(1, "ls"), None);
        assert_eq!(history.navigate(-1, "ls").as_deref(), Some("git status"));
        assert_eq!(history.navigate(-1, "git status").as_deref(), Some("gi"));
        assert_eq!(history.navigate(-1, "gi"), None);
    }

    #[test]
    fn history_skips_blank_and_repeated_entries() {
        let mut history = History::new(["make"]);
        history.push("   ");
        history.push("make");
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn agent_sentinel_matches_after_leading_blanks() {
        let config = SessionConfig::default();
        assert!(config.is_agent_input("@reviewer look"));
        assert!(config.is_agent_input("  @"));
        assert!(!config.is_agent_input("echo @x"));
    }

    #[test]
    fn suggestion_hidden_when_suppressed_or_not_a_prefix() {
        let mut state = SessionState::new("$ ", History::default(), Some("try ls".into()));
        assert_eq!(state.visible_suggestion(), Some("try ls"));

        state.buffer = "git s".into();
        state.active_prediction = Some("git status".into());
        assert_eq!(state.visible_suggestion(), Some("tatus"));

        state.active_prediction = Some("grep".into());
        assert_eq!(state.visible_suggestion(), None);

        state.active_prediction = Some("git status".into());
        state.suppressed = true;
        assert_eq!(state.visible_suggestion(), None);
    }

    #[test]
    fn interrupted_outcome_marks_partial_line() {
        let outcome = SessionOutcome::Interrupted {
            lines: vec!["cat <<EOF".into(), "hello".into()],
            partial: "wor".into(),
        };
        assert_eq!(outcome.display_lines(), ["cat <<EOF", "hello", "wor^C"]);
        assert_eq!(outcome.result_text(), "");
        assert_eq!(SessionOutcome::Exit.result_text(), "exit");
    }

    #[test]
    fn byte_offset_handles_multibyte() {
        assert_eq!(byte_offset("héllo", 2), 3);
        assert_eq!(byte_offset("abc", 10), 3);
    }
}
