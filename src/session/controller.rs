//! The session loop: drains the event queue, runs the reducer, executes its
//! effects and redraws.
//!
//! Only this thread touches [`SessionState`]. Input, resize, timers and provider
//! workers all communicate with it through the queue, one event at a time.

use std::io;
use std::sync::Arc;

use crate::config::PromptConfig;
use crate::core::output::{OutputGate, TerminalCmd};
use crate::core::probe::{prewarm, CapabilityProbe, NoProbe};
use crate::core::terminal::{Terminal, TerminalGuard};
use crate::error::PromptError;
use crate::platform::{stdio_is_interactive, ProcessTerminal, TtyProbe};
use crate::suggest::{PipelineTimings, SuggestionPipeline, SuggestionProviders};

use super::event::{Effect, SessionEvent};
use super::queue::EventQueue;
use super::reducer::reduce;
use super::render::{render, Frame, RENDER_GLYPHS};
use super::state::{History, SessionConfig, SessionOutcome, SessionState};

/// Runs interactive input episodes on a terminal.
pub struct Session<T: Terminal> {
    terminal: T,
    providers: SuggestionProviders,
    config: PromptConfig,
    probe: Option<Box<dyn CapabilityProbe>>,
}

impl Session<ProcessTerminal> {
    /// A session on the process's own tty, configured from the environment.
    pub fn interactive(providers: SuggestionProviders) -> Result<Self, PromptError> {
        if !stdio_is_interactive() {
            return Err(PromptError::NotInteractive);
        }
        Ok(Self::new(ProcessTerminal::new(), providers).with_config(PromptConfig::from_env()))
    }
}

impl<T: Terminal> Session<T> {
    pub fn new(terminal: T, providers: SuggestionProviders) -> Self {
        Self {
            terminal,
            providers,
            config: PromptConfig::default(),
            probe: None,
        }
    }

    pub fn with_config(mut self, config: PromptConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the tty probe used to prewarm the width cache.
    pub fn with_probe(mut self, probe: Box<dyn CapabilityProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn config(&self) -> &PromptConfig {
        &self.config
    }

    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    pub fn into_terminal(self) -> T {
        self.terminal
    }

    /// Runs one input episode to completion.
    ///
    /// `history` is in chronological order. Returns the committed command, an
    /// interrupt (with everything that was on screen), or the exit sentinel.
    pub fn start(
        &mut self,
        initial_prompt: &str,
        history: &[String],
        default_hint: Option<&str>,
    ) -> Result<SessionOutcome, PromptError> {
        self.prewarm_widths(initial_prompt, history, default_hint);

        let session_config = SessionConfig::from(&self.config);
        let queue: Arc<EventQueue<SessionEvent>> = Arc::new(EventQueue::new());
        let mut pipeline = SuggestionPipeline::start(
            self.providers.clone(),
            Arc::clone(&queue),
            PipelineTimings::from(&self.config),
        )
        .map_err(|source| PromptError::Spawn {
            name: "suggestion pipeline",
            source,
        })?;

        let mut guard = TerminalGuard::new(&mut self.terminal);
        let input_queue = Arc::clone(&queue);
        let resize_queue = Arc::clone(&queue);
        guard.terminal_mut().start(
            Box::new(move |key| {
                input_queue.push(SessionEvent::Key(key));
            }),
            Box::new(move || {
                resize_queue.push(SessionEvent::Resize);
            }),
        )?;
        tracing::info!(prompt = initial_prompt, history = history.len(), "session started");

        let mut state = SessionState::new(
            initial_prompt,
            History::new(history.iter().cloned()),
            default_hint.map(str::to_string),
        );
        let mut screen = Screen::default();
        screen.open(guard.terminal_mut())?;
        let width = usize::from(guard.terminal_mut().columns());
        screen.draw(guard.terminal_mut(), &render(&state, &session_config, width))?;

        let mut needs_render = false;
        let outcome = loop {
            let Some(event) = queue.pop() else {
                break SessionOutcome::Interrupted {
                    lines: state.accumulator.lines().to_vec(),
                    partial: state.buffer.clone(),
                };
            };
            tracing::trace!(?event, generation = state.generation, "session event");

            let (next, effects) = reduce(state, event, &session_config);
            state = next;

            let mut finished = None;
            for effect in effects {
                match effect {
                    Effect::Render => needs_render = true,
                    Effect::ScheduleDebounce { generation } => {
                        pipeline.schedule_debounce(generation)
                    }
                    Effect::ScheduleIdle { generation } => pipeline.schedule_idle(generation),
                    Effect::ScheduleAnimation { generation } => {
                        pipeline.schedule_animation(generation)
                    }
                    Effect::RequestPrediction { generation, text } => {
                        pipeline.request_prediction(generation, text)
                    }
                    Effect::RequestExplanation { generation, text } => {
                        pipeline.request_explanation(generation, text)
                    }
                    Effect::RequestCompletions {
                        generation,
                        line,
                        cursor,
                    } => pipeline.request_completions(generation, line, cursor),
                    Effect::RequestHelp {
                        generation,
                        line,
                        cursor,
                    } => pipeline.request_help(generation, line, cursor),
                    Effect::RecordAnalytics {
                        context,
                        prediction,
                        final_result,
                    } => pipeline.record_analytics(context, prediction, final_result),
                    Effect::Finish(outcome) => finished = Some(outcome),
                }
            }

            // Coalesce bursts (paste, key repeat) into one redraw.
            if needs_render && (finished.is_some() || queue.is_empty()) {
                let width = usize::from(guard.terminal_mut().columns());
                let frame = render(&state, &session_config, width);
                screen.draw(guard.terminal_mut(), &frame)?;
                needs_render = false;
            }
            if let Some(outcome) = finished {
                break outcome;
            }
        };

        queue.close();
        screen.close(guard.terminal_mut())?;
        pipeline.shutdown();
        guard.stop()?;
        tracing::info!(?outcome, "session finished");
        Ok(outcome)
    }

    /// Measures every glyph the session can already see before the input
    /// thread owns the tty; the loop itself only reads the cache.
    fn prewarm_widths(&self, prompt: &str, history: &[String], default_hint: Option<&str>) {
        let tty_probe;
        let probe: &dyn CapabilityProbe = match (&self.probe, self.config.probe_enabled) {
            (Some(probe), _) => probe.as_ref(),
            (None, true) => {
                tty_probe = TtyProbe::new(self.config.probe_timeout);
                &tty_probe
            }
            (None, false) => &NoProbe,
        };

        let glyphs = RENDER_GLYPHS
            .chars()
            .chain(prompt.chars())
            .chain(self.config.continuation.chars())
            .chain(default_hint.unwrap_or_default().chars())
            .chain(history.iter().flat_map(|entry| entry.chars()));
        let resolved = prewarm(glyphs, probe);
        tracing::debug!(resolved, "width cache prewarmed");
    }
}

/// Tracks where the previous frame left the cursor so the next one can
/// overwrite it in place.
#[derive(Debug, Default)]
struct Screen {
    cursor_row: usize,
    last_row: usize,
}

impl Screen {
    fn open<T: Terminal + ?Sized>(&mut self, terminal: &mut T) -> io::Result<()> {
        let mut gate = OutputGate::new();
        gate.push(TerminalCmd::BracketedPasteEnable);
        gate.flush(terminal)
    }

    fn draw<T: Terminal + ?Sized>(&mut self, terminal: &mut T, frame: &Frame) -> io::Result<()> {
        let mut gate = OutputGate::new();
        gate.push(TerminalCmd::HideCursor);
        gate.push(TerminalCmd::MoveUp(self.cursor_row));
        gate.push(TerminalCmd::CarriageReturn);
        gate.push(TerminalCmd::ClearToEnd);
        for (index, line) in frame.lines.iter().enumerate() {
            if index > 0 {
                gate.push(TerminalCmd::NewLine);
            }
            gate.push(TerminalCmd::bytes(line.as_str()));
        }

        let last_row = frame.lines.len().saturating_sub(1);
        gate.push(TerminalCmd::MoveUp(last_row.saturating_sub(frame.cursor_row)));
        gate.push(TerminalCmd::MoveToColumn(frame.cursor_col));
        gate.push(TerminalCmd::ShowCursor);
        self.cursor_row = frame.cursor_row;
        self.last_row = last_row;
        gate.flush(terminal)
    }

    /// Leaves the cursor on a fresh line below the final frame.
    fn close<T: Terminal + ?Sized>(&mut self, terminal: &mut T) -> io::Result<()> {
        let mut gate = OutputGate::new();
        gate.push(TerminalCmd::MoveDown(self.last_row.saturating_sub(self.cursor_row)));
        gate.push(TerminalCmd::NewLine);
        gate.push(TerminalCmd::ShowCursor);
        gate.push(TerminalCmd::BracketedPasteDisable);
        self.cursor_row = 0;
        self.last_row = 0;
        gate.flush(terminal)
    }
}

#[cfg(test)]
mod tests {
    use super::{Frame, Screen};
    use crate::core::keys::Key;
    use crate::core::terminal::Terminal;
    use std::io;

    #[derive(Default)]
    struct RecordingTerminal {
        output: String,
    }

    impl Terminal for RecordingTerminal {
        fn start(
            &mut self,
            _on_input: Box<dyn FnMut(Key) + Send>,
            _on_resize: Box<dyn FnMut() + Send>,
        ) -> io::Result<()> {
            Ok(())
        }

        fn stop(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn write(&mut self, data: &str) -> io::Result<()> {
            self.output.push_str(data);
            Ok(())
        }

        fn columns(&self) -> u16 {
            80
        }
    }

    fn frame(lines: &[&str], cursor_row: usize, cursor_col: usize) -> Frame {
        Frame {
            lines: lines.iter().map(|line| line.to_string()).collect(),
            cursor_row,
            cursor_col,
        }
    }

    #[test]
    fn redraw_returns_to_first_row_before_clearing() {
        let mut terminal = RecordingTerminal::default();
        let mut screen = Screen::default();

        screen
            .draw(&mut terminal, &frame(&["$ ls", "╭─ ⠋ ─╮", "╰─────╯"], 0, 4))
            .expect("first draw");
        assert_eq!(
            terminal.output,
            "\x1b[?25l\r\x1b[J$ ls\r\n╭─ ⠋ ─╮\r\n╰─────╯\x1b[2A\x1b[5G\x1b[?25h"
        );

        terminal.output.clear();
        screen
            .draw(&mut terminal, &frame(&["$ cat <<EOF", "> he"], 1, 4))
            .expect("second draw");
        assert_eq!(
            terminal.output,
            "\x1b[?25l\r\x1b[J$ cat <<EOF\r\n> he\x1b[5G\x1b[?25h"
        );

        terminal.output.clear();
        screen
            .draw(&mut terminal, &frame(&["$ cat <<EOF", "> hel"], 1, 5))
            .expect("third draw");
        assert!(terminal.output.starts_with("\x1b[?25l\x1b[1A\r\x1b[J"));
    }

    #[test]
    fn close_moves_below_the_frame() {
        let mut terminal = RecordingTerminal::default();
        let mut screen = Screen::default();
        screen
            .draw(&mut terminal, &frame(&["$ ls", "box", "box"], 0, 4))
            .expect("draw");
        terminal.output.clear();
        screen.close(&mut terminal).expect("close");
        assert_eq!(terminal.output, "\x1b[2B\r\n\x1b[?25h\x1b[?2004l");
    }
}
