//! Typed terminal output commands and a single output gate.
//!
//! Invariant: all terminal writes must flow through `OutputGate::flush(..)`.

use std::io;

use crate::core::terminal::Terminal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalCmd {
    /// Raw bytes/control sequences (UTF-8 string) to be written to the terminal.
    Bytes(String),

    HideCursor,
    ShowCursor,

    BracketedPasteEnable,
    BracketedPasteDisable,

    /// Cursor motion. Counts of zero emit nothing.
    CarriageReturn,
    MoveUp(usize),
    MoveDown(usize),
    /// Zero-based column.
    MoveToColumn(usize),

    /// Erase from the cursor to the end of the screen.
    ClearToEnd,
    NewLine,
}

impl TerminalCmd {
    pub fn bytes(data: impl Into<String>) -> Self {
        Self::Bytes(data.into())
    }

    fn encode(&self) -> String {
        match self {
            Self::Bytes(data) => data.clone(),
            Self::HideCursor => "\x1b[?25l".to_string(),
            Self::ShowCursor => "\x1b[?25h".to_string(),
            Self::BracketedPasteEnable => "\x1b[?2004h".to_string(),
            Self::BracketedPasteDisable => "\x1b[?2004l".to_string(),
            Self::CarriageReturn => "\r".to_string(),
            Self::MoveUp(0) | Self::MoveDown(0) => String::new(),
            Self::MoveUp(n) => format!("\x1b[{n}A"),
            Self::MoveDown(n) => format!("\x1b[{n}B"),
            Self::MoveToColumn(col) => format!("\x1b[{}G", col + 1),
            Self::ClearToEnd => "\x1b[J".to_string(),
            Self::NewLine => "\r\n".to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub struct OutputGate {
    cmds: Vec<TerminalCmd>,
}

impl OutputGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cmd: TerminalCmd) {
        self.cmds.push(cmd);
    }

    pub fn extend<I>(&mut self, cmds: I)
    where
        I: IntoIterator<Item = TerminalCmd>,
    {
        self.cmds.extend(cmds);
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    /// Flush buffered commands to the terminal as one write.
    ///
    /// This is the single write gate: `Terminal::write(..)` must not be called
    /// from anywhere else.
    pub fn flush<T: Terminal + ?Sized>(&mut self, term: &mut T) -> io::Result<()> {
        if self.cmds.is_empty() {
            return Ok(());
        }
        let data: String = self.cmds.drain(..).map(|cmd| cmd.encode()).collect();
        term.write(&data)
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::{OutputGate, TerminalCmd};
    use crate::core::keys::Key;
    use crate::core::terminal::Terminal;

    #[derive(Default)]
    struct RecordingTerminal {
        writes: Vec<String>,
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
            self.writes.push(data.to_string());
            Ok(())
        }

        fn columns(&self) -> u16 {
            80
        }
    }

    #[test]
    fn flush_batches_commands_into_one_write() {
        let mut gate = OutputGate::new();
        let mut terminal = RecordingTerminal::default();
        gate.extend([
            TerminalCmd::HideCursor,
            TerminalCmd::MoveUp(2),
            TerminalCmd::CarriageReturn,
            TerminalCmd::ClearToEnd,
            TerminalCmd::bytes("$ ls"),
            TerminalCmd::MoveToColumn(3),
            TerminalCmd::ShowCursor,
        ]);
        gate.flush(&mut terminal).expect("flush");

        assert!(gate.is_empty());
        assert_eq!(
            terminal.writes,
            vec!["\x1b[?25l\x1b[2A\r\x1b[J$ ls\x1b[4G\x1b[?25h".to_string()]
        );
    }

    #[test]
    fn zero_motion_emits_nothing() {
        let mut gate = OutputGate::new();
        let mut terminal = RecordingTerminal::default();
        gate.push(TerminalCmd::MoveUp(0));
        gate.push(TerminalCmd::MoveDown(0));
        gate.flush(&mut terminal).expect("flush");
        assert_eq!(terminal.writes, vec![String::new()]);

        gate.flush(&mut terminal).expect("flush");
        assert_eq!(terminal.writes.len(), 1);
    }
}
