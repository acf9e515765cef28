//! Terminal trait and lifecycle guard.

use std::io;

use crate::core::keys::Key;

/// Minimal terminal interface for the prompt session.
pub trait Terminal {
    /// Enter raw mode and start delivering decoded keys and resize notifications.
    ///
    /// Handlers run on terminal-owned threads, so they should only enqueue work.
    fn start(
        &mut self,
        on_input: Box<dyn FnMut(Key) + Send>,
        on_resize: Box<dyn FnMut() + Send>,
    ) -> io::Result<()>;

    /// Stop input delivery and restore the original terminal mode.
    fn stop(&mut self) -> io::Result<()>;

    fn write(&mut self, data: &str) -> io::Result<()>;

    fn columns(&self) -> u16;
}

/// RAII guard that stops the terminal on drop, including during unwinding.
pub struct TerminalGuard<'a, T: Terminal + ?Sized> {
    terminal: &'a mut T,
    stopped: bool,
}

impl<'a, T: Terminal + ?Sized> TerminalGuard<'a, T> {
    pub fn new(terminal: &'a mut T) -> Self {
        Self {
            terminal,
            stopped: false,
        }
    }

    pub fn terminal_mut(&mut self) -> &mut T {
        self.terminal
    }

    /// Stops the terminal now and reports the error, if any.
    pub fn stop(mut self) -> io::Result<()> {
        self.stopped = true;
        self.terminal.stop()
    }
}

impl<T: Terminal + ?Sized> Drop for TerminalGuard<'_, T> {
    fn drop(&mut self) {
        if !self.stopped {
            let _ = self.terminal.stop();
        }
    }
}
