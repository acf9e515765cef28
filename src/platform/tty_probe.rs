//! Width probe bound to the process's controlling terminal.

use std::io;
use std::time::Duration;

use libc::{self, c_int};

use crate::core::probe::{measure_glyph, CapabilityProbe, ProbeIo, DEFAULT_PROBE_TIMEOUT};
use crate::platform::tty::{is_tty, poll_readable, read_fd, write_all_fd, RawModeGuard};

/// Measures glyphs on stdin/stdout with the DSR cursor-position protocol.
///
/// Probing is skipped outright unless both streams are interactive. Each probe
/// switches the terminal to raw mode for the duration of the exchange, so it
/// must run before the session terminal takes over the tty.
#[derive(Debug, Clone, Copy)]
pub struct TtyProbe {
    stdin_fd: c_int,
    stdout_fd: c_int,
    timeout: Duration,
}

impl TtyProbe {
    pub fn new(timeout: Duration) -> Self {
        Self {
            stdin_fd: libc::STDIN_FILENO,
            stdout_fd: libc::STDOUT_FILENO,
            timeout,
        }
    }

    fn interactive(&self) -> bool {
        is_tty(self.stdin_fd) && is_tty(self.stdout_fd)
    }
}

impl Default for TtyProbe {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

impl CapabilityProbe for TtyProbe {
    fn probe_width(&self, ch: char) -> Option<u8> {
        if !self.interactive() {
            return None;
        }
        let _raw = match RawModeGuard::enter(self.stdin_fd) {
            Ok(guard) => guard,
            Err(err) => {
                tracing::debug!(error = %err, "cannot enter raw mode for width probe");
                return None;
            }
        };
        let mut io = FdProbeIo {
            stdin_fd: self.stdin_fd,
            stdout_fd: self.stdout_fd,
        };
        let width = measure_glyph(&mut io, ch, self.timeout);
        tracing::debug!(glyph = %ch, ?width, "probed glyph width");
        width
    }
}

struct FdProbeIo {
    stdin_fd: c_int,
    stdout_fd: c_int,
}

impl ProbeIo for FdProbeIo {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        write_all_fd(self.stdout_fd, bytes)
    }

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        if !poll_readable(self.stdin_fd, timeout)? {
            return Ok(0);
        }
        read_fd(self.stdin_fd, buf)
    }
}
