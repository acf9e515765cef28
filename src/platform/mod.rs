//! Platform-specific terminal integrations (POSIX only).

pub mod process_terminal;
pub mod tty;
pub mod tty_probe;

pub use process_terminal::ProcessTerminal;
pub use tty::stdio_is_interactive;
pub use tty_probe::TtyProbe;
