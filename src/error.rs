//! Error type for the prompt session's outer surface.
//!
//! Suggestion-side failures never reach this type: they are absorbed into
//! session state as a transient error marker.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("stdin and stdout must both be attached to a terminal")]
    NotInteractive,

    #[error("cannot open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("logging setup failed: {0}")]
    Logging(String),

    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: io::Error,
    },
}
