//! Tracing setup.
//!
//! stdout belongs to the raw-mode prompt, so logs only ever go to a file. With
//! no file configured nothing is installed and every `tracing` macro is a no-op.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::PromptError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub file: Option<PathBuf>,
    /// Default filter directive; `RUST_LOG` takes precedence when set.
    pub level: String,
}

impl LogConfig {
    pub const DEFAULT_LEVEL: &'static str = "info";
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: None,
            level: Self::DEFAULT_LEVEL.to_string(),
        }
    }
}

/// Installs the global subscriber. Returns `Ok(false)` when logging is disabled.
pub fn init_logging(config: &LogConfig) -> Result<bool, PromptError> {
    let Some(path) = config.file.as_ref() else {
        return Ok(false);
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("ghost_prompt={0},suggest_provider={0}", config.level))
    });
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| PromptError::LogFile {
            path: path.clone(),
            source,
        })?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true)
                .with_thread_names(true),
        )
        .try_init()
        .map_err(|err| PromptError::Logging(err.to_string()))?;
    Ok(true)
}
