//! Minimal provider-agnostic contract for the services a prompt session consumes.
//!
//! This crate intentionally defines only the request/response shapes of the
//! prediction, explanation, analytics, completion and status-polling
//! collaborators. It excludes transport details (HTTP, OS polling) and any
//! scheduling concerns; callers decide which thread a provider runs on.

use std::time::Duration;

use thiserror::Error;

/// Error returned by any suggestion-side collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The backing service is not reachable or not configured.
    #[error("{service} is unavailable: {message}")]
    Unavailable {
        service: &'static str,
        message: String,
    },

    /// The service answered but the request failed.
    #[error("{service} request failed: {message}")]
    Failed {
        service: &'static str,
        message: String,
    },

    /// The request exceeded its time bound.
    #[error("{service} timed out after {elapsed:?}")]
    Timeout {
        service: &'static str,
        elapsed: Duration,
    },

    /// The provider panicked while serving the request.
    #[error("{service} panicked")]
    Panicked { service: &'static str },
}

impl ProviderError {
    #[must_use]
    pub fn failed(service: &'static str, message: impl Into<String>) -> Self {
        Self::Failed {
            service,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unavailable(service: &'static str, message: impl Into<String>) -> Self {
        Self::Unavailable {
            service,
            message: message.into(),
        }
    }

    /// Name of the collaborator that produced the error.
    #[must_use]
    pub fn service(&self) -> &'static str {
        match self {
            Self::Unavailable { service, .. }
            | Self::Failed { service, .. }
            | Self::Timeout { service, .. }
            | Self::Panicked { service } => service,
        }
    }
}

/// Inline completion for the current buffer plus the context the model used.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Prediction {
    /// Full predicted line; the buffer is expected to be a prefix of it.
    pub text: String,
    /// Opaque context blob, forwarded to analytics at session end.
    pub context: String,
}

impl Prediction {
    #[must_use]
    pub fn new(text: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            context: context.into(),
        }
    }
}

/// Point-in-time status shown in the prompt footer (git branch, load, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub source: String,
    pub summary: String,
}

impl StatusSnapshot {
    #[must_use]
    pub fn new(source: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            summary: summary.into(),
        }
    }
}

/// Produces ghost-text predictions for a partially typed line.
pub trait Predictor: Send + Sync + 'static {
    fn predict(&self, buffer: &str) -> Result<Prediction, ProviderError>;
}

/// Produces a natural-language explanation of a command line.
pub trait Explainer: Send + Sync + 'static {
    fn explain(&self, text: &str) -> Result<String, ProviderError>;
}

/// Fire-and-forget sink for accepted entries.
pub trait Analytics: Send + Sync + 'static {
    fn record_entry(
        &self,
        context: &str,
        prediction: &str,
        final_result: &str,
    ) -> Result<(), ProviderError>;
}

/// Command-completion and inline-help source.
pub trait CompletionProvider: Send + Sync + 'static {
    /// Candidate replacements for the word under `cursor` (a char index).
    fn completions(&self, line: &str, cursor: usize) -> Vec<String>;

    /// Help text for the command under `cursor`, if any is known.
    fn help_info(&self, _line: &str, _cursor: usize) -> Option<String> {
        None
    }
}

/// Best-effort poller for ambient status (git, system resources).
///
/// `Ok(None)` means "nothing new"; the caller keeps whatever it displayed before.
pub trait StatusPoller: Send + Sync + 'static {
    fn poll(&self) -> Result<Option<StatusSnapshot>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{CompletionProvider, Prediction, ProviderError, StatusSnapshot};

    struct WordList;

    impl CompletionProvider for WordList {
        fn completions(&self, line: &str, _cursor: usize) -> Vec<String> {
            ["git", "grep"]
                .iter()
                .filter(|word| word.starts_with(line))
                .map(|word| word.to_string())
                .collect()
        }
    }

    #[test]
    fn provider_error_reports_service_for_every_variant() {
        let errors = [
            ProviderError::unavailable("predictor", "offline"),
            ProviderError::failed("explainer", "bad request"),
            ProviderError::Timeout {
                service: "poller",
                elapsed: Duration::from_millis(250),
            },
            ProviderError::Panicked { service: "analytics" },
        ];

        let services: Vec<&str> = errors.iter().map(ProviderError::service).collect();
        assert_eq!(services, vec!["predictor", "explainer", "poller", "analytics"]);
    }

    #[test]
    fn provider_error_display_includes_message() {
        let error = ProviderError::failed("predictor", "HTTP 500");
        assert_eq!(error.to_string(), "predictor request failed: HTTP 500");
    }

    #[test]
    fn default_help_info_is_empty() {
        assert_eq!(WordList.help_info("git", 3), None);
        assert_eq!(WordList.completions("g", 1), vec!["git", "grep"]);
    }

    #[test]
    fn constructors_fill_fields() {
        let prediction = Prediction::new("git status", "cwd=/repo");
        assert_eq!(prediction.text, "git status");
        assert_eq!(prediction.context, "cwd=/repo");

        let snapshot = StatusSnapshot::new("git", "main +2");
        assert_eq!(snapshot.source, "git");
        assert_eq!(snapshot.summary, "main +2");
    }
}
