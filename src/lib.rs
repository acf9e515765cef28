//! Inline shell prompt engine.
//!
//! Invariant: single output gate: only `core::output::OutputGate::flush(..)` writes to the
//! terminal.
//!
//! # Public API Overview
//! - Run an input episode with [`Session::start`], backed by [`ProcessTerminal`] or any
//!   [`Terminal`] implementation.
//! - Plug prediction, explanation, analytics, completion and status sources in through
//!   [`SuggestionProviders`].
//! - Judge shell-command completeness line by line with [`MultilineAccumulator`].
//! - Lay out styled text with the width-cache-aware wrap and truncate helpers.
//!
//! # Session Model
//! All session mutation goes through [`reduce`], a pure `(state, event) -> (state, effects)`
//! function. Asynchronous results carry the [`Generation`] they were requested for and are
//! dropped when the session has moved on.

#![allow(clippy::type_complexity)]

pub mod config;
pub mod error;
pub mod logging;

pub mod core;
pub mod platform;
pub mod session;
pub mod shell;
pub mod suggest;

pub use crate::config::PromptConfig;
pub use crate::error::PromptError;
pub use crate::logging::{init_logging, LogConfig};

/// Session entry points and the reducer's vocabulary.
pub use crate::session::{
    reduce, Effect, Generation, History, Session, SessionConfig, SessionEvent, SessionOutcome,
    SessionState, Status,
};

/// Shell completeness detection.
pub use crate::shell::{LineStatus, MultilineAccumulator, Pending, MAX_ACCUMULATED_BYTES};

/// Provider wiring.
pub use crate::suggest::{PipelineTimings, SuggestionPipeline, SuggestionProviders};
pub use suggest_provider::{
    Analytics, CompletionProvider, Explainer, Prediction, Predictor, ProviderError,
    StatusPoller, StatusSnapshot,
};

/// Terminal interfaces and process-backed implementation.
pub use crate::core::keys::{Key, KeyDecoder};
pub use crate::core::terminal::Terminal;
pub use crate::platform::{ProcessTerminal, TtyProbe};

/// Glyph width probing and the process-wide width cache.
pub use crate::core::probe::{
    parse_cursor_report, width_cache, CapabilityProbe, NoProbe, WidthCache,
};

/// ANSI-aware wrapping helpers.
pub use crate::core::text::slice::{word_wrap, wrap_text_with_ansi};
/// ANSI-aware truncation helper.
pub use crate::core::text::utils::truncate_to_width;
/// Visible width helper that ignores ANSI control sequences.
pub use crate::core::text::width::visible_width;
