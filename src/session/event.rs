//! Events consumed and effects produced by the session reducer.

use suggest_provider::{Prediction, ProviderError, StatusSnapshot};

use crate::core::keys::Key;

use super::state::SessionOutcome;

/// Monotonic tag stamped on every asynchronous request at issue time.
pub type Generation = u64;

/// One discrete input to the session loop.
///
/// Everything tagged with a [`Generation`] is applied only when the tag still
/// matches the session's current generation.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Key(Key),
    Resize,
    DebounceFired {
        generation: Generation,
    },
    PredictionReady {
        generation: Generation,
        prediction: Prediction,
    },
    PredictionFailed {
        generation: Generation,
        error: ProviderError,
    },
    ExplanationReady {
        generation: Generation,
        text: String,
    },
    ExplanationFailed {
        generation: Generation,
        error: ProviderError,
    },
    CompletionsReady {
        generation: Generation,
        candidates: Vec<String>,
    },
    HelpReady {
        generation: Generation,
        text: Option<String>,
    },
    StatusPolled(StatusSnapshot),
    IdleFired {
        generation: Generation,
    },
    AnimationTick {
        generation: Generation,
    },
}

impl SessionEvent {
    /// The generation tag, for events that carry one.
    pub fn generation(&self) -> Option<Generation> {
        match self {
            Self::DebounceFired { generation }
            | Self::PredictionReady { generation, .. }
            | Self::PredictionFailed { generation, .. }
            | Self::ExplanationReady { generation, .. }
            | Self::ExplanationFailed { generation, .. }
            | Self::CompletionsReady { generation, .. }
            | Self::HelpReady { generation, .. }
            | Self::IdleFired { generation }
            | Self::AnimationTick { generation } => Some(*generation),
            Self::Key(_) | Self::Resize | Self::StatusPolled(_) => None,
        }
    }
}

/// Work the controller performs on the reducer's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Post `DebounceFired` after the debounce delay.
    ScheduleDebounce { generation: Generation },
    RequestPrediction { generation: Generation, text: String },
    RequestExplanation { generation: Generation, text: String },
    RequestCompletions {
        generation: Generation,
        line: String,
        cursor: usize,
    },
    RequestHelp {
        generation: Generation,
        line: String,
        cursor: usize,
    },
    ScheduleIdle { generation: Generation },
    ScheduleAnimation { generation: Generation },
    RecordAnalytics {
        context: String,
        prediction: String,
        final_result: String,
    },
    Render,
    Finish(SessionOutcome),
}
