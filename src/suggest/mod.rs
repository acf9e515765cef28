//! Off-loop execution of suggestion providers and timers.

use std::sync::Arc;

use suggest_provider::{Analytics, CompletionProvider, Explainer, Predictor, StatusPoller};

pub mod pipeline;
mod timer;

pub use pipeline::{PipelineTimings, SuggestionPipeline};

/// The collaborators a session talks to. Only prediction and explanation are
/// required; the rest degrade to "nothing to show".
#[derive(Clone)]
pub struct SuggestionProviders {
    pub predictor: Arc<dyn Predictor>,
    pub explainer: Arc<dyn Explainer>,
    pub analytics: Option<Arc<dyn Analytics>>,
    pub completions: Option<Arc<dyn CompletionProvider>>,
    pub poller: Option<Arc<dyn StatusPoller>>,
}

impl SuggestionProviders {
    pub fn new(predictor: Arc<dyn Predictor>, explainer: Arc<dyn Explainer>) -> Self {
        Self {
            predictor,
            explainer,
            analytics: None,
            completions: None,
            poller: None,
        }
    }

    pub fn with_analytics(mut self, analytics: Arc<dyn Analytics>) -> Self {
        self.analytics = Some(analytics);
        self
    }

    pub fn with_completions(mut self, completions: Arc<dyn CompletionProvider>) -> Self {
        self.completions = Some(completions);
        self
    }

    pub fn with_poller(mut self, poller: Arc<dyn StatusPoller>) -> Self {
        self.poller = Some(poller);
        self
    }
}
