//! Deterministic mock implementations of the `suggest_provider` contract.
//!
//! This crate contains no transport logic and is intended for local demos and
//! contract-level tests of the prompt session.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use suggest_provider::{
    Analytics, CompletionProvider, Explainer, Prediction, Predictor, ProviderError,
    StatusPoller, StatusSnapshot,
};

/// Command lines the mock predictor completes against.
pub const DEFAULT_COMMANDS: &[&str] = &[
    "git status",
    "git commit -m \"\"",
    "git push origin main",
    "cargo build --release",
    "cargo test --workspace",
    "ls -la",
    "grep -rn TODO src",
    "docker ps -a",
];

/// Prefix-matching predictor with optional latency and scripted failures.
#[derive(Debug)]
pub struct MockPredictor {
    commands: Vec<String>,
    delay: Duration,
    failures: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl MockPredictor {
    #[must_use]
    pub fn new(commands: Vec<String>) -> Self {
        Self {
            commands,
            delay: Duration::ZERO,
            failures: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Makes the next call fail with `message`. Queued failures are consumed in order.
    pub fn fail_next(&self, message: impl Into<String>) {
        lock_unpoisoned(&self.failures).push_back(message.into());
    }

    /// Number of `predict` calls served so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockPredictor {
    fn default() -> Self {
        Self::new(DEFAULT_COMMANDS.iter().map(|cmd| cmd.to_string()).collect())
    }
}

impl Predictor for MockPredictor {
    fn predict(&self, buffer: &str) -> Result<Prediction, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        if let Some(message) = lock_unpoisoned(&self.failures).pop_front() {
            return Err(ProviderError::failed("predictor", message));
        }

        let text = self
            .commands
            .iter()
            .find(|cmd| !buffer.is_empty() && cmd.starts_with(buffer))
            .cloned()
            .unwrap_or_else(|| buffer.to_string());
        Ok(Prediction::new(text, format!("mock-context:{buffer}")))
    }
}

/// Explainer that echoes a fixed template.
#[derive(Debug, Default)]
pub struct MockExplainer {
    calls: AtomicUsize,
    targets: Mutex<Vec<String>>,
    failures: Mutex<VecDeque<String>>,
}

impl MockExplainer {
    pub fn fail_next(&self, message: impl Into<String>) {
        lock_unpoisoned(&self.failures).push_back(message.into());
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Texts that were sent for explanation, in call order.
    #[must_use]
    pub fn targets(&self) -> Vec<String> {
        lock_unpoisoned(&self.targets).clone()
    }
}

impl Explainer for MockExplainer {
    fn explain(&self, text: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock_unpoisoned(&self.targets).push(text.to_string());
        if let Some(message) = lock_unpoisoned(&self.failures).pop_front() {
            return Err(ProviderError::failed("explainer", message));
        }
        Ok(format!("Runs `{text}` in the current directory."))
    }
}

/// Analytics sink that records every entry in memory.
#[derive(Debug, Default)]
pub struct RecordingAnalytics {
    entries: Mutex<Vec<(String, String, String)>>,
}

impl RecordingAnalytics {
    /// Recorded `(context, prediction, final_result)` triples.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, String, String)> {
        lock_unpoisoned(&self.entries).clone()
    }
}

impl Analytics for RecordingAnalytics {
    fn record_entry(
        &self,
        context: &str,
        prediction: &str,
        final_result: &str,
    ) -> Result<(), ProviderError> {
        lock_unpoisoned(&self.entries).push((
            context.to_string(),
            prediction.to_string(),
            final_result.to_string(),
        ));
        Ok(())
    }
}

/// Completion source backed by a fixed word list.
#[derive(Debug, Clone)]
pub struct StaticCompletions {
    words: Vec<String>,
}

impl StaticCompletions {
    #[must_use]
    pub fn new(words: Vec<String>) -> Self {
        Self { words }
    }
}

impl Default for StaticCompletions {
    fn default() -> Self {
        Self::new(
            ["cargo", "cat", "cd", "chmod", "git", "grep", "ls"]
                .iter()
                .map(|word| word.to_string())
                .collect(),
        )
    }
}

impl CompletionProvider for StaticCompletions {
    fn completions(&self, line: &str, cursor: usize) -> Vec<String> {
        let before: String = line.chars().take(cursor).collect();
        let word = before.rsplit(' ').next().unwrap_or("");
        if word.is_empty() {
            return Vec::new();
        }
        self.words
            .iter()
            .filter(|candidate| candidate.starts_with(word))
            .cloned()
            .collect()
    }

    fn help_info(&self, line: &str, _cursor: usize) -> Option<String> {
        let command = line.split_whitespace().next()?;
        self.words
            .iter()
            .any(|word| word == command)
            .then(|| format!("{command}: builtin mock help"))
    }
}

/// Poller that replays a scripted list of results, then repeats the last one.
#[derive(Debug)]
pub struct ScriptedPoller {
    script: Mutex<VecDeque<Result<Option<StatusSnapshot>, ProviderError>>>,
    last: Mutex<Option<StatusSnapshot>>,
}

impl ScriptedPoller {
    #[must_use]
    pub fn new(script: Vec<Result<Option<StatusSnapshot>, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
        }
    }
}

impl StatusPoller for ScriptedPoller {
    fn poll(&self) -> Result<Option<StatusSnapshot>, ProviderError> {
        match lock_unpoisoned(&self.script).pop_front() {
            Some(Ok(Some(snapshot))) => {
                *lock_unpoisoned(&self.last) = Some(snapshot.clone());
                Ok(Some(snapshot))
            }
            Some(other) => other,
            None => Ok(lock_unpoisoned(&self.last).clone()),
        }
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
