//! Background execution of provider calls.
//!
//! Each request runs on its own named worker thread and posts exactly one
//! completion event tagged with the generation it was issued for. Workers are
//! never aborted; stale results are dropped by the reducer. A provider panic is
//! caught on the worker, kept off stderr and reported as
//! [`ProviderError::Panicked`].

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use suggest_provider::{ProviderError, StatusSnapshot};

use crate::config::PromptConfig;
use crate::core::quiet::catch_quietly;
use crate::session::event::{Generation, SessionEvent};
use crate::session::queue::EventQueue;

use super::timer::Timer;
use super::SuggestionProviders;

/// Upper bound on a single status poll.
pub const POLL_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineTimings {
    pub debounce: Duration,
    pub idle: Duration,
    pub animation: Duration,
    pub poll_interval: Duration,
}

impl From<&PromptConfig> for PipelineTimings {
    fn from(config: &PromptConfig) -> Self {
        Self {
            debounce: config.debounce,
            idle: config.idle,
            animation: config.animation,
            poll_interval: config.poll_interval,
        }
    }
}

impl Default for PipelineTimings {
    fn default() -> Self {
        Self::from(&PromptConfig::default())
    }
}

#[derive(Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    cvar: Condvar,
}

impl StopSignal {
    fn stop(&self) {
        *lock_unpoisoned(&self.stopped) = true;
        self.cvar.notify_all();
    }

    /// Sleeps for `timeout` unless stopped first. Returns `true` once stopped.
    fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut stopped = lock_unpoisoned(&self.stopped);
        while !*stopped {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            stopped = self
                .cvar
                .wait_timeout(stopped, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        }
        true
    }
}

pub struct SuggestionPipeline {
    providers: SuggestionProviders,
    queue: Arc<EventQueue<SessionEvent>>,
    timings: PipelineTimings,
    timer: Timer<SessionEvent>,
    poll_stop: Arc<StopSignal>,
    poll_handle: Option<JoinHandle<()>>,
    analytics_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl SuggestionPipeline {
    pub fn start(
        providers: SuggestionProviders,
        queue: Arc<EventQueue<SessionEvent>>,
        timings: PipelineTimings,
    ) -> io::Result<Self> {
        let timer = Timer::start(Arc::clone(&queue))?;
        let mut pipeline = Self {
            providers,
            queue,
            timings,
            timer,
            poll_stop: Arc::new(StopSignal::default()),
            poll_handle: None,
            analytics_handles: Mutex::new(Vec::new()),
        };
        pipeline.start_polling()?;
        Ok(pipeline)
    }

    pub fn schedule_debounce(&self, generation: Generation) {
        self.timer
            .schedule(self.timings.debounce, SessionEvent::DebounceFired { generation });
    }

    pub fn schedule_idle(&self, generation: Generation) {
        self.timer
            .schedule(self.timings.idle, SessionEvent::IdleFired { generation });
    }

    pub fn schedule_animation(&self, generation: Generation) {
        self.timer
            .schedule(self.timings.animation, SessionEvent::AnimationTick { generation });
    }

    pub fn request_prediction(&self, generation: Generation, text: String) {
        let predictor = Arc::clone(&self.providers.predictor);
        self.spawn_worker(
            format!("prompt-predict-{generation}"),
            move || match guarded("predictor", || predictor.predict(&text)) {
                Ok(prediction) => SessionEvent::PredictionReady {
                    generation,
                    prediction,
                },
                Err(error) => SessionEvent::PredictionFailed { generation, error },
            },
            move |error| SessionEvent::PredictionFailed { generation, error },
        );
    }

    pub fn request_explanation(&self, generation: Generation, text: String) {
        let explainer = Arc::clone(&self.providers.explainer);
        self.spawn_worker(
            format!("prompt-explain-{generation}"),
            move || match guarded("explainer", || explainer.explain(&text)) {
                Ok(text) => SessionEvent::ExplanationReady { generation, text },
                Err(error) => SessionEvent::ExplanationFailed { generation, error },
            },
            move |error| SessionEvent::ExplanationFailed { generation, error },
        );
    }

    pub fn request_completions(&self, generation: Generation, line: String, cursor: usize) {
        let Some(provider) = self.providers.completions.clone() else {
            self.queue.push(SessionEvent::CompletionsReady {
                generation,
                candidates: Vec::new(),
            });
            return;
        };
        self.spawn_worker(
            format!("prompt-complete-{generation}"),
            move || {
                let candidates =
                    guarded("completions", || Ok(provider.completions(&line, cursor)))
                        .unwrap_or_default();
                SessionEvent::CompletionsReady {
                    generation,
                    candidates,
                }
            },
            move |_| SessionEvent::CompletionsReady {
                generation,
                candidates: Vec::new(),
            },
        );
    }

    pub fn request_help(&self, generation: Generation, line: String, cursor: usize) {
        let Some(provider) = self.providers.completions.clone() else {
            self.queue.push(SessionEvent::HelpReady {
                generation,
                text: None,
            });
            return;
        };
        self.spawn_worker(
            format!("prompt-help-{generation}"),
            move || {
                let text = guarded("help", || Ok(provider.help_info(&line, cursor)))
                    .ok()
                    .flatten();
                SessionEvent::HelpReady { generation, text }
            },
            move |_| SessionEvent::HelpReady {
                generation,
                text: None,
            },
        );
    }

    /// Fire-and-forget; failures are only logged.
    pub fn record_analytics(&self, context: String, prediction: String, final_result: String) {
        let Some(analytics) = self.providers.analytics.clone() else {
            return;
        };
        let spawned = thread::Builder::new()
            .name("prompt-analytics".to_string())
            .spawn(move || {
                let result = guarded("analytics", || {
                    analytics.record_entry(&context, &prediction, &final_result)
                });
                if let Err(error) = result {
                    tracing::warn!(error = %error, "analytics record failed");
                }
            });
        match spawned {
            Ok(handle) => lock_unpoisoned(&self.analytics_handles).push(handle),
            Err(error) => tracing::warn!(error = %error, "failed to spawn analytics worker"),
        }
    }

    /// Stops timers and polling and waits for analytics to finish. Prediction
    /// and explanation workers are left to complete on their own.
    pub fn shutdown(&mut self) {
        self.timer.stop();
        self.poll_stop.stop();
        if let Some(handle) = self.poll_handle.take() {
            if handle.join().is_err() {
                tracing::warn!("status poll thread panicked");
            }
        }
        let handles = std::mem::take(&mut *lock_unpoisoned(&self.analytics_handles));
        for handle in handles {
            if handle.join().is_err() {
                tracing::warn!("analytics worker panicked");
            }
        }
    }

    fn start_polling(&mut self) -> io::Result<()> {
        let Some(poller) = self.providers.poller.clone() else {
            return Ok(());
        };
        let queue = Arc::clone(&self.queue);
        let stop = Arc::clone(&self.poll_stop);
        let interval = self.timings.poll_interval;
        let handle = thread::Builder::new()
            .name("prompt-status-poll".to_string())
            .spawn(move || {
                let bounded = BoundedPoll::default();
                loop {
                    let poller = Arc::clone(&poller);
                    match bounded.run(POLL_TIMEOUT, move || poller.poll()) {
                        Some(Ok(Some(snapshot))) => {
                            queue.push(SessionEvent::StatusPolled(snapshot));
                        }
                        Some(Ok(None)) => {}
                        Some(Err(error)) => tracing::debug!(error = %error, "status poll failed"),
                        None => tracing::debug!("previous status poll still running; skipped"),
                    }
                    if stop.wait(interval) {
                        return;
                    }
                }
            })?;
        self.poll_handle = Some(handle);
        Ok(())
    }

    /// Runs `work` on a named thread and posts its event; if the thread cannot
    /// be spawned, posts `on_spawn_error` instead so the session never waits
    /// on a request that was never made.
    fn spawn_worker<W, F>(&self, name: String, work: W, on_spawn_error: F)
    where
        W: FnOnce() -> SessionEvent + Send + 'static,
        F: FnOnce(ProviderError) -> SessionEvent,
    {
        let queue = Arc::clone(&self.queue);
        let spawned = thread::Builder::new().name(name.clone()).spawn(move || {
            queue.push(work());
        });
        if let Err(error) = spawned {
            tracing::warn!(worker = %name, error = %error, "failed to spawn worker");
            self.queue.push(on_spawn_error(ProviderError::unavailable(
                "worker",
                error.to_string(),
            )));
        }
    }
}

impl Drop for SuggestionPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn guarded<T>(
    service: &'static str,
    call: impl FnOnce() -> Result<T, ProviderError>,
) -> Result<T, ProviderError> {
    match catch_quietly(call) {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(service, "provider panicked");
            Err(ProviderError::Panicked { service })
        }
    }
}

/// Runs status polls with a deadline. A poll that overruns is abandoned; its
/// thread finishes on its own and the result is dropped. Until it does, later
/// polls are skipped so a hung poller holds at most one thread.
#[derive(Default)]
struct BoundedPoll {
    outstanding: Arc<AtomicBool>,
}

impl BoundedPoll {
    /// Returns `None` without calling `work` while an earlier call is still running.
    fn run<F>(
        &self,
        timeout: Duration,
        work: F,
    ) -> Option<Result<Option<StatusSnapshot>, ProviderError>>
    where
        F: FnOnce() -> Result<Option<StatusSnapshot>, ProviderError> + Send + 'static,
    {
        if self.outstanding.swap(true, Ordering::AcqRel) {
            return None;
        }
        let outstanding = Arc::clone(&self.outstanding);
        let (tx, rx) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("prompt-status-call".to_string())
            .spawn(move || {
                let result = guarded("status", work);
                outstanding.store(false, Ordering::Release);
                let _ = tx.send(result);
            });
        if let Err(error) = spawned {
            self.outstanding.store(false, Ordering::Release);
            return Some(Err(ProviderError::unavailable("status", error.to_string())));
        }
        Some(match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(ProviderError::Timeout {
                service: "status",
                elapsed: timeout,
            }),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(ProviderError::Panicked {
                service: "status",
            }),
        })
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
