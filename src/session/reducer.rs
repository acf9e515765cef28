//! The session state machine: `(state, event) -> (state, effects)`.
//!
//! `reduce` is pure. It never blocks and never touches the terminal; anything
//! with a side effect is returned as an [`Effect`] for the controller to run.
//! Every asynchronous result is checked against the current generation before
//! it is allowed to change anything.

use suggest_provider::{Prediction, ProviderError};

use crate::core::keys::Key;
use crate::shell::LineStatus;

use super::event::{Effect, Generation, SessionEvent};
use super::state::{byte_offset, LastError, SessionConfig, SessionOutcome, SessionState, Status};

/// Applies one event. Stale and post-termination events return `state`
/// untouched with no effects.
pub fn reduce(
    state: SessionState,
    event: SessionEvent,
    config: &SessionConfig,
) -> (SessionState, Vec<Effect>) {
    if state.terminated {
        return (state, Vec::new());
    }
    if let Some(generation) = event.generation() {
        if generation != state.generation && !matches!(event, SessionEvent::IdleFired { .. }) {
            tracing::debug!(
                stale = generation,
                current = state.generation,
                "discarding stale event"
            );
            return (state, Vec::new());
        }
    }

    let mut reducer = Reducer {
        state,
        effects: Vec::new(),
        config,
    };
    reducer.apply(event);
    (reducer.state, reducer.effects)
}

struct Reducer<'a> {
    state: SessionState,
    effects: Vec<Effect>,
    config: &'a SessionConfig,
}

impl Reducer<'_> {
    fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Key(key) => self.on_key(key),
            SessionEvent::Resize => self.render(),
            SessionEvent::DebounceFired { generation } => self.on_debounce(generation),
            SessionEvent::PredictionReady {
                generation,
                prediction,
            } => self.on_prediction(generation, prediction),
            SessionEvent::PredictionFailed { generation, error }
            | SessionEvent::ExplanationFailed { generation, error } => {
                self.on_failure(generation, &error)
            }
            SessionEvent::ExplanationReady { text, .. } => {
                self.state.active_explanation = Some(text);
                self.state.status = Status::Success;
                self.render();
            }
            SessionEvent::CompletionsReady { candidates, .. } => self.on_completions(candidates),
            SessionEvent::HelpReady { text, .. } => {
                self.state.help = Some(text.unwrap_or_else(|| "No help available.".to_string()));
                self.render();
            }
            SessionEvent::StatusPolled(snapshot) => {
                if self.state.snapshot.as_ref() != Some(&snapshot) {
                    self.state.snapshot = Some(snapshot);
                    self.render();
                }
            }
            SessionEvent::IdleFired { generation } => self.on_idle(generation),
            SessionEvent::AnimationTick { generation } => {
                if let Status::InFlight { frame } = self.state.status {
                    self.state.status = Status::InFlight {
                        frame: frame.wrapping_add(1),
                    };
                    self.effects.push(Effect::ScheduleAnimation { generation });
                    self.render();
                }
            }
        }
    }

    fn render(&mut self) {
        if !self.effects.contains(&Effect::Render) {
            self.effects.push(Effect::Render);
        }
    }

    fn on_key(&mut self, key: Key) {
        match key {
            Key::Char(ch) if !ch.is_control() => self.insert(&ch.to_string()),
            Key::Paste(text) => self.paste(&text),
            Key::Enter | Key::Ctrl('j') | Key::Ctrl('m') => self.submit(),
            Key::Backspace | Key::Ctrl('h') => self.delete_backward(),
            Key::Delete => self.delete_forward(),
            Key::Left | Key::Ctrl('b') => self.move_cursor(-1),
            Key::Right | Key::Ctrl('f') => {
                if self.state.cursor_at_end() && self.state.visible_suggestion().is_some() {
                    self.accept_suggestion();
                } else {
                    self.move_cursor(1);
                }
            }
            Key::Home | Key::Ctrl('a') => self.set_cursor(0),
            Key::End | Key::Ctrl('e') => {
                if self.state.cursor_at_end() && self.state.visible_suggestion().is_some() {
                    self.accept_suggestion();
                } else {
                    let end = self.state.buffer.chars().count();
                    self.set_cursor(end);
                }
            }
            Key::Tab => {
                if self.state.visible_suggestion().is_some() {
                    self.accept_suggestion();
                } else {
                    self.effects.push(Effect::RequestCompletions {
                        generation: self.state.generation,
                        line: self.state.buffer.clone(),
                        cursor: self.state.cursor,
                    });
                }
            }
            Key::Up | Key::Ctrl('p') => self.navigate_history(1),
            Key::Down | Key::Ctrl('n') => self.navigate_history(-1),
            Key::Escape => self.trim_suggestion(),
            Key::Alt('h') | Key::F1 => self.effects.push(Effect::RequestHelp {
                generation: self.state.generation,
                line: self.state.buffer.clone(),
                cursor: self.state.cursor,
            }),
            Key::Ctrl('c') => self.interrupt(),
            Key::Ctrl('d') => {
                if self.state.buffer.is_empty() && self.state.accumulator.is_empty() {
                    self.finish(SessionOutcome::Exit);
                } else {
                    self.delete_forward();
                }
            }
            Key::Ctrl('u') => {
                let cut = self.state.cursor_byte();
                let rest = self.state.buffer[cut..].to_string();
                self.replace_buffer(rest, 0);
            }
            Key::Ctrl('k') => {
                let cut = self.state.cursor_byte();
                let mut kept = self.state.buffer.clone();
                kept.truncate(cut);
                let cursor = self.state.cursor;
                self.replace_buffer(kept, cursor);
            }
            Key::Ctrl('w') => self.delete_word_backward(),
            Key::Ctrl('l') => self.render(),
            Key::Char(_) | Key::Ctrl(_) | Key::Alt(_) | Key::Unknown(_) => {}
        }
    }

    fn insert(&mut self, text: &str) {
        let at = self.state.cursor_byte();
        let mut buffer = self.state.buffer.clone();
        buffer.insert_str(at, text);
        let cursor = self.state.cursor + text.chars().count();
        self.replace_buffer(buffer, cursor);
    }

    /// Pasted newlines behave like Enter so a pasted multi-line command flows
    /// through the completeness check line by line.
    fn paste(&mut self, text: &str) {
        let mut parts = text.split('\n').peekable();
        while let Some(part) = parts.next() {
            let clean: String = part.chars().filter(|ch| !ch.is_control() || *ch == '\t').collect();
            if !clean.is_empty() {
                self.insert(&clean);
            }
            if parts.peek().is_some() {
                self.submit();
                if self.state.terminated {
                    return;
                }
            }
        }
    }

    fn delete_backward(&mut self) {
        if self.state.cursor == 0 {
            return;
        }
        let start = byte_offset(&self.state.buffer, self.state.cursor - 1);
        let end = self.state.cursor_byte();
        let mut buffer = self.state.buffer.clone();
        buffer.replace_range(start..end, "");
        let cursor = self.state.cursor - 1;
        self.replace_buffer(buffer, cursor);
    }

    fn delete_forward(&mut self) {
        if self.state.cursor_at_end() {
            return;
        }
        let start = self.state.cursor_byte();
        let end = byte_offset(&self.state.buffer, self.state.cursor + 1);
        let mut buffer = self.state.buffer.clone();
        buffer.replace_range(start..end, "");
        let cursor = self.state.cursor;
        self.replace_buffer(buffer, cursor);
    }

    fn delete_word_backward(&mut self) {
        let chars: Vec<char> = self.state.buffer.chars().collect();
        let mut start = self.state.cursor.min(chars.len());
        while start > 0 && chars[start - 1].is_whitespace() {
            start -= 1;
        }
        while start > 0 && !chars[start - 1].is_whitespace() {
            start -= 1;
        }
        let mut buffer: String = chars[..start].iter().collect();
        buffer.extend(&chars[self.state.cursor.min(chars.len())..]);
        self.replace_buffer(buffer, start);
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.state.buffer.chars().count() as isize;
        let target = (self.state.cursor as isize + delta).clamp(0, len);
        self.set_cursor(target as usize);
    }

    fn set_cursor(&mut self, cursor: usize) {
        if cursor != self.state.cursor {
            self.state.cursor = cursor;
            self.render();
        }
    }

    fn navigate_history(&mut self, direction: isize) {
        let current = self.state.buffer.clone();
        if let Some(text) = self.state.history.navigate(direction, &current) {
            let cursor = text.chars().count();
            self.edit(text, cursor);
        }
    }

    fn accept_suggestion(&mut self) {
        let Some(suffix) = self.state.visible_suggestion().map(str::to_string) else {
            return;
        };
        let mut buffer = self.state.buffer.clone();
        buffer.push_str(&suffix);
        let cursor = buffer.chars().count();
        self.replace_buffer(buffer, cursor);
    }

    /// Typed edits leave history navigation; history recalls do not.
    fn replace_buffer(&mut self, buffer: String, cursor: usize) {
        self.state.history.reset_navigation();
        self.edit(buffer, cursor);
    }

    /// Common path for every change to the buffer text.
    fn edit(&mut self, buffer: String, cursor: usize) {
        if buffer == self.state.buffer {
            self.set_cursor(cursor);
            return;
        }
        let was_dirty = self.state.dirty;

        self.state.buffer = buffer;
        self.state.cursor = cursor;
        self.state.generation += 1;
        self.state.dirty = true;
        self.state.suppressed = false;
        self.state.idle_hint = false;
        self.state.completions.clear();
        self.state.help = None;
        let generation = self.state.generation;
        self.render();
        self.schedule_idle();

        if self.state.buffer.is_empty() {
            if was_dirty {
                self.state.hint = self.state.default_hint.clone();
            }
            self.clear_suggestion();
            self.state.status = Status::Idle;
            return;
        }

        if self.config.is_agent_input(&self.state.buffer) {
            self.clear_suggestion();
            self.state.status = Status::Idle;
            return;
        }

        let reusable = self
            .state
            .active_prediction
            .as_deref()
            .is_some_and(|prediction| prediction.starts_with(self.state.buffer.as_str()));
        if reusable {
            // The pending tick carries the retired generation.
            self.rearm_animation();
            if self.state.active_explanation.is_none() {
                if let Some(prediction) = self.state.active_prediction.clone() {
                    self.request_explanation(prediction);
                }
            }
            return;
        }

        self.clear_suggestion();
        self.state.status = Status::Idle;
        self.effects.push(Effect::ScheduleDebounce { generation });
    }

    fn clear_suggestion(&mut self) {
        self.state.active_prediction = None;
        self.state.active_explanation = None;
        self.state.context = None;
    }

    fn schedule_idle(&mut self) {
        if !self.state.idle_check_pending {
            self.state.idle_check_pending = true;
            self.effects.push(Effect::ScheduleIdle {
                generation: self.state.generation,
            });
        }
    }

    fn set_in_flight(&mut self) {
        if !self.state.status.is_in_flight() {
            self.state.status = Status::InFlight { frame: 0 };
            self.effects.push(Effect::ScheduleAnimation {
                generation: self.state.generation,
            });
        }
    }

    fn rearm_animation(&mut self) {
        if self.state.status.is_in_flight() {
            self.effects.push(Effect::ScheduleAnimation {
                generation: self.state.generation,
            });
        }
    }

    fn request_explanation(&mut self, text: String) {
        self.set_in_flight();
        self.effects.push(Effect::RequestExplanation {
            generation: self.state.generation,
            text,
        });
        self.render();
    }

    fn on_debounce(&mut self, generation: Generation) {
        let buffer = self.state.buffer.clone();
        if buffer.is_empty() {
            return;
        }
        if self.config.is_agent_input(&buffer) {
            self.state.status = Status::Idle;
            self.render();
            return;
        }
        if self.state.suppressed {
            self.request_explanation(buffer);
            return;
        }
        self.set_in_flight();
        self.effects.push(Effect::RequestPrediction {
            generation,
            text: buffer,
        });
        self.render();
    }

    fn on_prediction(&mut self, generation: Generation, prediction: Prediction) {
        if self.state.suppressed {
            return;
        }
        let extends_buffer = prediction.text.len() > self.state.buffer.len()
            && prediction.text.starts_with(self.state.buffer.as_str());
        if !extends_buffer {
            tracing::debug!(generation, "prediction does not extend the buffer");
            self.clear_suggestion();
            self.state.status = Status::Idle;
            self.render();
            return;
        }

        self.state.context = Some(prediction.context);
        self.state.active_prediction = Some(prediction.text.clone());
        self.state.active_explanation = None;
        self.request_explanation(prediction.text);
    }

    fn on_failure(&mut self, generation: Generation, error: &ProviderError) {
        tracing::warn!(generation, service = error.service(), error = %error, "suggestion request failed");
        self.state.last_error = Some(LastError {
            generation,
            message: error.to_string(),
        });
        self.clear_suggestion();
        self.state.status = Status::Error;
        self.render();
    }

    fn on_completions(&mut self, candidates: Vec<String>) {
        let chars: Vec<char> = self.state.buffer.chars().collect();
        let cursor = self.state.cursor.min(chars.len());
        let mut word_start = cursor;
        while word_start > 0 && !chars[word_start - 1].is_whitespace() {
            word_start -= 1;
        }
        let word: String = chars[word_start..cursor].iter().collect();

        let replacement = match candidates.as_slice() {
            [] => None,
            [only] => Some(only.clone()),
            many => {
                self.state.completions = many.to_vec();
                Some(common_prefix(many))
                    .filter(|prefix| prefix.len() > word.len() && prefix.starts_with(word.as_str()))
            }
        };
        if candidates.is_empty() {
            self.state.completions.clear();
        }

        let Some(replacement) = replacement else {
            self.render();
            return;
        };
        let completions = std::mem::take(&mut self.state.completions);
        let mut buffer: String = chars[..word_start].iter().collect();
        buffer.push_str(&replacement);
        let new_cursor = buffer.chars().count();
        buffer.extend(&chars[cursor..]);
        self.replace_buffer(buffer, new_cursor);
        if completions.len() > 1 {
            self.state.completions = completions;
        }
    }

    fn on_idle(&mut self, generation: Generation) {
        self.state.idle_check_pending = false;
        if generation != self.state.generation {
            self.schedule_idle();
            return;
        }
        if !self.state.buffer.is_empty() && self.state.visible_suggestion().is_some() {
            self.state.idle_hint = true;
            self.render();
        }
    }

    fn trim_suggestion(&mut self) {
        if self.state.suppressed {
            return;
        }
        self.clear_suggestion();
        self.state.hint = None;
        self.state.suppressed = true;
        self.state.idle_hint = false;
        self.state.completions.clear();
        self.state.status = Status::Idle;
        self.state.generation += 1;
        self.render();
        if !self.state.buffer.is_empty() && !self.config.is_agent_input(&self.state.buffer) {
            self.effects.push(Effect::ScheduleDebounce {
                generation: self.state.generation,
            });
        }
    }

    fn submit(&mut self) {
        let line = std::mem::take(&mut self.state.buffer);
        let status = self.state.accumulator.add_line(&line);
        if let LineStatus::Incomplete(pending) = status {
            tracing::debug!(?pending, "awaiting continuation line");
            self.state.cursor = 0;
            self.state.generation += 1;
            self.state.history.reset_navigation();
            self.clear_suggestion();
            self.state.hint = None;
            self.state.suppressed = false;
            self.state.completions.clear();
            self.state.help = None;
            self.state.idle_hint = false;
            self.state.status = Status::Idle;
            self.render();
            return;
        }

        self.state.buffer = line;
        self.state.cursor = self.state.buffer.chars().count();
        let mut prior = self.state.accumulator.lines().to_vec();
        prior.pop();
        self.state.committed_lines = prior;
        let command = self.state.accumulator.complete();
        self.state.history.push(&command);
        self.finish(SessionOutcome::Committed(command));
    }

    fn interrupt(&mut self) {
        let outcome = SessionOutcome::Interrupted {
            lines: self.state.accumulator.lines().to_vec(),
            partial: self.state.buffer.clone(),
        };
        self.state.interrupted = true;
        self.finish(outcome);
    }

    fn finish(&mut self, outcome: SessionOutcome) {
        self.state.terminated = true;
        self.state.status = Status::Idle;
        self.render();
        if !self.state.interrupted {
            self.effects.push(Effect::RecordAnalytics {
                context: self.state.context.clone().unwrap_or_default(),
                prediction: self.state.active_prediction.clone().unwrap_or_default(),
                final_result: outcome.result_text().to_string(),
            });
        }
        self.state.outcome = Some(outcome.clone());
        self.effects.push(Effect::Finish(outcome));
    }
}

fn common_prefix(words: &[String]) -> String {
    let Some((first, rest)) = words.split_first() else {
        return String::new();
    };
    let mut end = first.len();
    for word in rest {
        end = first
            .char_indices()
            .zip(word.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map_or(0, |((idx, ch), _)| idx + ch.len_utf8())
            .min(end);
    }
    first[..end].to_string()
}

#[cfg(test)]
mod tests {
    use suggest_provider::{Prediction, ProviderError};

    use super::{common_prefix, reduce};
    use crate::core::keys::Key;
    use crate::session::event::{Effect, SessionEvent};
    use crate::session::state::{History, SessionConfig, SessionOutcome, SessionState, Status};

    fn config() -> SessionConfig {
        SessionConfig::default()
    }

    fn state() -> SessionState {
        SessionState::new("$ ", History::default(), None)
    }

    fn feed(state: SessionState, events: Vec<SessionEvent>) -> (SessionState, Vec<Effect>) {
        let config = config();
        let mut effects = Vec::new();
        let mut state = state;
        for event in events {
            let (next, mut produced) = reduce(state, event, &config);
            state = next;
            effects.append(&mut produced);
        }
        (state, effects)
    }

    fn typed(text: &str) -> Vec<SessionEvent> {
        text.chars().map(|ch| SessionEvent::Key(Key::Char(ch))).collect()
    }

    #[test]
    fn typing_bumps_generation_and_debounces() {
        let (state, effects) = feed(state(), typed("gi"));
        assert_eq!(state.buffer, "gi");
        assert_eq!(state.cursor, 2);
        assert_eq!(state.generation, 2);
        assert!(state.dirty);
        assert!(effects.contains(&Effect::ScheduleDebounce { generation: 1 }));
        assert!(effects.contains(&Effect::ScheduleDebounce { generation: 2 }));
        assert_eq!(
            effects
                .iter()
                .filter(|effect| matches!(effect, Effect::ScheduleIdle { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn debounce_issues_prediction_and_starts_animation() {
        let (state, _) = feed(state(), typed("gi"));
        let (state, effects) = feed(state, vec![SessionEvent::DebounceFired { generation: 2 }]);
        assert_eq!(state.status, Status::InFlight { frame: 0 });
        assert!(effects.contains(&Effect::RequestPrediction {
            generation: 2,
            text: "gi".into()
        }));
        assert!(effects.contains(&Effect::ScheduleAnimation { generation: 2 }));
    }

    #[test]
    fn stale_debounce_is_ignored() {
        let (state, _) = feed(state(), typed("gi"));
        let before = state.clone();
        let (after, effects) = feed(state, vec![SessionEvent::DebounceFired { generation: 1 }]);
        assert_eq!(after, before);
        assert!(effects.is_empty());
    }

    #[test]
    fn prediction_then_explanation_reaches_success() {
        let (state, _) = feed(state(), typed("git"));
        let (state, effects) = feed(
            state,
            vec![
                SessionEvent::DebounceFired { generation: 3 },
                SessionEvent::PredictionReady {
                    generation: 3,
                    prediction: Prediction::new("git status", "ctx"),
                },
            ],
        );
        assert_eq!(state.active_prediction.as_deref(), Some("git status"));
        assert_eq!(state.visible_suggestion(), Some(" status"));
        assert!(effects.contains(&Effect::RequestExplanation {
            generation: 3,
            text: "git status".into()
        }));

        let (state, _) = feed(
            state,
            vec![SessionEvent::ExplanationReady {
                generation: 3,
                text: "Shows the working tree status.".into(),
            }],
        );
        assert_eq!(state.status, Status::Success);
        assert_eq!(
            state.active_explanation.as_deref(),
            Some("Shows the working tree status.")
        );
    }

    #[test]
    fn animation_rearms_only_while_in_flight() {
        let (state, _) = feed(state(), typed("l"));
        let (state, _) = feed(state, vec![SessionEvent::DebounceFired { generation: 1 }]);
        let (state, effects) = feed(state, vec![SessionEvent::AnimationTick { generation: 1 }]);
        assert_eq!(state.status, Status::InFlight { frame: 1 });
        assert!(effects.contains(&Effect::ScheduleAnimation { generation: 1 }));

        let (state, _) = feed(
            state,
            vec![SessionEvent::PredictionFailed {
                generation: 1,
                error: ProviderError::failed("predictor", "boom"),
            }],
        );
        let (_, effects) = feed(state, vec![SessionEvent::AnimationTick { generation: 1 }]);
        assert!(effects.is_empty());
    }

    #[test]
    fn escape_trims_and_explains_buffer_instead() {
        let (state, _) = feed(state(), typed("git"));
        let (state, _) = feed(
            state,
            vec![
                SessionEvent::DebounceFired { generation: 3 },
                SessionEvent::PredictionReady {
                    generation: 3,
                    prediction: Prediction::new("git status", "ctx"),
                },
                SessionEvent::Key(Key::Escape),
            ],
        );
        assert!(state.suppressed);
        assert_eq!(state.active_prediction, None);
        assert_eq!(state.generation, 4);
        assert_eq!(state.visible_suggestion(), None);

        let (state, effects) = feed(state, vec![SessionEvent::DebounceFired { generation: 4 }]);
        assert!(effects.contains(&Effect::RequestExplanation {
            generation: 4,
            text: "git".into()
        }));
        assert!(!effects
            .iter()
            .any(|effect| matches!(effect, Effect::RequestPrediction { .. })));
        assert!(state.suppressed);
    }

    #[test]
    fn tab_accepts_visible_suggestion_or_requests_completions() {
        let (state, effects) = feed(state(), vec![SessionEvent::Key(Key::Tab)]);
        assert!(effects.contains(&Effect::RequestCompletions {
            generation: 0,
            line: String::new(),
            cursor: 0
        }));

        let (state, _) = feed(state, typed("gi"));
        let (state, _) = feed(
            state,
            vec![
                SessionEvent::DebounceFired { generation: 2 },
                SessionEvent::PredictionReady {
                    generation: 2,
                    prediction: Prediction::new("git push", "ctx"),
                },
                SessionEvent::Key(Key::Tab),
            ],
        );
        assert_eq!(state.buffer, "git push");
        assert_eq!(state.cursor, 8);
        assert_eq!(state.active_prediction.as_deref(), Some("git push"));
    }

    #[test]
    fn completions_replace_word_or_insert_common_prefix() {
        let (state, _) = feed(state(), typed("echo gi"));
        let generation = state.generation;
        let (state, _) = feed(
            state,
            vec![SessionEvent::CompletionsReady {
                generation,
                candidates: vec!["git".into()],
            }],
        );
        assert_eq!(state.buffer, "echo git");

        let (state, _) = feed(state, typed(" c"));
        let generation = state.generation;
        let (state, _) = feed(
            state,
            vec![SessionEvent::CompletionsReady {
                generation,
                candidates: vec!["checkout".into(), "cherry-pick".into()],
            }],
        );
        assert_eq!(state.buffer, "echo git che");
        assert_eq!(state.completions, ["checkout", "cherry-pick"]);
    }

    #[test]
    fn help_result_is_shown_and_cleared_by_edits() {
        let (state, effects) = feed(state(), vec![SessionEvent::Key(Key::F1)]);
        assert!(effects
            .iter()
            .any(|effect| matches!(effect, Effect::RequestHelp { generation: 0, .. })));
        let (state, _) = feed(
            state,
            vec![SessionEvent::HelpReady {
                generation: 0,
                text: Some("ls: list".into()),
            }],
        );
        assert_eq!(state.help.as_deref(), Some("ls: list"));
        let (state, _) = feed(state, typed("l"));
        assert_eq!(state.help, None);
    }

    #[test]
    fn idle_fired_on_stale_generation_reschedules() {
        let (state, _) = feed(state(), typed("gi"));
        assert!(state.idle_check_pending);
        let (state, effects) = feed(state, vec![SessionEvent::IdleFired { generation: 1 }]);
        assert_eq!(effects, vec![Effect::ScheduleIdle { generation: 2 }]);
        assert!(state.idle_check_pending);
        assert!(!state.idle_hint);
    }

    #[test]
    fn editing_keys() {
        let (state, _) = feed(state(), typed("git push origin"));
        let (state, _) = feed(state, vec![SessionEvent::Key(Key::Ctrl('w'))]);
        assert_eq!(state.buffer, "git push ");
        let (state, _) = feed(
            state,
            vec![
                SessionEvent::Key(Key::Ctrl('a')),
                SessionEvent::Key(Key::Right),
                SessionEvent::Key(Key::Ctrl('k')),
            ],
        );
        assert_eq!(state.buffer, "g");
        let (state, _) = feed(state, vec![SessionEvent::Key(Key::Ctrl('u'))]);
        assert_eq!(state.buffer, "");
        assert_eq!(state.cursor, 0);
    }

    #[test]
    fn ctrl_d_on_empty_buffer_exits() {
        let (state, effects) = feed(state(), vec![SessionEvent::Key(Key::Ctrl('d'))]);
        assert!(state.terminated);
        assert!(effects.contains(&Effect::Finish(SessionOutcome::Exit)));
        assert!(effects.contains(&Effect::RecordAnalytics {
            context: String::new(),
            prediction: String::new(),
            final_result: "exit".into()
        }));
    }

    #[test]
    fn events_after_termination_are_ignored() {
        let (state, _) = feed(state(), vec![SessionEvent::Key(Key::Ctrl('c'))]);
        let before = state.clone();
        let (after, effects) = feed(state, typed("x"));
        assert_eq!(after, before);
        assert!(effects.is_empty());
    }

    #[test]
    fn paste_with_newlines_submits_each_line() {
        let (state, effects) = feed(
            state(),
            vec![SessionEvent::Key(Key::Paste("for i in 1 2; do\necho $i\ndone".into()))],
        );
        assert!(!state.terminated);
        assert_eq!(state.buffer, "done");
        assert_eq!(state.accumulator.lines(), ["for i in 1 2; do", "echo $i"]);
        assert!(!effects.iter().any(|effect| matches!(effect, Effect::Finish(_))));

        let (state, effects) = feed(state, vec![SessionEvent::Key(Key::Enter)]);
        assert!(state.terminated);
        assert!(effects.contains(&Effect::Finish(SessionOutcome::Committed(
            "for i in 1 2; do\necho $i\ndone".into()
        ))));
    }

    #[test]
    fn common_prefix_of_candidates() {
        assert_eq!(common_prefix(&["checkout".into(), "cherry".into()]), "che");
        assert_eq!(common_prefix(&["a".into(), "b".into()]), "");
        assert_eq!(common_prefix(&[]), "");
    }
}
