mod fixture;

use std::sync::Arc;
use std::time::Duration;

use fixture::{keys, visible_text, ScriptedTerminal, Step};
use ghost_prompt::{Key, NoProbe, PromptConfig, Session, SessionOutcome, SuggestionProviders};
use pretty_assertions::assert_eq;
use suggest_provider_mock::{MockExplainer, MockPredictor, RecordingAnalytics, StaticCompletions};

fn fast_config() -> PromptConfig {
    PromptConfig {
        debounce: Duration::from_millis(5),
        idle: Duration::from_millis(50),
        animation: Duration::from_millis(5),
        probe_enabled: false,
        ..PromptConfig::default()
    }
}

fn providers(analytics: Arc<RecordingAnalytics>) -> SuggestionProviders {
    SuggestionProviders::new(
        Arc::new(MockPredictor::default()),
        Arc::new(MockExplainer::default()),
    )
    .with_analytics(analytics)
    .with_completions(Arc::new(StaticCompletions::default()))
}

fn run(
    script: Vec<Step>,
    analytics: Arc<RecordingAnalytics>,
) -> (SessionOutcome, ScriptedTerminal) {
    let mut session = Session::new(ScriptedTerminal::new(script), providers(analytics))
        .with_config(fast_config())
        .with_probe(Box::new(NoProbe));
    let outcome = session.start("$ ", &[], None).expect("session runs");
    (outcome, session.into_terminal())
}

#[test]
fn typed_line_is_committed_and_recorded_once() {
    let analytics = Arc::new(RecordingAnalytics::default());
    let mut script = keys("echo hi");
    script.push(Step::Key(Key::Enter));

    let (outcome, terminal) = run(script, Arc::clone(&analytics));

    assert_eq!(outcome, SessionOutcome::Committed("echo hi".to_string()));
    assert!(terminal.was_stopped());
    assert!(visible_text(&terminal.output()).contains("$ echo hi"));
    let entries = analytics.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].2, "echo hi");
}

#[test]
fn accepted_prediction_is_committed() {
    let analytics = Arc::new(RecordingAnalytics::default());
    let mut script = keys("git st");
    script.push(Step::Wait(Duration::from_millis(300)));
    script.push(Step::Key(Key::Tab));
    script.push(Step::Key(Key::Enter));

    let (outcome, _terminal) = run(script, Arc::clone(&analytics));

    assert_eq!(outcome, SessionOutcome::Committed("git status".to_string()));
    let entries = analytics.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].1, "git status");
    assert!(entries[0].0.starts_with("mock-context:g"));
}

#[test]
fn multiline_heredoc_is_joined() {
    let analytics = Arc::new(RecordingAnalytics::default());
    let mut script = keys("cat <<EOF");
    script.push(Step::Key(Key::Enter));
    script.extend(keys("hello"));
    script.push(Step::Key(Key::Enter));
    script.extend(keys("EOF"));
    script.push(Step::Key(Key::Enter));

    let (outcome, terminal) = run(script, analytics);

    assert_eq!(
        outcome,
        SessionOutcome::Committed("cat <<EOF\nhello\nEOF".to_string())
    );
    assert!(visible_text(&terminal.output()).contains("> hello"));
}

#[test]
fn interrupt_mid_multiline_keeps_what_was_on_screen() {
    let analytics = Arc::new(RecordingAnalytics::default());
    let mut script = keys("cat <<EOF");
    script.push(Step::Key(Key::Enter));
    script.extend(keys("hello"));
    script.push(Step::Key(Key::Enter));
    script.extend(keys("wor"));
    script.push(Step::Key(Key::Ctrl('c')));

    let (outcome, terminal) = run(script, Arc::clone(&analytics));

    assert_eq!(
        outcome,
        SessionOutcome::Interrupted {
            lines: vec!["cat <<EOF".to_string(), "hello".to_string()],
            partial: "wor".to_string(),
        }
    );
    assert_eq!(outcome.display_lines(), vec!["cat <<EOF", "hello", "wor^C"]);
    assert!(visible_text(&terminal.output()).contains("> wor^C"));
    assert!(analytics.entries().is_empty());
}

#[test]
fn end_of_input_on_blank_line_exits() {
    let analytics = Arc::new(RecordingAnalytics::default());
    let (outcome, _terminal) = run(vec![Step::Key(Key::Ctrl('d'))], Arc::clone(&analytics));

    assert_eq!(outcome, SessionOutcome::Exit);
    assert_eq!(outcome.result_text(), "exit");
    assert_eq!(analytics.entries().len(), 1);
}

#[test]
fn agent_input_never_reaches_the_predictor() {
    let predictor = Arc::new(MockPredictor::default());
    let providers = SuggestionProviders::new(
        Arc::clone(&predictor) as Arc<dyn ghost_prompt::Predictor>,
        Arc::new(MockExplainer::default()),
    );
    let mut script = keys("@reviewer check this");
    script.push(Step::Wait(Duration::from_millis(100)));
    script.push(Step::Key(Key::Enter));

    let mut session = Session::new(ScriptedTerminal::new(script), providers)
        .with_config(fast_config())
        .with_probe(Box::new(NoProbe));
    let outcome = session.start("$ ", &[], None).expect("session runs");

    assert_eq!(
        outcome,
        SessionOutcome::Committed("@reviewer check this".to_string())
    );
    assert_eq!(predictor.calls(), 0);
}

#[test]
fn history_recall_commits_previous_entry() {
    let analytics = Arc::new(RecordingAnalytics::default());
    let history = vec!["make test".to_string(), "cargo fmt".to_string()];
    let script = vec![
        Step::Key(Key::Up),
        Step::Key(Key::Up),
        Step::Key(Key::Enter),
    ];

    let mut session = Session::new(ScriptedTerminal::new(script), providers(analytics))
        .with_config(fast_config())
        .with_probe(Box::new(NoProbe));
    let outcome = session.start("$ ", &history, None).expect("session runs");

    assert_eq!(outcome, SessionOutcome::Committed("make test".to_string()));
}
