use std::sync::Arc;
use std::time::Duration;

use ghost_prompt::{init_logging, PromptConfig, Session, SessionOutcome, StatusSnapshot, SuggestionProviders};
use suggest_provider_mock::{
    MockExplainer, MockPredictor, RecordingAnalytics, ScriptedPoller, StaticCompletions,
};

const HISTORY: [&str; 3] = ["cargo build", "git log --oneline", "ls -la"];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = PromptConfig::from_env();
    if init_logging(&config.log)? {
        tracing::info!("interactive prompt demo starting");
    }

    let analytics = Arc::new(RecordingAnalytics::default());
    let providers = SuggestionProviders::new(
        Arc::new(MockPredictor::default().with_delay(Duration::from_millis(120))),
        Arc::new(MockExplainer::default()),
    )
    .with_analytics(Arc::clone(&analytics) as Arc<dyn ghost_prompt::Analytics>)
    .with_completions(Arc::new(StaticCompletions::default()))
    .with_poller(Arc::new(ScriptedPoller::new(vec![Ok(Some(
        StatusSnapshot::new("demo", "mock providers"),
    ))])));

    let mut history: Vec<String> = HISTORY.iter().map(|entry| entry.to_string()).collect();
    let mut session = Session::interactive(providers)?;

    loop {
        let outcome = session.start("demo$ ", &history, Some("try: git st"))?;
        match &outcome {
            SessionOutcome::Committed(command) => {
                println!("committed: {command}");
                history.push(command.clone());
            }
            SessionOutcome::Interrupted { .. } => {
                for line in outcome.display_lines() {
                    println!("interrupted: {line}");
                }
            }
            SessionOutcome::Exit => break,
        }
    }

    for (context, prediction, final_result) in analytics.entries() {
        println!("analytics: context={context:?} prediction={prediction:?} final={final_result:?}");
    }
    Ok(())
}
