//! Environment configuration.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::logging::LogConfig;

pub const DEFAULT_DEBOUNCE_MS: u64 = 200;
pub const DEFAULT_IDLE_MS: u64 = 4000;
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 100;
pub const DEFAULT_ANIMATION_MS: u64 = 80;
pub const DEFAULT_POLL_MS: u64 = 5000;
pub const DEFAULT_AGENT_SENTINEL: char = '@';
pub const DEFAULT_CONTINUATION: &str = "> ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptConfig {
    /// Quiet period after an edit before a prediction is requested.
    pub debounce: Duration,
    /// Quiet period before the idle hint is considered.
    pub idle: Duration,
    pub probe_timeout: Duration,
    /// In-flight spinner frame interval.
    pub animation: Duration,
    /// Status poller interval.
    pub poll_interval: Duration,
    /// Leading character that marks agent/control input; such input is never predicted.
    pub agent_sentinel: char,
    /// Prompt shown in front of continuation lines.
    pub continuation: String,
    pub probe_enabled: bool,
    pub log: LogConfig,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            idle: Duration::from_millis(DEFAULT_IDLE_MS),
            probe_timeout: Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS),
            animation: Duration::from_millis(DEFAULT_ANIMATION_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_MS),
            agent_sentinel: DEFAULT_AGENT_SENTINEL,
            continuation: DEFAULT_CONTINUATION.to_string(),
            probe_enabled: true,
            log: LogConfig::default(),
        }
    }
}

impl PromptConfig {
    pub fn from_env() -> Self {
        Self {
            debounce: env_millis("GHOST_PROMPT_DEBOUNCE_MS", DEFAULT_DEBOUNCE_MS),
            idle: env_millis("GHOST_PROMPT_IDLE_MS", DEFAULT_IDLE_MS),
            probe_timeout: env_millis("GHOST_PROMPT_PROBE_TIMEOUT_MS", DEFAULT_PROBE_TIMEOUT_MS),
            animation: env_millis("GHOST_PROMPT_ANIMATION_MS", DEFAULT_ANIMATION_MS),
            poll_interval: env_millis("GHOST_PROMPT_POLL_MS", DEFAULT_POLL_MS),
            agent_sentinel: env_string_opt("GHOST_PROMPT_AGENT_SENTINEL")
                .and_then(|value| value.trim().chars().next())
                .unwrap_or(DEFAULT_AGENT_SENTINEL),
            continuation: env_string_opt("GHOST_PROMPT_CONTINUATION")
                .unwrap_or_else(|| DEFAULT_CONTINUATION.to_string()),
            probe_enabled: !env_flag("GHOST_PROMPT_NO_PROBE"),
            log: LogConfig {
                file: env_string_opt("GHOST_PROMPT_LOG").map(PathBuf::from),
                level: env_string_opt("GHOST_PROMPT_LOG_LEVEL")
                    .unwrap_or_else(|| LogConfig::DEFAULT_LEVEL.to_string()),
            },
        }
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key).map(|value| value == "1").unwrap_or(false)
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

fn env_millis(key: &str, default_ms: u64) -> Duration {
    let millis = match env_string_opt(key) {
        Some(value) => match value.trim().parse::<u64>() {
            Ok(millis) => millis,
            Err(_) => {
                tracing::warn!(key, value = %value, "ignoring non-numeric duration");
                default_ms
            }
        },
        None => default_ms,
    };
    Duration::from_millis(millis)
}

#[cfg(test)]
mod tests {
    use super::PromptConfig;
    use std::env;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    const KEYS: [&str; 10] = [
        "GHOST_PROMPT_DEBOUNCE_MS",
        "GHOST_PROMPT_IDLE_MS",
        "GHOST_PROMPT_PROBE_TIMEOUT_MS",
        "GHOST_PROMPT_ANIMATION_MS",
        "GHOST_PROMPT_POLL_MS",
        "GHOST_PROMPT_AGENT_SENTINEL",
        "GHOST_PROMPT_CONTINUATION",
        "GHOST_PROMPT_NO_PROBE",
        "GHOST_PROMPT_LOG",
        "GHOST_PROMPT_LOG_LEVEL",
    ];

    struct EnvGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.previous {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
            .lock()
            .expect("env lock poisoned")
    }

    fn set_env_guard(key: &'static str, value: Option<&str>) -> EnvGuard {
        let previous = env::var(key).ok();
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
        EnvGuard { key, previous }
    }

    fn clear_all() -> Vec<EnvGuard> {
        KEYS.iter().map(|key| set_env_guard(key, None)).collect()
    }

    #[test]
    fn env_defaults_match_reference_timings() {
        let _lock = env_lock();
        let _guards = clear_all();

        let config = PromptConfig::from_env();
        assert_eq!(config, PromptConfig::default());
        assert_eq!(config.debounce, Duration::from_millis(200));
        assert_eq!(config.probe_timeout, Duration::from_millis(100));
        assert_eq!(config.agent_sentinel, '@');
        assert!(config.probe_enabled);
        assert!(config.log.file.is_none());
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn env_overrides_apply() {
        let _lock = env_lock();
        let _guards = clear_all();
        let _g1 = set_env_guard("GHOST_PROMPT_DEBOUNCE_MS", Some("50"));
        let _g2 = set_env_guard("GHOST_PROMPT_AGENT_SENTINEL", Some("/"));
        let _g3 = set_env_guard("GHOST_PROMPT_NO_PROBE", Some("1"));
        let _g4 = set_env_guard("GHOST_PROMPT_LOG", Some("/tmp/ghost.log"));
        let _g5 = set_env_guard("GHOST_PROMPT_CONTINUATION", Some("... "));

        let config = PromptConfig::from_env();
        assert_eq!(config.debounce, Duration::from_millis(50));
        assert_eq!(config.agent_sentinel, '/');
        assert!(!config.probe_enabled);
        assert_eq!(config.log.file, Some(PathBuf::from("/tmp/ghost.log")));
        assert_eq!(config.continuation, "... ");
    }

    #[test]
    fn empty_or_invalid_values_fall_back() {
        let _lock = env_lock();
        let _guards = clear_all();
        let _g1 = set_env_guard("GHOST_PROMPT_LOG", Some(""));
        let _g2 = set_env_guard("GHOST_PROMPT_IDLE_MS", Some("soon"));
        let _g3 = set_env_guard("GHOST_PROMPT_NO_PROBE", Some("yes"));

        let config = PromptConfig::from_env();
        assert!(config.log.file.is_none());
        assert_eq!(config.idle, Duration::from_millis(4000));
        assert!(config.probe_enabled);
    }
}
