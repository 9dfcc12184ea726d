//! Run configuration, layered as defaults, RON file, environment, CLI flags.
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use digest_engine::{
    ApiSettings, MonitorSettings, PollSettings, DEFAULT_CHAT_BASE_URL, DEFAULT_EXA_BASE_URL,
    DEFAULT_GMAIL_BASE_URL, DEFAULT_SPEECH_BASE_URL, DEFAULT_VOICE_ID, GMAIL_API_BODY_LIMIT,
    SMTP_BODY_LIMIT,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_TOPIC: &str = "AI and Technology";
const DEFAULT_SENDER: &str = "newsletter@yourcompany.com";
const VISIBLE_SECRET_CHARS: usize = 8;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("environment variable {key} is invalid: {message}")]
    Env { key: &'static str, message: String },
    #[error("{0} is not configured")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub exa: String,
    pub chat: String,
    pub speech: String,
    pub gmail: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            exa: DEFAULT_EXA_BASE_URL.to_string(),
            chat: DEFAULT_CHAT_BASE_URL.to_string(),
            speech: DEFAULT_SPEECH_BASE_URL.to_string(),
            gmail: DEFAULT_GMAIL_BASE_URL.to_string(),
        }
    }
}

/// Hand-tuned limits. Each one was picked by observation, so they stay editable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub enrichment_completion: f64,
    pub truncation_floor: f64,
    pub gmail_api_body_limit: usize,
    pub smtp_body_limit: usize,
    pub audio_max_words: usize,
    pub audio_tail_window: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            enrichment_completion: digest_core::DEFAULT_COMPLETION_THRESHOLD,
            truncation_floor: digest_core::DEFAULT_BOUNDARY_FLOOR,
            gmail_api_body_limit: GMAIL_API_BODY_LIMIT,
            smtp_body_limit: SMTP_BODY_LIMIT,
            audio_max_words: digest_core::speech::DEFAULT_MAX_WORDS,
            audio_tail_window: digest_core::speech::DEFAULT_TAIL_WINDOW,
        }
    }
}

/// Durations in whole seconds so the RON file stays readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub poll_max_wait_secs: u64,
    pub poll_interval_secs: u64,
    pub analyze_poll_interval_secs: u64,
    pub retry_backoff_secs: u64,
    pub max_transport_attempts: u32,
    pub monitor_check_secs: u64,
    pub monitor_error_backoff_secs: u64,
    pub request_timeout_secs: u64,
    pub voice_target_secs: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            poll_max_wait_secs: 120,
            poll_interval_secs: 10,
            analyze_poll_interval_secs: 30,
            retry_backoff_secs: 2,
            max_transport_attempts: 3,
            monitor_check_secs: 30,
            monitor_error_backoff_secs: 10,
            request_timeout_secs: 60,
            voice_target_secs: 180,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub exa_api_key: Option<String>,
    pub perplexity_api_key: Option<String>,
    pub elevenlabs_api_key: Option<String>,
    pub voice_id: String,
    pub topic: String,
    pub max_articles: u32,
    pub sender_email: String,
    pub recipient_emails: Vec<String>,
    pub gmail_user: Option<String>,
    pub gmail_app_password: Option<String>,
    pub gmail_token_file: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub endpoints: Endpoints,
    pub thresholds: Thresholds,
    pub timing: Timing,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            exa_api_key: None,
            perplexity_api_key: None,
            elevenlabs_api_key: None,
            voice_id: DEFAULT_VOICE_ID.to_string(),
            topic: DEFAULT_TOPIC.to_string(),
            max_articles: 8,
            sender_email: DEFAULT_SENDER.to_string(),
            recipient_emails: Vec::new(),
            gmail_user: None,
            gmail_app_password: None,
            gmail_token_file: None,
            output_dir: PathBuf::from("."),
            endpoints: Endpoints::default(),
            thresholds: Thresholds::default(),
            timing: Timing::default(),
        }
    }
}

impl AppConfig {
    /// Defaults, overlaid by the RON file at `path` when one is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&content).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    fn from_ron(content: &str) -> Result<Self, String> {
        ron::from_str(content).map_err(|err| err.to_string())
    }

    /// Overlays environment variables. Empty values count as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = get("EXA_API_KEY") {
            self.exa_api_key = Some(value);
        }
        if let Some(value) = get("PERPLEXITY_API_KEY") {
            self.perplexity_api_key = Some(value);
        }
        if let Some(value) = get("ELEVENLABS_API_KEY") {
            self.elevenlabs_api_key = Some(value);
        }
        if let Some(value) = get("ELEVENLABS_VOICE_ID") {
            self.voice_id = value;
        }
        if let Some(value) = get("NEWSLETTER_TOPIC") {
            self.topic = value;
        }
        if let Some(value) = get("MAX_ARTICLES") {
            self.max_articles = value.trim().parse().map_err(|err| ConfigError::Env {
                key: "MAX_ARTICLES",
                message: format!("{value:?}: {err}"),
            })?;
        }
        if let Some(value) = get("SENDER_EMAIL") {
            self.sender_email = value;
        }
        if let Some(value) = get("RECIPIENT_EMAILS") {
            self.recipient_emails = split_list(&value);
        }
        if let Some(value) = get("GMAIL_USER") {
            self.gmail_user = Some(value);
        }
        if let Some(value) = get("GMAIL_APP_PASSWORD") {
            self.gmail_app_password = Some(value);
        }
        if let Some(value) = get("GMAIL_TOKEN_FILE") {
            self.gmail_token_file = Some(PathBuf::from(value));
        }
        Ok(())
    }

    pub fn exa_key(&self) -> Result<&str, ConfigError> {
        self.exa_api_key
            .as_deref()
            .ok_or(ConfigError::Missing("EXA_API_KEY"))
    }

    pub fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            request_timeout: Duration::from_secs(self.timing.request_timeout_secs),
            ..ApiSettings::default()
        }
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            max_wait: Duration::from_secs(self.timing.poll_max_wait_secs),
            interval: Duration::from_secs(self.timing.poll_interval_secs),
            completion_threshold: self.thresholds.enrichment_completion,
            retry_backoff: Duration::from_secs(self.timing.retry_backoff_secs),
            max_transport_attempts: self.timing.max_transport_attempts,
        }
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            check_interval: Duration::from_secs(self.timing.monitor_check_secs),
            error_backoff: Duration::from_secs(self.timing.monitor_error_backoff_secs),
        }
    }

    /// Key names with masked values, for start-up diagnostics.
    pub fn masked_keys(&self) -> Vec<(&'static str, String)> {
        let show = |value: &Option<String>| match value {
            Some(secret) => mask_secret(secret),
            None => "not set".to_string(),
        };
        vec![
            ("EXA_API_KEY", show(&self.exa_api_key)),
            ("PERPLEXITY_API_KEY", show(&self.perplexity_api_key)),
            ("ELEVENLABS_API_KEY", show(&self.elevenlabs_api_key)),
            ("GMAIL_APP_PASSWORD", show(&self.gmail_app_password)),
        ]
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Replaces all but the last 8 characters with `*`. Secrets of 8 characters
/// or fewer are masked entirely.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= VISIBLE_SECRET_CHARS {
        return "*".repeat(chars.len());
    }
    let hidden = chars.len() - VISIBLE_SECRET_CHARS;
    let tail: String = chars[hidden..].iter().collect();
    format!("{}{tail}", "*".repeat(hidden))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn ron_file_overrides_defaults_partially() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("digest.ron");
        fs::write(
            &path,
            r#"(topic: "Robotics", timing: (poll_max_wait_secs: 300), thresholds: (smtp_body_limit: 1000))"#,
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.topic, "Robotics");
        assert_eq!(config.timing.poll_max_wait_secs, 300);
        assert_eq!(config.timing.poll_interval_secs, 10);
        assert_eq!(config.thresholds.smtp_body_limit, 1000);
        assert_eq!(config.thresholds.gmail_api_body_limit, 20_000);
        assert_eq!(config.voice_id, DEFAULT_VOICE_ID);
    }

    #[test]
    fn unreadable_or_invalid_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let missing = AppConfig::load(Some(&temp.path().join("absent.ron")));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));

        let path = temp.path().join("bad.ron");
        fs::write(&path, "(topic: ").unwrap();
        assert!(matches!(
            AppConfig::load(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut config = AppConfig {
            topic: "From file".into(),
            ..AppConfig::default()
        };
        let vars = env(&[
            ("EXA_API_KEY", "exa-key"),
            ("NEWSLETTER_TOPIC", "Quantum"),
            ("MAX_ARTICLES", " 12 "),
            ("RECIPIENT_EMAILS", "a@example.com, ,b@example.com"),
            ("ELEVENLABS_API_KEY", "   "),
        ]);
        config.apply_env(|key| vars.get(key).cloned()).unwrap();

        assert_eq!(config.exa_key().unwrap(), "exa-key");
        assert_eq!(config.topic, "Quantum");
        assert_eq!(config.max_articles, 12);
        assert_eq!(
            config.recipient_emails,
            vec!["a@example.com".to_string(), "b@example.com".to_string()]
        );
        assert_eq!(config.elevenlabs_api_key, None);
    }

    #[test]
    fn bad_number_in_environment_is_reported() {
        let mut config = AppConfig::default();
        let vars = env(&[("MAX_ARTICLES", "many")]);
        let err = config.apply_env(|key| vars.get(key).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::Env { key: "MAX_ARTICLES", .. }));
    }

    #[test]
    fn missing_exa_key_is_reported_by_name() {
        let err = AppConfig::default().exa_key().unwrap_err();
        assert_eq!(err.to_string(), "EXA_API_KEY is not configured");
    }

    #[test]
    fn settings_follow_configured_timing() {
        let mut config = AppConfig::default();
        config.timing.poll_interval_secs = 30;
        config.thresholds.enrichment_completion = 0.5;
        let poll = config.poll_settings();
        assert_eq!(poll.interval, Duration::from_secs(30));
        assert_eq!(poll.max_wait, Duration::from_secs(120));
        assert!(poll.validate().is_ok());
        assert_eq!(
            config.monitor_settings().error_backoff,
            Duration::from_secs(10)
        );
    }

    #[test]
    fn secrets_keep_only_last_eight_characters() {
        assert_eq!(mask_secret("sk-1234567890abcdef"), "***********90abcdef");
        assert_eq!(mask_secret("12345678"), "********");
        assert_eq!(mask_secret("abc"), "***");
        assert_eq!(mask_secret(""), "");
    }
}
