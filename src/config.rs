use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::Validate;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Chat platform configuration
    #[validate(nested)]
    pub slack: SlackConfig,

    /// Correlation and admission configuration
    #[validate(nested)]
    pub relay: RelayConfig,

    /// Issue tracker configuration
    #[serde(default)]
    pub tracker: TrackerConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> std::result::Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: ALERT_RELAY__)
            .add_source(
                config::Environment::with_prefix("ALERT_RELAY")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("slack.channel_ids")
                    .with_list_parse_key("relay.trigger_tags")
                    .with_list_parse_key("tracker.channel_ids")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Check everything the relay needs before it starts serving events.
    ///
    /// Any failure here is fatal: the caller is expected to exit.
    pub fn validate_startup(&self) -> Result<()> {
        self.validate()?;

        self.slack.bot_token()?;

        if !self.relay.patterns_file.is_file() {
            return Err(AppError::Configuration(format!(
                "filter patterns file not found: {}",
                self.relay.patterns_file.display()
            )));
        }

        if self.tracker.enabled {
            if self.tracker.base_url.as_deref().map_or(true, str::is_empty) {
                return Err(AppError::Configuration(
                    "tracker.base_url is required when the tracker is enabled".to_string(),
                ));
            }
            if self.tracker.channel_ids.is_empty() {
                return Err(AppError::Configuration(
                    "tracker.channel_ids must name at least one channel".to_string(),
                ));
            }
            if !self.tracker.issue_template_file.is_file() {
                return Err(AppError::Configuration(format!(
                    "issue template file not found: {}",
                    self.tracker.issue_template_file.display()
                )));
            }
            self.tracker.token()?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SlackConfig {
    /// Web API base URL
    #[serde(default = "default_slack_api_base_url")]
    pub api_base_url: String,

    /// Env var holding the bot token
    #[serde(default = "default_bot_token_env")]
    pub bot_token_env: String,

    /// Env var holding the request signing secret; verification is off when unset
    #[serde(default = "default_signing_secret_env")]
    pub signing_secret_env: String,

    /// Broadcast channel alerts are relayed to
    #[validate(length(min = 1, message = "target channel id is required"))]
    #[serde(default)]
    pub target_channel_id: String,

    /// Source channels whose alerts are relayed
    #[validate(length(min = 1, message = "at least one source channel is required"))]
    #[serde(default)]
    pub channel_ids: Vec<String>,

    /// Reaction applied when the affordance is acknowledged
    #[serde(default = "default_resolution_reaction")]
    pub resolution_reaction: String,

    /// Button label on actionable posts
    #[serde(default = "default_affordance_label")]
    pub affordance_label: String,

    /// Action id carried by the button
    #[serde(default = "default_affordance_action_id")]
    pub affordance_action_id: String,

    /// Outbound request timeout (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl SlackConfig {
    pub fn bot_token(&self) -> Result<String> {
        read_secret(&self.bot_token_env)
    }

    pub fn signing_secret(&self) -> Option<String> {
        read_secret(&self.signing_secret_env).ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RelayConfig {
    /// JSON file holding `{"patterns": [...]}`
    #[serde(default = "default_patterns_file")]
    pub patterns_file: PathBuf,

    /// Severity tags that mark "started"/"resolved" messages as volatile
    #[serde(default = "default_trigger_tags")]
    pub trigger_tags: Vec<String>,

    /// Suppression window for "Issue" alerts (seconds)
    #[validate(range(min = 1))]
    #[serde(default = "default_issue_window")]
    pub issue_window_secs: u64,

    /// Suppression window for "Triggered" alerts (seconds)
    #[validate(range(min = 1))]
    #[serde(default = "default_triggered_window")]
    pub triggered_window_secs: u64,

    /// Trigger count a flapping incident needs before its recovery is announced
    #[validate(range(min = 1))]
    #[serde(default = "default_flap_threshold")]
    pub recovery_flap_threshold: u32,

    /// Inbound queue capacity
    #[validate(range(min = 1))]
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,

    /// How long delivered event ids are remembered (seconds)
    #[serde(default = "default_event_dedup_ttl")]
    pub event_dedup_ttl_secs: u64,
}

impl RelayConfig {
    pub fn issue_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.issue_window_secs as i64)
    }

    pub fn triggered_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.triggered_window_secs as i64)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            patterns_file: default_patterns_file(),
            trigger_tags: default_trigger_tags(),
            issue_window_secs: default_issue_window(),
            triggered_window_secs: default_triggered_window(),
            recovery_flap_threshold: default_flap_threshold(),
            queue_size: default_queue_size(),
            event_dedup_ttl_secs: default_event_dedup_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Enable the ticket bridge
    #[serde(default)]
    pub enabled: bool,

    /// Tracker base URL (REST API lives under `/api/rest`)
    pub base_url: Option<String>,

    /// Env var holding the tracker API token
    #[serde(default = "default_tracker_token_env")]
    pub token_env: String,

    /// Channels whose messages are ticketed
    #[serde(default)]
    pub channel_ids: Vec<String>,

    /// JSON file holding `{"issues": [...], "updates": [...]}` templates
    #[serde(default = "default_issue_template_file")]
    pub issue_template_file: PathBuf,

    /// Post the ticket outcome as a threaded reply
    #[serde(default = "default_true")]
    pub reply_in_thread: bool,

    /// Extra mention appended to resolver notes
    #[serde(default = "default_note_mention")]
    pub note_mention: String,

    /// Outbound request timeout (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Ticket queue capacity
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,
}

impl TrackerConfig {
    pub fn token(&self) -> Result<String> {
        read_secret(&self.token_env)
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: None,
            token_env: default_tracker_token_env(),
            channel_ids: Vec::new(),
            issue_template_file: default_issue_template_file(),
            reply_in_thread: true,
            note_mention: default_note_mention(),
            timeout_secs: default_timeout(),
            queue_size: default_queue_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

fn read_secret(env_name: &str) -> Result<String> {
    match std::env::var(env_name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AppError::Configuration(format!(
            "{} not set as an environment variable",
            env_name
        ))),
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    3000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_slack_api_base_url() -> String {
    "https://slack.com/api".to_string()
}

fn default_bot_token_env() -> String {
    "BOT_TOKEN".to_string()
}

fn default_signing_secret_env() -> String {
    "SLACK_SIGNING_SECRET".to_string()
}

fn default_resolution_reaction() -> String {
    "white_check_mark".to_string()
}

fn default_affordance_label() -> String {
    "Have you fixed it?".to_string()
}

fn default_affordance_action_id() -> String {
    "button_click".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_patterns_file() -> PathBuf {
    PathBuf::from("config/patterns.json")
}

fn default_trigger_tags() -> Vec<String> {
    vec!["Disaster".to_string(), "High".to_string()]
}

fn default_issue_window() -> u64 {
    900 // 15 minutes
}

fn default_triggered_window() -> u64 {
    3600 // 1 hour
}

fn default_flap_threshold() -> u32 {
    3
}

fn default_queue_size() -> usize {
    1024
}

fn default_event_dedup_ttl() -> u64 {
    600
}

fn default_tracker_token_env() -> String {
    "MANTIS_TOKEN".to_string()
}

fn default_issue_template_file() -> PathBuf {
    PathBuf::from("config/issues.json")
}

fn default_note_mention() -> String {
    "CSM".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slack_config() -> SlackConfig {
        SlackConfig {
            api_base_url: default_slack_api_base_url(),
            bot_token_env: "ALERT_RELAY_TEST_UNSET_TOKEN".to_string(),
            signing_secret_env: default_signing_secret_env(),
            target_channel_id: "C0TARGET".to_string(),
            channel_ids: vec!["C0SOURCE".to_string()],
            resolution_reaction: default_resolution_reaction(),
            affordance_label: default_affordance_label(),
            affordance_action_id: default_affordance_action_id(),
            timeout_secs: default_timeout(),
        }
    }

    #[test]
    fn test_default_config_values() {
        assert_eq!(default_issue_window(), 900);
        assert_eq!(default_triggered_window(), 3600);
        assert_eq!(default_flap_threshold(), 3);
        assert_eq!(default_trigger_tags(), vec!["Disaster", "High"]);
        assert_eq!(default_affordance_label(), "Have you fixed it?");
        assert!(default_true());
    }

    #[test]
    fn test_embedded_defaults_parse() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.relay.issue_window_secs, 900);
        assert!(!config.tracker.enabled);
        assert_eq!(config.slack.resolution_reaction, "white_check_mark");
    }

    #[test]
    fn test_slack_config_requires_channels() {
        let mut slack = slack_config();
        assert!(slack.validate().is_ok());

        slack.target_channel_id.clear();
        assert!(slack.validate().is_err());

        let mut slack = slack_config();
        slack.channel_ids.clear();
        assert!(slack.validate().is_err());
    }

    #[test]
    fn test_missing_secret_is_configuration_error() {
        let slack = slack_config();
        let err = slack.bot_token().unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn test_windows_convert_to_durations() {
        let relay = RelayConfig::default();
        assert_eq!(relay.issue_window(), chrono::Duration::minutes(15));
        assert_eq!(relay.triggered_window(), chrono::Duration::minutes(60));
    }
}
