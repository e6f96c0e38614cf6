//! Configuration schema and loader.
//!
//! Configuration is layered with figment (lowest to highest priority):
//!
//! 1. Built-in defaults
//! 2. YAML file (`hearth.yaml` by default)
//! 3. Environment variables (`HEARTH_*` with `__` as section separator)
//!
//! The chat OAuth token is deliberately absent from the file schema defaults;
//! set it via `HEARTH_TOKEN` or the `token` key.
//!
//! # Environment Variable Mapping
//!
//! - `HEARTH_TOKEN=oauth:xxx` → `token = "oauth:xxx"`
//! - `HEARTH_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `HEARTH_RETRY__MAX_RETRIES=10` → `retry.max_retries = 10`

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur during configuration loading and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// Failed to extract configuration from the layered sources.
    #[error("failed to extract configuration: {0}")]
    Extract(#[from] figment::Error),

    /// Missing required field.
    #[error("missing required configuration field: {field}")]
    MissingField { field: String },
}

impl ConfigError {
    fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HearthConfig {
    /// Channel to join, without the leading `#`.
    #[serde(default)]
    pub channel: String,

    /// Login nick of the bot account.
    #[serde(default)]
    pub nick: String,

    /// OAuth token, including the `oauth:` prefix.
    #[serde(default)]
    pub token: String,

    /// Chat server websocket URL.
    #[serde(default = "default_url")]
    pub url: String,

    /// Reconnection behavior.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Key/value store backing the greeter ledger.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging behavior.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Per-feature toggles and templates.
    #[serde(default)]
    pub features: FeatureConfig,
}

impl Default for HearthConfig {
    fn default() -> Self {
        Self {
            channel: String::new(),
            nick: String::new(),
            token: String::new(),
            url: default_url(),
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
            features: FeatureConfig::default(),
        }
    }
}

fn default_url() -> String {
    "wss://irc-ws.chat.twitch.tv:443".to_string()
}

impl HearthConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.channel.trim().is_empty() {
            return Err(ConfigError::missing_field("channel"));
        }
        if self.nick.trim().is_empty() {
            return Err(ConfigError::missing_field("nick"));
        }
        if self.token.trim().is_empty() {
            return Err(ConfigError::missing_field("token"));
        }
        Ok(())
    }
}

/// Reconnection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of reconnection attempts.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay between attempts in milliseconds. The delay grows
    /// linearly with the attempt number.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl RetryConfig {
    /// Base delay as a [`Duration`].
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

fn default_max_retries() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    2000
}

/// Backing storage for the key/value store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheKind {
    /// In-memory only, lost on restart.
    #[default]
    Memory,
    /// Flushed to a line-oriented file and rehydrated on startup.
    File,
}

/// Key/value store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Storage backing.
    #[serde(default)]
    pub kind: CacheKind,

    /// Path of the persistence file when `kind` is `file`.
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            kind: CacheKind::default(),
            path: default_cache_path(),
        }
    }
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("hearth-cache.txt")
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Compact single-line format.
    #[default]
    Compact,
    /// Full format with more context.
    Full,
}

/// Log output destination.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    /// Standard output.
    #[default]
    Stdout,
    /// Standard error.
    Stderr,
    /// A log file, see `file_path`.
    File,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base level directive (trace, debug, info, warn, error).
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Output destination.
    #[serde(default)]
    pub output: LogOutput,

    /// Log file path, used when `output` is `file`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            file_path: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Per-feature toggles.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FeatureConfig {
    /// Welcome first-time chatters.
    #[serde(default)]
    pub greeter: GreeterConfig,

    /// Canned chat command responses.
    #[serde(default)]
    pub commands: CommandsConfig,

    /// Acknowledge raids in chat.
    #[serde(default)]
    pub raids: AckConfig,

    /// Acknowledge subscriptions and resubscriptions in chat.
    #[serde(default)]
    pub subs: AckConfig,

    /// Acknowledge gifted subscriptions in chat.
    #[serde(default)]
    pub gift_subs: AckConfig,

    /// Acknowledge bits cheers in chat.
    #[serde(default)]
    pub bits: AckConfig,

    /// Collect numeric poll votes from chat.
    #[serde(default)]
    pub polls: PollsConfig,

    /// Log every inbound event at info level.
    #[serde(default)]
    pub read_logger: bool,

    /// Mirror every outbound event as a JSON log line.
    #[serde(default)]
    pub log_sink: bool,
}

/// Greeter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreeterConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Welcome message, rendered with `{sender}`.
    #[serde(default = "default_greet_template")]
    pub template: String,

    /// Seconds to wait before sending the welcome.
    #[serde(default = "default_greet_delay_secs")]
    pub delay_seconds: u64,

    /// Seconds after which someone counts as a first-time chatter
    /// again. Zero or negative means never.
    #[serde(default)]
    pub ttl_seconds: i64,
}

impl Default for GreeterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            template: default_greet_template(),
            delay_seconds: default_greet_delay_secs(),
            ttl_seconds: 0,
        }
    }
}

fn default_greet_template() -> String {
    "Welcome @{sender}!".to_string()
}

fn default_greet_delay_secs() -> u64 {
    2
}

/// A single canned command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Prefix that triggers the command, e.g. `!discord`.
    pub prefix: String,

    /// Response template.
    pub template: String,
}

/// Canned command configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CommandsConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Known commands, matched by prefix.
    #[serde(default)]
    pub known: Vec<CommandSpec>,
}

/// Shared shape for simple acknowledgement features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Response template.
    #[serde(default)]
    pub template: String,

    /// Seconds to wait before sending the acknowledgement.
    #[serde(default)]
    pub delay_seconds: u64,
}

impl Default for AckConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            template: String::new(),
            delay_seconds: 0,
        }
    }
}

/// Poll vote collection configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PollsConfig {
    #[serde(default)]
    pub enabled: bool,
}

/// Loads configuration from the default file location plus environment.
pub fn load() -> ConfigResult<HearthConfig> {
    load_from(Path::new("hearth.yaml"), true)
}

/// Loads configuration from a specific YAML file plus environment.
///
/// The file may be absent when `required` is false; defaults and
/// environment variables still apply.
pub fn load_from(path: &Path, required: bool) -> ConfigResult<HearthConfig> {
    let mut figment = Figment::from(Serialized::defaults(HearthConfig::default()));

    if path.exists() {
        figment = figment.merge(Yaml::file(path));
    } else if required && std::env::var_os("HEARTH_CHANNEL").is_none() {
        // Without a file the mandatory fields must come from the
        // environment; bail early with a clearer error otherwise.
        warn!(path = %path.display(), "no configuration file found");
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }

    figment = figment.merge(Env::prefixed("HEARTH_").split("__"));

    let config: HearthConfig = figment.extract()?;
    config.validate()?;

    debug!(
        channel = %config.channel,
        url = %config.url,
        "configuration loaded"
    );

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp_yaml(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_minimal_file_with_defaults() {
        let path = write_temp_yaml(
            "hearth-config-minimal.yaml",
            "channel: medgelabs\nnick: medgebot\ntoken: oauth:secret\n",
        );
        let config = load_from(&path, true).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.channel, "medgelabs");
        assert_eq!(config.url, default_url());
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.cache.kind, CacheKind::Memory);
        assert!(!config.features.greeter.enabled);
    }

    #[test]
    fn rejects_missing_token() {
        let path = write_temp_yaml(
            "hearth-config-no-token.yaml",
            "channel: medgelabs\nnick: medgebot\n",
        );
        let result = load_from(&path, true);
        std::fs::remove_file(&path).ok();

        assert!(matches!(
            result,
            Err(ConfigError::MissingField { field }) if field == "token"
        ));
    }

    #[test]
    fn missing_file_is_an_error_when_required() {
        let path = Path::new("/nonexistent/hearth.yaml");
        assert!(matches!(
            load_from(path, true),
            Err(ConfigError::FileNotFound(_))
        ));
    }

    #[test]
    fn parses_feature_sections() {
        let path = write_temp_yaml(
            "hearth-config-features.yaml",
            concat!(
                "channel: medgelabs\n",
                "nick: medgebot\n",
                "token: oauth:secret\n",
                "cache:\n",
                "  kind: file\n",
                "  path: /tmp/ledger.txt\n",
                "features:\n",
                "  greeter:\n",
                "    enabled: true\n",
                "    template: \"Hi {sender}\"\n",
                "  commands:\n",
                "    enabled: true\n",
                "    known:\n",
                "      - prefix: \"!discord\"\n",
                "        template: \"join at example.com\"\n",
                "  raids:\n",
                "    enabled: true\n",
                "    template: \"{sender} raided with {amount}!\"\n",
                "    delay_seconds: 3\n",
            ),
        );
        let config = load_from(&path, true).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.cache.kind, CacheKind::File);
        assert!(config.features.greeter.enabled);
        assert_eq!(config.features.greeter.template, "Hi {sender}");
        assert_eq!(config.features.commands.known.len(), 1);
        assert_eq!(config.features.raids.delay_seconds, 3);
        assert!(!config.features.subs.enabled);
    }
}
