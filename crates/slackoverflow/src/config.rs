//! YAML configuration.
//!
//! Lives at `~/.slackoverflow/slackoverflow.yaml` unless another directory is
//! given with `--config-path`. The SQLite database sits next to it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const CONFIG_DIR_NAME: &str = ".slackoverflow";
pub const CONFIG_FILE_NAME: &str = "slackoverflow.yaml";
pub const DATABASE_FILE_NAME: &str = "slackoverflow.db3";

/// Environment variable overriding `slack.token`.
pub const ENV_SLACK_TOKEN: &str = "SLACK_TOKEN";
/// Environment variable overriding `stackexchange.key`.
pub const ENV_STACKEXCHANGE_KEY: &str = "STACKEXCHANGE_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Could not determine home directory")]
    NoHomeDir,

    #[error("Invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub slack: SlackSection,
    #[serde(default)]
    pub stackexchange: StackExchangeSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SlackSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Channel id, e.g. `C0123456`.
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub channel_name: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_slack_api_host")]
    pub api_host: String,
    /// Footer icon of posted messages.
    #[serde(default)]
    pub team_icon: Option<String>,
}

impl Default for SlackSection {
    fn default() -> Self {
        Self {
            enabled: true,
            channel: None,
            channel_name: None,
            token: None,
            api_host: default_slack_api_host(),
            team_icon: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StackExchangeSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default = "default_se_api_version")]
    pub api_version: String,
    #[serde(default = "default_se_api_host")]
    pub api_host: String,
    #[serde(default = "default_site")]
    pub site: String,
    /// Size of the tracked window.
    #[serde(default = "default_questions_to_watch")]
    pub questions_to_watch: usize,
    /// Overrides for `/search/advanced`, e.g. `tagged: aframe`.
    #[serde(default)]
    pub search_advanced: BTreeMap<String, String>,
    /// Overrides for `/questions/{ids}`.
    #[serde(default)]
    pub questions: BTreeMap<String, String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for StackExchangeSection {
    fn default() -> Self {
        Self {
            enabled: true,
            key: None,
            api_version: default_se_api_version(),
            api_host: default_se_api_host(),
            site: default_site(),
            questions_to_watch: default_questions_to_watch(),
            search_advanced: BTreeMap::new(),
            questions: BTreeMap::new(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl StackExchangeSection {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_true() -> bool {
    true
}

fn default_slack_api_host() -> String {
    notify::DEFAULT_API_HOST.to_string()
}

fn default_se_api_host() -> String {
    stackexchange::DEFAULT_API_HOST.to_string()
}

fn default_se_api_version() -> String {
    stackexchange::DEFAULT_API_VERSION.to_string()
}

fn default_site() -> String {
    "stackoverflow".to_string()
}

fn default_questions_to_watch() -> usize {
    15
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Resolved file locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub dir: PathBuf,
    pub config_file: PathBuf,
    pub database_file: PathBuf,
}

impl Paths {
    /// `dir` if given, `~/.slackoverflow` otherwise.
    pub fn resolve(dir: Option<&Path>) -> Result<Self, ConfigError> {
        let dir = match dir {
            Some(dir) => dir.to_path_buf(),
            None => dirs::home_dir()
                .ok_or(ConfigError::NoHomeDir)?
                .join(CONFIG_DIR_NAME),
        };
        Ok(Self {
            config_file: dir.join(CONFIG_FILE_NAME),
            database_file: dir.join(DATABASE_FILE_NAME),
            dir,
        })
    }
}

impl Config {
    /// Read `path` and apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_yaml(&contents)?;
        config.apply_env();
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Write YAML to `path`, creating the parent directory.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, yaml).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Secrets from the environment win over the file.
    pub fn apply_env(&mut self) {
        if let Some(token) = non_empty_env(ENV_SLACK_TOKEN) {
            self.slack.token = Some(token);
        }
        if let Some(key) = non_empty_env(ENV_STACKEXCHANGE_KEY) {
            self.stackexchange.key = Some(key);
        }
    }

    /// Collect every policy problem instead of stopping at the first.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        if self.stackexchange.site.trim().is_empty() {
            problems.push("stackexchange.site must not be empty".to_string());
        }
        if self.stackexchange.questions_to_watch == 0 {
            problems.push("stackexchange.questions-to-watch must be at least 1".to_string());
        }
        if self.stackexchange.request_timeout_secs == 0 {
            problems.push("stackexchange.request-timeout-secs must be at least 1".to_string());
        }
        if self.slack.enabled {
            if is_blank(self.slack.token.as_deref()) {
                problems.push(format!(
                    "slack.token is required when slack is enabled (or set {ENV_SLACK_TOKEN})"
                ));
            }
            if is_blank(self.slack.channel.as_deref()) {
                problems.push("slack.channel is required when slack is enabled".to_string());
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }

    /// Copy with secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.slack.token = copy.slack.token.as_deref().map(redact);
        copy.stackexchange.key = copy.stackexchange.key.as_deref().map(redact);
        copy
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

fn redact(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    format!("{visible}****")
}
