//! Configuration loading and validation.
//!
//! Everything is read from the process environment once at start-up. A `.env`
//! file is loaded first when present so local runs don't need exported vars.

use crate::error::{ConfigError, Result};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// langreport configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Data directory path.
    pub data_dir: PathBuf,

    /// Database location.
    pub database: DatabaseConfig,

    /// Slack credentials. Only the bot process needs them.
    pub slack: Option<SlackConfig>,

    /// HTTP query service settings.
    pub api: ApiConfig,

    /// Directory for rolling log files. Logs go to stderr when unset.
    pub log_dir: Option<PathBuf>,

    /// Send the welcome message to every active user when the bot starts.
    pub welcome_on_start: bool,
}

/// SQLite database configuration.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database name, from `DB_NAME`.
    pub name: String,

    /// Directory holding the database file.
    pub data_dir: PathBuf,
}

impl DatabaseConfig {
    /// Path of the SQLite file backing this database.
    pub fn sqlite_path(&self) -> PathBuf {
        if Path::new(&self.name).extension().is_some() {
            self.data_dir.join(&self.name)
        } else {
            self.data_dir.join(format!("{}.db", self.name))
        }
    }
}

/// Slack app credentials.
#[derive(Clone)]
pub struct SlackConfig {
    pub bot_token: String,
    pub app_token: String,
    /// Only used when events arrive over HTTP; Socket Mode ignores it.
    pub signing_secret: Option<String>,
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("bot_token", &"[redacted]")
            .field("app_token", &"[redacted]")
            .field("signing_secret", &self.signing_secret.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// HTTP query service configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind: SocketAddr,

    /// Append-only file holding the `/responses/new` poll cursor.
    pub cursor_path: PathBuf,
}

pub const DEFAULT_DB_NAME: &str = "language_reports";
pub const DEFAULT_API_BIND: &str = "0.0.0.0:5000";
pub const CURSOR_FILE_NAME: &str = "latest_query_time.txt";

impl Config {
    /// Load configuration from the process environment.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load a `.env` file into the process environment, then [`Config::load`].
    ///
    /// With no explicit path a missing `.env` is fine; an explicit path must exist.
    pub fn load_with_env_file(env_file: Option<&Path>) -> Result<Self> {
        match env_file {
            Some(path) => {
                dotenvy::from_path(path).map_err(|error| ConfigError::EnvFile {
                    path: path.display().to_string(),
                    message: error.to_string(),
                })?;
            }
            None => {
                let _ = dotenvy::dotenv();
            }
        }
        Self::load()
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let data_dir = var("LANGREPORT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data"));

        let database = DatabaseConfig {
            name: var("DB_NAME").unwrap_or_else(|| DEFAULT_DB_NAME.into()),
            data_dir: data_dir.clone(),
        };

        let slack = match (var("SLACK_BOT_TOKEN"), var("SLACK_APP_TOKEN")) {
            (Some(bot_token), Some(app_token)) => Some(SlackConfig {
                bot_token,
                app_token,
                signing_secret: var("SLACK_SIGNING_SECRET")
                    .or_else(|| var("TASK_BOT_SIGNING_SECRET")),
            }),
            _ => None,
        };

        let bind_value = var("LANGREPORT_API_BIND").unwrap_or_else(|| DEFAULT_API_BIND.into());
        let bind = bind_value.parse::<SocketAddr>().map_err(|error| {
            ConfigError::Invalid(format!("LANGREPORT_API_BIND '{bind_value}': {error}"))
        })?;

        let cursor_path = var("LANGREPORT_CURSOR_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join(CURSOR_FILE_NAME));

        let welcome_on_start = match var("WELCOME_ON_START") {
            None => true,
            Some(value) => parse_bool(&value).ok_or_else(|| {
                ConfigError::Invalid(format!("WELCOME_ON_START must be a boolean, got '{value}'"))
            })?,
        };

        Ok(Self {
            data_dir,
            database,
            slack,
            api: ApiConfig { bind, cursor_path },
            log_dir: var("LANGREPORT_LOG_DIR").map(PathBuf::from),
            welcome_on_start,
        })
    }

    /// Slack credentials, or an error naming the first missing token.
    pub fn require_slack(&self) -> Result<&SlackConfig> {
        self.slack.as_ref().ok_or_else(|| {
            ConfigError::MissingKey("SLACK_BOT_TOKEN and SLACK_APP_TOKEN".into()).into()
        })
    }

    /// Create the data directory if it doesn't exist yet.
    pub fn ensure_data_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
