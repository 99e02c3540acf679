//! Layered configuration for dtz.
//!
//! Sources, lowest priority first:
//!
//! 1. Built-in defaults.
//! 2. The user configuration file, `config.toml` in the platform config
//!    directory (for example `~/.config/dtz/config.toml`).
//! 3. A file given explicitly with `--config`.
//! 4. Environment variables prefixed `DTZ_`, with `__` separating sections:
//!    `DTZ_WIKI__ACCESS_TOKEN` sets `wiki.access_token`.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "DTZ_";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_API_URL: &str = "https://commons.wikimedia.org/w/api.php";
pub const DEFAULT_USER_AGENT: &str = concat!("dtz/", env!("CARGO_PKG_VERSION"), " (https://github.com/garyhouston/dtz)");
/// Upper bound the API places on `gailimit` for bot-flagged accounts.
pub const MAX_PAGE_SIZE: u32 = 500;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub wiki: WikiConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

/// Where and how to reach the wiki.
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct WikiConfig {
    pub api_url: String,
    pub user_agent: String,
    /// OAuth 2.0 owner-only access token.
    pub access_token: Option<String>,
    pub maxlag: Option<u32>,
    pub timeout_secs: u64,
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            access_token: None,
            maxlag: Some(5),
            timeout_secs: 30,
        }
    }
}

impl fmt::Debug for WikiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WikiConfig")
            .field("api_url", &self.api_url)
            .field("user_agent", &self.user_agent)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("maxlag", &self.maxlag)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl WikiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Pacing and wording of batch runs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Minimum time between successful edits.
    pub edit_interval_secs: u64,
    /// Delay before each record is processed.
    pub record_pacing_ms: u64,
    pub max_attempts: u32,
    pub page_size: u32,
    pub summary: String,
    pub template: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            edit_interval_secs: 5,
            record_pacing_ms: 1000,
            max_attempts: 3,
            page_size: 100,
            summary: "Set date from Exif with time zone".to_string(),
            template: "DTZ".to_string(),
        }
    }
}

impl BatchConfig {
    pub fn edit_interval(&self) -> Duration {
        Duration::from_secs(self.edit_interval_secs)
    }

    pub fn record_pacing(&self) -> Duration {
        Duration::from_millis(self.record_pacing_ms)
    }
}

impl Config {
    /// Path of the user configuration file, if the platform has a config
    /// directory.
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "wikimedia", "dtz").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Builds the provider chain without extracting it.
    ///
    /// `explicit` is layered above the user configuration file.
    pub fn figment(explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = Self::user_config_path().filter(|p| p.exists()) {
            tracing::debug!(path = %path.display(), "Merging user configuration file");
            figment = figment.merge(Toml::file(path));
        }
        if let Some(path) = explicit {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads and validates configuration from all sources.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit
            && !path.is_file()
        {
            exn::bail!(ErrorKind::FileNotFound(path.to_path_buf()));
        }
        let config: Self = match Self::figment(explicit).extract() {
            Ok(config) => config,
            Err(err) => {
                let reason = err.to_string();
                return Err(exn::Exn::from(err).raise(ErrorKind::Load(reason)));
            },
        };
        config.validate()?;
        tracing::debug!(?config, "Loaded configuration");
        Ok(config)
    }

    /// Checks values that deserialize fine but cannot be used.
    pub fn validate(&self) -> Result<()> {
        if !(self.wiki.api_url.starts_with("https://") || self.wiki.api_url.starts_with("http://")) {
            exn::bail!(ErrorKind::InvalidValue {
                field: "wiki.api_url",
                reason: format!("not an http(s) URL: {}", self.wiki.api_url),
            });
        }
        if self.wiki.user_agent.trim().is_empty() {
            exn::bail!(ErrorKind::InvalidValue {
                field: "wiki.user_agent",
                reason: "must not be empty".to_string(),
            });
        }
        if self.wiki.timeout_secs == 0 {
            exn::bail!(ErrorKind::InvalidValue {
                field: "wiki.timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.batch.max_attempts == 0 {
            exn::bail!(ErrorKind::InvalidValue {
                field: "batch.max_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.batch.page_size) {
            exn::bail!(ErrorKind::InvalidValue {
                field: "batch.page_size",
                reason: format!("must be between 1 and {MAX_PAGE_SIZE}, got {}", self.batch.page_size),
            });
        }
        if self.batch.template.trim().is_empty() || self.batch.template.contains(['{', '}', '|']) {
            exn::bail!(ErrorKind::InvalidValue {
                field: "batch.template",
                reason: format!("not a usable template name: {:?}", self.batch.template),
            });
        }
        Ok(())
    }
}
