use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{provider, retry};
use crate::retry::RetryPolicy;


/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "SLSDEPLOY_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Provider the service descriptor must declare
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Extra options forwarded to every `sls` invocation as `--name value`
    #[serde(default)]
    pub options: BTreeMap<String, String>,

    /// Retry configuration for `sls` invocations
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,
}

fn default_provider() -> String {
    provider::DEFAULT.to_string()
}

fn default_attempts() -> u32 {
    retry::MAX_ATTEMPTS
}

fn default_delay_secs() -> u64 {
    retry::DELAY_SECS
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            delay_secs: default_delay_secs(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.attempts, Duration::from_secs(self.delay_secs))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            options: BTreeMap::new(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Load from `$SLSDEPLOY_CONFIG`, else `<config dir>/slsdeploy/config.toml`.
    ///
    /// Defaults apply only when the default location has no file; an explicit
    /// path that cannot be read is an error.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_with(
            std::env::var_os(CONFIG_ENV).map(PathBuf::from),
            Self::default_path(),
        )
    }

    pub fn load_with(explicit: Option<PathBuf>, default: Option<PathBuf>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(&path).with_context(|| {
                format!("Failed to load config {} (set by {})", path.display(), CONFIG_ENV)
            });
        }
        match default {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Config::default()),
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("slsdeploy").join("config.toml"))
    }
}
