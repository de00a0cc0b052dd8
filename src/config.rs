use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

use crate::responder::DEFAULT_REPLY_DELAY;

pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_RETRIES: u32 = 1;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub reply_delay_ms: Option<u64>,
    pub reply_timeout_ms: Option<u64>,
    pub max_retries: Option<u32>,
    pub show_theme_selector: Option<bool>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("chat-tui").join("config.json"))
    }
}

/// Command-line overrides, all optional
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub reply_delay_ms: Option<u64>,
    pub no_persist: bool,
    pub no_themes: bool,
}

/// Effective runtime settings: CLI over config file over defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub reply_delay: Duration,
    pub reply_timeout: Duration,
    pub max_retries: u32,
    pub show_theme_selector: bool,
    pub persist_theme: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reply_delay: DEFAULT_REPLY_DELAY,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            show_theme_selector: true,
            persist_theme: true,
        }
    }
}

impl Settings {
    pub fn resolve(config: &Config, overrides: &Overrides) -> Self {
        let defaults = Self::default();

        let reply_delay = overrides
            .reply_delay_ms
            .or(config.reply_delay_ms)
            .map(Duration::from_millis)
            .unwrap_or(defaults.reply_delay);

        let mut reply_timeout = config
            .reply_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.reply_timeout);

        // The simulated reply must always land inside the timeout
        if reply_timeout <= reply_delay {
            let raised = reply_delay + DEFAULT_REPLY_TIMEOUT;
            tracing::warn!(
                "Reply timeout {:?} does not exceed reply delay {:?}, raising it to {:?}",
                reply_timeout,
                reply_delay,
                raised
            );
            reply_timeout = raised;
        }

        let show_theme_selector =
            !overrides.no_themes && config.show_theme_selector.unwrap_or(true);

        Self {
            reply_delay,
            reply_timeout,
            max_retries: config.max_retries.unwrap_or(defaults.max_retries),
            show_theme_selector,
            // Without a selector the theme can't change, so there is nothing to persist
            persist_theme: !overrides.no_persist && show_theme_selector,
        }
    }
}
