//! # Configuration
//!
//! Manages the loading and parsing of the bot's configuration file.
//! Defines the structs for the Matrix connection, the watched feeds and the
//! scheduling intervals.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Main application configuration structure.
/// Matches the layout of `config.yaml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub matrix: MatrixConfig,
    /// Base addresses of the watched catalog feeds.
    #[serde(default)]
    pub feeds: Vec<String>,
    #[serde(default)]
    pub intervals: IntervalConfig,
    #[serde(default = "default_database")]
    pub database: String,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig =
            serde_yaml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}

/// Connection settings for the Matrix account and the announcement room.
#[derive(Debug, Deserialize, Clone)]
pub struct MatrixConfig {
    pub homeserver: String,
    pub username: String,
    /// May be left empty and supplied via the password file instead.
    #[serde(default)]
    pub password: String,
    pub room: String,
    #[serde(default = "default_nickname")]
    pub nickname: String,
}

/// Scheduling cadences, all in seconds.
#[derive(Debug, Deserialize, Clone)]
pub struct IntervalConfig {
    #[serde(default = "default_check_interval")]
    pub check: u64,
    #[serde(default = "default_keepalive_interval")]
    pub keepalive: u64,
    /// Grace period before an unanswered probe is treated as a lapsed
    /// membership. Short relative to the keepalive cadence.
    #[serde(default = "default_probe_grace")]
    pub probe_grace: u64,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            check: default_check_interval(),
            keepalive: default_keepalive_interval(),
            probe_grace: default_probe_grace(),
        }
    }
}

fn default_check_interval() -> u64 {
    900
}
fn default_keepalive_interval() -> u64 {
    30
}
fn default_probe_grace() -> u64 {
    25
}
fn default_nickname() -> String {
    "fdroid-herald".to_string()
}
fn default_database() -> String {
    "fdroid-herald.sqlite".to_string()
}
