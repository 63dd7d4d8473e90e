use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, Level};

use crate::capture::filter::default_keywords;
use crate::error::WatchfulError;
use crate::game::GameVariant;
use crate::store::{AggregateStore, FileHost, HostContext, DEFAULT_HISTORY_CAP};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub site_origin: String,
    pub store_path: PathBuf,
    pub history_cap: usize,
    pub fallback_variant: GameVariant,
    pub game_keywords: Vec<String>,
    pub webhook_url: Option<String>,
    pub log_level: String,
    pub win_chance_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_origin: "https://bet88.ph/".to_string(),
            store_path: PathBuf::from("./data/storage.json"),
            history_cap: DEFAULT_HISTORY_CAP,
            fallback_variant: GameVariant::Dice,
            game_keywords: default_keywords(),
            webhook_url: None,
            log_level: "info".to_string(),
            win_chance_timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn max_log_level(&self) -> Result<Level> {
        Level::from_str(&self.log_level)
            .map_err(|_| WatchfulError::config_error(format!("invalid log level: {}", self.log_level)))
            .context("parsing WATCHFUL_LOG_LEVEL")
    }
}

pub fn load_config() -> Result<Config> {
    load_config_from(|key| env::var(key).ok())
}

pub fn load_config_from(lookup: impl Fn(&str) -> Option<String>) -> Result<Config> {
    let mut config = Config::default();

    if let Some(site_origin) = lookup("WATCHFUL_SITE_ORIGIN") {
        config.site_origin = site_origin;
    }

    if let Some(store_path) = lookup("WATCHFUL_STORE_PATH") {
        config.store_path = PathBuf::from(store_path);
    }

    if let Some(cap) = lookup("WATCHFUL_HISTORY_CAP") {
        config.history_cap = cap
            .trim()
            .parse()
            .with_context(|| format!("WATCHFUL_HISTORY_CAP is not a number: {}", cap))?;
        if config.history_cap == 0 {
            return Err(WatchfulError::config_error("WATCHFUL_HISTORY_CAP must be at least 1").into());
        }
    }

    if let Some(variant) = lookup("WATCHFUL_FALLBACK_VARIANT") {
        config.fallback_variant = variant.parse()?;
    }

    if let Some(extra) = lookup("WATCHFUL_EXTRA_KEYWORDS") {
        config.game_keywords.extend(
            extra
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_lowercase),
        );
    }

    if let Some(webhook_url) = lookup("WATCHFUL_WEBHOOK_URL").filter(|u| !u.trim().is_empty()) {
        config.webhook_url = Some(webhook_url);
    }

    if let Some(log_level) = lookup("WATCHFUL_LOG_LEVEL") {
        config.log_level = log_level;
    }
    config.max_log_level()?;

    if let Some(timeout) = lookup("WATCHFUL_WIN_CHANCE_TIMEOUT") {
        config.win_chance_timeout_secs = timeout
            .trim()
            .parse()
            .with_context(|| format!("WATCHFUL_WIN_CHANCE_TIMEOUT is not a number: {}", timeout))?;
    }

    Ok(config)
}

pub async fn initialize_config(config: &Config) -> Result<()> {
    info!("Initializing storage at {}", config.store_path.display());

    let host = FileHost::new(&config.store_path)
        .with_context(|| format!("creating storage location {}", config.store_path.display()))?;
    info!("Storage file: {}", host.path().display());
    let store = AggregateStore::open_with_cap(host, HostContext::new(), config.history_cap).await?;
    let snapshot = store.read_snapshot().await?;
    store.close().await?;

    info!("Site origin: {}", config.site_origin);
    info!("History cap: {} results", store.cap());
    info!(
        "Stored results: {} ({} wins / {} losses, {:.2}% win rate)",
        snapshot.total_games, snapshot.wins, snapshot.losses, snapshot.win_rate
    );
    if config.webhook_url.is_none() {
        info!("No webhook configured; storage changes will only be written to stdout");
    }

    info!("Configuration initialized successfully!");
    Ok(())
}
