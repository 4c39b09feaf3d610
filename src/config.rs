use crate::paths::AppPaths;
use crate::{Result, ScraperError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_TIMEOUT_SECS: u64 = 25;
const DEFAULT_FEED_SCROLL_STEP: u32 = 500;
const DEFAULT_FEED_MAX_STALLED_ROUNDS: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Global timeout for a single HTTP request.
    pub timeout_secs: u64,
    /// Optional user agent list (one per line); falls back to `config/useragents.txt`.
    pub user_agent_file: Option<String>,
    /// Append a `data.csv` row per saved media file.
    pub write_metadata: bool,
    /// Pixels scrolled per round while enumerating a feed.
    pub feed_scroll_step: u32,
    /// Rounds without a new post link before feed enumeration gives up.
    pub feed_max_stalled_rounds: usize,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent_file: None,
            write_metadata: true,
            feed_scroll_step: DEFAULT_FEED_SCROLL_STEP,
            feed_max_stalled_rounds: DEFAULT_FEED_MAX_STALLED_ROUNDS,
        }
    }
}

impl ScraperConfig {
    pub fn user_agent_path(&self, paths: &AppPaths) -> PathBuf {
        match self.user_agent_file.as_deref().map(str::trim) {
            Some(custom) if !custom.is_empty() => PathBuf::from(custom),
            _ => paths.user_agents_path(),
        }
    }
}

pub fn load_config(paths: &AppPaths) -> Result<ScraperConfig> {
    let path = paths.config_path();
    if !path.exists() {
        return Ok(ScraperConfig::default());
    }
    let bytes = std::fs::read(&path)?;
    let mut parsed: ScraperConfig = serde_json::from_slice(&bytes).map_err(|e| {
        ScraperError::Config(format!(
            "failed to parse scraper config at {}: {e}",
            path.to_string_lossy()
        ))
    })?;
    parsed.timeout_secs = parsed.timeout_secs.max(1);
    parsed.feed_scroll_step = parsed.feed_scroll_step.max(1);
    parsed.feed_max_stalled_rounds = parsed.feed_max_stalled_rounds.max(1);
    Ok(parsed)
}

pub fn save_config(paths: &AppPaths, config: &ScraperConfig) -> Result<()> {
    let path = paths.config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, format!("{json}\n"))?;
    Ok(())
}
