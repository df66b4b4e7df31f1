//! Collector configuration: TOML file + defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context};
use serde::Deserialize;

use nifty_oi_chain::StrikeWindow;

/// Poll intervals the config accepts, in seconds. Anything in this range is
/// reasonable against the upstream; the ends are the values observed in use.
pub const MIN_POLL_INTERVAL_SECS: u64 = 10;
pub const MAX_POLL_INTERVAL_SECS: u64 = 600;

/// Root configuration schema for the collector.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub source: SourceConfig,
    pub poll: PollConfig,
    pub window: StrikeWindow,
    pub sentiment: SentimentConfig,
    pub sink: SinkConfig,
    pub server: ServerConfig,
}

/// Upstream source settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Index symbol, e.g. "NIFTY" or "BANKNIFTY".
    pub symbol: String,
    /// Explicit target expiry ("30-Jan-2026"); nearest expiry when unset.
    pub expiry: Option<String>,
    /// Round-trip timeout for one fetch.
    pub timeout_secs: u64,
    pub base_url: String,
}

/// Refresh and persist cadence.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_secs: u64,
    /// Independent timer for the snapshot sink; a render failure must not
    /// block a pending persist, and vice versa.
    pub persist_interval_secs: u64,
    pub auto_refresh: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    /// Nonnegative dead-zone around zero net weight; 0 = strict sign test.
    pub threshold: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub csv_path: Option<PathBuf>,
    pub jsonl_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Status server bind address; server disabled when unset.
    pub bind: Option<SocketAddr>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            symbol: "NIFTY".to_string(),
            expiry: None,
            timeout_secs: 8,
            base_url: crate::client::NSE_BASE_URL.to_string(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            persist_interval_secs: 60,
            auto_refresh: true,
        }
    }
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self { threshold: 0 }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            csv_path: Some(PathBuf::from("data/oi_trend.csv")),
            jsonl_path: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: None }
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            poll: PollConfig::default(),
            window: StrikeWindow::default(),
            sentiment: SentimentConfig::default(),
            sink: SinkConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl CollectorConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Could not find config file: {}", path))?;
        let config: Self =
            toml::from_str(&config_str).with_context(|| format!("Failed to parse {}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the poller cannot honor.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(MIN_POLL_INTERVAL_SECS..=MAX_POLL_INTERVAL_SECS).contains(&self.poll.interval_secs) {
            bail!(
                "poll.interval_secs must be within {}..={} (got {})",
                MIN_POLL_INTERVAL_SECS,
                MAX_POLL_INTERVAL_SECS,
                self.poll.interval_secs
            );
        }
        if self.poll.persist_interval_secs == 0 {
            bail!("poll.persist_interval_secs must be nonzero");
        }
        if self.sentiment.threshold < 0 {
            bail!("sentiment.threshold must be nonnegative");
        }
        if self.source.timeout_secs == 0 {
            bail!("source.timeout_secs must be nonzero");
        }
        match self.window {
            StrikeWindow::FixedBand { points } if points <= 0 => {
                bail!("window.points must be positive")
            }
            StrikeWindow::NearestN { count } if count == 0 => {
                bail!("window.count must be nonzero")
            }
            _ => Ok(()),
        }
    }
}
