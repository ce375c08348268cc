use crate::application::classifier::ClassifierLimits;
use crate::application::scanner::ScanSettings;
use crate::infrastructure::symbols::nse_feed::DEFAULT_FEED_URL;
use crate::infrastructure::yahoo::market_data::DEFAULT_BASE_URL;
use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    // Classification thresholds
    pub min_avg_turnover: f64,
    pub spike_threshold: f64,
    pub min_bars: usize,
    pub require_rising_trend: bool,
    // Scan shape
    pub batch_size: usize,
    pub worker_count: usize,
    pub max_symbols: usize,
    pub top_spikes_count: usize,
    // Lookback window
    pub lookback_range: String,
    pub bar_interval: String,
    // External endpoints
    pub symbol_feed_url: String,
    pub yahoo_base_url: String,
    pub feed_timeout_secs: u64,
    pub provider_timeout_secs: u64,
    pub rate_limit_cooldown_secs: u64,
    // Service
    pub database_url: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let min_avg_turnover = env::var("MIN_AVG_TURNOVER")
            .unwrap_or_else(|_| "500000.0".to_string())
            .parse::<f64>()
            .context("Failed to parse MIN_AVG_TURNOVER")?;

        let spike_threshold = env::var("SPIKE_THRESHOLD")
            .unwrap_or_else(|_| "2.0".to_string())
            .parse::<f64>()
            .context("Failed to parse SPIKE_THRESHOLD")?;

        let min_bars = env::var("MIN_BARS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<usize>()
            .context("Failed to parse MIN_BARS")?;

        let require_rising_trend = env::var("REQUIRE_RISING_TREND")
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .unwrap_or(false);

        let batch_size = env::var("BATCH_SIZE")
            .unwrap_or_else(|_| "100".to_string())
            .parse::<usize>()
            .context("Failed to parse BATCH_SIZE")?;

        let worker_count = env::var("WORKER_COUNT")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<usize>()
            .context("Failed to parse WORKER_COUNT")?;

        let max_symbols = env::var("MAX_SYMBOLS")
            .unwrap_or_else(|_| "2200".to_string())
            .parse::<usize>()
            .context("Failed to parse MAX_SYMBOLS")?;

        let top_spikes_count = env::var("TOP_SPIKES_COUNT")
            .unwrap_or_else(|_| "20".to_string())
            .parse::<usize>()
            .context("Failed to parse TOP_SPIKES_COUNT")?;

        let lookback_range = env::var("LOOKBACK_RANGE").unwrap_or_else(|_| "5d".to_string());
        let bar_interval = env::var("BAR_INTERVAL").unwrap_or_else(|_| "5m".to_string());

        let symbol_feed_url =
            env::var("SYMBOL_FEED_URL").unwrap_or_else(|_| DEFAULT_FEED_URL.to_string());
        let yahoo_base_url =
            env::var("YAHOO_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let feed_timeout_secs = env::var("FEED_TIMEOUT_SECS")
            .unwrap_or_else(|_| "12".to_string())
            .parse::<u64>()
            .context("Failed to parse FEED_TIMEOUT_SECS")?;

        let provider_timeout_secs = env::var("PROVIDER_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u64>()
            .context("Failed to parse PROVIDER_TIMEOUT_SECS")?;

        let rate_limit_cooldown_secs = env::var("RATE_LIMIT_COOLDOWN_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()
            .context("Failed to parse RATE_LIMIT_COOLDOWN_SECS")?;

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://data/symbols.db".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "8083".to_string())
            .parse::<u16>()
            .context("Failed to parse PORT")?;

        Ok(Self {
            min_avg_turnover,
            spike_threshold,
            min_bars,
            require_rising_trend,
            batch_size,
            worker_count,
            max_symbols,
            top_spikes_count,
            lookback_range,
            bar_interval,
            symbol_feed_url,
            yahoo_base_url,
            feed_timeout_secs,
            provider_timeout_secs,
            rate_limit_cooldown_secs,
            database_url,
            port,
        })
    }

    pub fn scan_settings(&self) -> ScanSettings {
        ScanSettings {
            max_symbols: self.max_symbols,
            batch_size: self.batch_size,
            worker_count: self.worker_count,
            spike_threshold: self.spike_threshold,
            top_spikes_count: self.top_spikes_count,
            require_rising_trend: self.require_rising_trend,
            limits: ClassifierLimits {
                min_avg_turnover: self.min_avg_turnover,
                min_bars: self.min_bars,
            },
        }
    }
}
