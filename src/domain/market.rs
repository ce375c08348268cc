//! Core market types shared by the fetcher, classifier and orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One intraday observation as the provider returns it. Close or volume may
/// be missing for halted or thinly traded bars; the classifier drops those
/// rows before computing anything.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawBar {
    pub timestamp: DateTime<Utc>,
    pub close: Option<f64>,
    pub volume: Option<u64>,
}

impl RawBar {
    pub fn new(timestamp: DateTime<Utc>, close: Option<f64>, volume: Option<u64>) -> Self {
        Self {
            timestamp,
            close,
            volume,
        }
    }
}

/// Chronological bars for one symbol over the lookback window
/// (5 trading days of 5-minute bars, fewer across gaps and holidays).
pub type SeriesWindow = Vec<RawBar>;

/// Outcome of scoring one symbol's series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub symbol: String,
    pub current_vol: f64,
    pub avg_vol: f64,
    /// Current bar volume over window average. Undefined ratios never reach
    /// this type; the classifier rejects them first.
    pub ratio: f64,
    pub avg_turnover: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Starting,
    Running,
    Complete,
}

/// Aggregate outcome of one full scan over the symbol universe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Classifications with ratio above the spike threshold, descending by ratio.
    pub matches: Vec<Classification>,
    /// Top classifications by ratio across every liquidity-passing symbol,
    /// capped at the configured count. Not limited to matches.
    pub top_spikes: Vec<Classification>,
    pub total_scanned: usize,
    pub status: ScanStatus,
}
