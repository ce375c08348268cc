//! Liquidity and volume-spike classification for one symbol's series.
//!
//! Pure and synchronous: the orchestrator calls this on whatever the fetcher
//! returned, and every rejection is a [`SkipReason`] value rather than an
//! error or a silent drop.

use crate::domain::errors::SkipReason;
use crate::domain::market::{Classification, SeriesWindow};

/// Thresholds applied before a series is scored.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierLimits {
    /// Minimum mean 5-minute turnover (close * volume) over the window, in INR.
    pub min_avg_turnover: f64,
    /// Minimum number of bars with both close and volume present.
    pub min_bars: usize,
}

impl Default for ClassifierLimits {
    fn default() -> Self {
        Self {
            min_avg_turnover: 500_000.0,
            min_bars: 10,
        }
    }
}

/// Score one symbol's series, or explain why it was filtered out.
///
/// Decision sequence, each step short-circuiting:
/// 1. empty series
/// 2. drop bars missing close or volume, require `min_bars` remaining
/// 3. turnover floor over the cleaned bars
/// 4. optional rising-trend confirmation on the last three volumes
/// 5. zero average volume (ratio undefined)
///
/// The spike-match threshold is the orchestrator's concern, not applied here.
pub fn classify(
    symbol: &str,
    series: &SeriesWindow,
    require_rising_trend: bool,
    limits: &ClassifierLimits,
) -> Result<Classification, SkipReason> {
    if series.is_empty() {
        return Err(SkipReason::EmptySeries);
    }

    let clean: Vec<(f64, u64)> = series
        .iter()
        .filter_map(|bar| Some((bar.close?, bar.volume?)))
        .collect();

    if clean.len() < limits.min_bars {
        return Err(SkipReason::TooFewBars {
            have: clean.len(),
            need: limits.min_bars,
        });
    }

    let avg_turnover =
        clean.iter().map(|(close, vol)| close * *vol as f64).sum::<f64>() / clean.len() as f64;
    if avg_turnover < limits.min_avg_turnover {
        return Err(SkipReason::BelowTurnoverFloor {
            turnover: avg_turnover,
            floor: limits.min_avg_turnover,
        });
    }

    // Last 15 minutes = last 3 candles of 5 minutes each.
    if require_rising_trend {
        if clean.len() < 3 {
            return Err(SkipReason::TooFewBars {
                have: clean.len(),
                need: 3,
            });
        }
        let n = clean.len();
        let (v1, v2, v3) = (clean[n - 3].1, clean[n - 2].1, clean[n - 1].1);
        if !(v1 < v2 && v2 < v3) {
            return Err(SkipReason::TrendNotRising);
        }
    }

    let current_vol = clean[clean.len() - 1].1 as f64;
    let avg_vol = clean.iter().map(|(_, vol)| *vol as f64).sum::<f64>() / clean.len() as f64;
    if avg_vol == 0.0 {
        return Err(SkipReason::ZeroAverageVolume);
    }

    Ok(Classification {
        symbol: symbol.to_string(),
        current_vol,
        avg_vol,
        ratio: current_vol / avg_vol,
        avg_turnover,
    })
}
