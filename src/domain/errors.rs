use thiserror::Error;

/// Why the classifier declined to score a series.
///
/// These are deliberate filter outcomes, not failures; they stay inspectable
/// so tests can assert on the exact rejection.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum SkipReason {
    #[error("series is empty")]
    EmptySeries,

    #[error("only {have} valid bars, need {need}")]
    TooFewBars { have: usize, need: usize },

    #[error("average turnover {turnover:.0} below floor {floor:.0}")]
    BelowTurnoverFloor { turnover: f64, floor: f64 },

    #[error("last three volumes are not strictly increasing")]
    TrendNotRising,

    #[error("average volume is zero, ratio undefined")]
    ZeroAverageVolume,
}

/// Errors from the equity symbol feed. All of these are absorbed by the
/// directory cache, which falls back to persisted or hardcoded symbols.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("symbol feed request failed: {0}")]
    Transport(#[from] reqwest_middleware::Error),

    #[error("symbol feed body read failed: {0}")]
    Body(#[from] reqwest::Error),

    #[error("symbol feed returned HTTP {status}")]
    Status { status: u16 },

    #[error("symbol feed CSV parse failed: {0}")]
    Parse(#[from] csv::Error),

    #[error("symbol feed CSV has no SYMBOL column")]
    MissingSymbolColumn,
}

/// Errors from the market-data provider. A failed batch degrades to zero
/// results for that batch; the scan keeps progressing.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider rate limited the request")]
    RateLimited,

    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest_middleware::Error),

    #[error("provider returned HTTP {status} for {ticker}")]
    Status { ticker: String, status: u16 },

    #[error("malformed chart payload for {ticker}: {reason}")]
    Malformed { ticker: String, reason: String },
}

/// Job-slot violations surfaced by the HTTP layer.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum JobError {
    #[error("Analysis already in progress")]
    AlreadyRunning,
}
