use crate::domain::errors::{FeedError, ProviderError};
use crate::domain::market::SeriesWindow;
use async_trait::async_trait;
use std::collections::HashMap;

// Need async_trait for async functions in traits
#[async_trait]
pub trait SymbolFeed: Send + Sync {
    /// Download the full tradable-symbol listing from the external feed.
    async fn fetch_symbols(&self) -> Result<Vec<String>, FeedError>;
}

#[async_trait]
pub trait MarketDataService: Send + Sync {
    /// Fetch the intraday lookback window for every symbol in one batch.
    ///
    /// Symbols whose data cannot be retrieved or parsed are simply absent
    /// from the map. Implementations must not spawn their own concurrency:
    /// the orchestrator already parallelizes across batches, and stacking
    /// provider-side threading on top exhausts OS thread limits.
    async fn fetch_batch(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, SeriesWindow>, ProviderError>;
}

#[async_trait]
pub trait SymbolUniverse: Send + Sync {
    /// The symbol universe to scan. Infallible: falls back to cached or
    /// hardcoded symbols rather than erroring.
    async fn symbols(&self) -> Vec<String>;
}
