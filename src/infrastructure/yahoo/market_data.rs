//! Yahoo Finance chart fetcher for NSE tickers.
//!
//! One `fetch_batch` call walks its tickers sequentially against the v8
//! chart endpoint. That sequencing is a contract, not an accident: the
//! orchestrator already runs a worker pool across batches, and the fetcher
//! adding its own concurrency on top would multiply outstanding connections
//! past the configured budget.

use crate::domain::errors::ProviderError;
use crate::domain::market::{RawBar, SeriesWindow};
use crate::domain::ports::MarketDataService;
use crate::infrastructure::core::cooldown::CooldownGate;
use crate::infrastructure::core::http_client_factory::HttpClientFactory;
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// NSE listings carry this suffix on Yahoo.
const MARKET_SUFFIX: &str = ".NS";

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub struct YahooMarketData {
    client: ClientWithMiddleware,
    base_url: String,
    /// Lookback span, e.g. "5d".
    range: String,
    /// Bar interval, e.g. "5m".
    interval: String,
    timeout: Duration,
    cooldown: Arc<CooldownGate>,
}

impl YahooMarketData {
    pub fn new(
        base_url: String,
        range: String,
        interval: String,
        timeout: Duration,
        cooldown: Arc<CooldownGate>,
    ) -> Self {
        Self {
            client: HttpClientFactory::create_client(),
            base_url,
            range,
            interval,
            timeout,
            cooldown,
        }
    }

    async fn fetch_one(&self, ticker: &str) -> Result<SeriesWindow, ProviderError> {
        let url = format!(
            "{}/v8/finance/chart/{}?range={}&interval={}",
            self.base_url, ticker, self.range, self.interval
        );

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            return Err(ProviderError::Status {
                ticker: ticker.to_string(),
                status: status.as_u16(),
            });
        }

        let envelope: ChartEnvelope =
            response
                .json()
                .await
                .map_err(|e| ProviderError::Malformed {
                    ticker: ticker.to_string(),
                    reason: e.to_string(),
                })?;

        parse_chart(ticker, envelope)
    }
}

#[async_trait]
impl MarketDataService for YahooMarketData {
    async fn fetch_batch(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, SeriesWindow>, ProviderError> {
        let mut series_by_symbol = HashMap::with_capacity(symbols.len());

        for symbol in symbols {
            self.cooldown.wait_if_armed().await;

            let ticker = format!("{}{}", symbol, MARKET_SUFFIX);
            match self.fetch_one(&ticker).await {
                Ok(series) => {
                    series_by_symbol.insert(symbol.clone(), series);
                }
                Err(ProviderError::RateLimited) => {
                    // Pause the whole pool; the rest of this batch is lost.
                    self.cooldown.arm().await;
                    return Err(ProviderError::RateLimited);
                }
                // One bad ticker must not cost its batch siblings.
                Err(e) => debug!("{}: skipped ({})", ticker, e),
            }
        }

        if series_by_symbol.is_empty() && !symbols.is_empty() {
            warn!("Batch of {} tickers returned no usable series", symbols.len());
        }
        Ok(series_by_symbol)
    }
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<u64>>>,
}

/// Zip the chart arrays into bars, preserving nulls for the classifier to
/// drop. Bars with an invalid epoch are discarded.
fn parse_chart(ticker: &str, envelope: ChartEnvelope) -> Result<SeriesWindow, ProviderError> {
    let result = envelope
        .chart
        .result
        .and_then(|mut results| results.pop())
        .ok_or_else(|| ProviderError::Malformed {
            ticker: ticker.to_string(),
            reason: "empty chart result".to_string(),
        })?;

    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Malformed {
            ticker: ticker.to_string(),
            reason: "no quote indicators".to_string(),
        })?;

    let timestamps = result.timestamp.unwrap_or_default();
    let closes = quote.close.unwrap_or_default();
    let volumes = quote.volume.unwrap_or_default();

    let mut series = Vec::with_capacity(timestamps.len());
    for (i, epoch) in timestamps.iter().enumerate() {
        let Some(timestamp) = DateTime::from_timestamp(*epoch, 0) else {
            continue;
        };
        series.push(RawBar::new(
            timestamp,
            closes.get(i).copied().flatten(),
            volumes.get(i).copied().flatten(),
        ));
    }
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(json: &str) -> ChartEnvelope {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn parses_chart_arrays_preserving_nulls() {
        let payload = r#"{
            "chart": {
                "result": [{
                    "timestamp": [1700000000, 1700000300, 1700000600],
                    "indicators": {
                        "quote": [{
                            "close": [100.5, null, 101.25],
                            "volume": [1200, 0, null]
                        }]
                    }
                }]
            }
        }"#;

        let series = parse_chart("RELIANCE.NS", envelope(payload)).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].close, Some(100.5));
        assert_eq!(series[0].volume, Some(1200));
        assert_eq!(series[1].close, None);
        assert_eq!(series[1].volume, Some(0));
        assert_eq!(series[2].close, Some(101.25));
        assert_eq!(series[2].volume, None);
    }

    #[test]
    fn empty_result_is_malformed() {
        let payload = r#"{"chart": {"result": null}}"#;
        assert!(matches!(
            parse_chart("TCS.NS", envelope(payload)),
            Err(ProviderError::Malformed { .. })
        ));
    }

    #[test]
    fn short_indicator_arrays_leave_missing_fields_empty() {
        let payload = r#"{
            "chart": {
                "result": [{
                    "timestamp": [1700000000, 1700000300],
                    "indicators": {
                        "quote": [{
                            "close": [100.0],
                            "volume": [500]
                        }]
                    }
                }]
            }
        }"#;

        let series = parse_chart("INFY.NS", envelope(payload)).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[1].close, None);
        assert_eq!(series[1].volume, None);
    }
}
