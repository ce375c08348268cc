//! Scan orchestration: cap the universe, partition into batches, run a
//! bounded worker pool over the provider, and aggregate ranked results.
//!
//! Workers only return values; the coordinating task is the single writer
//! into the aggregation pools, so no locking is needed around them. Results
//! merge in completion order and become deterministic after the final sort.

use crate::application::classifier::{self, ClassifierLimits};
use crate::domain::market::{Classification, ScanResult, ScanStatus};
use crate::domain::ports::MarketDataService;
use futures::stream::{self, StreamExt};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Progress notification: (processed symbols, total symbols, message).
/// Fire-and-forget; must not block.
pub type ProgressFn = Arc<dyn Fn(usize, usize, &str) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ScanSettings {
    /// Defensive cap on the universe size per scan.
    pub max_symbols: usize,
    /// Symbols per provider batch.
    pub batch_size: usize,
    /// Concurrent workers; independent of (and smaller than) the batch count.
    pub worker_count: usize,
    /// A classification is a match when ratio exceeds this.
    pub spike_threshold: f64,
    pub top_spikes_count: usize,
    /// Momentum confirmation on the last three volumes, off by default.
    pub require_rising_trend: bool,
    pub limits: ClassifierLimits,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            max_symbols: 2200,
            batch_size: 100,
            worker_count: 10,
            spike_threshold: 2.0,
            top_spikes_count: 20,
            require_rising_trend: false,
            limits: ClassifierLimits::default(),
        }
    }
}

pub struct ScanOrchestrator {
    market_data: Arc<dyn MarketDataService>,
    settings: ScanSettings,
}

impl ScanOrchestrator {
    pub fn new(market_data: Arc<dyn MarketDataService>, settings: ScanSettings) -> Self {
        Self {
            market_data,
            settings,
        }
    }

    pub async fn run(&self, mut symbols: Vec<String>, progress: Option<ProgressFn>) -> ScanResult {
        symbols.truncate(self.settings.max_symbols);
        let total_count = symbols.len();

        let batches: Vec<Vec<String>> = symbols
            .chunks(self.settings.batch_size.max(1))
            .map(|chunk| chunk.to_vec())
            .collect();

        info!(
            "Scan started: {} symbols in {} batches, {} workers",
            total_count,
            batches.len(),
            self.settings.worker_count
        );
        let started = Instant::now();

        let mut completed = stream::iter(batches.into_iter().map(|batch| {
            let market_data = Arc::clone(&self.market_data);
            let settings = self.settings.clone();
            async move {
                let batch_len = batch.len();
                let (classified, matches) =
                    process_batch(market_data.as_ref(), &batch, &settings).await;
                (batch_len, classified, matches)
            }
        }))
        .buffer_unordered(self.settings.worker_count.max(1));

        let mut all_classified: Vec<Classification> = Vec::new();
        let mut matches: Vec<Classification> = Vec::new();
        let mut processed_count = 0usize;

        while let Some((batch_len, batch_classified, batch_matches)) = completed.next().await {
            all_classified.extend(batch_classified);
            matches.extend(batch_matches);
            processed_count += batch_len;
            if let Some(callback) = &progress {
                callback(
                    processed_count,
                    total_count,
                    &format!("Processing: {}/{}", processed_count, total_count),
                );
            }
        }

        sort_by_ratio_desc(&mut matches);
        sort_by_ratio_desc(&mut all_classified);
        all_classified.truncate(self.settings.top_spikes_count);

        info!(
            "Scan complete: {} matches across {} symbols in {:.1}s",
            matches.len(),
            total_count,
            started.elapsed().as_secs_f64()
        );

        ScanResult {
            matches,
            top_spikes: all_classified,
            total_scanned: total_count,
            status: ScanStatus::Complete,
        }
    }
}

/// One worker unit: fetch the batch, classify every symbol present, split
/// out the matches. A provider failure degrades the whole batch to empty.
async fn process_batch(
    market_data: &dyn MarketDataService,
    batch: &[String],
    settings: &ScanSettings,
) -> (Vec<Classification>, Vec<Classification>) {
    let series_by_symbol = match market_data.fetch_batch(batch).await {
        Ok(map) => map,
        Err(e) => {
            warn!("Batch of {} symbols yielded no data: {}", batch.len(), e);
            return (Vec::new(), Vec::new());
        }
    };

    let mut classified = Vec::new();
    let mut matches = Vec::new();
    for symbol in batch {
        let Some(series) = series_by_symbol.get(symbol) else {
            continue;
        };
        match classifier::classify(
            symbol,
            series,
            settings.require_rising_trend,
            &settings.limits,
        ) {
            Ok(c) => {
                if c.ratio > settings.spike_threshold {
                    matches.push(c.clone());
                }
                classified.push(c);
            }
            Err(reason) => debug!("{}: skipped ({})", symbol, reason),
        }
    }
    (classified, matches)
}

fn sort_by_ratio_desc(list: &mut [Classification]) {
    // Stable: equal ratios keep completion order.
    list.sort_by(|a, b| b.ratio.partial_cmp(&a.ratio).unwrap_or(Ordering::Equal));
}
