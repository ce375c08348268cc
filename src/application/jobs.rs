//! Single-flight background job wrapping one orchestrator invocation.
//!
//! The registry is a process-wide single slot: a new scan while one is in
//! flight is rejected, not queued, and a finished scan fully replaces the
//! previous result. Any failure inside the job task is caught at this
//! boundary, reported in the status message, and always clears the running
//! flag so the next scan can start.

use crate::application::scanner::{ProgressFn, ScanOrchestrator};
use crate::domain::errors::JobError;
use crate::domain::market::ScanResult;
use crate::domain::ports::SymbolUniverse;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tracing::{error, info};

#[derive(Debug, Default)]
struct JobState {
    running: bool,
    progress: usize,
    total: usize,
    message: String,
    last_results: Option<ScanResult>,
    started_at: Option<Instant>,
}

/// Point-in-time view of the job slot, shaped for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub running: bool,
    pub progress: usize,
    pub total: usize,
    pub message: String,
    pub results: Option<ScanResult>,
    /// Seconds since the running scan started, 0 when idle.
    pub elapsed: f64,
}

pub struct JobRegistry {
    state: Mutex<JobState>,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(JobState {
                message: "Idle".to_string(),
                ..JobState::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, JobState> {
        // A poisoned lock only means a writer panicked mid-update; the state
        // fields are all independently valid, so take it as-is.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Atomically claim the single job slot and reset the stats.
    pub fn try_start(&self) -> Result<(), JobError> {
        let mut state = self.lock();
        if state.running {
            return Err(JobError::AlreadyRunning);
        }
        state.running = true;
        state.progress = 0;
        state.total = 0;
        state.last_results = None;
        state.started_at = Some(Instant::now());
        state.message = "Starting analysis...".to_string();
        Ok(())
    }

    pub fn set_progress(&self, progress: usize, total: usize, message: &str) {
        let mut state = self.lock();
        state.progress = progress;
        state.total = total;
        state.message = message.to_string();
    }

    pub fn finish(&self, results: ScanResult) {
        let mut state = self.lock();
        state.last_results = Some(results);
        state.message = "Analysis Complete".to_string();
        state.running = false;
    }

    pub fn fail(&self, message: &str) {
        let mut state = self.lock();
        state.message = message.to_string();
        state.running = false;
    }

    pub fn snapshot(&self) -> JobSnapshot {
        let state = self.lock();
        let elapsed = match (state.running, state.started_at) {
            (true, Some(started_at)) => {
                (started_at.elapsed().as_secs_f64() * 10.0).round() / 10.0
            }
            _ => 0.0,
        };
        JobSnapshot {
            running: state.running,
            progress: state.progress,
            total: state.total,
            message: state.message.clone(),
            results: state.last_results.clone(),
            elapsed,
        }
    }
}

/// Runs scans as background jobs against the single-slot registry.
pub struct JobRunner {
    registry: Arc<JobRegistry>,
    universe: Arc<dyn SymbolUniverse>,
    orchestrator: Arc<ScanOrchestrator>,
}

impl JobRunner {
    pub fn new(
        registry: Arc<JobRegistry>,
        universe: Arc<dyn SymbolUniverse>,
        orchestrator: Arc<ScanOrchestrator>,
    ) -> Self {
        Self {
            registry,
            universe,
            orchestrator,
        }
    }

    /// Kick off a scan in the background, or reject if one is in flight.
    pub fn start_scan(&self) -> Result<(), JobError> {
        self.registry.try_start()?;
        info!("Volume scan job started");

        let registry = Arc::clone(&self.registry);
        let universe = Arc::clone(&self.universe);
        let orchestrator = Arc::clone(&self.orchestrator);

        tokio::spawn(async move {
            let progress_registry = Arc::clone(&registry);
            let progress: ProgressFn = Arc::new(move |done, total, message: &str| {
                progress_registry.set_progress(done, total, message);
            });

            let scan = tokio::spawn(async move {
                let symbols = universe.symbols().await;
                orchestrator.run(symbols, Some(progress)).await
            });

            // Job boundary: a panicked or cancelled scan must still release
            // the slot and leave an explanatory message behind.
            match scan.await {
                Ok(results) => registry.finish(results),
                Err(e) => {
                    error!("Scan job failed: {}", e);
                    registry.fail(&format!("Error: {}", e));
                }
            }
        });

        Ok(())
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.registry.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::scanner::ScanSettings;
    use crate::domain::errors::ProviderError;
    use crate::domain::market::SeriesWindow;
    use crate::domain::ports::MarketDataService;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::time::Duration;

    struct StaticUniverse(Vec<String>);

    #[async_trait]
    impl SymbolUniverse for StaticUniverse {
        async fn symbols(&self) -> Vec<String> {
            self.0.clone()
        }
    }

    /// Always yields empty batches, slowly, so the job stays running long
    /// enough to observe single-flight rejection.
    struct SlowEmptyMarketData;

    #[async_trait]
    impl MarketDataService for SlowEmptyMarketData {
        async fn fetch_batch(
            &self,
            _symbols: &[String],
        ) -> Result<HashMap<String, SeriesWindow>, ProviderError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(HashMap::new())
        }
    }

    struct PanickingMarketData;

    #[async_trait]
    impl MarketDataService for PanickingMarketData {
        async fn fetch_batch(
            &self,
            _symbols: &[String],
        ) -> Result<HashMap<String, SeriesWindow>, ProviderError> {
            panic!("simulated provider bug");
        }
    }

    fn runner(market_data: Arc<dyn MarketDataService>) -> JobRunner {
        let symbols: Vec<String> = (0..4).map(|i| format!("S{}", i)).collect();
        JobRunner::new(
            Arc::new(JobRegistry::new()),
            Arc::new(StaticUniverse(symbols)),
            Arc::new(ScanOrchestrator::new(
                market_data,
                ScanSettings {
                    batch_size: 2,
                    worker_count: 1,
                    ..ScanSettings::default()
                },
            )),
        )
    }

    async fn wait_until_idle(runner: &JobRunner) -> JobSnapshot {
        for _ in 0..100 {
            let snapshot = runner.snapshot();
            if !snapshot.running {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job never finished");
    }

    #[tokio::test]
    async fn second_start_is_rejected_while_running() {
        let runner = runner(Arc::new(SlowEmptyMarketData));

        runner.start_scan().unwrap();
        assert_eq!(runner.start_scan(), Err(JobError::AlreadyRunning));

        let snapshot = wait_until_idle(&runner).await;
        assert_eq!(snapshot.message, "Analysis Complete");
        assert_eq!(snapshot.results.unwrap().total_scanned, 4);

        // Slot is free again.
        runner.start_scan().unwrap();
        wait_until_idle(&runner).await;
    }

    #[tokio::test]
    async fn panicking_scan_clears_running_flag_and_reports_error() {
        let runner = runner(Arc::new(PanickingMarketData));

        runner.start_scan().unwrap();
        let snapshot = wait_until_idle(&runner).await;

        assert!(snapshot.message.starts_with("Error:"), "{}", snapshot.message);
        assert!(snapshot.results.is_none());

        // A new scan can start after the failure.
        assert!(runner.start_scan().is_ok());
    }

    #[tokio::test]
    async fn snapshot_reports_progress_written_by_the_job() {
        let registry = JobRegistry::new();
        registry.try_start().unwrap();
        registry.set_progress(100, 400, "Processing: 100/400");

        let snapshot = registry.snapshot();
        assert!(snapshot.running);
        assert_eq!(snapshot.progress, 100);
        assert_eq!(snapshot.total, 400);
        assert_eq!(snapshot.message, "Processing: 100/400");
    }
}
