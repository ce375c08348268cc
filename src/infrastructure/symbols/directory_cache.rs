//! Two-tier symbol directory cache.
//!
//! Lookup order: in-process memo, then the SQLite cache, then the external
//! feed. The feed is hit at most once a week (first run, or Mondays when the
//! recorded download date is stale); every failure path degrades to whatever
//! older data exists, ending at a fixed fallback list. `get_symbols` never
//! fails.

use crate::domain::ports::{SymbolFeed, SymbolUniverse};
use crate::infrastructure::persistence::Database;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Datelike, Local, NaiveDate, Weekday};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Highly liquid NSE symbols; last resort on a pristine deployment with no
/// network access.
pub const FALLBACK_SYMBOLS: [&str; 6] =
    ["RELIANCE", "TCS", "INFY", "HDFCBANK", "ICICIBANK", "SBIN"];

const LAST_DOWNLOAD_KEY: &str = "last_download_date";

pub struct SymbolDirectory {
    db: Database,
    feed: Arc<dyn SymbolFeed>,
    memo: RwLock<Option<Vec<String>>>,
}

impl SymbolDirectory {
    pub fn new(db: Database, feed: Arc<dyn SymbolFeed>) -> Self {
        Self {
            db,
            feed,
            memo: RwLock::new(None),
        }
    }

    /// Refresh is due when nothing was ever downloaded, or on the weekly
    /// refresh day (Monday) with a download date before today. Pure so the
    /// calendar logic is testable without a clock.
    pub fn should_refresh(today: NaiveDate, last_download: Option<NaiveDate>) -> bool {
        match last_download {
            None => true,
            Some(last) => today.weekday() == Weekday::Mon && last < today,
        }
    }

    /// The tradable-symbol universe. Memoized for the process lifetime.
    pub async fn get_symbols(&self) -> Vec<String> {
        if let Some(cached) = self.memo.read().await.as_ref() {
            return cached.clone();
        }

        let symbols = match self.load().await {
            Ok(symbols) if !symbols.is_empty() => symbols,
            Ok(_) => {
                info!("Symbol cache empty, using fallback symbol list");
                fallback()
            }
            Err(e) => {
                warn!("Symbol cache error, using fallback symbol list: {:#}", e);
                fallback()
            }
        };

        *self.memo.write().await = Some(symbols.clone());
        symbols
    }

    async fn load(&self) -> Result<Vec<String>> {
        let last_download = self.last_download_date().await?;
        let today = Local::now().date_naive();

        if Self::should_refresh(today, last_download) {
            match self.refresh(today).await {
                Ok(symbols) => return Ok(symbols),
                Err(e) => warn!("Symbol feed refresh failed, serving cached data: {:#}", e),
            }
        }

        let cached = self.read_cached().await?;
        if !cached.is_empty() {
            info!(
                "Using cached symbols ({} symbols, last download: {})",
                cached.len(),
                last_download.map_or_else(|| "never".to_string(), |d| d.to_string())
            );
        }
        Ok(cached)
    }

    /// Replace the persisted symbol set and download date in one transaction.
    async fn refresh(&self, today: NaiveDate) -> Result<Vec<String>> {
        let symbols = self
            .feed
            .fetch_symbols()
            .await
            .context("Symbol feed download failed")?;

        let mut tx = self.db.pool.begin().await?;
        sqlx::query("DELETE FROM symbols").execute(&mut *tx).await?;
        for symbol in &symbols {
            sqlx::query("INSERT INTO symbols (symbol) VALUES (?)")
                .bind(symbol)
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query("INSERT OR REPLACE INTO metadata (key, value) VALUES (?, ?)")
            .bind(LAST_DOWNLOAD_KEY)
            .bind(today.to_string())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("Cached {} symbols from feed", symbols.len());
        Ok(symbols)
    }

    async fn last_download_date(&self) -> Result<Option<NaiveDate>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM metadata WHERE key = ?")
            .bind(LAST_DOWNLOAD_KEY)
            .fetch_optional(&self.db.pool)
            .await?;
        // An unparseable stored date counts as never downloaded.
        Ok(row.and_then(|(value,)| NaiveDate::parse_from_str(&value, "%Y-%m-%d").ok()))
    }

    async fn read_cached(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT symbol FROM symbols ORDER BY symbol")
            .fetch_all(&self.db.pool)
            .await?;
        Ok(rows.into_iter().map(|(symbol,)| symbol).collect())
    }
}

fn fallback() -> Vec<String> {
    FALLBACK_SYMBOLS.iter().map(|s| s.to_string()).collect()
}

#[async_trait]
impl SymbolUniverse for SymbolDirectory {
    async fn symbols(&self) -> Vec<String> {
        self.get_symbols().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn refreshes_when_never_downloaded() {
        // A Thursday; day of week must not matter for the first download.
        assert!(SymbolDirectory::should_refresh(date(2024, 3, 7), None));
    }

    #[test]
    fn refreshes_on_monday_with_stale_date() {
        let monday = date(2024, 3, 4);
        assert!(SymbolDirectory::should_refresh(
            monday,
            Some(date(2024, 2, 26))
        ));
    }

    #[test]
    fn no_refresh_on_monday_when_already_downloaded_today() {
        let monday = date(2024, 3, 4);
        assert!(!SymbolDirectory::should_refresh(monday, Some(monday)));
    }

    #[test]
    fn no_refresh_midweek_regardless_of_staleness() {
        let wednesday = date(2024, 3, 6);
        assert!(!SymbolDirectory::should_refresh(
            wednesday,
            Some(date(2023, 1, 2))
        ));
    }
}
