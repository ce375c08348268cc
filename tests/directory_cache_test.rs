//! Integration tests for the two-tier symbol directory cache against a real
//! SQLite file.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use volspike::domain::errors::FeedError;
use volspike::domain::ports::SymbolFeed;
use volspike::infrastructure::persistence::Database;
use volspike::infrastructure::symbols::SymbolDirectory;
use volspike::infrastructure::symbols::directory_cache::FALLBACK_SYMBOLS;

struct FailingFeed {
    calls: AtomicUsize,
}

#[async_trait]
impl SymbolFeed for FailingFeed {
    async fn fetch_symbols(&self) -> Result<Vec<String>, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(FeedError::Status { status: 503 })
    }
}

struct StaticFeed {
    symbols: Vec<String>,
    calls: AtomicUsize,
}

#[async_trait]
impl SymbolFeed for StaticFeed {
    async fn fetch_symbols(&self) -> Result<Vec<String>, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.symbols.clone())
    }
}

async fn temp_db(name: &str) -> Database {
    let path = std::env::temp_dir().join(format!(
        "volspike-test-{}-{}.db",
        name,
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);
    Database::new(&format!("sqlite://{}", path.display()))
        .await
        .unwrap()
}

#[tokio::test]
async fn pristine_deployment_with_dead_feed_serves_fallback() {
    let db = temp_db("fallback").await;
    let feed = Arc::new(FailingFeed {
        calls: AtomicUsize::new(0),
    });
    let directory = SymbolDirectory::new(db, feed.clone());

    let symbols = directory.get_symbols().await;

    assert_eq!(symbols.len(), 6);
    assert_eq!(symbols, FALLBACK_SYMBOLS.map(String::from).to_vec());
    // Never downloaded, so the refresh was attempted exactly once.
    assert_eq!(feed.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn first_run_downloads_and_persists_the_listing() {
    let db = temp_db("first-run").await;
    let feed = Arc::new(StaticFeed {
        symbols: vec!["WIPRO".to_string(), "LT".to_string()],
        calls: AtomicUsize::new(0),
    });
    let directory = SymbolDirectory::new(db.clone(), feed.clone());

    let symbols = directory.get_symbols().await;
    assert_eq!(symbols, vec!["WIPRO", "LT"]);

    // The listing and the download date landed in the database.
    let rows: Vec<(String,)> = sqlx::query_as("SELECT symbol FROM symbols ORDER BY symbol")
        .fetch_all(&db.pool)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);

    let date: Option<(String,)> =
        sqlx::query_as("SELECT value FROM metadata WHERE key = 'last_download_date'")
            .fetch_optional(&db.pool)
            .await
            .unwrap();
    let today = chrono::Local::now().date_naive().to_string();
    assert_eq!(date.unwrap().0, today);
}

#[tokio::test]
async fn persisted_listing_survives_feed_outage() {
    let db = temp_db("outage").await;

    // Seed the cache as if a download happened earlier today; with
    // last_download == today the refresh predicate is false on any weekday.
    let today = chrono::Local::now().date_naive().to_string();
    for symbol in ["RELIANCE", "TCS"] {
        sqlx::query("INSERT INTO symbols (symbol) VALUES (?)")
            .bind(symbol)
            .execute(&db.pool)
            .await
            .unwrap();
    }
    sqlx::query("INSERT INTO metadata (key, value) VALUES ('last_download_date', ?)")
        .bind(&today)
        .execute(&db.pool)
        .await
        .unwrap();

    let feed = Arc::new(FailingFeed {
        calls: AtomicUsize::new(0),
    });
    let directory = SymbolDirectory::new(db, feed.clone());

    let symbols = directory.get_symbols().await;
    assert_eq!(symbols, vec!["RELIANCE", "TCS"]);
    // No refresh was due, so the dead feed was never touched.
    assert_eq!(feed.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn second_call_is_served_from_the_process_memo() {
    let db = temp_db("memo").await;
    let feed = Arc::new(StaticFeed {
        symbols: vec!["SBIN".to_string()],
        calls: AtomicUsize::new(0),
    });
    let directory = SymbolDirectory::new(db, feed.clone());

    let first = directory.get_symbols().await;
    let second = directory.get_symbols().await;

    assert_eq!(first, second);
    assert_eq!(feed.calls.load(Ordering::SeqCst), 1);
}
