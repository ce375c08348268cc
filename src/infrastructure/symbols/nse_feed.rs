//! NSE equity listing feed client.
//!
//! One GET against the EQUITY_L.csv archive; NSE blocks non-browser agents,
//! hence the header set.

use crate::domain::errors::FeedError;
use crate::domain::ports::SymbolFeed;
use crate::infrastructure::core::http_client_factory::HttpClientFactory;
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_FEED_URL: &str = "https://archives.nseindia.com/content/equities/EQUITY_L.csv";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8";

pub struct NseSymbolFeed {
    client: ClientWithMiddleware,
    url: String,
    timeout: Duration,
}

impl NseSymbolFeed {
    pub fn new(url: String, timeout: Duration) -> Self {
        Self {
            client: HttpClientFactory::create_client(),
            url,
            timeout,
        }
    }
}

#[async_trait]
impl SymbolFeed for NseSymbolFeed {
    async fn fetch_symbols(&self) -> Result<Vec<String>, FeedError> {
        info!("Downloading equity listing from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
            .header(reqwest::header::ACCEPT, BROWSER_ACCEPT)
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FeedError::Status {
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await?;
        parse_symbol_column(&body)
    }
}

/// Extract the SYMBOL column from the listing CSV, keeping non-empty entries.
fn parse_symbol_column(csv_text: &str) -> Result<Vec<String>, FeedError> {
    let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
    let symbol_index = reader
        .headers()?
        .iter()
        .position(|header| header.trim() == "SYMBOL")
        .ok_or(FeedError::MissingSymbolColumn)?;

    let mut symbols = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(field) = record.get(symbol_index) {
            let symbol = field.trim();
            if !symbol.is_empty() {
                symbols.push(symbol.to_string());
            }
        }
    }
    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_symbol_column_and_skips_blanks() {
        let csv_text = "SYMBOL,NAME OF COMPANY,SERIES\n\
                        RELIANCE,Reliance Industries,EQ\n\
                        ,Blank Row,EQ\n\
                        TCS,Tata Consultancy Services,EQ\n";
        let symbols = parse_symbol_column(csv_text).unwrap();
        assert_eq!(symbols, vec!["RELIANCE", "TCS"]);
    }

    #[test]
    fn missing_symbol_column_is_an_error() {
        let csv_text = "TICKER,NAME\nRELIANCE,Reliance Industries\n";
        assert!(matches!(
            parse_symbol_column(csv_text),
            Err(FeedError::MissingSymbolColumn)
        ));
    }

    #[test]
    fn header_whitespace_is_tolerated() {
        let csv_text = " SYMBOL ,NAME\nINFY,Infosys\n";
        let symbols = parse_symbol_column(csv_text).unwrap();
        assert_eq!(symbols, vec!["INFY"]);
    }
}
