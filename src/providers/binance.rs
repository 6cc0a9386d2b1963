use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::market_data::MarketDataSource;
use crate::model::Quote;

/// Binance-style REST market-data source.
///
/// Symbol discovery uses `/api/v3/exchangeInfo`; price snapshots use the
/// batched `/api/v3/ticker/price` endpoint, which returns every symbol's
/// latest price in one response.
pub struct BinanceSource {
    base_url: String,
    client: reqwest::Client,
}

impl BinanceSource {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("coinconv/0.1")
            .timeout(request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[derive(Deserialize, Debug)]
struct ExchangeInfoResponse {
    symbols: Vec<ExchangeSymbol>,
}

#[derive(Deserialize, Debug)]
struct ExchangeSymbol {
    symbol: String,
    status: String,
}

#[derive(Deserialize, Debug)]
struct TickerEntry {
    symbol: String,
    // Binance encodes prices as decimal strings.
    price: String,
}

impl TickerEntry {
    fn into_quote(self, observed_at: chrono::DateTime<Utc>) -> Option<Quote> {
        let price: f64 = match self.price.parse() {
            Ok(p) => p,
            Err(e) => {
                warn!(symbol = %self.symbol, price = %self.price, error = %e, "Skipping unparseable ticker");
                return None;
            }
        };
        if self.symbol.is_empty() || price <= 0.0 {
            warn!(symbol = %self.symbol, price, "Skipping ticker with non-positive price");
            return None;
        }
        Some(Quote::new(self.symbol.to_uppercase(), price, observed_at))
    }
}

#[async_trait]
impl MarketDataSource for BinanceSource {
    async fn active_symbols(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/v3/exchangeInfo", self.base_url);
        debug!("Requesting exchange info from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for URL: {}", e, url))?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {} for exchange info", response.status()));
        }

        let data = response.json::<ExchangeInfoResponse>().await?;
        let symbols: Vec<String> = data
            .symbols
            .into_iter()
            .filter(|s| s.status == "TRADING")
            .map(|s| s.symbol.to_uppercase())
            .collect();

        debug!("Fetched {} trading symbols", symbols.len());
        Ok(symbols)
    }

    async fn latest_tickers(&self) -> Result<Vec<Quote>> {
        let url = format!("{}/api/v3/ticker/price", self.base_url);
        debug!("Requesting ticker prices from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for URL: {}", e, url))?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {} for ticker prices", response.status()));
        }

        let entries = response.json::<Vec<TickerEntry>>().await?;
        let observed_at = Utc::now();
        let quotes: Vec<Quote> = entries
            .into_iter()
            .filter_map(|e| e.into_quote(observed_at))
            .collect();

        debug!("Fetched {} ticker quotes", quotes.len());
        Ok(quotes)
    }
}
