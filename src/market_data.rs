//! Upstream market-data abstractions.

use anyhow::Result;
use async_trait::async_trait;

use crate::model::Quote;

/// Upstream source of tradable symbols and price snapshots.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Returns the identifiers of all currently tradable symbols.
    async fn active_symbols(&self) -> Result<Vec<String>>;

    /// Returns the latest price for every symbol the upstream knows,
    /// stamped with the fetch instant when the upstream supplies no
    /// timestamp of its own.
    async fn latest_tickers(&self) -> Result<Vec<Quote>>;
}
