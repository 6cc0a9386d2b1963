//! Registry of currently tradable symbols.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::market_data::MarketDataSource;

/// Caches the active symbol set fetched from the upstream source.
///
/// A failed refresh leaves the previously known set in place; the error is
/// returned so the caller can log it and retry on its next scheduled cycle.
pub struct SymbolRegistry {
    source: Arc<dyn MarketDataSource>,
    symbols: RwLock<HashSet<String>>,
}

impl SymbolRegistry {
    pub fn new(source: Arc<dyn MarketDataSource>) -> Self {
        Self {
            source,
            symbols: RwLock::new(HashSet::new()),
        }
    }

    /// Replaces the cached set with a fresh upstream fetch.
    pub async fn refresh(&self) -> Result<usize> {
        let fetched = self
            .source
            .active_symbols()
            .await
            .context("Symbol refresh failed")?;
        let count = fetched.len();

        let mut symbols = self.symbols.write().await;
        *symbols = fetched.into_iter().collect();
        info!("Refreshed symbol registry with {count} symbols");
        Ok(count)
    }

    pub async fn contains(&self, symbol: &str) -> bool {
        let symbols = self.symbols.read().await;
        symbols.contains(symbol)
    }

    pub async fn symbols(&self) -> HashSet<String> {
        let symbols = self.symbols.read().await;
        symbols.clone()
    }

    pub async fn is_empty(&self) -> bool {
        let symbols = self.symbols.read().await;
        symbols.is_empty()
    }
}
