//! In-process buffer holding the most recent quote per symbol.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::model::Quote;

/// Shared map from symbol to its latest observed quote.
///
/// The poller is the sole writer; the persister and the live conversion path
/// read concurrently. Each `put` replaces the entry as a whole value, so
/// readers never observe a partially updated quote.
#[derive(Clone)]
pub struct QuoteBuffer {
    inner: Arc<RwLock<HashMap<String, Quote>>>,
}

impl QuoteBuffer {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Overwrites the buffered quote for the symbol.
    pub async fn put(&self, quote: Quote) {
        let mut buffer = self.inner.write().await;
        buffer.insert(quote.symbol.clone(), quote);
    }

    pub async fn get(&self, symbol: &str) -> Option<Quote> {
        let buffer = self.inner.read().await;
        let value = buffer.get(symbol).cloned();
        if value.is_some() {
            debug!(symbol, "Buffer HIT");
        } else {
            debug!(symbol, "Buffer MISS");
        }
        value
    }

    /// Atomic point-in-time copy of the whole buffer.
    pub async fn snapshot(&self) -> HashMap<String, Quote> {
        let buffer = self.inner.read().await;
        buffer.clone()
    }

    pub async fn len(&self) -> usize {
        let buffer = self.inner.read().await;
        buffer.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for QuoteBuffer {
    fn default() -> Self {
        Self::new()
    }
}
