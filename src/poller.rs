//! Periodic task that polls upstream prices into the quote buffer.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::buffer::QuoteBuffer;
use crate::market_data::MarketDataSource;
use crate::registry::SymbolRegistry;

pub struct QuotePoller {
    source: Arc<dyn MarketDataSource>,
    registry: Arc<SymbolRegistry>,
    buffer: QuoteBuffer,
    poll_interval: Duration,
    symbol_refresh_interval: Duration,
}

impl QuotePoller {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        registry: Arc<SymbolRegistry>,
        buffer: QuoteBuffer,
        poll_interval: Duration,
        symbol_refresh_interval: Duration,
    ) -> Self {
        Self {
            source,
            registry,
            buffer,
            poll_interval,
            symbol_refresh_interval,
        }
    }

    /// Runs poll cycles until the shutdown signal flips.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("Quote poller started (interval {:?})", self.poll_interval);
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_refresh: Option<Instant> = None;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.cycle(&mut last_refresh).await;
                }
                _ = shutdown.changed() => {
                    info!("Quote poller stopped");
                    break;
                }
            }
        }
    }

    /// One poll cycle. Upstream failures are logged and retried on the next
    /// cycle; they never escape this method.
    pub async fn cycle(&self, last_refresh: &mut Option<Instant>) {
        let refresh_due = match last_refresh {
            None => true,
            Some(at) => at.elapsed() >= self.symbol_refresh_interval,
        };
        if refresh_due || self.registry.is_empty().await {
            match self.registry.refresh().await {
                Ok(_) => *last_refresh = Some(Instant::now()),
                Err(e) => warn!(error = %e, "Symbol refresh failed, keeping previous set"),
            }
        }

        let quotes = match self.source.latest_tickers().await {
            Ok(quotes) => quotes,
            Err(e) => {
                warn!(error = %e, "Ticker fetch failed, retrying next cycle");
                return;
            }
        };

        // With an empty registry (discovery has never succeeded) everything
        // the upstream returned is buffered rather than dropping the cycle.
        let known = self.registry.symbols().await;
        let mut buffered = 0;
        for quote in quotes {
            if !known.is_empty() && !known.contains(&quote.symbol) {
                continue;
            }
            self.buffer.put(quote).await;
            buffered += 1;
        }
        debug!("Buffered {buffered} quotes this cycle");
    }
}
