//! Periodic task that flushes the quote buffer into the durable store.

use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::buffer::QuoteBuffer;
use crate::model::Quote;
use crate::store::QuoteStore;

pub struct QuotePersister {
    buffer: QuoteBuffer,
    store: Arc<QuoteStore>,
    save_interval: Duration,
    retention: ChronoDuration,
}

impl QuotePersister {
    pub fn new(
        buffer: QuoteBuffer,
        store: Arc<QuoteStore>,
        save_interval: Duration,
        retention_days: i64,
    ) -> Self {
        Self {
            buffer,
            store,
            save_interval,
            retention: ChronoDuration::days(retention_days),
        }
    }

    /// Runs flush cycles until the shutdown signal flips, then performs a
    /// final flush so buffered quotes are not lost on shutdown.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("Quote persister started (interval {:?})", self.save_interval);
        let mut ticker = tokio::time::interval(self.save_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of a tokio interval fires immediately; skip it so
        // the first flush happens a full interval after startup.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.flush().await;
                }
                _ = shutdown.changed() => {
                    self.flush().await;
                    info!("Quote persister stopped");
                    break;
                }
            }
        }
    }

    /// Snapshots the buffer, batch-writes it, then prunes expired records.
    /// A write failure skips the cycle; the buffer stays authoritative and
    /// the same quotes are retried on the next flush.
    pub async fn flush(&self) {
        let snapshot = self.buffer.snapshot().await;
        if snapshot.is_empty() {
            debug!("Nothing to flush");
            return;
        }

        let records: Vec<Quote> = snapshot.into_values().collect();
        match self.store.insert_batch(&records) {
            Ok(written) => {
                debug!("Flushed {written} quotes to store");
                if let Err(e) = self.store.prune_older_than(self.retention) {
                    warn!(error = %e, "Retention pruning failed");
                }
            }
            Err(e) => {
                warn!(error = %e, "Store write failed, buffer retained for next flush");
            }
        }
    }
}
