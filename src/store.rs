//! Durable time-series storage for quotes, backed by a fjall keyspace.
//!
//! Records are keyed by `symbol \0 big-endian-millis`, which sorts each
//! symbol's quotes by observation time and makes the two lookup patterns
//! (`latest_before`, `last_of_day`) single range scans.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle};
use std::path::Path;
use tracing::{debug, info};

use crate::model::Quote;

const KEY_SEPARATOR: u8 = 0x00;

pub struct QuoteStore {
    _keyspace: Keyspace,
    quotes: PartitionHandle,
}

fn encode_key(symbol: &str, observed_at: DateTime<Utc>) -> Vec<u8> {
    let millis = observed_at.timestamp_millis().max(0) as u64;
    let mut key = Vec::with_capacity(symbol.len() + 9);
    key.extend_from_slice(symbol.as_bytes());
    key.push(KEY_SEPARATOR);
    key.extend_from_slice(&millis.to_be_bytes());
    key
}

fn timestamp_of_key(key: &[u8]) -> Option<u64> {
    let ts_bytes: [u8; 8] = key.get(key.len().checked_sub(8)?..)?.try_into().ok()?;
    Some(u64::from_be_bytes(ts_bytes))
}

impl QuoteStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create store directory: {}", path.display()))?;

        let keyspace = fjall::Config::new(path)
            .open()
            .with_context(|| format!("Failed to open quote store at {}", path.display()))?;
        let quotes = keyspace
            .open_partition("quotes", PartitionCreateOptions::default())
            .context("Failed to open quotes partition")?;

        Ok(Self {
            _keyspace: keyspace,
            quotes,
        })
    }

    /// Bulk-appends records. Re-inserting a record for the same
    /// `(symbol, observed_at)` overwrites it, so retried batches are safe.
    pub fn insert_batch(&self, records: &[Quote]) -> Result<usize> {
        for record in records {
            let key = encode_key(&record.symbol, record.observed_at);
            let value = serde_json::to_vec(record)?;
            self.quotes.insert(key, value)?;
        }
        if !records.is_empty() {
            info!("Saved {} quotes to store", records.len());
        }
        Ok(records.len())
    }

    /// The record with the greatest `observed_at <= cutoff` for the symbol.
    pub fn latest_before(&self, symbol: &str, cutoff: DateTime<Utc>) -> Result<Option<Quote>> {
        let start = encode_key(symbol, DateTime::<Utc>::UNIX_EPOCH);
        let end = encode_key(symbol, cutoff);
        self.last_in_range(start..=end)
    }

    /// The record with the greatest `observed_at` whose UTC calendar date
    /// equals `day`. The day boundary is `[00:00:00, 24:00:00)` UTC.
    pub fn last_of_day(&self, symbol: &str, day: NaiveDate) -> Result<Option<Quote>> {
        let next_day = day.succ_opt().context("Day out of range")?;
        let start = encode_key(symbol, day.and_time(NaiveTime::MIN).and_utc());
        let end = encode_key(symbol, next_day.and_time(NaiveTime::MIN).and_utc());
        self.last_in_range(start..end)
    }

    fn last_in_range<R>(&self, range: R) -> Result<Option<Quote>>
    where
        R: std::ops::RangeBounds<Vec<u8>>,
    {
        match self.quotes.range(range).next_back() {
            Some(entry) => {
                let (_, value) = entry?;
                let quote: Quote =
                    serde_json::from_slice(&value).context("Failed to decode stored quote")?;
                Ok(Some(quote))
            }
            None => Ok(None),
        }
    }

    /// Deletes every record older than `now - retention`. Idempotent.
    pub fn prune_older_than(&self, retention: Duration) -> Result<usize> {
        let cutoff = (Utc::now() - retention).timestamp_millis().max(0) as u64;

        let mut expired = Vec::new();
        for entry in self.quotes.iter() {
            let (key, _) = entry?;
            if timestamp_of_key(&key).is_some_and(|ts| ts < cutoff) {
                expired.push(key);
            }
        }

        let deleted = expired.len();
        for key in expired {
            self.quotes.remove(key)?;
        }
        if deleted > 0 {
            info!("Pruned {deleted} expired quotes");
        } else {
            debug!("No expired quotes to prune");
        }
        Ok(deleted)
    }

    /// Total number of stored records.
    pub fn len(&self) -> Result<usize> {
        let mut count = 0;
        for entry in self.quotes.iter() {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_latest_before_returns_most_recent() {
        let dir = tempdir().unwrap();
        let store = QuoteStore::open(dir.path()).unwrap();

        store
            .insert_batch(&[
                Quote::new("BTCUSDT", 50000.0, utc(2025, 8, 12, 10, 0, 0)),
                Quote::new("BTCUSDT", 50500.0, utc(2025, 8, 12, 11, 0, 0)),
                Quote::new("BTCUSDT", 51000.0, utc(2025, 8, 12, 12, 0, 0)),
                Quote::new("ETHUSDT", 3000.0, utc(2025, 8, 12, 11, 30, 0)),
            ])
            .unwrap();

        let found = store
            .latest_before("BTCUSDT", utc(2025, 8, 12, 11, 30, 0))
            .unwrap()
            .unwrap();
        assert_eq!(found.price, 50500.0);

        let found = store
            .latest_before("BTCUSDT", utc(2025, 8, 13, 0, 0, 0))
            .unwrap()
            .unwrap();
        assert_eq!(found.price, 51000.0);
    }

    #[test]
    fn test_latest_before_no_match() {
        let dir = tempdir().unwrap();
        let store = QuoteStore::open(dir.path()).unwrap();

        store
            .insert_batch(&[Quote::new("BTCUSDT", 50000.0, utc(2025, 8, 12, 10, 0, 0))])
            .unwrap();

        assert!(
            store
                .latest_before("BTCUSDT", utc(2025, 8, 12, 9, 0, 0))
                .unwrap()
                .is_none()
        );
        assert!(
            store
                .latest_before("ETHUSDT", utc(2025, 8, 13, 0, 0, 0))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_last_of_day_picks_latest_within_day() {
        let dir = tempdir().unwrap();
        let store = QuoteStore::open(dir.path()).unwrap();

        store
            .insert_batch(&[
                Quote::new("BTCUSDT", 49000.0, utc(2025, 8, 11, 23, 59, 59)),
                Quote::new("BTCUSDT", 50000.0, utc(2025, 8, 12, 8, 0, 0)),
                Quote::new("BTCUSDT", 50750.0, utc(2025, 8, 12, 22, 34, 3)),
                Quote::new("BTCUSDT", 52000.0, utc(2025, 8, 13, 0, 0, 0)),
            ])
            .unwrap();

        let day = NaiveDate::from_ymd_opt(2025, 8, 12).unwrap();
        let found = store.last_of_day("BTCUSDT", day).unwrap().unwrap();
        assert_eq!(found.price, 50750.0);
        assert_eq!(found.observed_at, utc(2025, 8, 12, 22, 34, 3));
    }

    #[test]
    fn test_last_of_day_absent_when_only_adjacent_days() {
        let dir = tempdir().unwrap();
        let store = QuoteStore::open(dir.path()).unwrap();

        store
            .insert_batch(&[
                Quote::new("BTCUSDT", 49000.0, utc(2025, 8, 11, 12, 0, 0)),
                Quote::new("BTCUSDT", 52000.0, utc(2025, 8, 13, 12, 0, 0)),
            ])
            .unwrap();

        let day = NaiveDate::from_ymd_opt(2025, 8, 12).unwrap();
        assert!(store.last_of_day("BTCUSDT", day).unwrap().is_none());
    }

    #[test]
    fn test_prune_removes_only_expired() {
        let dir = tempdir().unwrap();
        let store = QuoteStore::open(dir.path()).unwrap();
        let now = Utc::now();

        store
            .insert_batch(&[
                Quote::new("BTCUSDT", 40000.0, now - Duration::days(10)),
                Quote::new("BTCUSDT", 45000.0, now - Duration::days(8)),
                Quote::new("BTCUSDT", 50000.0, now - Duration::days(3)),
                Quote::new("ETHUSDT", 3000.0, now - Duration::hours(1)),
            ])
            .unwrap();

        let deleted = store.prune_older_than(Duration::days(7)).unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.len().unwrap(), 2);

        // Idempotent: a second run deletes nothing.
        let deleted = store.prune_older_than(Duration::days(7)).unwrap();
        assert_eq!(deleted, 0);
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn test_insert_batch_is_idempotent_per_key() {
        let dir = tempdir().unwrap();
        let store = QuoteStore::open(dir.path()).unwrap();
        let at = utc(2025, 8, 12, 10, 0, 0);

        store
            .insert_batch(&[Quote::new("BTCUSDT", 50000.0, at)])
            .unwrap();
        store
            .insert_batch(&[Quote::new("BTCUSDT", 50000.0, at)])
            .unwrap();

        assert_eq!(store.len().unwrap(), 1);
    }
}
