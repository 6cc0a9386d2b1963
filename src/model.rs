//! Core domain types shared by the poller, store and conversion engine.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A single observation of a trading pair's price.
///
/// `observed_at` always carries UTC semantics; it is the instant the value was
/// fetched when the upstream does not supply its own timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub observed_at: DateTime<Utc>,
}

impl Quote {
    pub fn new(symbol: impl Into<String>, price: f64, observed_at: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            observed_at,
        }
    }

    /// Age of this quote relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.observed_at
    }
}

/// Outcome of a successful conversion. Owned by the caller, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionResult {
    pub amount: f64,
    pub from_symbol: String,
    pub to_symbol: String,
    pub converted_amount: f64,
    pub rate: f64,
    /// The `observed_at` of the quote pair actually used, not the request time.
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_age() {
        let now = Utc::now();
        let quote = Quote::new("BTCUSDT", 50000.0, now - Duration::seconds(90));
        assert_eq!(quote.age(now), Duration::seconds(90));
    }
}
