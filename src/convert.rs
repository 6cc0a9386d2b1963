//! Conversion engine: pair matching, quote retrieval and cross-rate math.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::buffer::QuoteBuffer;
use crate::model::{ConversionResult, Quote};
use crate::pair::{self, SharedAsset};
use crate::registry::SymbolRegistry;
use crate::store::QuoteStore;

/// Caller-facing conversion failures, mapped 1:1 onto the API error shape.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Symbol {0} is not supported")]
    SymbolNotSupported(String),

    #[error("Conversion from {from} to {to} is not supported")]
    UnsupportedConversion { from: String, to: String },

    #[error("No quotes available for conversion from {from} to {to}")]
    QuotesNotFound { from: String, to: String },

    #[error("Quotes are older than {0} seconds")]
    QuotesOutdated(i64),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub struct ConversionEngine {
    registry: Arc<SymbolRegistry>,
    buffer: QuoteBuffer,
    store: Arc<QuoteStore>,
    freshness: Duration,
}

impl ConversionEngine {
    pub fn new(
        registry: Arc<SymbolRegistry>,
        buffer: QuoteBuffer,
        store: Arc<QuoteStore>,
        freshness_secs: i64,
    ) -> Self {
        Self {
            registry,
            buffer,
            store,
            freshness: Duration::seconds(freshness_secs),
        }
    }

    /// Converts `amount` between two symbols sharing an asset.
    ///
    /// Without `at`, both quotes come from the live buffer and must be within
    /// the freshness threshold. With `at`, both come from the store as the
    /// last quote of that UTC calendar day; no freshness check applies.
    pub async fn convert(
        &self,
        from: &str,
        to: &str,
        amount: f64,
        at: Option<DateTime<Utc>>,
    ) -> Result<ConversionResult, ConvertError> {
        let from = from.to_uppercase();
        let to = to.to_uppercase();

        for symbol in [&from, &to] {
            if !self.registry.contains(symbol).await {
                return Err(ConvertError::SymbolNotSupported(symbol.clone()));
            }
        }

        let shared =
            pair::shared_asset(&from, &to).ok_or_else(|| ConvertError::UnsupportedConversion {
                from: from.clone(),
                to: to.clone(),
            })?;
        debug!(%from, %to, ?shared, "Pair match found");

        let (from_quote, to_quote) = match at {
            None => self.live_quotes(&from, &to).await?,
            Some(at) => self.historical_quotes(&from, &to, at)?,
        };

        let rate = effective_price(&from_quote, &shared) / effective_price(&to_quote, &shared);
        let timestamp = from_quote.observed_at.max(to_quote.observed_at);

        Ok(ConversionResult {
            amount,
            from_symbol: from,
            to_symbol: to,
            converted_amount: amount * rate,
            rate,
            timestamp,
        })
    }

    async fn live_quotes(&self, from: &str, to: &str) -> Result<(Quote, Quote), ConvertError> {
        let (Some(from_quote), Some(to_quote)) =
            (self.buffer.get(from).await, self.buffer.get(to).await)
        else {
            return Err(ConvertError::QuotesNotFound {
                from: from.to_string(),
                to: to.to_string(),
            });
        };

        let now = Utc::now();
        if from_quote.age(now) > self.freshness || to_quote.age(now) > self.freshness {
            return Err(ConvertError::QuotesOutdated(self.freshness.num_seconds()));
        }
        Ok((from_quote, to_quote))
    }

    fn historical_quotes(
        &self,
        from: &str,
        to: &str,
        at: DateTime<Utc>,
    ) -> Result<(Quote, Quote), ConvertError> {
        let day = at.date_naive();
        let (Some(from_quote), Some(to_quote)) = (
            self.store.last_of_day(from, day)?,
            self.store.last_of_day(to, day)?,
        ) else {
            return Err(ConvertError::QuotesNotFound {
                from: from.to_string(),
                to: to.to_string(),
            });
        };
        Ok((from_quote, to_quote))
    }
}

/// Price of the symbol's non-shared asset expressed in units of the shared
/// asset. A side where the shared asset sits in the base position contributes
/// its inverted price.
fn effective_price(quote: &Quote, shared: &SharedAsset) -> f64 {
    match shared {
        SharedAsset::Quote(_) => quote.price,
        SharedAsset::Base(_) => 1.0 / quote.price,
    }
}
