//! Trading pair decomposition and shared-asset matching.
//!
//! Symbols concatenate a base and a quote asset with no delimiter
//! ("ETH" + "BTC" = "ETHBTC"), so splitting them requires a table of known
//! asset codes. The table below is the authoritative contract for which
//! conversions are supported; longer codes are matched first.

/// Asset codes recognised as either side of a pair.
pub const KNOWN_ASSETS: &[&str] = &["USDT", "BTC", "ETH", "BNB"];

/// A symbol split into its base and quote assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    pub base: String,
    pub quote: String,
}

/// The asset two symbols have in common, and the structural position it
/// occupies on each side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SharedAsset {
    /// Both symbols quote against the shared asset (e.g. BTCUSDT / ETHUSDT).
    Quote(String),
    /// Both symbols have the shared asset as their base (e.g. BTCUSDT / BTCEUR).
    Base(String),
}

/// Splits a symbol into `(base, quote)` against the known-asset table.
///
/// A known asset is looked up as a suffix first (quote position), then as a
/// prefix (base position). The remainder must be non-empty either way.
pub fn decompose(symbol: &str) -> Option<Pair> {
    let mut assets: Vec<&str> = KNOWN_ASSETS.to_vec();
    assets.sort_by_key(|a| std::cmp::Reverse(a.len()));

    for asset in &assets {
        if let Some(base) = symbol.strip_suffix(asset) {
            if !base.is_empty() {
                return Some(Pair {
                    base: base.to_string(),
                    quote: asset.to_string(),
                });
            }
        }
    }
    for asset in &assets {
        if let Some(quote) = symbol.strip_prefix(asset) {
            if !quote.is_empty() {
                return Some(Pair {
                    base: asset.to_string(),
                    quote: quote.to_string(),
                });
            }
        }
    }
    None
}

/// Finds the asset shared by two symbols in the same structural position.
///
/// Returns `None` when the symbols are identical, when either cannot be
/// decomposed, or when no asset is shared.
pub fn shared_asset(from: &str, to: &str) -> Option<SharedAsset> {
    if from == to {
        return None;
    }
    let from = decompose(from)?;
    let to = decompose(to)?;

    if from.quote == to.quote {
        Some(SharedAsset::Quote(from.quote))
    } else if from.base == to.base {
        Some(SharedAsset::Base(from.base))
    } else {
        None
    }
}
