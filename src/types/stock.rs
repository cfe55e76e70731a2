use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type Qty = u64;

/// Point-in-time price fact for one symbol, as supplied by the quote provider.
/// Consumed transiently; never owned by the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub price: Decimal,
    pub change: Decimal,
    pub change_percent: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub open: Decimal,
    pub previous_close: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Catalog entry: a tradable instrument and its latest known quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    pub symbol: String,
    pub name: String,
    pub quote: Option<Quote>,
}

impl Stock {
    pub fn new(symbol: &str, name: &str) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            name: name.to_string(),
            quote: None,
        }
    }

    /// Latest price, only if a quote exists and is strictly positive.
    pub fn price(&self) -> Option<Decimal> {
        self.quote
            .as_ref()
            .map(|q| q.price)
            .filter(|p| *p > Decimal::ZERO)
    }
}
