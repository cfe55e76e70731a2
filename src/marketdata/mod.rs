//! Market data: the quote provider seam, the instrument catalog, and the
//! periodic refresh loop.

pub mod finnhub;
pub mod poller;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::warn;

use crate::types::stock::{Quote, Stock};

pub type SharedCatalog = Arc<RwLock<StockCatalog>>;

#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned status {0}")]
    Status(reqwest::StatusCode),
}

/// Pull-based quote oracle. The ledger never sees fetch failures; absent
/// entries mean "no update", never zero.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Latest quote for one symbol. `Ok(None)` means unknown or unquoted.
    async fn quote(&self, symbol: &str) -> Result<Option<Quote>, MarketDataError>;

    /// Batch lookup. Failed or absent entries are simply omitted.
    async fn quotes(&self, symbols: &[String]) -> HashMap<String, Quote> {
        let mut out = HashMap::new();
        for symbol in symbols {
            match self.quote(symbol).await {
                Ok(Some(quote)) => {
                    out.insert(symbol.clone(), quote);
                }
                Ok(None) => {}
                Err(err) => warn!(%symbol, error = %err, "quote fetch failed"),
            }
        }
        out
    }
}

/// The instrument universe: every quotable symbol with its display name and
/// last successfully fetched quote. Keyed by uppercase symbol.
pub struct StockCatalog {
    stocks: HashMap<String, Stock>,
}

impl StockCatalog {
    /// Catalog seeded with the tracked US-equity universe, no quotes yet.
    pub fn with_tracked() -> Self {
        Self::from_stocks(
            TRACKED_STOCKS
                .iter()
                .map(|(symbol, name)| Stock::new(symbol, name))
                .collect(),
        )
    }

    pub fn from_stocks(stocks: Vec<Stock>) -> Self {
        Self {
            stocks: stocks.into_iter().map(|s| (s.symbol.clone(), s)).collect(),
        }
    }

    pub fn get(&self, symbol: &str) -> Option<&Stock> {
        self.stocks.get(&symbol.to_uppercase())
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.stocks.contains_key(&symbol.to_uppercase())
    }

    pub fn symbols(&self) -> Vec<String> {
        self.stocks.keys().cloned().collect()
    }

    /// All entries, sorted by symbol for stable display.
    pub fn all(&self) -> Vec<Stock> {
        let mut stocks: Vec<Stock> = self.stocks.values().cloned().collect();
        stocks.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        stocks
    }

    /// Overlay freshly fetched quotes. Symbols outside the universe are
    /// ignored; symbols without an entry keep their previous quote.
    pub fn apply_quotes(&mut self, quotes: &HashMap<String, Quote>) {
        for (symbol, quote) in quotes {
            if let Some(stock) = self.stocks.get_mut(&symbol.to_uppercase()) {
                stock.quote = Some(quote.clone());
            }
        }
    }

    /// Latest strictly positive price for one symbol.
    pub fn price_of(&self, symbol: &str) -> Option<Decimal> {
        self.get(symbol)?.price()
    }

    /// Every symbol that currently has a strictly positive price.
    pub fn prices(&self) -> HashMap<String, Decimal> {
        self.stocks
            .values()
            .filter_map(|s| Some((s.symbol.clone(), s.price()?)))
            .collect()
    }
}

/// The instrument universe served by the simulator.
pub const TRACKED_STOCKS: &[(&str, &str)] = &[
    ("AAPL", "Apple Inc."),
    ("MSFT", "Microsoft Corporation"),
    ("GOOGL", "Alphabet Inc."),
    ("AMZN", "Amazon.com Inc."),
    ("NVDA", "NVIDIA Corporation"),
    ("META", "Meta Platforms Inc."),
    ("TSLA", "Tesla Inc."),
    ("AMD", "Advanced Micro Devices Inc."),
    ("INTC", "Intel Corporation"),
    ("NFLX", "Netflix Inc."),
    ("JPM", "JPMorgan Chase & Co."),
    ("V", "Visa Inc."),
    ("MA", "Mastercard Incorporated"),
    ("BAC", "Bank of America Corporation"),
    ("GS", "Goldman Sachs Group Inc."),
    ("MS", "Morgan Stanley"),
    ("WFC", "Wells Fargo & Company"),
    ("C", "Citigroup Inc."),
    ("UNH", "UnitedHealth Group Incorporated"),
    ("JNJ", "Johnson & Johnson"),
    ("PFE", "Pfizer Inc."),
    ("ABBV", "AbbVie Inc."),
    ("MRK", "Merck & Co. Inc."),
    ("LLY", "Eli Lilly and Company"),
    ("WMT", "Walmart Inc."),
    ("PG", "Procter & Gamble Company"),
    ("KO", "Coca-Cola Company"),
    ("PEP", "PepsiCo Inc."),
    ("MCD", "McDonald's Corporation"),
    ("NKE", "Nike Inc."),
    ("SBUX", "Starbucks Corporation"),
    ("DIS", "Walt Disney Company"),
    ("XOM", "Exxon Mobil Corporation"),
    ("CVX", "Chevron Corporation"),
    ("CAT", "Caterpillar Inc."),
    ("BA", "Boeing Company"),
    ("GE", "General Electric Company"),
    ("HON", "Honeywell International Inc."),
    ("VZ", "Verizon Communications Inc."),
    ("T", "AT&T Inc."),
    ("CMCSA", "Comcast Corporation"),
    ("TMUS", "T-Mobile US Inc."),
];
