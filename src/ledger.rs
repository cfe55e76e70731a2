//! Portfolio ledger: buy, sell, reprice, reset.
//! Testable without HTTP.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::marketdata::SharedCatalog;
use crate::types::portfolio::{Holding, Portfolio};
use crate::types::stock::{Qty, Stock};
use crate::types::trade::{Trade, TradeSide, TradeStatus};

pub type SharedLedger = Arc<RwLock<Ledger>>;

/// Virtual cash every fresh portfolio starts with.
pub fn initial_cash() -> Decimal {
    Decimal::from(100_000u32)
}

/// Why a buy or sell was not applied. These are expected user-facing
/// conditions reported to the caller, not faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    #[error("unknown or unquoted symbol")]
    UnknownSymbol,
    #[error("quantity must be a positive whole number")]
    InvalidQuantity,
    #[error("insufficient cash for this order")]
    InsufficientFunds,
    #[error("insufficient shares to sell")]
    InsufficientShares,
}

/// Owns the portfolio and its trade history. Single writer; every mutation
/// either applies fully and recomputes the derived fields, or rejects and
/// changes nothing.
#[derive(Debug, Serialize, Deserialize)]
pub struct Ledger {
    portfolio: Portfolio,
    /// Most recent first.
    trades: Vec<Trade>,
    next_trade_id: u64,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            portfolio: Portfolio::new(initial_cash()),
            trades: Vec::new(),
            next_trade_id: 1,
        }
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn recent_trades(&self, limit: usize) -> Vec<Trade> {
        self.trades.iter().take(limit).cloned().collect()
    }

    /// Buy `quantity` shares of `stock` at its current quote price.
    /// Weighted average when adding to an existing holding.
    pub fn buy(&mut self, stock: &Stock, quantity: Qty) -> Result<Trade, Rejection> {
        let price = stock.price().ok_or(Rejection::UnknownSymbol)?;
        if quantity == 0 {
            return Err(Rejection::InvalidQuantity);
        }
        let total = price * Decimal::from(quantity);
        if total > self.portfolio.cash {
            return Err(Rejection::InsufficientFunds);
        }

        match self.portfolio.holding_mut(&stock.symbol) {
            Some(holding) => {
                let old_qty = Decimal::from(holding.quantity);
                holding.quantity += quantity;
                holding.avg_price =
                    (holding.avg_price * old_qty + total) / Decimal::from(holding.quantity);
                holding.mark(price);
            }
            None => {
                let mut holding = Holding {
                    symbol: stock.symbol.clone(),
                    name: stock.name.clone(),
                    quantity,
                    avg_price: price,
                    current_price: price,
                    value: total,
                    profit_loss: Decimal::ZERO,
                    profit_loss_percent: Decimal::ZERO,
                };
                holding.mark(price);
                self.portfolio.holdings.push(holding);
            }
        }

        self.portfolio.cash -= total;
        let trade = self.record(stock, TradeSide::Buy, quantity, price, total, None);
        self.portfolio.recompute();
        Ok(trade)
    }

    /// Sell `quantity` shares at the current quote price. Proceeds use the
    /// live price; the remaining shares' average cost is unchanged. A sell
    /// that exhausts the holding removes it entirely.
    pub fn sell(&mut self, stock: &Stock, quantity: Qty) -> Result<Trade, Rejection> {
        let price = stock.price().ok_or(Rejection::UnknownSymbol)?;
        if quantity == 0 {
            return Err(Rejection::InvalidQuantity);
        }

        // Capture the cost basis before the decrement; sells never re-average.
        let (avg_price, remaining) = {
            let Some(holding) = self.portfolio.holding_mut(&stock.symbol) else {
                return Err(Rejection::InsufficientShares);
            };
            if holding.quantity < quantity {
                return Err(Rejection::InsufficientShares);
            }
            let avg_price = holding.avg_price;
            holding.quantity -= quantity;
            if holding.quantity > 0 {
                holding.mark(price);
            }
            (avg_price, holding.quantity)
        };
        if remaining == 0 {
            self.portfolio.holdings.retain(|h| h.symbol != stock.symbol);
        }

        let total = price * Decimal::from(quantity);
        let realized = (price - avg_price) * Decimal::from(quantity);

        self.portfolio.cash += total;
        let trade = self.record(stock, TradeSide::Sell, quantity, price, total, Some(realized));
        self.portfolio.recompute();
        Ok(trade)
    }

    /// Project new prices onto held symbols. Holdings without a matching
    /// entry keep their last-known price; cash and history are untouched.
    /// Idempotent.
    pub fn reprice(&mut self, prices: &HashMap<String, Decimal>) {
        for holding in &mut self.portfolio.holdings {
            if let Some(price) = prices.get(&holding.symbol) {
                holding.mark(*price);
            }
        }
        self.portfolio.recompute();
    }

    /// Back to the initial endowment: fixed starting cash, no holdings,
    /// empty trade history.
    pub fn reset(&mut self) {
        self.portfolio = Portfolio::new(initial_cash());
        self.trades.clear();
        self.next_trade_id = 1;
    }

    fn record(
        &mut self,
        stock: &Stock,
        side: TradeSide,
        quantity: Qty,
        price: Decimal,
        total: Decimal,
        realized_pnl: Option<Decimal>,
    ) -> Trade {
        let trade = Trade {
            id: self.next_trade_id,
            symbol: stock.symbol.clone(),
            name: stock.name.clone(),
            side,
            quantity,
            price,
            total,
            timestamp: Utc::now(),
            status: TradeStatus::Completed,
            realized_pnl,
        };
        self.next_trade_id += 1;
        self.trades.insert(0, trade.clone());
        trade
    }
}

/// Resolve `symbol` against the catalog (case-insensitive) and apply a
/// market order under the ledger lock. Same path for user and advisor
/// orders.
pub async fn place_order(
    ledger: &SharedLedger,
    catalog: &SharedCatalog,
    symbol: &str,
    side: TradeSide,
    quantity: Qty,
) -> Result<Trade, Rejection> {
    let stock = catalog.read().await.get(symbol).cloned();
    let Some(stock) = stock else {
        return Err(Rejection::UnknownSymbol);
    };
    let mut guard = ledger.write().await;
    match side {
        TradeSide::Buy => guard.buy(&stock, quantity),
        TradeSide::Sell => guard.sell(&stock, quantity),
    }
}

/// Project the catalog's current prices onto the ledger's holdings.
pub async fn refresh_prices(ledger: &SharedLedger, catalog: &SharedCatalog) {
    let prices = catalog.read().await.prices();
    ledger.write().await.reprice(&prices);
}
