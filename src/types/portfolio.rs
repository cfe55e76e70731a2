use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::stock::Qty;

/// One symbol's open position. Present in a portfolio only while quantity > 0.
/// `avg_price` is the weighted-average cost over all buys; sells never change it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub name: String,
    pub quantity: Qty,
    pub avg_price: Decimal,
    pub current_price: Decimal,
    pub value: Decimal,
    pub profit_loss: Decimal,
    pub profit_loss_percent: Decimal,
}

impl Holding {
    /// Recompute the derived fields from a new market price.
    /// Percent is defined as 0 when `avg_price` is 0.
    pub fn mark(&mut self, price: Decimal) {
        self.current_price = price;
        self.value = price * Decimal::from(self.quantity);
        self.profit_loss = (price - self.avg_price) * Decimal::from(self.quantity);
        self.profit_loss_percent = if self.avg_price.is_zero() {
            Decimal::ZERO
        } else {
            (price - self.avg_price) / self.avg_price * Decimal::ONE_HUNDRED
        };
    }
}

/// The aggregate: cash plus holdings, with four derived totals that are
/// recomputed after every mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub cash: Decimal,
    pub holdings: Vec<Holding>,
    pub total_value: Decimal,
    pub total_invested: Decimal,
    pub profit_loss: Decimal,
    pub profit_loss_percent: Decimal,
}

impl Portfolio {
    pub fn new(cash: Decimal) -> Self {
        Self {
            cash,
            holdings: Vec::new(),
            total_value: cash,
            total_invested: Decimal::ZERO,
            profit_loss: Decimal::ZERO,
            profit_loss_percent: Decimal::ZERO,
        }
    }

    pub fn holding(&self, symbol: &str) -> Option<&Holding> {
        self.holdings.iter().find(|h| h.symbol == symbol)
    }

    pub(crate) fn holding_mut(&mut self, symbol: &str) -> Option<&mut Holding> {
        self.holdings.iter_mut().find(|h| h.symbol == symbol)
    }

    /// Recompute the four derived totals from raw (cash, holdings) state.
    /// Percent is defined as 0 when nothing is invested.
    pub fn recompute(&mut self) {
        let holdings_value: Decimal = self.holdings.iter().map(|h| h.value).sum();
        self.total_invested = self
            .holdings
            .iter()
            .map(|h| h.avg_price * Decimal::from(h.quantity))
            .sum();
        self.total_value = self.cash + holdings_value;
        self.profit_loss = holdings_value - self.total_invested;
        self.profit_loss_percent = if self.total_invested.is_zero() {
            Decimal::ZERO
        } else {
            self.profit_loss / self.total_invested * Decimal::ONE_HUNDRED
        };
    }
}
