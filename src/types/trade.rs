use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::stock::Qty;

pub type TradeId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Completed,
    Pending,
}

/// Immutable record of an accepted buy or sell. Ids are creation-ordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub symbol: String,
    pub name: String,
    pub side: TradeSide,
    pub quantity: Qty,
    pub price: Decimal,
    pub total: Decimal,
    pub timestamp: DateTime<Utc>,
    pub status: TradeStatus,
    /// Gain against the average cost at sale time. `None` for buys.
    pub realized_pnl: Option<Decimal>,
}
