//! External trade recommendations: strict payload validation and the
//! auto-trading loop. Recommendations are untrusted input and go through
//! the same mutation interface as manual orders.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::api::routes::{AppState, publish_portfolio, save_advisor};
use crate::ledger::place_order;
use crate::types::portfolio::Portfolio;
use crate::types::stock::{Qty, Stock};
use crate::types::trade::TradeSide;

pub type SharedAdvisor = Arc<RwLock<AdvisorState>>;

/// Most advisor trades kept in the log.
const LOG_CAP: usize = 50;

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("recommendation is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unsupported action {0:?}")]
    InvalidAction(String),
    #[error("quantity must be a positive whole number")]
    InvalidQuantity,
    #[error("empty symbol")]
    EmptySymbol,
}

/// Raw payload shape. Everything is optional or loosely typed until
/// validated.
#[derive(Debug, Deserialize)]
struct RawRecommendation {
    action: Option<String>,
    symbol: Option<String>,
    quantity: Option<f64>,
    reason: Option<String>,
    confidence: Option<f64>,
    #[serde(rename = "expectedProfit", alias = "expected_profit")]
    expected_profit: Option<f64>,
}

/// A recommendation that survived validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub side: TradeSide,
    pub symbol: String,
    pub quantity: Qty,
    pub reason: Option<String>,
    /// 0-100.
    pub confidence: Option<u8>,
    /// Model-estimated profit percentage; advisory only.
    pub expected_profit: Option<f64>,
}

/// Parse an untrusted recommendation payload. Malformed required fields
/// (action, symbol, quantity) reject the payload; malformed optional fields
/// are discarded rather than trusted.
pub fn parse_recommendation(payload: &str) -> Result<Recommendation, AdvisorError> {
    let raw: RawRecommendation = serde_json::from_str(strip_fences(payload))?;

    let side = match raw.action.as_deref() {
        Some("buy") => TradeSide::Buy,
        Some("sell") => TradeSide::Sell,
        other => return Err(AdvisorError::InvalidAction(other.unwrap_or("").to_string())),
    };
    let symbol = raw
        .symbol
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .ok_or(AdvisorError::EmptySymbol)?;
    let quantity = raw
        .quantity
        .filter(|q| q.is_finite() && *q >= 1.0 && q.fract() == 0.0 && *q <= Qty::MAX as f64)
        .map(|q| q as Qty)
        .ok_or(AdvisorError::InvalidQuantity)?;
    let confidence = raw
        .confidence
        .filter(|c| c.is_finite() && (0.0..=100.0).contains(c))
        .map(|c| c.round() as u8);
    let expected_profit = raw.expected_profit.filter(|p| p.is_finite());

    Ok(Recommendation {
        side,
        symbol,
        quantity,
        reason: raw.reason.filter(|r| !r.trim().is_empty()),
        confidence,
        expected_profit,
    })
}

/// Models wrap JSON answers in markdown fences more often than not.
fn strip_fences(payload: &str) -> &str {
    let trimmed = payload.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

/// One applied advisor order, kept most-recent-first in a capped log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisorTrade {
    pub symbol: String,
    pub side: TradeSide,
    pub quantity: Qty,
    pub price: Decimal,
    pub reason: Option<String>,
    pub confidence: Option<u8>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdvisorState {
    pub enabled: bool,
    pub trades: Vec<AdvisorTrade>,
}

impl AdvisorState {
    pub fn record(&mut self, trade: AdvisorTrade) {
        self.trades.insert(0, trade);
        self.trades.truncate(LOG_CAP);
    }
}

/// Where recommendations come from. The generative model, if any, lives
/// behind the implementation; this service never builds prompts.
#[async_trait]
pub trait RecommendationSource: Send + Sync {
    async fn recommend(
        &self,
        portfolio: &Portfolio,
        stocks: &[Stock],
    ) -> Result<String, AdvisorError>;
}

/// POSTs the current portfolio and catalog snapshot to a webhook and reads
/// the raw payload back.
pub struct HttpRecommendationSource {
    client: reqwest::Client,
    url: String,
}

impl HttpRecommendationSource {
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl RecommendationSource for HttpRecommendationSource {
    async fn recommend(
        &self,
        portfolio: &Portfolio,
        stocks: &[Stock],
    ) -> Result<String, AdvisorError> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "portfolio": portfolio, "stocks": stocks }))
            .send()
            .await?;
        Ok(response.text().await?)
    }
}

/// Apply at most one recommendation per tick while enabled. Source failures
/// and rejected orders skip the cycle; rejections use the same semantics as
/// manual trades, with no privileged bypass.
pub async fn run(state: AppState, source: Arc<dyn RecommendationSource>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        if !state.advisor.read().await.enabled {
            continue;
        }

        let (stocks, portfolio) = {
            let catalog = state.catalog.read().await;
            let ledger = state.ledger.read().await;
            (catalog.all(), ledger.portfolio().clone())
        };

        let payload = match source.recommend(&portfolio, &stocks).await {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "recommendation fetch failed");
                continue;
            }
        };
        let rec = match parse_recommendation(&payload) {
            Ok(rec) => rec,
            Err(err) => {
                warn!(error = %err, "discarding malformed recommendation");
                continue;
            }
        };

        match place_order(&state.ledger, &state.catalog, &rec.symbol, rec.side, rec.quantity).await
        {
            Ok(trade) => {
                {
                    let mut advisor = state.advisor.write().await;
                    advisor.record(AdvisorTrade {
                        symbol: trade.symbol.clone(),
                        side: trade.side,
                        quantity: trade.quantity,
                        price: trade.price,
                        reason: rec.reason.clone(),
                        confidence: rec.confidence,
                        timestamp: trade.timestamp,
                    });
                }
                save_advisor(&state).await;
                info!(symbol = %trade.symbol, side = ?trade.side, quantity = trade.quantity, "applied advisor order");
                publish_portfolio(&state, Some(trade)).await;
            }
            Err(rejection) => info!(%rejection, "advisor order rejected"),
        }
    }
}
