//! HTTP surface: catalog and portfolio snapshots, order placement, advisor
//! controls, WebSocket upgrade.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::broadcast;
use tracing::warn;

use crate::advisor::{AdvisorState, SharedAdvisor};
use crate::api::ws::ws_handler;
use crate::ledger::{SharedLedger, place_order};
use crate::marketdata::SharedCatalog;
use crate::persistence::{ADVISOR_STORE, JsonStore, PORTFOLIO_STORE};
use crate::types::portfolio::Portfolio;
use crate::types::stock::{Qty, Quote, Stock};
use crate::types::trade::{Trade, TradeSide};

const DEFAULT_TRADES_LIMIT: usize = 50;

/// Shared resources, cloned into every handler and background task.
#[derive(Clone)]
pub struct AppState {
    pub catalog: SharedCatalog,
    pub ledger: SharedLedger,
    pub advisor: SharedAdvisor,
    pub store: Arc<JsonStore>,
    pub ws_channel: broadcast::Sender<WsMessage>,
}

/// Messages fanned out to WebSocket clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    Quote { symbol: String, quote: Quote },
    Trade { trade: Trade },
    Portfolio { portfolio: Portfolio },
}

async fn health() -> &'static str {
    "healthy"
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stocks", get(list_stocks))
        .route("/stocks/{symbol}", get(get_stock))
        .route("/portfolio", get(get_portfolio))
        .route("/portfolio/reset", post(reset_portfolio))
        .route("/trades", get(list_trades).post(place_trade))
        .route("/advisor", get(get_advisor))
        .route("/advisor/toggle", post(toggle_advisor))
        .route("/advisor/clear", post(clear_advisor))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

async fn list_stocks(State(state): State<AppState>) -> Json<Vec<Stock>> {
    Json(state.catalog.read().await.all())
}

async fn get_stock(State(state): State<AppState>, Path(symbol): Path<String>) -> Response {
    match state.catalog.read().await.get(&symbol).cloned() {
        Some(stock) => Json(stock).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "unknown_symbol" })),
        )
            .into_response(),
    }
}

async fn get_portfolio(State(state): State<AppState>) -> Json<Portfolio> {
    Json(state.ledger.read().await.portfolio().clone())
}

#[derive(Debug, Deserialize)]
struct TradesQuery {
    limit: Option<usize>,
}

async fn list_trades(
    State(state): State<AppState>,
    Query(query): Query<TradesQuery>,
) -> Json<Vec<Trade>> {
    let limit = query.limit.unwrap_or(DEFAULT_TRADES_LIMIT);
    Json(state.ledger.read().await.recent_trades(limit))
}

#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: TradeSide,
    pub quantity: Qty,
}

/// Rejections are expected user-facing outcomes: 422 with a tagged reason,
/// not logged as errors.
async fn place_trade(State(state): State<AppState>, Json(req): Json<OrderRequest>) -> Response {
    match place_order(&state.ledger, &state.catalog, &req.symbol, req.side, req.quantity).await {
        Ok(trade) => {
            publish_portfolio(&state, Some(trade.clone())).await;
            (StatusCode::CREATED, Json(trade)).into_response()
        }
        Err(rejection) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": rejection, "message": rejection.to_string() })),
        )
            .into_response(),
    }
}

async fn reset_portfolio(State(state): State<AppState>) -> Json<Portfolio> {
    {
        state.ledger.write().await.reset();
    }
    publish_portfolio(&state, None).await;
    Json(state.ledger.read().await.portfolio().clone())
}

async fn get_advisor(State(state): State<AppState>) -> Json<AdvisorState> {
    Json(state.advisor.read().await.clone())
}

async fn toggle_advisor(State(state): State<AppState>) -> Json<serde_json::Value> {
    let enabled = {
        let mut advisor = state.advisor.write().await;
        advisor.enabled = !advisor.enabled;
        advisor.enabled
    };
    save_advisor(&state).await;
    Json(json!({ "enabled": enabled }))
}

async fn clear_advisor(State(state): State<AppState>) -> StatusCode {
    {
        state.advisor.write().await.trades.clear();
    }
    save_advisor(&state).await;
    StatusCode::NO_CONTENT
}

/// Persist the ledger and push the post-mutation snapshot (and the trade
/// that caused it, if any) to every WebSocket client.
pub async fn publish_portfolio(state: &AppState, trade: Option<Trade>) {
    let ledger = state.ledger.read().await;
    if let Err(err) = state.store.save(PORTFOLIO_STORE, &*ledger).await {
        warn!(error = %err, "failed to persist portfolio");
    }
    if let Some(trade) = trade {
        let _ = state.ws_channel.send(WsMessage::Trade { trade });
    }
    let _ = state.ws_channel.send(WsMessage::Portfolio {
        portfolio: ledger.portfolio().clone(),
    });
}

/// Persist the advisor store, warning on failure.
pub async fn save_advisor(state: &AppState) {
    let advisor = state.advisor.read().await;
    if let Err(err) = state.store.save(ADVISOR_STORE, &*advisor).await {
        warn!(error = %err, "failed to persist advisor state");
    }
}
