//! Periodic quote refresh: fetch a batch, overlay the catalog, reprice the
//! ledger, push updates to WebSocket clients.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::api::routes::{AppState, WsMessage, publish_portfolio};
use crate::ledger::refresh_prices;
use crate::marketdata::QuoteProvider;

/// Cooperative polling loop. A failed cycle (no quotes came back) logs a
/// warning and leaves every piece of state unchanged; there is no retry and
/// no backoff.
pub async fn run(state: AppState, provider: Arc<dyn QuoteProvider>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;

        let symbols = state.catalog.read().await.symbols();
        let quotes = provider.quotes(&symbols).await;
        if quotes.is_empty() {
            warn!("quote refresh returned nothing; keeping cached prices");
            continue;
        }

        state.catalog.write().await.apply_quotes(&quotes);
        for (symbol, quote) in &quotes {
            let _ = state.ws_channel.send(WsMessage::Quote {
                symbol: symbol.clone(),
                quote: quote.clone(),
            });
        }

        refresh_prices(&state.ledger, &state.catalog).await;
        publish_portfolio(&state, None).await;
        debug!(count = quotes.len(), "applied quote refresh");
    }
}
