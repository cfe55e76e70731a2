use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use wealthsim::advisor::{self, AdvisorState, HttpRecommendationSource};
use wealthsim::api::routes::{AppState, app_router};
use wealthsim::config::Config;
use wealthsim::ledger::Ledger;
use wealthsim::marketdata::finnhub::FinnhubClient;
use wealthsim::marketdata::{StockCatalog, poller};
use wealthsim::persistence::{ADVISOR_STORE, JsonStore, PORTFOLIO_STORE};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wealthsim=info")),
        )
        .init();

    let config = Config::from_env();
    let store = Arc::new(JsonStore::open(&config.data_dir).expect("data directory"));

    let ledger = match store.load::<Ledger>(PORTFOLIO_STORE).await {
        Ok(Some(mut ledger)) => {
            // Re-derive totals from raw state before serving snapshots.
            ledger.reprice(&HashMap::new());
            info!("restored portfolio from store");
            ledger
        }
        Ok(None) => Ledger::new(),
        Err(err) => {
            warn!(error = %err, "unreadable portfolio store; starting fresh");
            Ledger::new()
        }
    };
    let advisor_state = match store.load::<AdvisorState>(ADVISOR_STORE).await {
        Ok(Some(state)) => state,
        Ok(None) => AdvisorState::default(),
        Err(err) => {
            warn!(error = %err, "unreadable advisor store; starting fresh");
            AdvisorState::default()
        }
    };

    let (ws_channel, _) = broadcast::channel(256);
    let state = AppState {
        catalog: Arc::new(RwLock::new(StockCatalog::with_tracked())),
        ledger: Arc::new(RwLock::new(ledger)),
        advisor: Arc::new(RwLock::new(advisor_state)),
        store,
        ws_channel,
    };

    match &config.finnhub_api_key {
        Some(key) => {
            let provider = Arc::new(FinnhubClient::new(key));
            tokio::spawn(poller::run(state.clone(), provider, config.quote_refresh));
        }
        None => warn!("FINNHUB_API_KEY not set; quotes will not refresh"),
    }
    if let Some(url) = &config.advisor_url {
        let source = Arc::new(HttpRecommendationSource::new(url));
        tokio::spawn(advisor::run(state.clone(), source, config.advisor_interval));
    }

    let app = app_router(state);
    info!(addr = %config.bind_addr, "listening");
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
