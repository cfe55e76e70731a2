//! Finnhub quote client. Free tier is limited to 60 API calls per minute.
//! API documentation: https://finnhub.io/docs/api

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use futures::future::join_all;
use reqwest::Client;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::marketdata::{MarketDataError, QuoteProvider};
use crate::types::stock::Quote;

const DEFAULT_BASE_URL: &str = "https://finnhub.io/api/v1";

/// Symbols fetched concurrently per batch.
const BATCH_SIZE: usize = 10;

/// Response from /quote. Field names are Finnhub's single-letter keys.
#[derive(Debug, Deserialize)]
struct QuoteResponse {
    /// Current price
    c: Option<f64>,
    /// Change
    d: Option<f64>,
    /// Percent change
    dp: Option<f64>,
    /// High price of the day
    h: Option<f64>,
    /// Low price of the day
    l: Option<f64>,
    /// Open price of the day
    o: Option<f64>,
    /// Previous close price
    pc: Option<f64>,
    /// Timestamp (Unix seconds)
    t: Option<i64>,
}

pub struct FinnhubClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl FinnhubClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Base URL override, for pointing tests at a local server.
    pub fn with_base_url(api_key: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl QuoteProvider for FinnhubClient {
    async fn quote(&self, symbol: &str) -> Result<Option<Quote>, MarketDataError> {
        let url = format!("{}/quote", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("symbol", symbol), ("token", self.api_key.as_str())])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(MarketDataError::Status(response.status()));
        }
        let body: QuoteResponse = response.json().await?;
        Ok(quote_from_response(body))
    }

    async fn quotes(&self, symbols: &[String]) -> HashMap<String, Quote> {
        let mut out = HashMap::new();
        for batch in symbols.chunks(BATCH_SIZE) {
            let fetches = batch
                .iter()
                .map(|symbol| async move { (symbol.clone(), self.quote(symbol).await) });
            for (symbol, result) in join_all(fetches).await {
                match result {
                    Ok(Some(quote)) => {
                        out.insert(symbol, quote);
                    }
                    Ok(None) => debug!(%symbol, "no quote for symbol"),
                    Err(err) => warn!(%symbol, error = %err, "quote fetch failed"),
                }
            }
        }
        out
    }
}

/// Finnhub answers unknown symbols with an all-zero payload; a current price
/// of zero or less is therefore "no quote". Missing day statistics fall back
/// to the current price.
fn quote_from_response(body: QuoteResponse) -> Option<Quote> {
    let price = body.c.and_then(Decimal::from_f64)?;
    if price <= Decimal::ZERO {
        return None;
    }
    let field = |v: Option<f64>| v.and_then(Decimal::from_f64);
    Some(Quote {
        price,
        change: field(body.d).unwrap_or(Decimal::ZERO),
        change_percent: field(body.dp).unwrap_or(Decimal::ZERO),
        high: field(body.h).unwrap_or(price),
        low: field(body.l).unwrap_or(price),
        open: field(body.o).unwrap_or(price),
        previous_close: field(body.pc).unwrap_or(price),
        timestamp: body
            .t
            .and_then(|t| Utc.timestamp_opt(t, 0).single())
            .unwrap_or_else(Utc::now),
    })
}
