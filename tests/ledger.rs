//! Ledger integration tests: buy/sell/reprice/reset, accounting invariants.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::RwLock;

use wealthsim::ledger::{Ledger, Rejection, initial_cash, place_order, refresh_prices};
use wealthsim::marketdata::StockCatalog;
use wealthsim::types::portfolio::Portfolio;
use wealthsim::types::stock::{Quote, Stock};
use wealthsim::types::trade::TradeSide;

fn quote(price: Decimal) -> Quote {
    Quote {
        price,
        change: Decimal::ZERO,
        change_percent: Decimal::ZERO,
        high: price,
        low: price,
        open: price,
        previous_close: price,
        timestamp: Utc::now(),
    }
}

fn quoted(symbol: &str, price: Decimal) -> Stock {
    let mut stock = Stock::new(symbol, &format!("{symbol} Test Co."));
    stock.quote = Some(quote(price));
    stock
}

/// The four derived totals must follow from raw (cash, holdings) state.
fn assert_consistent(portfolio: &Portfolio) {
    for holding in &portfolio.holdings {
        assert!(holding.quantity > 0, "zero-quantity holding left behind");
        assert_eq!(
            holding.value,
            holding.current_price * Decimal::from(holding.quantity)
        );
    }
    let holdings_value: Decimal = portfolio.holdings.iter().map(|h| h.value).sum();
    let invested: Decimal = portfolio
        .holdings
        .iter()
        .map(|h| h.avg_price * Decimal::from(h.quantity))
        .sum();
    assert_eq!(portfolio.total_value, portfolio.cash + holdings_value);
    assert_eq!(portfolio.total_invested, invested);
    assert_eq!(portfolio.profit_loss, holdings_value - invested);
}

#[test]
fn buy_creates_holding() {
    let mut ledger = Ledger::new();
    let trade = ledger.buy(&quoted("AAPL", dec!(50)), 10).unwrap();

    assert_eq!(trade.symbol, "AAPL");
    assert_eq!(trade.total, dec!(500));
    assert_eq!(trade.realized_pnl, None);

    let p = ledger.portfolio();
    assert_eq!(p.cash, dec!(99500));
    assert_eq!(p.total_invested, dec!(500));
    assert_eq!(p.total_value, dec!(100000));
    let holding = p.holding("AAPL").unwrap();
    assert_eq!(holding.quantity, 10);
    assert_eq!(holding.avg_price, dec!(50));
    assert_eq!(holding.profit_loss, Decimal::ZERO);
    assert_consistent(p);
}

#[test]
fn buy_weighted_average_is_exact() {
    let mut ledger = Ledger::new();
    ledger.buy(&quoted("AAPL", dec!(100)), 10).unwrap();
    ledger.buy(&quoted("AAPL", dec!(200)), 10).unwrap();

    let holding = ledger.portfolio().holding("AAPL").unwrap();
    assert_eq!(holding.quantity, 20);
    assert_eq!(holding.avg_price, dec!(150));
    assert_consistent(ledger.portfolio());
}

#[test]
fn buy_insufficient_funds_mutates_nothing() {
    let mut ledger = Ledger::new();
    ledger.buy(&quoted("AAPL", dec!(50)), 10).unwrap();
    let before = ledger.portfolio().clone();
    let trades_before = ledger.trades().to_vec();

    let result = ledger.buy(&quoted("MSFT", dec!(200000)), 1);
    assert_eq!(result.unwrap_err(), Rejection::InsufficientFunds);
    assert_eq!(ledger.portfolio(), &before);
    assert_eq!(ledger.trades(), trades_before.as_slice());
}

#[test]
fn buy_without_quote_is_unknown_symbol() {
    let mut ledger = Ledger::new();
    let unquoted = Stock::new("AAPL", "Apple Inc.");
    assert_eq!(ledger.buy(&unquoted, 1).unwrap_err(), Rejection::UnknownSymbol);
    assert!(ledger.trades().is_empty());
}

#[test]
fn zero_quantity_is_invalid() {
    let mut ledger = Ledger::new();
    let stock = quoted("AAPL", dec!(50));
    assert_eq!(ledger.buy(&stock, 0).unwrap_err(), Rejection::InvalidQuantity);
    assert_eq!(ledger.sell(&stock, 0).unwrap_err(), Rejection::InvalidQuantity);
}

#[test]
fn sell_partial_keeps_avg_price() {
    let mut ledger = Ledger::new();
    ledger.buy(&quoted("AAPL", dec!(50)), 10).unwrap();

    let trade = ledger.sell(&quoted("AAPL", dec!(60)), 4).unwrap();
    assert_eq!(trade.total, dec!(240));
    assert_eq!(trade.realized_pnl, Some(dec!(40)));

    let p = ledger.portfolio();
    assert_eq!(p.cash, dec!(99740));
    let holding = p.holding("AAPL").unwrap();
    assert_eq!(holding.quantity, 6);
    assert_eq!(holding.avg_price, dec!(50));
    assert_eq!(holding.current_price, dec!(60));
    assert_consistent(p);
}

#[test]
fn sell_all_removes_holding() {
    let mut ledger = Ledger::new();
    ledger.buy(&quoted("AAPL", dec!(50)), 10).unwrap();
    ledger.sell(&quoted("AAPL", dec!(50)), 10).unwrap();

    let p = ledger.portfolio();
    assert!(p.holdings.is_empty());
    assert_eq!(p.cash, initial_cash());
    assert_eq!(p.total_invested, Decimal::ZERO);
    assert_consistent(p);
}

#[test]
fn sell_insufficient_shares_mutates_nothing() {
    let mut ledger = Ledger::new();
    ledger.buy(&quoted("AAPL", dec!(50)), 5).unwrap();
    let before = ledger.portfolio().clone();

    let result = ledger.sell(&quoted("AAPL", dec!(50)), 6);
    assert_eq!(result.unwrap_err(), Rejection::InsufficientShares);
    assert_eq!(ledger.portfolio(), &before);

    let never_held = ledger.sell(&quoted("MSFT", dec!(50)), 1);
    assert_eq!(never_held.unwrap_err(), Rejection::InsufficientShares);
}

#[test]
fn sell_without_quote_is_unknown_symbol() {
    let mut ledger = Ledger::new();
    ledger.buy(&quoted("AAPL", dec!(50)), 5).unwrap();

    let unquoted = Stock::new("AAPL", "Apple Inc.");
    assert_eq!(ledger.sell(&unquoted, 5).unwrap_err(), Rejection::UnknownSymbol);
    assert_eq!(ledger.portfolio().holding("AAPL").unwrap().quantity, 5);
}

#[test]
fn reprice_updates_only_matched_holdings() {
    let mut ledger = Ledger::new();
    ledger.buy(&quoted("AAPL", dec!(50)), 10).unwrap();
    ledger.buy(&quoted("MSFT", dec!(100)), 2).unwrap();

    let prices = HashMap::from([("AAPL".to_string(), dec!(60))]);
    ledger.reprice(&prices);

    let p = ledger.portfolio();
    let aapl = p.holding("AAPL").unwrap();
    assert_eq!(aapl.current_price, dec!(60));
    assert_eq!(aapl.value, dec!(600));
    assert_eq!(aapl.profit_loss, dec!(100));
    assert_eq!(aapl.profit_loss_percent, dec!(20));
    // MSFT had no entry in the map: stale-but-present.
    let msft = p.holding("MSFT").unwrap();
    assert_eq!(msft.current_price, dec!(100));
    assert_consistent(p);
}

#[test]
fn reprice_is_idempotent() {
    let mut ledger = Ledger::new();
    ledger.buy(&quoted("AAPL", dec!(50)), 10).unwrap();

    let prices = HashMap::from([("AAPL".to_string(), dec!(62.5))]);
    ledger.reprice(&prices);
    let first = ledger.portfolio().clone();
    ledger.reprice(&prices);
    assert_eq!(ledger.portfolio(), &first);
}

#[test]
fn reprice_never_touches_cash_or_history() {
    let mut ledger = Ledger::new();
    ledger.buy(&quoted("AAPL", dec!(50)), 10).unwrap();
    let cash = ledger.portfolio().cash;
    let trade_count = ledger.trades().len();

    ledger.reprice(&HashMap::from([("AAPL".to_string(), dec!(75))]));
    assert_eq!(ledger.portfolio().cash, cash);
    assert_eq!(ledger.trades().len(), trade_count);
}

#[test]
fn reset_restores_initial_state() {
    let mut ledger = Ledger::new();
    ledger.buy(&quoted("AAPL", dec!(50)), 10).unwrap();
    ledger.sell(&quoted("AAPL", dec!(55)), 3).unwrap();

    ledger.reset();
    let p = ledger.portfolio();
    assert_eq!(p.cash, initial_cash());
    assert!(p.holdings.is_empty());
    assert!(ledger.trades().is_empty());
    assert_eq!(p.total_value, initial_cash());
    assert_eq!(p.profit_loss_percent, Decimal::ZERO);
}

#[test]
fn trade_history_most_recent_first_with_ordered_ids() {
    let mut ledger = Ledger::new();
    ledger.buy(&quoted("AAPL", dec!(50)), 1).unwrap();
    ledger.buy(&quoted("MSFT", dec!(100)), 1).unwrap();
    ledger.sell(&quoted("AAPL", dec!(50)), 1).unwrap();

    let trades = ledger.trades();
    assert_eq!(trades.len(), 3);
    assert_eq!(trades[0].symbol, "AAPL");
    assert_eq!(trades[0].side, TradeSide::Sell);
    assert!(trades[0].id > trades[1].id);
    assert!(trades[1].id > trades[2].id);

    let recent = ledger.recent_trades(2);
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].id, trades[0].id);
}

/// The walk-through scenario: buy at 50, reprice to 60, sell everything.
#[test]
fn buy_reprice_sell_scenario() {
    let mut ledger = Ledger::new();
    assert_eq!(ledger.portfolio().cash, dec!(100000));

    ledger.buy(&quoted("XYZ", dec!(50)), 10).unwrap();
    let p = ledger.portfolio();
    assert_eq!(p.cash, dec!(99500));
    assert_eq!(p.total_invested, dec!(500));
    assert_eq!(p.total_value, dec!(100000));

    ledger.reprice(&HashMap::from([("XYZ".to_string(), dec!(60))]));
    let p = ledger.portfolio();
    assert_eq!(p.holding("XYZ").unwrap().value, dec!(600));
    assert_eq!(p.profit_loss, dec!(100));
    assert_eq!(p.total_value, dec!(100100));

    ledger.sell(&quoted("XYZ", dec!(60)), 10).unwrap();
    let p = ledger.portfolio();
    assert_eq!(p.cash, dec!(100100));
    assert!(p.holdings.is_empty());
    assert_eq!(p.total_invested, Decimal::ZERO);
    assert_eq!(p.profit_loss, Decimal::ZERO);
    assert_eq!(p.total_value, dec!(100100));
}

#[test]
fn derived_fields_consistent_across_sequences() {
    let mut ledger = Ledger::new();
    let ops: &[(&str, TradeSide, u64, Decimal)] = &[
        ("AAPL", TradeSide::Buy, 10, dec!(150)),
        ("MSFT", TradeSide::Buy, 5, dec!(300)),
        ("AAPL", TradeSide::Buy, 10, dec!(170)),
        ("AAPL", TradeSide::Sell, 15, dec!(165)),
        ("MSFT", TradeSide::Sell, 5, dec!(280)),
        ("NVDA", TradeSide::Buy, 3, dec!(475.25)),
    ];
    for (symbol, side, quantity, price) in ops {
        let stock = quoted(symbol, *price);
        match side {
            TradeSide::Buy => ledger.buy(&stock, *quantity).unwrap(),
            TradeSide::Sell => ledger.sell(&stock, *quantity).unwrap(),
        };
        assert_consistent(ledger.portfolio());
    }
}

#[tokio::test]
async fn place_order_resolves_symbols_case_insensitively() {
    let catalog = Arc::new(RwLock::new(StockCatalog::from_stocks(vec![quoted(
        "AAPL",
        dec!(150),
    )])));
    let ledger = Arc::new(RwLock::new(Ledger::new()));

    let trade = place_order(&ledger, &catalog, "aapl", TradeSide::Buy, 2)
        .await
        .unwrap();
    assert_eq!(trade.symbol, "AAPL");

    let unknown = place_order(&ledger, &catalog, "ZZZZ", TradeSide::Buy, 1).await;
    assert_eq!(unknown.unwrap_err(), Rejection::UnknownSymbol);
}

#[tokio::test]
async fn refresh_prices_projects_catalog_onto_holdings() {
    let catalog = Arc::new(RwLock::new(StockCatalog::from_stocks(vec![quoted(
        "AAPL",
        dec!(150),
    )])));
    let ledger = Arc::new(RwLock::new(Ledger::new()));
    place_order(&ledger, &catalog, "AAPL", TradeSide::Buy, 4)
        .await
        .unwrap();

    catalog.write().await.apply_quotes(&HashMap::from([(
        "AAPL".to_string(),
        quote(dec!(175)),
    )]));
    refresh_prices(&ledger, &catalog).await;

    let guard = ledger.read().await;
    let holding = guard.portfolio().holding("AAPL").unwrap();
    assert_eq!(holding.current_price, dec!(175));
    assert_eq!(holding.profit_loss, dec!(100));
}
