//! State persistence: explicit save/load at session boundaries.

mod store;

pub use store::{ADVISOR_STORE, JsonStore, PORTFOLIO_STORE, StoreError};
