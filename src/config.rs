//! Environment-driven configuration, read once at startup.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub data_dir: PathBuf,
    /// Without a key the quote poller is not spawned.
    pub finnhub_api_key: Option<String>,
    pub quote_refresh: Duration,
    /// Without a URL the advisor loop is not spawned.
    pub advisor_url: Option<String>,
    pub advisor_interval: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:3000"),
            data_dir: PathBuf::from(env_or("DATA_DIR", "data")),
            finnhub_api_key: non_empty("FINNHUB_API_KEY"),
            quote_refresh: Duration::from_secs(env_secs("QUOTE_REFRESH_SECS", 10)),
            advisor_url: non_empty("ADVISOR_URL"),
            advisor_interval: Duration::from_secs(env_secs("ADVISOR_INTERVAL_SECS", 60)),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_secs(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|&secs| secs > 0)
        .unwrap_or(default)
}
