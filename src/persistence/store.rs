//! JSON-file store: serde values saved as human-readable records under a
//! stable store name.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Store name for the ledger (portfolio, trade history, trade-id counter).
pub const PORTFOLIO_STORE: &str = "portfolio";
/// Store name for the advisor toggle and its trade log.
pub const ADVISOR_STORE: &str = "advisor";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Saves and loads serde values as pretty-printed JSON at
/// `<dir>/<name>.json`. Round-tripping reproduces the value exactly,
/// derived fields included.
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    pub async fn save<T: Serialize>(&self, name: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(value)?;
        tokio::fs::write(self.path(name), json).await?;
        Ok(())
    }

    /// `Ok(None)` when nothing has been saved under `name` yet.
    pub async fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, StoreError> {
        match tokio::fs::read_to_string(self.path(name)).await {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}
