//! Snapshot files on disk.
//!
//! `<data_dir>/<SYMBOL>.json` holds one chain in the same shape that
//! [`OptionChain`] serializes to, so `--format json` output of the `chain`
//! command can be replayed offline.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::provider::{ChainProvider, RetrievalError};
use super::types::{ContractRecord, OptionChain};

#[derive(Debug, Deserialize)]
struct ChainFile {
    symbol: String,
    underlying_price: Decimal,
    snapshot_date: NaiveDate,
    contracts: Vec<ContractRecord>,
}

/// Provider backed by JSON snapshot files.
pub struct FileProvider {
    data_dir: PathBuf,
}

impl FileProvider {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    /// Path of the snapshot file for `symbol`.
    pub fn snapshot_path(&self, symbol: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", symbol.trim().to_uppercase()))
    }

    /// Write `chain` where [`FileProvider::fetch_chain`] will find it.
    pub fn store(&self, chain: &OptionChain) -> Result<PathBuf, RetrievalError> {
        fs::create_dir_all(&self.data_dir)?;
        let path = self.snapshot_path(chain.symbol());
        fs::write(&path, serde_json::to_string_pretty(chain)?)?;
        Ok(path)
    }
}

impl ChainProvider for FileProvider {
    fn name(&self) -> &str {
        "file"
    }

    fn fetch_chain(&self, symbol: &str) -> Result<OptionChain, RetrievalError> {
        let path = self.snapshot_path(symbol);
        if !path.exists() {
            return Err(RetrievalError::NoData {
                symbol: symbol.to_string(),
            });
        }
        let content = fs::read_to_string(&path)?;
        let file: ChainFile = serde_json::from_str(&content)?;
        Ok(OptionChain::try_new(
            file.symbol,
            file.underlying_price,
            file.snapshot_date,
            file.contracts,
        )?)
    }
}
