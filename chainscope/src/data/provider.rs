//! Market-data retrieval seam.
//!
//! Analytics only see the [`ChainProvider`] trait: one blocking call from a
//! symbol to a validated [`OptionChain`] snapshot. Concrete adapters live in
//! sibling modules.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::cboe::CboeProvider;
use super::file::FileProvider;
use super::orats::OratsProvider;
use super::types::{ChainError, OptionChain};
use crate::config::ProviderConfig;

/// Errors raised while retrieving a chain.
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error for {symbol}: {status}: {body}")]
    Api {
        symbol: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("No option data available for {symbol}")]
    NoData { symbol: String },

    #[error("Missing credentials: environment variable {0} is not set")]
    MissingCredentials(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed chain: {0}")]
    MalformedChain(#[from] ChainError),
}

/// Source of option chain snapshots.
pub trait ChainProvider: Send + Sync {
    /// Short provider name for logs and reports.
    fn name(&self) -> &str;

    /// Retrieve the current chain for `symbol`.
    fn fetch_chain(&self, symbol: &str) -> Result<OptionChain, RetrievalError>;
}

impl<P: ChainProvider + ?Sized> ChainProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch_chain(&self, symbol: &str) -> Result<OptionChain, RetrievalError> {
        (**self).fetch_chain(symbol)
    }
}

/// Available provider adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Cboe,
    Orats,
    File,
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cboe" => Ok(Self::Cboe),
            "orats" => Ok(Self::Orats),
            "file" => Ok(Self::File),
            other => Err(format!("unknown provider: {}", other)),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cboe => "cboe",
            Self::Orats => "orats",
            Self::File => "file",
        };
        f.write_str(name)
    }
}

/// Construct the provider selected by `config`.
pub fn build_provider(config: &ProviderConfig) -> Result<Box<dyn ChainProvider>, RetrievalError> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let provider: Box<dyn ChainProvider> = match config.kind {
        ProviderKind::Cboe => Box::new(CboeProvider::new(timeout)?),
        ProviderKind::Orats => {
            let token = std::env::var(&config.token_env)
                .map_err(|_| RetrievalError::MissingCredentials(config.token_env.clone()))?;
            Box::new(OratsProvider::new(token, timeout)?)
        }
        ProviderKind::File => Box::new(FileProvider::new(&config.data_dir)),
    };
    Ok(provider)
}

/// In-memory provider used by analytics tests.
#[cfg(test)]
pub(crate) mod mock {
    use std::collections::HashMap;

    use super::*;

    #[derive(Default)]
    pub struct MockProvider {
        chains: HashMap<String, OptionChain>,
    }

    impl MockProvider {
        pub fn with_chain(mut self, chain: OptionChain) -> Self {
            self.chains.insert(chain.symbol().to_string(), chain);
            self
        }
    }

    impl ChainProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        fn fetch_chain(&self, symbol: &str) -> Result<OptionChain, RetrievalError> {
            self.chains
                .get(symbol)
                .cloned()
                .ok_or_else(|| RetrievalError::NoData {
                    symbol: symbol.to_string(),
                })
        }
    }
}
