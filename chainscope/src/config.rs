//! Application configuration.
//!
//! Loaded from TOML; every section has defaults so a partial file (or no
//! file at all) is valid. CLI flags override individual values afterwards.

use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::ProviderKind;
use crate::selection::{ExpirationPolicy, RELAXED_MIN_DTE};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Market-data provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// Directory of JSON snapshots for the file provider.
    pub data_dir: PathBuf,
    /// Environment variable holding the ORATS token.
    pub token_env: String,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Cboe,
            data_dir: PathBuf::from("data/chains"),
            token_env: "ORATS_API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

/// At-the-money analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AtmConfig {
    pub min_dte: i32,
    pub max_dte: i32,
    /// Half-width of the strike band as a fraction of the underlying.
    pub band_fraction: Decimal,
    pub policy: ExpirationPolicy,
    /// Floor of the relaxed fallback tier.
    pub relaxed_min_dte: i32,
}

impl Default for AtmConfig {
    fn default() -> Self {
        Self {
            min_dte: 14,
            max_dte: 60,
            band_fraction: dec!(0.05),
            policy: ExpirationPolicy::Earliest,
            relaxed_min_dte: RELAXED_MIN_DTE,
        }
    }
}

/// Cross-symbol IV screen settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenerConfig {
    pub min_dte: i32,
    /// Contracts need IV strictly above this.
    pub min_iv: f64,
    /// Concurrent retrievals; 1 runs sequentially.
    pub max_concurrency: usize,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            min_dte: 14,
            min_iv: 0.5,
            max_concurrency: 4,
        }
    }
}

/// Volatility smile and Greeks profile settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmileConfig {
    pub min_dte: i32,
    pub max_dte: i32,
    pub band_fraction: Decimal,
}

impl Default for SmileConfig {
    fn default() -> Self {
        Self {
            min_dte: 7,
            max_dte: 60,
            band_fraction: dec!(0.15),
        }
    }
}

/// Payoff price grid settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PayoffConfig {
    pub points: usize,
    pub low_multiple: Decimal,
    pub high_multiple: Decimal,
}

impl Default for PayoffConfig {
    fn default() -> Self {
        Self {
            points: 100,
            low_multiple: dec!(0.7),
            high_multiple: dec!(1.3),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub atm: AtmConfig,
    pub screener: ScreenerConfig,
    pub smile: SmileConfig,
    pub payoff: PayoffConfig,
}

impl AppConfig {
    /// Load and validate a TOML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content)?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.atm.min_dte < 0 || self.atm.min_dte > self.atm.max_dte {
            return invalid(format!(
                "atm DTE window {}-{} is empty or negative",
                self.atm.min_dte, self.atm.max_dte
            ));
        }
        if self.atm.relaxed_min_dte < 0 {
            return invalid(format!(
                "atm relaxed_min_dte is negative: {}",
                self.atm.relaxed_min_dte
            ));
        }
        if self.atm.band_fraction <= Decimal::ZERO || self.atm.band_fraction >= Decimal::ONE {
            return invalid(format!(
                "atm band_fraction must be in (0, 1), got {}",
                self.atm.band_fraction
            ));
        }
        if self.screener.min_dte < 0 {
            return invalid(format!("screener min_dte is negative: {}", self.screener.min_dte));
        }
        if !(self.screener.min_iv >= 0.0) {
            return invalid(format!("screener min_iv must be >= 0, got {}", self.screener.min_iv));
        }
        if self.screener.max_concurrency == 0 {
            return invalid("screener max_concurrency must be at least 1".to_string());
        }
        if self.smile.min_dte < 0 || self.smile.min_dte > self.smile.max_dte {
            return invalid(format!(
                "smile DTE window {}-{} is empty or negative",
                self.smile.min_dte, self.smile.max_dte
            ));
        }
        if self.smile.band_fraction <= Decimal::ZERO || self.smile.band_fraction >= Decimal::ONE {
            return invalid(format!(
                "smile band_fraction must be in (0, 1), got {}",
                self.smile.band_fraction
            ));
        }
        if self.payoff.points < 2 {
            return invalid(format!("payoff points must be at least 2, got {}", self.payoff.points));
        }
        if self.payoff.low_multiple < Decimal::ZERO
            || self.payoff.low_multiple >= self.payoff.high_multiple
        {
            return invalid(format!(
                "payoff multiples {}..{} are not an increasing non-negative range",
                self.payoff.low_multiple, self.payoff.high_multiple
            ));
        }
        Ok(())
    }
}
