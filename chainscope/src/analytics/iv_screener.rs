//! Cross-symbol implied volatility screen.
//!
//! For every symbol: retrieve the chain, keep contracts with
//! `dte >= min_dte` and `iv > min_iv`, and summarise the survivors. A symbol
//! whose retrieval fails, or that has no survivors, is recorded as skipped
//! and never affects the other symbols. Hits are ranked by maximum IV,
//! descending, ties kept in input order.

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ScreenerConfig;
use crate::data::{ChainProvider, OptionChain};

/// Per-symbol aggregate of contracts passing the screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenResult {
    pub symbol: String,
    /// Number of passing contracts, always >= 1.
    pub count: usize,
    pub max_iv: f64,
}

/// Why a symbol produced no result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    NoQualifyingContracts,
    RetrievalFailed(String),
}

/// Outcome of screening one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScreenOutcome {
    Hit(ScreenResult),
    Skipped { symbol: String, reason: SkipReason },
}

impl ScreenOutcome {
    pub fn symbol(&self) -> &str {
        match self {
            Self::Hit(result) => &result.symbol,
            Self::Skipped { symbol, .. } => symbol,
        }
    }
}

/// Outcomes of a screen, in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenReport {
    pub outcomes: Vec<ScreenOutcome>,
}

impl ScreenReport {
    /// Hits sorted by `max_iv` descending; ties keep input order.
    pub fn ranked(&self) -> Vec<ScreenResult> {
        let mut hits: Vec<ScreenResult> = self
            .outcomes
            .iter()
            .filter_map(|o| match o {
                ScreenOutcome::Hit(result) => Some(result.clone()),
                ScreenOutcome::Skipped { .. } => None,
            })
            .collect();
        hits.sort_by(|a, b| {
            b.max_iv
                .partial_cmp(&a.max_iv)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits
    }

    /// Skipped symbols with their reasons, in input order.
    pub fn skipped(&self) -> Vec<(&str, &SkipReason)> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                ScreenOutcome::Skipped { symbol, reason } => Some((symbol.as_str(), reason)),
                ScreenOutcome::Hit(_) => None,
            })
            .collect()
    }
}

/// Summarise the contracts of `chain` passing the DTE and IV thresholds.
pub fn screen_chain(chain: &OptionChain, min_dte: i32, min_iv: f64) -> Option<ScreenResult> {
    let passing: Vec<f64> = chain
        .contracts()
        .iter()
        .filter(|c| c.dte >= min_dte && c.implied_volatility > min_iv)
        .map(|c| c.implied_volatility)
        .collect();

    let max_iv = passing.iter().copied().reduce(f64::max)?;
    Some(ScreenResult {
        symbol: chain.symbol().to_string(),
        count: passing.len(),
        max_iv,
    })
}

/// Screens many underlyings for high implied volatility.
pub struct IVScreener {
    config: ScreenerConfig,
}

impl IVScreener {
    pub fn new(config: ScreenerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScreenerConfig {
        &self.config
    }

    fn screen_symbol<P>(&self, provider: &P, symbol: &str) -> ScreenOutcome
    where
        P: ChainProvider + ?Sized,
    {
        let chain = match provider.fetch_chain(symbol) {
            Ok(chain) => chain,
            Err(e) => {
                warn!("{}: skipped, retrieval from {} failed: {}", symbol, provider.name(), e);
                return ScreenOutcome::Skipped {
                    symbol: symbol.to_string(),
                    reason: SkipReason::RetrievalFailed(e.to_string()),
                };
            }
        };

        match screen_chain(&chain, self.config.min_dte, self.config.min_iv) {
            Some(mut result) => {
                debug!("{}: {} contracts, max IV {:.4}", symbol, result.count, result.max_iv);
                // Report under the requested symbol, not the provider's spelling
                result.symbol = symbol.to_string();
                ScreenOutcome::Hit(result)
            }
            None => {
                debug!("{}: no contracts above IV {}", symbol, self.config.min_iv);
                ScreenOutcome::Skipped {
                    symbol: symbol.to_string(),
                    reason: SkipReason::NoQualifyingContracts,
                }
            }
        }
    }

    /// Screen every symbol and report per-symbol outcomes.
    pub fn screen<P, S>(&self, provider: &P, symbols: &[S]) -> ScreenReport
    where
        P: ChainProvider + ?Sized,
        S: AsRef<str> + Sync,
    {
        info!(
            "Screening {} symbols via {} (min DTE {}, min IV {}, concurrency {})",
            symbols.len(),
            provider.name(),
            self.config.min_dte,
            self.config.min_iv,
            self.config.max_concurrency
        );

        let outcomes = if self.config.max_concurrency > 1 && symbols.len() > 1 {
            self.screen_parallel(provider, symbols)
        } else {
            self.screen_sequential(provider, symbols)
        };

        let report = ScreenReport { outcomes };
        info!(
            "Screen complete: {} hits, {} skipped",
            report.outcomes.len() - report.skipped().len(),
            report.skipped().len()
        );
        report
    }

    fn screen_sequential<P, S>(&self, provider: &P, symbols: &[S]) -> Vec<ScreenOutcome>
    where
        P: ChainProvider + ?Sized,
        S: AsRef<str>,
    {
        symbols
            .iter()
            .map(|s| self.screen_symbol(provider, s.as_ref()))
            .collect()
    }

    fn screen_parallel<P, S>(&self, provider: &P, symbols: &[S]) -> Vec<ScreenOutcome>
    where
        P: ChainProvider + ?Sized,
        S: AsRef<str> + Sync,
    {
        match ThreadPoolBuilder::new()
            .num_threads(self.config.max_concurrency)
            .build()
        {
            // Indexed collect keeps input order
            Ok(pool) => pool.install(|| {
                symbols
                    .par_iter()
                    .map(|s| self.screen_symbol(provider, s.as_ref()))
                    .collect()
            }),
            Err(e) => {
                warn!("Thread pool unavailable ({}), screening sequentially", e);
                self.screen_sequential(provider, symbols)
            }
        }
    }

    /// Ranked hits only.
    pub fn screen_ranked<P, S>(&self, provider: &P, symbols: &[S]) -> Vec<ScreenResult>
    where
        P: ChainProvider + ?Sized,
        S: AsRef<str> + Sync,
    {
        self.screen(provider, symbols).ranked()
    }
}
