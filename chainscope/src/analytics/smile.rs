//! Per-strike series for one expiration: volatility smile and Greeks.
//!
//! Both series pick the earliest expiration inside a DTE window (no relaxed
//! fallback), keep strikes within a band around the underlying, and sort by
//! strike. The smile ignores contracts without IV; the Greeks profile
//! ignores calls with zero delta.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::SmileConfig;
use crate::data::{ContractRecord, OptionChain};
use crate::selection::{
    sort_by_strike, split, ExpirationPolicy, ExpirationSelection, ExpirationSelector,
    FallbackTier, SelectionError, StrikeBandFilter,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmilePoint {
    pub strike: Decimal,
    pub implied_volatility: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilitySmile {
    pub symbol: String,
    pub underlying_price: Decimal,
    pub expiration: NaiveDate,
    pub dte: i32,
    pub calls: Vec<SmilePoint>,
    pub puts: Vec<SmilePoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GreeksPoint {
    pub strike: Decimal,
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
}

/// Call Greeks across strikes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GreeksProfile {
    pub symbol: String,
    pub underlying_price: Decimal,
    pub expiration: NaiveDate,
    pub dte: i32,
    pub points: Vec<GreeksPoint>,
}

/// Builds strike-indexed series for charting.
#[derive(Debug, Clone)]
pub struct StrikeProfiler {
    selector: ExpirationSelector,
    band: StrikeBandFilter,
}

impl StrikeProfiler {
    pub fn new(min_dte: i32, max_dte: i32, band_fraction: Decimal) -> Self {
        Self {
            selector: ExpirationSelector::new(
                vec![FallbackTier::DteWindow { min_dte, max_dte }],
                ExpirationPolicy::Earliest,
            ),
            band: StrikeBandFilter::new(band_fraction),
        }
    }

    pub fn from_config(config: &SmileConfig) -> Self {
        Self::new(config.min_dte, config.max_dte, config.band_fraction)
    }

    fn banded<F>(
        &self,
        chain: &OptionChain,
        usable: F,
    ) -> Result<(ExpirationSelection, Vec<ContractRecord>), SelectionError>
    where
        F: Fn(&ContractRecord) -> bool,
    {
        let usable = chain.filtered(usable);
        let selection = self.selector.select(&usable)?;
        let mut banded = self.band.filter(&selection.contracts, chain.underlying_price());
        sort_by_strike(&mut banded);
        Ok((selection, banded))
    }

    pub fn smile(&self, chain: &OptionChain) -> Result<VolatilitySmile, SelectionError> {
        let (selection, banded) = self.banded(chain, |c| c.has_iv())?;
        let (calls, puts) = split(banded);
        let points = |side: Vec<ContractRecord>| -> Vec<SmilePoint> {
            side.iter()
                .map(|c| SmilePoint {
                    strike: c.strike,
                    implied_volatility: c.implied_volatility,
                })
                .collect()
        };

        Ok(VolatilitySmile {
            symbol: chain.symbol().to_string(),
            underlying_price: chain.underlying_price(),
            expiration: selection.expiration,
            dte: selection.dte,
            calls: points(calls),
            puts: points(puts),
        })
    }

    pub fn call_greeks(&self, chain: &OptionChain) -> Result<GreeksProfile, SelectionError> {
        let (selection, banded) = self.banded(chain, |c| c.greeks.delta != 0.0)?;
        let points = banded
            .iter()
            .filter(|c| c.is_call())
            .map(|c| GreeksPoint {
                strike: c.strike,
                delta: c.greeks.delta,
                gamma: c.greeks.gamma,
                theta: c.greeks.theta,
                vega: c.greeks.vega,
            })
            .collect();

        Ok(GreeksProfile {
            symbol: chain.symbol().to_string(),
            underlying_price: chain.underlying_price(),
            expiration: selection.expiration,
            dte: selection.dte,
            points,
        })
    }
}
