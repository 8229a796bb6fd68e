//! Strike band around a reference price.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::ContractRecord;

/// Inclusive strike interval `[reference * (1 - f), reference * (1 + f)]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrikeBand {
    pub lower: Decimal,
    pub upper: Decimal,
}

impl StrikeBand {
    pub fn around(reference_price: Decimal, band_fraction: Decimal) -> Self {
        Self {
            lower: reference_price * (Decimal::ONE - band_fraction),
            upper: reference_price * (Decimal::ONE + band_fraction),
        }
    }

    pub fn contains(&self, strike: Decimal) -> bool {
        strike >= self.lower && strike <= self.upper
    }
}

/// Keeps contracts whose strike falls inside a percentage band.
///
/// An empty result is a normal outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrikeBandFilter {
    band_fraction: Decimal,
}

impl StrikeBandFilter {
    /// `band_fraction` is a positive fraction, e.g. `0.05` for ±5%.
    pub fn new(band_fraction: Decimal) -> Self {
        Self { band_fraction }
    }

    pub fn band_fraction(&self) -> Decimal {
        self.band_fraction
    }

    pub fn band(&self, reference_price: Decimal) -> StrikeBand {
        StrikeBand::around(reference_price, self.band_fraction)
    }

    pub fn filter<'a, I>(&self, contracts: I, reference_price: Decimal) -> Vec<ContractRecord>
    where
        I: IntoIterator<Item = &'a ContractRecord>,
    {
        let band = self.band(reference_price);
        contracts
            .into_iter()
            .filter(|c| band.contains(c.strike))
            .cloned()
            .collect()
    }
}

/// One-shot form of [`StrikeBandFilter::filter`].
pub fn filter_by_strike_band(
    contracts: &[ContractRecord],
    reference_price: Decimal,
    band_fraction: Decimal,
) -> Vec<ContractRecord> {
    StrikeBandFilter::new(band_fraction).filter(contracts, reference_price)
}
