//! At-the-money contract analysis for a single underlying.
//!
//! Pipeline: expiration selection -> call/put split -> strike band on each
//! side, both sides using the underlying price as reference. Outputs are
//! sorted by strike.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::AtmConfig;
use crate::data::{ChainProvider, ContractRecord, OptionChain, RetrievalError};
use crate::selection::{
    sort_by_strike, split, ExpirationSelector, SelectionError, StrikeBand, StrikeBandFilter,
};

/// Failures of single-symbol analysis flows.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Selection(#[from] SelectionError),
}

/// Contracts around the money at the selected expiration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtmAnalysis {
    pub symbol: String,
    pub underlying_price: Decimal,
    pub target_expiration: NaiveDate,
    pub target_dte: i32,
    /// Fallback tier the expiration came from (0 = requested window).
    pub tier: usize,
    pub band: StrikeBand,
    pub atm_calls: Vec<ContractRecord>,
    pub atm_puts: Vec<ContractRecord>,
}

impl AtmAnalysis {
    pub fn is_empty(&self) -> bool {
        self.atm_calls.is_empty() && self.atm_puts.is_empty()
    }
}

/// Composes expiration selection, classification and the strike band.
#[derive(Debug, Clone)]
pub struct AtmAnalyzer {
    selector: ExpirationSelector,
    band: StrikeBandFilter,
}

impl AtmAnalyzer {
    pub fn new(selector: ExpirationSelector, band: StrikeBandFilter) -> Self {
        Self { selector, band }
    }

    pub fn from_config(config: &AtmConfig) -> Self {
        Self::new(
            ExpirationSelector::with_relaxed_floor(
                config.min_dte,
                config.max_dte,
                config.relaxed_min_dte,
                config.policy,
            ),
            StrikeBandFilter::new(config.band_fraction),
        )
    }

    /// Analyze an already retrieved chain.
    pub fn analyze(&self, chain: &OptionChain) -> Result<AtmAnalysis, SelectionError> {
        let selection = self.selector.select(chain)?;
        let reference = chain.underlying_price();

        let (calls, puts) = split(selection.contracts);
        let mut atm_calls = self.band.filter(&calls, reference);
        let mut atm_puts = self.band.filter(&puts, reference);
        sort_by_strike(&mut atm_calls);
        sort_by_strike(&mut atm_puts);

        debug!(
            "{} {}: {} of {} calls and {} of {} puts inside band",
            chain.symbol(),
            selection.expiration,
            atm_calls.len(),
            calls.len(),
            atm_puts.len(),
            puts.len()
        );

        Ok(AtmAnalysis {
            symbol: chain.symbol().to_string(),
            underlying_price: reference,
            target_expiration: selection.expiration,
            target_dte: selection.dte,
            tier: selection.tier,
            band: self.band.band(reference),
            atm_calls,
            atm_puts,
        })
    }

    /// Retrieve `symbol` and analyze it; retrieval failures propagate.
    pub fn analyze_symbol<P>(&self, provider: &P, symbol: &str) -> Result<AtmAnalysis, AnalysisError>
    where
        P: ChainProvider + ?Sized,
    {
        let chain = provider.fetch_chain(symbol)?;
        Ok(self.analyze(&chain)?)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::data::provider::mock::MockProvider;
    use crate::data::types::fixtures::{chain, contract};
    use crate::data::OptionType;
    use crate::selection::ExpirationPolicy;

    fn sample_chain() -> OptionChain {
        let mut contracts = Vec::new();
        for dte in [5, 20, 40] {
            for strike in [dec!(110), dec!(90), dec!(105), dec!(95), dec!(100)] {
                contracts.push(contract("AAPL", dec!(100), dte, strike, OptionType::Call, 0.3));
                contracts.push(contract("AAPL", dec!(100), dte, strike, OptionType::Put, 0.3));
            }
        }
        chain("AAPL", dec!(100), contracts)
    }

    fn analyzer(policy: ExpirationPolicy) -> AtmAnalyzer {
        AtmAnalyzer::from_config(&AtmConfig {
            policy,
            ..AtmConfig::default()
        })
    }

    #[test]
    fn test_atm_calls_and_puts_sorted() {
        let analysis = analyzer(ExpirationPolicy::Earliest)
            .analyze(&sample_chain())
            .unwrap();

        assert_eq!(analysis.target_dte, 20);
        assert_eq!(analysis.tier, 0);
        assert_eq!(analysis.underlying_price, dec!(100));
        let call_strikes: Vec<_> = analysis.atm_calls.iter().map(|c| c.strike).collect();
        let put_strikes: Vec<_> = analysis.atm_puts.iter().map(|c| c.strike).collect();
        assert_eq!(call_strikes, vec![dec!(95), dec!(100), dec!(105)]);
        assert_eq!(put_strikes, vec![dec!(95), dec!(100), dec!(105)]);
        assert!(analysis.atm_calls.iter().all(|c| c.is_call()));
        assert!(analysis.atm_puts.iter().all(|c| c.is_put()));
        assert!(analysis
            .atm_calls
            .iter()
            .all(|c| c.expiration == analysis.target_expiration));
    }

    #[test]
    fn test_median_policy_picks_lower_middle() {
        let analysis = analyzer(ExpirationPolicy::Median)
            .analyze(&sample_chain())
            .unwrap();
        // Window admits 20 and 40 DTE; lower middle of two is 20
        assert_eq!(analysis.target_dte, 20);
    }

    #[test]
    fn test_empty_band_is_not_an_error() {
        let chain = chain(
            "AAPL",
            dec!(100),
            vec![
                contract("AAPL", dec!(100), 20, dec!(150), OptionType::Call, 0.3),
                contract("AAPL", dec!(100), 20, dec!(100), OptionType::Call, 0.3),
            ],
        );
        let analysis = analyzer(ExpirationPolicy::Earliest).analyze(&chain).unwrap();
        assert_eq!(analysis.atm_calls.len(), 1);
        assert!(analysis.atm_puts.is_empty());
        assert!(!analysis.is_empty());
    }

    #[test]
    fn test_no_viable_expiration_surfaces() {
        let chain = chain(
            "AAPL",
            dec!(100),
            vec![contract("AAPL", dec!(100), 3, dec!(100), OptionType::Call, 0.3)],
        );
        let err = analyzer(ExpirationPolicy::Earliest).analyze(&chain).unwrap_err();
        assert!(matches!(err, SelectionError::NoViableExpiration { .. }));
    }

    #[test]
    fn test_analyze_symbol_propagates_retrieval_failure() {
        let provider = MockProvider::default();
        let err = analyzer(ExpirationPolicy::Earliest)
            .analyze_symbol(&provider, "MISSING")
            .unwrap_err();
        match err {
            AnalysisError::Retrieval(RetrievalError::NoData { symbol }) => {
                assert_eq!(symbol, "MISSING");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_analyze_symbol() {
        let provider = MockProvider::default().with_chain(sample_chain());
        let analysis = analyzer(ExpirationPolicy::Earliest)
            .analyze_symbol(&provider, "AAPL")
            .unwrap();
        assert_eq!(analysis.symbol, "AAPL");
        assert_eq!(analysis.band.lower, dec!(95));
        assert_eq!(analysis.band.upper, dec!(105));
    }
}
