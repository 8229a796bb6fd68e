//! Expiration selection with ordered fallback tiers.
//!
//! Tiers are tried in order; the first tier admitting at least one contract
//! wins. The default cascade is:
//! 1. `min_dte <= dte <= max_dte`
//! 2. `dte >= 7`
//!
//! If every tier is empty the selection fails with `NoViableExpiration`.
//! From the winning tier a single expiration is picked by an
//! [`ExpirationPolicy`], and all of that tier's contracts at that
//! expiration are kept.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::data::{ContractRecord, OptionChain};

/// Floor used by the relaxed tier of the standard cascade.
pub const RELAXED_MIN_DTE: i32 = 7;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("No viable expiration for {symbol}: all {tiers} fallback tiers are empty")]
    NoViableExpiration { symbol: String, tiers: usize },
}

/// One filter tier of the fallback cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FallbackTier {
    /// Inclusive DTE window.
    DteWindow { min_dte: i32, max_dte: i32 },
    /// Open-ended DTE floor.
    MinDte { min_dte: i32 },
}

impl FallbackTier {
    pub fn admits(&self, contract: &ContractRecord) -> bool {
        match *self {
            Self::DteWindow { min_dte, max_dte } => {
                contract.dte >= min_dte && contract.dte <= max_dte
            }
            Self::MinDte { min_dte } => contract.dte >= min_dte,
        }
    }
}

impl fmt::Display for FallbackTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DteWindow { min_dte, max_dte } => write!(f, "{}-{} DTE", min_dte, max_dte),
            Self::MinDte { min_dte } => write!(f, ">= {} DTE", min_dte),
        }
    }
}

/// How the target expiration is picked among the surviving expirations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpirationPolicy {
    /// Chronologically first surviving expiration.
    #[default]
    Earliest,
    /// Middle of the sorted unique expirations; the lower one for even counts.
    Median,
}

impl ExpirationPolicy {
    /// Pick from expirations already sorted and deduplicated.
    pub fn choose(&self, expirations: &[NaiveDate]) -> Option<NaiveDate> {
        if expirations.is_empty() {
            return None;
        }
        let idx = match self {
            Self::Earliest => 0,
            Self::Median => (expirations.len() - 1) / 2,
        };
        Some(expirations[idx])
    }
}

impl FromStr for ExpirationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "earliest" => Ok(Self::Earliest),
            "median" => Ok(Self::Median),
            other => Err(format!("unknown expiration policy: {}", other)),
        }
    }
}

impl fmt::Display for ExpirationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Earliest => f.write_str("earliest"),
            Self::Median => f.write_str("median"),
        }
    }
}

/// Result of a successful selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpirationSelection {
    pub expiration: NaiveDate,
    pub dte: i32,
    /// Index of the tier that produced the selection.
    pub tier: usize,
    /// Contracts of the winning tier expiring on `expiration`.
    pub contracts: Vec<ContractRecord>,
}

/// Narrows a chain to a single expiration.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpirationSelector {
    tiers: Vec<FallbackTier>,
    policy: ExpirationPolicy,
}

impl ExpirationSelector {
    pub fn new(tiers: Vec<FallbackTier>, policy: ExpirationPolicy) -> Self {
        Self { tiers, policy }
    }

    /// Window tier followed by the `dte >= 7` relaxed tier.
    pub fn standard(min_dte: i32, max_dte: i32, policy: ExpirationPolicy) -> Self {
        Self::with_relaxed_floor(min_dte, max_dte, RELAXED_MIN_DTE, policy)
    }

    pub fn with_relaxed_floor(
        min_dte: i32,
        max_dte: i32,
        relaxed_min_dte: i32,
        policy: ExpirationPolicy,
    ) -> Self {
        Self::new(
            vec![
                FallbackTier::DteWindow { min_dte, max_dte },
                FallbackTier::MinDte {
                    min_dte: relaxed_min_dte,
                },
            ],
            policy,
        )
    }

    pub fn tiers(&self) -> &[FallbackTier] {
        &self.tiers
    }

    pub fn policy(&self) -> ExpirationPolicy {
        self.policy
    }

    /// First non-empty tier and the contracts it admits.
    pub fn surviving_tier<'a>(
        &self,
        chain: &'a OptionChain,
    ) -> Option<(usize, Vec<&'a ContractRecord>)> {
        self.tiers.iter().enumerate().find_map(|(idx, tier)| {
            let admitted: Vec<_> = chain.contracts().iter().filter(|c| tier.admits(c)).collect();
            debug!(
                "{} tier {} ({}): {} contracts",
                chain.symbol(),
                idx,
                tier,
                admitted.len()
            );
            if admitted.is_empty() {
                None
            } else {
                Some((idx, admitted))
            }
        })
    }

    /// Select the target expiration and its contracts.
    pub fn select(&self, chain: &OptionChain) -> Result<ExpirationSelection, SelectionError> {
        let no_viable = || SelectionError::NoViableExpiration {
            symbol: chain.symbol().to_string(),
            tiers: self.tiers.len(),
        };
        let (tier, admitted) = self.surviving_tier(chain).ok_or_else(no_viable)?;

        let mut expirations: Vec<NaiveDate> = admitted.iter().map(|c| c.expiration).collect();
        expirations.sort();
        expirations.dedup();
        let expiration = self.policy.choose(&expirations).ok_or_else(no_viable)?;

        let contracts: Vec<ContractRecord> = admitted
            .into_iter()
            .filter(|c| c.expiration == expiration)
            .cloned()
            .collect();
        let dte = contracts.first().map(|c| c.dte).ok_or_else(no_viable)?;

        debug!(
            "{}: selected {} ({} DTE) by {} policy from {} expirations",
            chain.symbol(),
            expiration,
            dte,
            self.policy,
            expirations.len()
        );

        Ok(ExpirationSelection {
            expiration,
            dte,
            tier,
            contracts,
        })
    }
}

/// Select with the standard two-tier cascade.
pub fn select_expiration(
    chain: &OptionChain,
    min_dte: i32,
    max_dte: i32,
    policy: ExpirationPolicy,
) -> Result<ExpirationSelection, SelectionError> {
    ExpirationSelector::standard(min_dte, max_dte, policy).select(chain)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::data::types::fixtures::{chain, contract};
    use crate::data::OptionType;

    fn chain_with_dtes(dtes: &[i32]) -> OptionChain {
        let contracts = dtes
            .iter()
            .flat_map(|&dte| {
                [
                    contract("SPY", dec!(100), dte, dec!(100), OptionType::Call, 0.2),
                    contract("SPY", dec!(100), dte, dec!(100), OptionType::Put, 0.2),
                ]
            })
            .collect();
        chain("SPY", dec!(100), contracts)
    }

    #[test]
    fn test_window_tier_wins() {
        let chain = chain_with_dtes(&[5, 10, 20, 40, 90]);
        let selector = ExpirationSelector::standard(14, 60, ExpirationPolicy::Earliest);

        let (tier, admitted) = selector.surviving_tier(&chain).unwrap();
        assert_eq!(tier, 0);
        let mut dtes: Vec<_> = admitted.iter().map(|c| c.dte).collect();
        dtes.dedup();
        assert_eq!(dtes, vec![20, 40]);

        let selection = selector.select(&chain).unwrap();
        assert_eq!(selection.dte, 20);
        assert_eq!(selection.tier, 0);
        // Both the call and the put at the chosen expiration are kept
        assert_eq!(selection.contracts.len(), 2);
    }

    #[test]
    fn test_relaxed_tier_used_when_window_empty() {
        let chain = chain_with_dtes(&[3, 8, 100]);
        let selection = select_expiration(&chain, 14, 60, ExpirationPolicy::Earliest).unwrap();
        assert_eq!(selection.tier, 1);
        assert_eq!(selection.dte, 8);
    }

    #[test]
    fn test_no_viable_expiration() {
        let chain = chain_with_dtes(&[1, 3, 5]);
        let err = select_expiration(&chain, 14, 60, ExpirationPolicy::Earliest).unwrap_err();
        assert_eq!(
            err,
            SelectionError::NoViableExpiration {
                symbol: "SPY".to_string(),
                tiers: 2
            }
        );
    }

    #[test]
    fn test_empty_chain_has_no_viable_expiration() {
        let chain = chain_with_dtes(&[]);
        assert!(select_expiration(&chain, 0, 60, ExpirationPolicy::Median).is_err());
    }

    #[test]
    fn test_median_policy() {
        // Odd count: the middle one
        let chain = chain_with_dtes(&[15, 20, 30]);
        let selection = select_expiration(&chain, 14, 60, ExpirationPolicy::Median).unwrap();
        assert_eq!(selection.dte, 20);

        // Even count: the lower middle
        let chain = chain_with_dtes(&[15, 20, 30, 45]);
        let selection = select_expiration(&chain, 14, 60, ExpirationPolicy::Median).unwrap();
        assert_eq!(selection.dte, 20);
    }

    #[test]
    fn test_calendar_order_not_insertion_order() {
        let chain = chain_with_dtes(&[40, 20, 30]);
        let selection = select_expiration(&chain, 14, 60, ExpirationPolicy::Earliest).unwrap();
        assert_eq!(selection.dte, 20);
    }

    #[test]
    fn test_window_bounds_inclusive() {
        let chain = chain_with_dtes(&[14, 60]);
        let selector = ExpirationSelector::standard(14, 60, ExpirationPolicy::Earliest);
        let (tier, admitted) = selector.surviving_tier(&chain).unwrap();
        assert_eq!(tier, 0);
        assert_eq!(admitted.len(), 4);
    }

    #[test]
    fn test_custom_cascade() {
        let chain = chain_with_dtes(&[2, 90]);
        let selector = ExpirationSelector::new(
            vec![FallbackTier::DteWindow {
                min_dte: 7,
                max_dte: 60,
            }],
            ExpirationPolicy::Earliest,
        );
        assert!(selector.select(&chain).is_err());
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("Median".parse::<ExpirationPolicy>(), Ok(ExpirationPolicy::Median));
        assert_eq!("earliest".parse::<ExpirationPolicy>(), Ok(ExpirationPolicy::Earliest));
        assert!("latest".parse::<ExpirationPolicy>().is_err());
    }

    proptest! {
        #[test]
        fn prop_tier_bounds(
            dtes in prop::collection::vec(0i32..120, 0..20),
            min_dte in 0i32..60,
            span in 0i32..60,
        ) {
            let max_dte = min_dte + span;
            let chain = chain_with_dtes(&dtes);
            let selector = ExpirationSelector::standard(min_dte, max_dte, ExpirationPolicy::Earliest);

            match selector.surviving_tier(&chain) {
                Some((0, admitted)) => {
                    prop_assert!(admitted.iter().all(|c| c.dte >= min_dte && c.dte <= max_dte));
                }
                Some((1, admitted)) => {
                    prop_assert!(!dtes.iter().any(|d| *d >= min_dte && *d <= max_dte));
                    prop_assert!(admitted.iter().all(|c| c.dte >= RELAXED_MIN_DTE));
                }
                Some((tier, _)) => prop_assert!(false, "unexpected tier {}", tier),
                None => {
                    prop_assert!(!dtes.iter().any(|d| *d >= min_dte && *d <= max_dte));
                    prop_assert!(dtes.iter().all(|d| *d < RELAXED_MIN_DTE));
                }
            }
        }

        #[test]
        fn prop_selection_is_single_expiration(
            dtes in prop::collection::vec(0i32..120, 1..20),
            median in any::<bool>(),
        ) {
            let policy = if median { ExpirationPolicy::Median } else { ExpirationPolicy::Earliest };
            let chain = chain_with_dtes(&dtes);
            if let Ok(selection) = select_expiration(&chain, 14, 60, policy) {
                prop_assert!(selection.contracts.iter().all(|c| c.expiration == selection.expiration));
                prop_assert!(selection.contracts.iter().all(|c| c.underlying_price == Decimal::from(100)));
            }
        }
    }
}
