//! Core data types for option chain analysis.
//!
//! A chain is an immutable snapshot: one underlying, one underlying price,
//! one snapshot date, and every contract the provider returned for it.
//! Filtering never mutates a chain; it produces derived collections.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Option type (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Put => "put",
        }
    }
}

impl FromStr for OptionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "C" | "CALL" => Ok(Self::Call),
            "P" | "PUT" => Ok(Self::Put),
            other => Err(format!("unknown option type: {}", other)),
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Greeks for an option contract.
///
/// Providers that omit Greeks leave these at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    #[serde(default)]
    pub delta: f64,
    #[serde(default)]
    pub gamma: f64,
    #[serde(default)]
    pub theta: f64,
    #[serde(default)]
    pub vega: f64,
}

/// A single option contract at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRecord {
    /// Underlying symbol (e.g., "AAPL")
    pub symbol: String,

    /// Underlying price at snapshot time
    pub underlying_price: Decimal,

    /// Option expiration date
    pub expiration: NaiveDate,

    /// Days to expiration, relative to the chain's snapshot date
    pub dte: i32,

    /// Strike price
    pub strike: Decimal,

    /// Option type (call or put)
    pub option_type: OptionType,

    /// Bid price, if quoted
    #[serde(default)]
    pub bid: Option<Decimal>,

    /// Ask price, if quoted
    #[serde(default)]
    pub ask: Option<Decimal>,

    /// Implied volatility as a fraction; 0 means unavailable
    #[serde(default)]
    pub implied_volatility: f64,

    #[serde(default)]
    pub greeks: Greeks,
}

impl ContractRecord {
    /// Mid price when both sides are quoted.
    pub fn mid(&self) -> Option<Decimal> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::TWO),
            _ => None,
        }
    }

    pub fn is_call(&self) -> bool {
        self.option_type == OptionType::Call
    }

    pub fn is_put(&self) -> bool {
        self.option_type == OptionType::Put
    }

    /// Whether a usable implied volatility was reported.
    pub fn has_iv(&self) -> bool {
        self.implied_volatility > 0.0
    }
}

/// Violations of the chain snapshot invariants.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChainError {
    #[error("Chain symbol is empty")]
    EmptySymbol,

    #[error("Underlying price for {symbol} must be positive, got {price}")]
    NonPositiveUnderlying { symbol: String, price: Decimal },

    #[error("Contract symbol {found} does not match chain symbol {expected}")]
    SymbolMismatch { expected: String, found: String },

    #[error("Contract underlying price {found} differs from chain price {expected}")]
    UnderlyingMismatch { expected: Decimal, found: Decimal },

    #[error("Contract expiring {expiration} precedes snapshot date {snapshot_date}")]
    Expired {
        expiration: NaiveDate,
        snapshot_date: NaiveDate,
    },

    #[error("Contract expiring {expiration} has dte {dte}, expected {expected}")]
    DteMismatch {
        expiration: NaiveDate,
        dte: i32,
        expected: i64,
    },

    #[error("Contract strike must be positive, got {0}")]
    NonPositiveStrike(Decimal),

    #[error("Negative {side} {value} at strike {strike}")]
    NegativeQuote {
        strike: Decimal,
        side: &'static str,
        value: Decimal,
    },

    #[error("Crossed quote at strike {strike}: bid {bid} > ask {ask}")]
    CrossedQuote {
        strike: Decimal,
        bid: Decimal,
        ask: Decimal,
    },
}

/// All contracts for one underlying from one retrieval call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionChain {
    symbol: String,
    underlying_price: Decimal,
    snapshot_date: NaiveDate,
    contracts: Vec<ContractRecord>,
}

impl OptionChain {
    /// Build a chain, checking every record against the snapshot invariants.
    pub fn try_new(
        symbol: impl Into<String>,
        underlying_price: Decimal,
        snapshot_date: NaiveDate,
        contracts: Vec<ContractRecord>,
    ) -> Result<Self, ChainError> {
        let symbol = symbol.into();
        if symbol.trim().is_empty() {
            return Err(ChainError::EmptySymbol);
        }
        if underlying_price <= Decimal::ZERO {
            return Err(ChainError::NonPositiveUnderlying {
                symbol,
                price: underlying_price,
            });
        }

        for record in &contracts {
            if record.symbol != symbol {
                return Err(ChainError::SymbolMismatch {
                    expected: symbol,
                    found: record.symbol.clone(),
                });
            }
            if record.underlying_price != underlying_price {
                return Err(ChainError::UnderlyingMismatch {
                    expected: underlying_price,
                    found: record.underlying_price,
                });
            }
            if record.expiration < snapshot_date {
                return Err(ChainError::Expired {
                    expiration: record.expiration,
                    snapshot_date,
                });
            }
            let expected = (record.expiration - snapshot_date).num_days();
            if i64::from(record.dte) != expected {
                return Err(ChainError::DteMismatch {
                    expiration: record.expiration,
                    dte: record.dte,
                    expected,
                });
            }
            if record.strike <= Decimal::ZERO {
                return Err(ChainError::NonPositiveStrike(record.strike));
            }
            for (side, quote) in [("bid", record.bid), ("ask", record.ask)] {
                if let Some(value) = quote.filter(|v| *v < Decimal::ZERO) {
                    return Err(ChainError::NegativeQuote {
                        strike: record.strike,
                        side,
                        value,
                    });
                }
            }
            if let (Some(bid), Some(ask)) = (record.bid, record.ask) {
                if bid > ask {
                    return Err(ChainError::CrossedQuote {
                        strike: record.strike,
                        bid,
                        ask,
                    });
                }
            }
        }

        Ok(Self {
            symbol,
            underlying_price,
            snapshot_date,
            contracts,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn underlying_price(&self) -> Decimal {
        self.underlying_price
    }

    pub fn snapshot_date(&self) -> NaiveDate {
        self.snapshot_date
    }

    pub fn contracts(&self) -> &[ContractRecord] {
        &self.contracts
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// Unique expiration dates in calendar order.
    pub fn expirations(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<_> = self.contracts.iter().map(|c| c.expiration).collect();
        dates.sort();
        dates.dedup();
        dates
    }

    /// Contracts expiring on a specific date.
    pub fn contracts_at(&self, expiration: NaiveDate) -> Vec<&ContractRecord> {
        self.contracts
            .iter()
            .filter(|c| c.expiration == expiration)
            .collect()
    }

    /// A derived chain holding only the contracts matching `predicate`.
    ///
    /// The result shares this chain's snapshot context, so it needs no
    /// re-validation.
    pub fn filtered<F>(&self, predicate: F) -> OptionChain
    where
        F: Fn(&ContractRecord) -> bool,
    {
        Self {
            symbol: self.symbol.clone(),
            underlying_price: self.underlying_price,
            snapshot_date: self.snapshot_date,
            contracts: self
                .contracts
                .iter()
                .filter(|c| predicate(c))
                .cloned()
                .collect(),
        }
    }

    /// Summary of the chain with the first `preview` expirations.
    pub fn summary(&self, preview: usize) -> ChainSummary {
        let expirations = self.expirations();
        let calls = self.contracts.iter().filter(|c| c.is_call()).count();
        ChainSummary {
            symbol: self.symbol.clone(),
            underlying_price: self.underlying_price,
            snapshot_date: self.snapshot_date,
            total_contracts: self.contracts.len(),
            calls,
            puts: self.contracts.len() - calls,
            expiration_count: expirations.len(),
            first_expirations: expirations.into_iter().take(preview).collect(),
        }
    }

    /// Number of (expiration, strike, type) keys that appear more than once.
    pub fn duplicate_keys(&self) -> usize {
        let mut seen = HashSet::new();
        self.contracts
            .iter()
            .filter(|c| !seen.insert((c.expiration, c.strike, c.option_type)))
            .count()
    }
}

/// Overview of a chain snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSummary {
    pub symbol: String,
    pub underlying_price: Decimal,
    pub snapshot_date: NaiveDate,
    pub total_contracts: usize,
    pub calls: usize,
    pub puts: usize,
    pub expiration_count: usize,
    pub first_expirations: Vec<NaiveDate>,
}


#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_option_type_parsing() {
        assert_eq!("C".parse::<OptionType>(), Ok(OptionType::Call));
        assert_eq!("P".parse::<OptionType>(), Ok(OptionType::Put));
        assert_eq!("call".parse::<OptionType>(), Ok(OptionType::Call));
        assert_eq!("PUT".parse::<OptionType>(), Ok(OptionType::Put));
        assert!("X".parse::<OptionType>().is_err());
    }

    #[test]
    fn test_mid_requires_both_sides() {
        let mut c = contract("AAPL", dec!(100), 30, dec!(100), OptionType::Call, 0.3);
        assert_eq!(c.mid(), Some(dec!(1.5)));
        c.ask = None;
        assert_eq!(c.mid(), None);
    }

    #[test]
    fn test_expirations_sorted_unique() {
        let chain = chain(
            "AAPL",
            dec!(100),
            vec![
                contract("AAPL", dec!(100), 40, dec!(100), OptionType::Call, 0.3),
                contract("AAPL", dec!(100), 10, dec!(100), OptionType::Put, 0.3),
                contract("AAPL", dec!(100), 40, dec!(105), OptionType::Put, 0.3),
            ],
        );
        let exps = chain.expirations();
        assert_eq!(exps.len(), 2);
        assert!(exps[0] < exps[1]);
    }

    #[test]
    fn test_rejects_mismatched_underlying() {
        let result = OptionChain::try_new(
            "AAPL",
            dec!(100),
            snapshot_date(),
            vec![contract("AAPL", dec!(101), 10, dec!(100), OptionType::Call, 0.3)],
        );
        assert!(matches!(result, Err(ChainError::UnderlyingMismatch { .. })));
    }

    #[test]
    fn test_rejects_inconsistent_dte() {
        let mut c = contract("AAPL", dec!(100), 10, dec!(100), OptionType::Call, 0.3);
        c.dte = 12;
        let result = OptionChain::try_new("AAPL", dec!(100), snapshot_date(), vec![c]);
        assert!(matches!(result, Err(ChainError::DteMismatch { expected: 10, .. })));
    }

    #[test]
    fn test_rejects_crossed_quote() {
        let mut c = contract("AAPL", dec!(100), 10, dec!(100), OptionType::Call, 0.3);
        c.bid = Some(dec!(3));
        let result = OptionChain::try_new("AAPL", dec!(100), snapshot_date(), vec![c]);
        assert!(matches!(result, Err(ChainError::CrossedQuote { .. })));
    }

    #[test]
    fn test_rejects_negative_quote() {
        let mut c = contract("AAPL", dec!(100), 10, dec!(100), OptionType::Call, 0.3);
        c.bid = Some(dec!(-1));
        let result = OptionChain::try_new("AAPL", dec!(100), snapshot_date(), vec![c]);
        assert_eq!(
            result,
            Err(ChainError::NegativeQuote {
                strike: dec!(100),
                side: "bid",
                value: dec!(-1),
            })
        );

        let mut c = contract("AAPL", dec!(100), 10, dec!(100), OptionType::Put, 0.3);
        c.bid = None;
        c.ask = Some(dec!(-0.5));
        let result = OptionChain::try_new("AAPL", dec!(100), snapshot_date(), vec![c]);
        assert!(matches!(result, Err(ChainError::NegativeQuote { side: "ask", .. })));
    }

    #[test]
    fn test_zero_bid_accepted() {
        let mut c = contract("AAPL", dec!(100), 10, dec!(100), OptionType::Call, 0.3);
        c.bid = Some(Decimal::ZERO);
        assert!(OptionChain::try_new("AAPL", dec!(100), snapshot_date(), vec![c]).is_ok());
    }

    #[test]
    fn test_rejects_empty_symbol() {
        let result = OptionChain::try_new(" ", dec!(100), snapshot_date(), vec![]);
        assert_eq!(result, Err(ChainError::EmptySymbol));
    }

    #[test]
    fn test_filtered_leaves_source_untouched() {
        let chain = chain(
            "AAPL",
            dec!(100),
            vec![
                contract("AAPL", dec!(100), 10, dec!(100), OptionType::Call, 0.3),
                contract("AAPL", dec!(100), 10, dec!(100), OptionType::Put, 0.0),
            ],
        );
        let with_iv = chain.filtered(|c| c.has_iv());
        assert_eq!(with_iv.len(), 1);
        assert_eq!(chain.len(), 2);
        assert_eq!(with_iv.underlying_price(), chain.underlying_price());
    }

    #[test]
    fn test_summary_counts() {
        let chain = chain(
            "AAPL",
            dec!(100),
            vec![
                contract("AAPL", dec!(100), 10, dec!(100), OptionType::Call, 0.3),
                contract("AAPL", dec!(100), 10, dec!(100), OptionType::Put, 0.3),
                contract("AAPL", dec!(100), 20, dec!(100), OptionType::Put, 0.3),
            ],
        );
        let summary = chain.summary(1);
        assert_eq!(summary.total_contracts, 3);
        assert_eq!(summary.calls, 1);
        assert_eq!(summary.puts, 2);
        assert_eq!(summary.expiration_count, 2);
        assert_eq!(summary.first_expirations.len(), 1);
    }

    #[test]
    fn test_duplicate_keys() {
        let c = contract("AAPL", dec!(100), 10, dec!(100), OptionType::Call, 0.3);
        let chain = chain("AAPL", dec!(100), vec![c.clone(), c]);
        assert_eq!(chain.duplicate_keys(), 1);
    }
}
