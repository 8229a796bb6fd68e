//! Integrity checks for a retrieved option chain.
//!
//! Validates:
//! - Quote coverage (share of contracts with a two-sided market)
//! - IV validity (no negative IVs)
//! - Greeks validity (delta in [-1,1], gamma/vega >= 0)
//! - Delta signs (calls positive, puts negative)
//! - Contract key uniqueness (expiration, strike, type)
//!
//! Snapshot invariants (positive strikes, uncrossed quotes, consistent DTE)
//! are already enforced by `OptionChain::try_new`; these checks are soft and
//! never abort.

use serde::Serialize;

use crate::data::{OptionChain, OptionType};

/// Result of a single validation check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub details: Option<String>,
}

impl CheckResult {
    pub fn pass(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            message: message.to_string(),
            details: None,
        }
    }

    pub fn fail(name: &str, message: &str, details: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            message: message.to_string(),
            details,
        }
    }
}

/// Integrity report for one chain snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct ChainIntegrityReport {
    pub symbol: String,
    pub contracts: usize,
    pub expirations: usize,
    pub checks: Vec<CheckResult>,
}

impl ChainIntegrityReport {
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failed_checks(&self) -> Vec<&CheckResult> {
        self.checks.iter().filter(|c| !c.passed).collect()
    }

    pub fn summary(&self) -> String {
        let passed = self.checks.iter().filter(|c| c.passed).count();
        format!(
            "{} ({} contracts, {} expirations): {}/{} checks passed",
            self.symbol,
            self.contracts,
            self.expirations,
            passed,
            self.checks.len()
        )
    }
}

/// Validator for option chain snapshots.
#[derive(Debug, Clone)]
pub struct ChainValidator {
    /// Minimum share of contracts with both bid and ask, in percent.
    min_quote_coverage_pct: f64,
    /// Tolerated share of contracts with a wrong-signed delta, in percent.
    max_delta_sign_pct: f64,
}

impl Default for ChainValidator {
    fn default() -> Self {
        Self {
            min_quote_coverage_pct: 50.0,
            max_delta_sign_pct: 1.0,
        }
    }
}

impl ChainValidator {
    pub fn new(min_quote_coverage_pct: f64, max_delta_sign_pct: f64) -> Self {
        Self {
            min_quote_coverage_pct,
            max_delta_sign_pct,
        }
    }

    /// Run all checks on `chain`.
    pub fn validate(&self, chain: &OptionChain) -> ChainIntegrityReport {
        let checks = vec![
            self.check_quote_coverage(chain),
            self.check_iv_validity(chain),
            self.check_greeks_validity(chain),
            self.check_delta_signs(chain),
            self.check_unique_keys(chain),
        ];

        ChainIntegrityReport {
            symbol: chain.symbol().to_string(),
            contracts: chain.len(),
            expirations: chain.expirations().len(),
            checks,
        }
    }

    fn check_quote_coverage(&self, chain: &OptionChain) -> CheckResult {
        if chain.is_empty() {
            return CheckResult::fail("quote_coverage", "Chain has no contracts", None);
        }

        let quoted = chain
            .contracts()
            .iter()
            .filter(|c| c.bid.is_some() && c.ask.is_some())
            .count();
        let pct = quoted as f64 / chain.len() as f64 * 100.0;

        if pct >= self.min_quote_coverage_pct {
            CheckResult::pass(
                "quote_coverage",
                &format!("{} of {} contracts quoted ({:.1}%)", quoted, chain.len(), pct),
            )
        } else {
            CheckResult::fail(
                "quote_coverage",
                &format!("Only {:.1}% of contracts quoted", pct),
                Some(format!(
                    "{} contracts without a two-sided market",
                    chain.len() - quoted
                )),
            )
        }
    }

    fn check_iv_validity(&self, chain: &OptionChain) -> CheckResult {
        let negative = chain
            .contracts()
            .iter()
            .filter(|c| c.implied_volatility < 0.0)
            .count();
        let missing = chain.contracts().iter().filter(|c| !c.has_iv()).count();

        if negative == 0 {
            CheckResult::pass(
                "iv_validity",
                &format!("All IVs non-negative ({} without IV)", missing),
            )
        } else {
            CheckResult::fail(
                "iv_validity",
                "IV validation issues",
                Some(format!("{} contracts with negative IV", negative)),
            )
        }
    }

    fn check_greeks_validity(&self, chain: &OptionChain) -> CheckResult {
        let contracts = chain.contracts();
        let mut issues = Vec::new();

        let invalid_delta = contracts
            .iter()
            .filter(|c| !(-1.0..=1.0).contains(&c.greeks.delta))
            .count();
        if invalid_delta > 0 {
            issues.push(format!("{} contracts with delta outside [-1,1]", invalid_delta));
        }

        let invalid_gamma = contracts.iter().filter(|c| c.greeks.gamma < 0.0).count();
        if invalid_gamma > 0 {
            issues.push(format!("{} contracts with negative gamma", invalid_gamma));
        }

        let invalid_vega = contracts.iter().filter(|c| c.greeks.vega < 0.0).count();
        if invalid_vega > 0 {
            issues.push(format!("{} contracts with negative vega", invalid_vega));
        }

        if issues.is_empty() {
            CheckResult::pass("greeks_validity", "All Greeks within valid ranges")
        } else {
            CheckResult::fail(
                "greeks_validity",
                &format!("{} issues found", issues.len()),
                Some(issues.join("; ")),
            )
        }
    }

    /// Calls should carry positive delta, puts negative. Zero deltas
    /// (Greeks not reported) are ignored.
    fn check_delta_signs(&self, chain: &OptionChain) -> CheckResult {
        let mut call_negative = 0;
        let mut put_positive = 0;
        let mut total_calls = 0;
        let mut total_puts = 0;

        for contract in chain.contracts() {
            let delta = contract.greeks.delta;
            match contract.option_type {
                OptionType::Call => {
                    total_calls += 1;
                    if delta < 0.0 {
                        call_negative += 1;
                    }
                }
                OptionType::Put => {
                    total_puts += 1;
                    if delta > 0.0 {
                        put_positive += 1;
                    }
                }
            }
        }

        let mut issues = Vec::new();

        let pct = call_negative as f64 / total_calls.max(1) as f64 * 100.0;
        if pct > self.max_delta_sign_pct {
            issues.push(format!(
                "{} ({:.2}%) calls with negative delta",
                call_negative, pct
            ));
        }

        let pct = put_positive as f64 / total_puts.max(1) as f64 * 100.0;
        if pct > self.max_delta_sign_pct {
            issues.push(format!(
                "{} ({:.2}%) puts with positive delta",
                put_positive, pct
            ));
        }

        if issues.is_empty() {
            CheckResult::pass(
                "delta_signs",
                &format!(
                    "Delta signs correct ({} calls, {} puts)",
                    total_calls, total_puts
                ),
            )
        } else {
            CheckResult::fail("delta_signs", "Delta sign issues", Some(issues.join("; ")))
        }
    }

    fn check_unique_keys(&self, chain: &OptionChain) -> CheckResult {
        let duplicates = chain.duplicate_keys();
        if duplicates == 0 {
            CheckResult::pass("unique_contracts", "No duplicate contracts")
        } else {
            CheckResult::fail(
                "unique_contracts",
                &format!("{} duplicate contracts", duplicates),
                Some("Same (expiration, strike, type) reported more than once".to_string()),
            )
        }
    }
}
