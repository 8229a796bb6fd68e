//! Validation of retrieved option chains.
//!
//! Soft integrity checks (value ranges, delta signs, duplicates) reported
//! as a list of named pass/fail results.

pub mod chain_integrity;

pub use chain_integrity::{ChainIntegrityReport, ChainValidator, CheckResult};
