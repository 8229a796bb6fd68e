//! Call/put partitioning.

use crate::data::{ContractRecord, OptionType};

/// Split contracts into `(calls, puts)`, preserving relative order.
pub fn split<I>(contracts: I) -> (Vec<ContractRecord>, Vec<ContractRecord>)
where
    I: IntoIterator<Item = ContractRecord>,
{
    contracts
        .into_iter()
        .partition(|c| c.option_type == OptionType::Call)
}

/// Sort ascending by strike; equal strikes keep their order.
pub fn sort_by_strike(contracts: &mut [ContractRecord]) {
    contracts.sort_by(|a, b| a.strike.cmp(&b.strike));
}
