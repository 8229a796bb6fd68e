//! Chain narrowing stages.
//!
//! Each stage takes typed contracts and returns a new, narrower collection:
//! - Expiration selection with ordered fallback tiers
//! - Call/put classification
//! - Strike band filtering around a reference price

pub mod classifier;
pub mod expiration;
pub mod strike_band;

pub use classifier::{sort_by_strike, split};
pub use expiration::{
    select_expiration, ExpirationPolicy, ExpirationSelection, ExpirationSelector, FallbackTier,
    SelectionError, RELAXED_MIN_DTE,
};
pub use strike_band::{filter_by_strike_band, StrikeBand, StrikeBandFilter};
