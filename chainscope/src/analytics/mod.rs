//! Options analytics module.
//!
//! Provides:
//! - At-the-money contract selection for one underlying
//! - Cross-symbol implied volatility screening
//! - Expiration payoff curves for single option positions
//! - Volatility smile and Greeks-by-strike series

pub mod atm;
pub mod iv_screener;
pub mod payoff;
pub mod smile;

pub use atm::{AnalysisError, AtmAnalysis, AtmAnalyzer};
pub use iv_screener::{screen_chain, IVScreener, ScreenOutcome, ScreenReport, ScreenResult, SkipReason};
pub use payoff::{payoff, PayoffCalculator, PayoffPoint, PayoffSummary, Position, PriceGrid};
pub use smile::{GreeksPoint, GreeksProfile, SmilePoint, StrikeProfiler, VolatilitySmile};
