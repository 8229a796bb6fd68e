//! Option chain analytics.
//!
//! Retrieves option chain snapshots through a pluggable provider and derives
//! at-the-money views, cross-symbol IV screens, payoff curves, volatility
//! smiles and integrity reports from them.

pub mod analytics;
pub mod config;
pub mod data;
pub mod selection;
pub mod validation;

// Re-export commonly used types
pub use analytics::{
    AnalysisError, AtmAnalysis, AtmAnalyzer, IVScreener, PayoffCalculator, Position,
    ScreenOutcome, ScreenReport, ScreenResult, StrikeProfiler,
};
pub use config::{AppConfig, ConfigError};
pub use data::{
    build_provider, ChainProvider, ContractRecord, Greeks, OptionChain, OptionType,
    RetrievalError,
};
pub use selection::{ExpirationPolicy, ExpirationSelector, SelectionError, StrikeBandFilter};
pub use validation::{ChainIntegrityReport, ChainValidator};
