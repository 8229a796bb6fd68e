pub mod cboe;
pub mod file;
pub mod orats;
pub mod provider;
pub mod types;

pub use cboe::{parse_occ_symbol, CboeProvider, OccSymbol};
pub use file::FileProvider;
pub use orats::{records_to_chain, OratsProvider, RawStrikeRecord};
pub use provider::{build_provider, ChainProvider, ProviderKind, RetrievalError};
pub use types::{ChainError, ChainSummary, ContractRecord, Greeks, OptionChain, OptionType};
