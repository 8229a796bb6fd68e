//! CBOE delayed-quotes adapter.
//!
//! The feed returns every listed contract keyed by its OCC symbol, e.g.
//! `AAPL240216C00185000` = AAPL, 2024-02-16, call, strike 185.000.
//! Index underlyings are requested with a leading underscore (`_SPX`).

use std::time::Duration;

use chrono::{NaiveDate, Utc};
use reqwest::blocking::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use super::provider::{ChainProvider, RetrievalError};
use super::types::{ContractRecord, Greeks, OptionChain, OptionType};

const BASE_URL: &str = "https://cdn.cboe.com/api/global/delayed_quotes/options";

/// Underlyings quoted as indices on CBOE.
const INDEX_SYMBOLS: &[&str] = &["SPX", "NDX", "RUT", "VIX", "XSP", "DJX", "OEX", "XEO"];

#[derive(Debug, Deserialize)]
struct CboeResponse {
    #[serde(default)]
    timestamp: Option<String>,
    data: CboeData,
}

#[derive(Debug, Deserialize)]
struct CboeData {
    #[serde(default)]
    current_price: Option<f64>,
    #[serde(default)]
    close: Option<f64>,
    #[serde(default)]
    options: Vec<CboeOption>,
}

#[derive(Debug, Deserialize)]
struct CboeOption {
    option: String,
    #[serde(default)]
    bid: Option<f64>,
    #[serde(default)]
    ask: Option<f64>,
    #[serde(default)]
    iv: Option<f64>,
    #[serde(default)]
    delta: Option<f64>,
    #[serde(default)]
    gamma: Option<f64>,
    #[serde(default)]
    theta: Option<f64>,
    #[serde(default)]
    vega: Option<f64>,
}

/// Fields decoded from an OCC option symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct OccSymbol {
    pub root: String,
    pub expiration: NaiveDate,
    pub option_type: OptionType,
    pub strike: Decimal,
}

/// Decode an OCC symbol; the last 15 characters are fixed width.
pub fn parse_occ_symbol(symbol: &str) -> Option<OccSymbol> {
    let symbol = symbol.trim();
    if symbol.len() < 16 || !symbol.is_ascii() {
        return None;
    }
    let (root, tail) = symbol.split_at(symbol.len() - 15);
    let expiration = NaiveDate::parse_from_str(&tail[..6], "%y%m%d").ok()?;
    let option_type = tail[6..7].parse().ok()?;
    let strike_milli: i64 = tail[7..].parse().ok()?;

    Some(OccSymbol {
        root: root.trim().to_string(),
        expiration,
        option_type,
        strike: Decimal::new(strike_milli, 3).normalize(),
    })
}

/// Quotes of zero mean "not quoted" on this feed.
fn quoted(value: Option<f64>) -> Option<Decimal> {
    value
        .filter(|v| *v > 0.0)
        .and_then(|v| Decimal::try_from(v).ok())
}

fn snapshot_date(timestamp: Option<&str>) -> NaiveDate {
    timestamp
        .and_then(|ts| ts.get(..10))
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .unwrap_or_else(|| Utc::now().date_naive())
}

fn response_to_chain(symbol: &str, response: CboeResponse) -> Result<OptionChain, RetrievalError> {
    let price = response
        .data
        .current_price
        .or(response.data.close)
        .ok_or_else(|| RetrievalError::InvalidResponse(format!("no price for {}", symbol)))?;
    let underlying_price = Decimal::try_from(price)
        .map_err(|e| RetrievalError::InvalidResponse(format!("bad price {}: {}", price, e)))?;
    let snapshot_date = snapshot_date(response.timestamp.as_deref());

    if response.data.options.is_empty() {
        return Err(RetrievalError::NoData {
            symbol: symbol.to_string(),
        });
    }

    let mut contracts = Vec::with_capacity(response.data.options.len());
    let mut skipped = 0usize;
    for option in response.data.options {
        let Some(occ) = parse_occ_symbol(&option.option) else {
            skipped += 1;
            continue;
        };
        if occ.expiration < snapshot_date || occ.strike <= Decimal::ZERO {
            skipped += 1;
            continue;
        }
        let mut bid = quoted(option.bid);
        let mut ask = quoted(option.ask);
        if let (Some(b), Some(a)) = (bid, ask) {
            if b > a {
                bid = None;
                ask = None;
            }
        }

        contracts.push(ContractRecord {
            symbol: symbol.to_string(),
            underlying_price,
            expiration: occ.expiration,
            dte: (occ.expiration - snapshot_date).num_days() as i32,
            strike: occ.strike,
            option_type: occ.option_type,
            bid,
            ask,
            implied_volatility: option.iv.unwrap_or(0.0).max(0.0),
            greeks: Greeks {
                delta: option.delta.unwrap_or(0.0),
                gamma: option.gamma.unwrap_or(0.0),
                theta: option.theta.unwrap_or(0.0),
                vega: option.vega.unwrap_or(0.0),
            },
        });
    }

    debug!(
        "cboe {}: {} contracts, {} skipped",
        symbol,
        contracts.len(),
        skipped
    );

    Ok(OptionChain::try_new(
        symbol,
        underlying_price,
        snapshot_date,
        contracts,
    )?)
}

/// CBOE delayed quotes client.
pub struct CboeProvider {
    client: Client,
}

impl CboeProvider {
    pub fn new(timeout: Duration) -> Result<Self, RetrievalError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    fn feed_symbol(symbol: &str) -> String {
        let upper = symbol.trim().to_uppercase();
        if INDEX_SYMBOLS.contains(&upper.as_str()) {
            format!("_{}", upper)
        } else {
            upper
        }
    }
}

impl ChainProvider for CboeProvider {
    fn name(&self) -> &str {
        "cboe"
    }

    fn fetch_chain(&self, symbol: &str) -> Result<OptionChain, RetrievalError> {
        let url = format!("{}/{}.json", BASE_URL, Self::feed_symbol(symbol));
        let response = self.client.get(&url).send()?;

        if response.status() == reqwest::StatusCode::FORBIDDEN
            || response.status() == reqwest::StatusCode::NOT_FOUND
        {
            return Err(RetrievalError::NoData {
                symbol: symbol.to_string(),
            });
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            return Err(RetrievalError::Api {
                symbol: symbol.to_string(),
                status,
                body,
            });
        }

        let parsed: CboeResponse = response
            .json()
            .map_err(|e| RetrievalError::InvalidResponse(format!("Failed to parse response: {}", e)))?;
        response_to_chain(&symbol.trim().to_uppercase(), parsed)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_parse_occ_symbol() {
        let occ = parse_occ_symbol("AAPL240216C00185000").unwrap();
        assert_eq!(occ.root, "AAPL");
        assert_eq!(occ.expiration, NaiveDate::from_ymd_opt(2024, 2, 16).unwrap());
        assert_eq!(occ.option_type, OptionType::Call);
        assert_eq!(occ.strike, dec!(185));

        let occ = parse_occ_symbol("SPXW240119P04712500").unwrap();
        assert_eq!(occ.root, "SPXW");
        assert_eq!(occ.option_type, OptionType::Put);
        assert_eq!(occ.strike, dec!(4712.5));
    }

    #[test]
    fn test_parse_occ_symbol_rejects_garbage() {
        assert!(parse_occ_symbol("AAPL").is_none());
        assert!(parse_occ_symbol("AAPL241316C00185000").is_none());
        assert!(parse_occ_symbol("AAPL240216X00185000").is_none());
    }

    #[test]
    fn test_feed_symbol_prefixes_indices() {
        assert_eq!(CboeProvider::feed_symbol("spx"), "_SPX");
        assert_eq!(CboeProvider::feed_symbol("AAPL"), "AAPL");
    }

    #[test]
    fn test_response_to_chain() {
        let json = r#"{
            "timestamp": "2024-01-15 16:15:00",
            "data": {
                "current_price": 185.5,
                "options": [
                    {"option": "AAPL240216C00185000", "bid": 5.1, "ask": 5.3, "iv": 0.22,
                     "delta": 0.52, "gamma": 0.03, "theta": -0.08, "vega": 0.21},
                    {"option": "AAPL240216P00185000", "bid": 0.0, "ask": 4.9, "iv": 0.24},
                    {"option": "AAPL240112C00185000", "bid": 1.0, "ask": 1.1, "iv": 0.3},
                    {"option": "garbage"}
                ]
            }
        }"#;
        let response: CboeResponse = serde_json::from_str(json).unwrap();
        let chain = response_to_chain("AAPL", response).unwrap();

        assert_eq!(chain.snapshot_date(), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(chain.underlying_price(), dec!(185.5));
        assert_eq!(chain.len(), 2);

        let call = &chain.contracts()[0];
        assert_eq!(call.dte, 32);
        assert_eq!(call.greeks.delta, 0.52);

        let put = &chain.contracts()[1];
        assert_eq!(put.bid, None);
        assert_eq!(put.ask, Some(dec!(4.9)));
        assert_eq!(put.greeks, Greeks::default());
    }

    #[test]
    fn test_response_without_options_is_no_data() {
        let json = r#"{"data": {"current_price": 10.0, "options": []}}"#;
        let response: CboeResponse = serde_json::from_str(json).unwrap();
        let err = response_to_chain("XYZ", response).unwrap_err();
        assert!(matches!(err, RetrievalError::NoData { .. }));
    }
}
