//! ORATS API adapter.
//!
//! The `strikes` endpoint returns one row per (expiration, strike) with call
//! and put fields side by side; each row becomes up to two contract records.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::blocking::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::provider::{ChainProvider, RetrievalError};
use super::types::{ContractRecord, Greeks, OptionChain, OptionType};

/// ORATS API base URL.
const BASE_URL: &str = "https://api.orats.io/datav2";

/// API response wrapper - ORATS wraps all responses in {"data": [...]}
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Raw strike row from the ORATS API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStrikeRecord {
    pub ticker: String,
    pub trade_date: String,
    pub expir_date: String,
    pub strike: f64,
    pub stock_price: f64,

    #[serde(default)]
    pub call_bid_price: Option<f64>,
    #[serde(default)]
    pub call_ask_price: Option<f64>,
    #[serde(default)]
    pub call_mid_iv: Option<f64>,

    #[serde(default)]
    pub put_bid_price: Option<f64>,
    #[serde(default)]
    pub put_ask_price: Option<f64>,
    #[serde(default)]
    pub put_mid_iv: Option<f64>,

    // Shared by both sides; ORATS reports call-side Greeks
    #[serde(default)]
    pub smv_vol: Option<f64>,
    #[serde(default)]
    pub delta: Option<f64>,
    #[serde(default)]
    pub gamma: Option<f64>,
    #[serde(default)]
    pub theta: Option<f64>,
    #[serde(default)]
    pub vega: Option<f64>,
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Negative prices are treated as not quoted.
fn to_decimal(value: Option<f64>) -> Option<Decimal> {
    value
        .filter(|v| *v >= 0.0)
        .and_then(|v| Decimal::try_from(v).ok())
}

impl RawStrikeRecord {
    fn quote(
        &self,
        symbol: &str,
        underlying_price: Decimal,
        snapshot_date: NaiveDate,
        option_type: OptionType,
    ) -> Option<ContractRecord> {
        let expiration = parse_date(&self.expir_date)?;
        if expiration < snapshot_date {
            return None;
        }
        let (bid, ask, mid_iv) = match option_type {
            OptionType::Call => (self.call_bid_price, self.call_ask_price, self.call_mid_iv),
            OptionType::Put => (self.put_bid_price, self.put_ask_price, self.put_mid_iv),
        };
        // Put delta is reported as the call delta; store it negative
        let delta = match option_type {
            OptionType::Call => self.delta.unwrap_or(0.0),
            OptionType::Put => -self.delta.unwrap_or(0.0).abs(),
        };

        let (bid, ask) = match (to_decimal(bid), to_decimal(ask)) {
            (Some(b), Some(a)) if b > a => (None, None),
            quotes => quotes,
        };

        Some(ContractRecord {
            symbol: symbol.to_string(),
            underlying_price,
            expiration,
            dte: (expiration - snapshot_date).num_days() as i32,
            strike: Decimal::try_from(self.strike)
                .ok()
                .filter(|s| *s > Decimal::ZERO)?,
            option_type,
            bid,
            ask,
            implied_volatility: mid_iv.or(self.smv_vol).unwrap_or(0.0).max(0.0),
            greeks: Greeks {
                delta,
                gamma: self.gamma.unwrap_or(0.0),
                theta: self.theta.unwrap_or(0.0),
                vega: self.vega.unwrap_or(0.0),
            },
        })
    }
}

/// Convert raw strike rows into a validated chain.
///
/// The first row supplies the snapshot date and underlying price; rows
/// with unparseable dates or strikes are skipped.
pub fn records_to_chain(
    symbol: &str,
    records: Vec<RawStrikeRecord>,
) -> Result<OptionChain, RetrievalError> {
    let symbol = symbol.trim().to_uppercase();
    let first = records.first().ok_or_else(|| RetrievalError::NoData {
        symbol: symbol.clone(),
    })?;
    let snapshot_date = parse_date(&first.trade_date).ok_or_else(|| {
        RetrievalError::InvalidResponse(format!("bad tradeDate: {}", first.trade_date))
    })?;
    let underlying_price = Decimal::try_from(first.stock_price).map_err(|e| {
        RetrievalError::InvalidResponse(format!("bad stockPrice {}: {}", first.stock_price, e))
    })?;

    let mut contracts = Vec::with_capacity(records.len() * 2);
    for record in &records {
        for option_type in [OptionType::Call, OptionType::Put] {
            if let Some(quote) = record.quote(&symbol, underlying_price, snapshot_date, option_type)
            {
                contracts.push(quote);
            }
        }
    }

    Ok(OptionChain::try_new(
        symbol,
        underlying_price,
        snapshot_date,
        contracts,
    )?)
}

/// ORATS API client.
pub struct OratsProvider {
    client: Client,
    token: String,
}

impl OratsProvider {
    pub fn new(token: String, timeout: Duration) -> Result<Self, RetrievalError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, token })
    }

    fn request<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, RetrievalError> {
        let url = format!("{}/{}", BASE_URL, endpoint);
        let mut all_params: Vec<(&str, &str)> = params.to_vec();
        all_params.push(("token", self.token.as_str()));

        let response = self.client.get(&url).query(&all_params).send()?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            let symbol = params
                .iter()
                .find(|(k, _)| *k == "ticker")
                .map(|(_, v)| v.to_string())
                .unwrap_or_default();
            return Err(RetrievalError::Api {
                symbol,
                status,
                body,
            });
        }

        response
            .json()
            .map_err(|e| RetrievalError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }
}

impl ChainProvider for OratsProvider {
    fn name(&self) -> &str {
        "orats"
    }

    fn fetch_chain(&self, symbol: &str) -> Result<OptionChain, RetrievalError> {
        let response: ApiResponse<Vec<RawStrikeRecord>> =
            self.request("strikes", &[("ticker", symbol)])?;
        debug!("orats returned {} strike rows for {}", response.data.len(), symbol);
        records_to_chain(symbol, response.data)
    }
}
