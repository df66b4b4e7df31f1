//! Typed mirror of the NSE option-chain payload.
//!
//! The upstream source is one HTTP GET returning JSON with a spot price
//! scalar, an expiry-date list, and a list of per-strike records, each
//! optionally carrying CE (call) and PE (put) sub-objects. This module
//! validates presence of the required top-level fields but not upstream
//! correctness.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::ChainError;

/// Expiry dates arrive as e.g. "30-Jan-2026".
pub const EXPIRY_FORMAT: &str = "%d-%b-%Y";

/// One side (CE or PE) of a strike's raw market data.
///
/// Every numeric field defaults to zero when absent. This is deliberate:
/// a strike with no recorded open-interest change must read as zero change,
/// not "unknown", so downstream sums stay total and exact.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SideQuote {
    #[serde(default)]
    pub last_price: f64,
    #[serde(default)]
    pub open_interest: i64,
    #[serde(rename = "changeinOpenInterest", default)]
    pub change_in_open_interest: i64,
    #[serde(default)]
    pub total_traded_volume: u64,
    /// Spot price, duplicated by upstream on every row.
    #[serde(default)]
    pub underlying_value: f64,
}

/// One strike's raw market data for one expiry.
///
/// Entries lacking a call or a put side are valid (deep out-of-the-money
/// strikes may omit a side); the missing side zero-fills downstream.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChainEntry {
    pub strike_price: f64,
    pub expiry_date: String,
    #[serde(rename = "CE")]
    pub ce: Option<SideQuote>,
    #[serde(rename = "PE")]
    pub pe: Option<SideQuote>,
}

/// The `records` (or `filtered`) block of the payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecords {
    pub expiry_dates: Vec<String>,
    pub data: Vec<RawChainEntry>,
    pub underlying_value: f64,
    /// Exchange-side timestamp string, informational only.
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Top-level option-chain payload.
#[derive(Debug, Clone, Deserialize)]
pub struct RawOptionChain {
    pub records: RawRecords,
    /// Upstream also ships a pre-filtered block for the nearest expiries.
    /// Normalization always works from `records`; this is kept only because
    /// the upstream contract includes it.
    #[serde(default)]
    pub filtered: Option<RawRecords>,
}

impl RawOptionChain {
    /// Decode a payload, failing with [`ChainError::MalformedPayload`] when
    /// the required top-level fields are missing or mistyped.
    pub fn from_json(body: &str) -> Result<Self, ChainError> {
        serde_json::from_str(body).map_err(|e| ChainError::MalformedPayload(e.to_string()))
    }

    /// Current spot price of the underlying.
    pub fn spot(&self) -> f64 {
        self.records.underlying_value
    }

    /// Nearest expiry: the first entry of the expiry list (upstream orders
    /// it ascending).
    pub fn nearest_expiry(&self) -> Result<&str, ChainError> {
        self.records
            .expiry_dates
            .first()
            .map(String::as_str)
            .ok_or_else(|| ChainError::MalformedPayload("empty expiryDates list".to_string()))
    }

    /// Expiry list parsed as dates, in payload order. Unparseable entries
    /// are skipped.
    pub fn expiry_dates(&self) -> Vec<NaiveDate> {
        self.records
            .expiry_dates
            .iter()
            .filter_map(|s| parse_expiry(s))
            .collect()
    }
}

/// Parse an upstream expiry string ("30-Jan-2026") into a date.
pub fn parse_expiry(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, EXPIRY_FORMAT).ok()
}

/// Resolve the target expiry for normalization: an explicit request must be
/// present in the payload's expiry list, otherwise the nearest expiry wins.
pub fn resolve_expiry(chain: &RawOptionChain, requested: Option<&str>) -> Result<String, ChainError> {
    match requested {
        Some(expiry) => {
            if chain.records.expiry_dates.iter().any(|e| e == expiry) {
                Ok(expiry.to_string())
            } else {
                Err(ChainError::UnknownExpiry(expiry.to_string()))
            }
        }
        None => chain.nearest_expiry().map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_expiry() {
        assert_eq!(
            parse_expiry("30-Jan-2026"),
            NaiveDate::from_ymd_opt(2026, 1, 30)
        );
        assert_eq!(parse_expiry("garbage"), None);
    }

    #[test]
    fn test_missing_records_is_malformed() {
        let err = RawOptionChain::from_json(r#"{"filtered": null}"#).unwrap_err();
        assert!(matches!(err, ChainError::MalformedPayload(_)));
    }

    #[test]
    fn test_missing_spot_is_malformed() {
        let body = r#"{"records": {"expiryDates": ["30-Jan-2026"], "data": []}}"#;
        let err = RawOptionChain::from_json(body).unwrap_err();
        assert!(matches!(err, ChainError::MalformedPayload(_)));
    }

    #[test]
    fn test_side_quote_defaults_to_zero() {
        let q: SideQuote = serde_json::from_str(r#"{"lastPrice": 12.5}"#).unwrap();
        assert_eq!(q.last_price, 12.5);
        assert_eq!(q.open_interest, 0);
        assert_eq!(q.change_in_open_interest, 0);
        assert_eq!(q.total_traded_volume, 0);
    }

    #[test]
    fn test_resolve_expiry_rejects_unknown() {
        let body = r#"{
            "records": {
                "expiryDates": ["30-Jan-2026", "27-Feb-2026"],
                "data": [],
                "underlyingValue": 24010.0
            }
        }"#;
        let chain = RawOptionChain::from_json(body).unwrap();
        assert_eq!(resolve_expiry(&chain, None).unwrap(), "30-Jan-2026");
        assert_eq!(
            resolve_expiry(&chain, Some("27-Feb-2026")).unwrap(),
            "27-Feb-2026"
        );
        assert!(matches!(
            resolve_expiry(&chain, Some("01-Jan-2020")),
            Err(ChainError::UnknownExpiry(_))
        ));
    }
}
