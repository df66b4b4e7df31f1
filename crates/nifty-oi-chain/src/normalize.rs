//! Payload normalization: nested per-strike records → flat strike-indexed rows.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::chain::{RawChainEntry, RawOptionChain};
use crate::ChainError;

/// One strike, flattened. Strike prices are index points (NIFTY strikes are
/// integral); every numeric field is defined, never missing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRow {
    pub strike: i64,
    pub call_ltp: f64,
    pub call_oi: i64,
    pub call_change_oi: i64,
    pub put_ltp: f64,
    pub put_oi: i64,
    pub put_change_oi: i64,
}

impl NormalizedRow {
    fn from_entry(strike: i64, entry: &RawChainEntry) -> Self {
        let ce = entry.ce.unwrap_or_default();
        let pe = entry.pe.unwrap_or_default();
        Self {
            strike,
            call_ltp: ce.last_price,
            call_oi: ce.open_interest,
            call_change_oi: ce.change_in_open_interest,
            put_ltp: pe.last_price,
            put_oi: pe.open_interest,
            put_change_oi: pe.change_in_open_interest,
        }
    }
}

/// How to handle a strike delivered twice for the same expiry.
///
/// Silent summing is never an option: it would corrupt every downstream
/// total without a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupPolicy {
    /// Keep the first occurrence in payload order.
    #[default]
    KeepFirst,
    /// Raise [`ChainError::DuplicateStrike`].
    Reject,
}

/// Normalize a raw chain to the rows of one expiry, deduplicated with
/// [`DedupPolicy::KeepFirst`].
///
/// Entries whose expiry differs from the target are dropped entirely, not
/// zero-filled. Output is sorted ascending by strike and retains no
/// reference to the payload. Pure function of its input: normalizing the
/// same payload twice yields identical rows.
pub fn normalize(
    chain: &RawOptionChain,
    target_expiry: &str,
) -> Result<Vec<NormalizedRow>, ChainError> {
    normalize_with(chain, target_expiry, DedupPolicy::KeepFirst)
}

/// [`normalize`] with an explicit dedup policy.
pub fn normalize_with(
    chain: &RawOptionChain,
    target_expiry: &str,
    dedup: DedupPolicy,
) -> Result<Vec<NormalizedRow>, ChainError> {
    let mut rows = Vec::new();
    let mut seen: HashSet<i64> = HashSet::new();

    for entry in &chain.records.data {
        if entry.expiry_date != target_expiry {
            continue;
        }
        let strike = entry.strike_price.round() as i64;
        if !seen.insert(strike) {
            match dedup {
                DedupPolicy::KeepFirst => continue,
                DedupPolicy::Reject => return Err(ChainError::DuplicateStrike(strike)),
            }
        }
        rows.push(NormalizedRow::from_entry(strike, entry));
    }

    rows.sort_by_key(|r| r.strike);
    Ok(rows)
}
