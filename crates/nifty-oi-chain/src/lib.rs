//! # Nifty OI Chain
//!
//! Core pipeline for turning a raw NSE option-chain payload into a ranked,
//! summarized table keyed by strike price.
//!
//! ## Pipeline
//! raw payload → [`normalize`] → [`ChainSummary`] (full-chain totals) and
//! [`RankedTable`] (windowed display view with one TOTAL row) → presentation
//! and snapshot persistence (both live outside this crate).
//!
//! ## Invariants
//! - Normalized strikes are unique per (expiry, snapshot); duplicates from
//!   upstream are deduplicated deterministically, never summed.
//! - Every numeric field on a [`NormalizedRow`] is defined; a strike with a
//!   missing CE or PE side reads as zero on that side, not "unknown".
//! - Totals always state which population they are over: the caller passes
//!   either the full chain or the windowed selection explicitly.

pub mod aggregate;
pub mod chain;
pub mod normalize;
pub mod select;
pub mod snapshot;
pub mod table;

pub use aggregate::{ChainSummary, Sentiment};
pub use chain::{RawChainEntry, RawOptionChain, RawRecords, SideQuote};
pub use normalize::{normalize, normalize_with, DedupPolicy, NormalizedRow};
pub use select::{nearest_strike, nearest_strike_of, select, StrikeWindow};
pub use snapshot::Snapshot;
pub use table::{RankedTable, SummaryRow, TOTAL_LABEL};

use thiserror::Error;

/// Errors produced while decoding or normalizing an option-chain payload.
///
/// All of these are recoverable for a polling caller: a bad fetch leaves the
/// previous in-memory snapshot intact.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The payload lacks the top-level records/expiry/spot-price fields or
    /// is not the JSON shape the upstream contract promises.
    #[error("malformed option-chain payload: {0}")]
    MalformedPayload(String),

    /// Upstream delivered the same strike twice for one expiry and the
    /// dedup policy was [`DedupPolicy::Reject`].
    #[error("duplicate strike {0} in payload")]
    DuplicateStrike(i64),

    /// The requested expiry is not present in the payload's expiry list.
    #[error("expiry {0} not present in payload")]
    UnknownExpiry(String),
}
