//! Point-in-time captures of a normalized chain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::normalize::NormalizedRow;

/// An immutable capture of one expiry's normalized chain at one instant,
/// appended to the time-series sink and never mutated after write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    /// Expiry in the upstream's string form (e.g. "30-Jan-2026").
    pub expiry: String,
    pub spot: f64,
    pub rows: Vec<NormalizedRow>,
}

impl Snapshot {
    pub fn new(timestamp: DateTime<Utc>, expiry: String, spot: f64, rows: Vec<NormalizedRow>) -> Self {
        Self {
            timestamp,
            expiry,
            spot,
            rows,
        }
    }
}
