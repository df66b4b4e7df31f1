//! Per-side totals, net weight and the sentiment label.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::normalize::NormalizedRow;

/// Qualitative direction proxy derived from the net change in open interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

impl Sentiment {
    /// Classify a net weight against a nonnegative dead-zone threshold.
    /// Threshold 0 reproduces the strict sign test (exactly 0 → neutral).
    pub fn from_net_weight(net_weight: i64, threshold: i64) -> Self {
        if net_weight > threshold {
            Sentiment::Bullish
        } else if net_weight < -threshold {
            Sentiment::Bearish
        } else {
            Sentiment::Neutral
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentiment::Bullish => write!(f, "bullish"),
            Sentiment::Bearish => write!(f, "bearish"),
            Sentiment::Neutral => write!(f, "neutral"),
        }
    }
}

/// Signed open-interest-change totals over a stated row population.
///
/// The population is always the caller's choice (full chain vs display
/// window); the two must never mix under one "total" label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSummary {
    pub total_call_change_oi: i64,
    pub total_put_change_oi: i64,
    /// Identity: `net_weight == total_call_change_oi - total_put_change_oi`.
    pub net_weight: i64,
    pub sentiment: Sentiment,
}

impl ChainSummary {
    /// Compute totals over exactly the rows given.
    pub fn over<'a, I>(rows: I, threshold: i64) -> Self
    where
        I: IntoIterator<Item = &'a NormalizedRow>,
    {
        let mut total_call = 0i64;
        let mut total_put = 0i64;
        for row in rows {
            total_call += row.call_change_oi;
            total_put += row.put_change_oi;
        }
        let net_weight = total_call - total_put;
        Self {
            total_call_change_oi: total_call,
            total_put_change_oi: total_put,
            net_weight,
            sentiment: Sentiment::from_net_weight(net_weight, threshold),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(call_change: i64, put_change: i64) -> NormalizedRow {
        NormalizedRow {
            strike: 24000,
            call_ltp: 0.0,
            call_oi: 0,
            call_change_oi: call_change,
            put_ltp: 0.0,
            put_oi: 0,
            put_change_oi: put_change,
        }
    }

    #[test]
    fn test_net_weight_identity() {
        let rows = vec![row(100, -50), row(20, 10), row(-5, 3)];
        let summary = ChainSummary::over(&rows, 0);
        assert_eq!(
            summary.net_weight,
            summary.total_call_change_oi - summary.total_put_change_oi
        );
    }

    #[test]
    fn test_signed_sums() {
        let rows = vec![row(100, -50), row(20, 10)];
        let summary = ChainSummary::over(&rows, 0);
        assert_eq!(summary.total_call_change_oi, 120);
        assert_eq!(summary.total_put_change_oi, -40);
        assert_eq!(summary.net_weight, 160);
        assert_eq!(summary.sentiment, Sentiment::Bullish);
    }

    #[test]
    fn test_sentiment_strict_sign() {
        assert_eq!(Sentiment::from_net_weight(1, 0), Sentiment::Bullish);
        assert_eq!(Sentiment::from_net_weight(-1, 0), Sentiment::Bearish);
        assert_eq!(Sentiment::from_net_weight(0, 0), Sentiment::Neutral);
    }

    #[test]
    fn test_sentiment_dead_zone() {
        assert_eq!(Sentiment::from_net_weight(500, 1000), Sentiment::Neutral);
        assert_eq!(Sentiment::from_net_weight(-1000, 1000), Sentiment::Neutral);
        assert_eq!(Sentiment::from_net_weight(1001, 1000), Sentiment::Bullish);
        assert_eq!(Sentiment::from_net_weight(-1001, 1000), Sentiment::Bearish);
    }

    #[test]
    fn test_summary_over_borrowed_window() {
        let rows = vec![row(10, 5), row(20, 5), row(30, 5)];
        let window: Vec<&NormalizedRow> = rows.iter().skip(1).collect();
        let summary = ChainSummary::over(window.into_iter(), 0);
        assert_eq!(summary.total_call_change_oi, 50);
        assert_eq!(summary.total_put_change_oi, 10);
    }

    #[test]
    fn test_sentiment_display() {
        assert_eq!(Sentiment::Bullish.to_string(), "bullish");
        assert_eq!(Sentiment::Bearish.to_string(), "bearish");
        assert_eq!(Sentiment::Neutral.to_string(), "neutral");
    }
}
