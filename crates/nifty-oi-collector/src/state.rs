//! Process-wide dashboard state and the plain-data view handed to
//! rendering consumers.
//!
//! Refresh state (last-good snapshot, last error, next-due timestamp) is one
//! explicit struct with defined transition functions, shared behind
//! `Arc<RwLock<_>>` between the poller and the status server. No ambient
//! globals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use nifty_oi_chain::{ChainSummary, RankedTable, Snapshot, StrikeWindow, TOTAL_LABEL};

/// One table row as plain data for a presentation layer. The strike column
/// is a string so the TOTAL sentinel fits; last-price columns are `None` on
/// the summary row, where they are not meaningful aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRowView {
    pub strike: String,
    pub nearest: bool,
    pub call_ltp: Option<f64>,
    pub call_oi: i64,
    pub call_change_oi: i64,
    pub put_ltp: Option<f64>,
    pub put_oi: i64,
    pub put_change_oi: i64,
}

/// Everything a rendering consumer needs, as plain data: the windowed table
/// (ordered rows + one summary row appended last) and the full-chain scalar
/// summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    pub timestamp: DateTime<Utc>,
    pub expiry: String,
    pub spot: f64,
    pub nearest_strike: Option<i64>,
    /// Window rows ascending by strike, then the TOTAL row.
    pub rows: Vec<TableRowView>,
    /// Totals over the full chain, not the display window.
    pub full_chain: ChainSummary,
}

impl DashboardView {
    /// Build the view for one snapshot: full-chain totals plus the windowed
    /// ranked table.
    pub fn build(snapshot: &Snapshot, window: &StrikeWindow, threshold: i64) -> Self {
        let full_chain = ChainSummary::over(&snapshot.rows, threshold);
        let table = RankedTable::build(&snapshot.rows, snapshot.spot, window);

        let mut rows: Vec<TableRowView> = table
            .rows
            .iter()
            .map(|r| TableRowView {
                strike: r.strike.to_string(),
                nearest: Some(r.strike) == table.nearest_strike,
                call_ltp: Some(r.call_ltp),
                call_oi: r.call_oi,
                call_change_oi: r.call_change_oi,
                put_ltp: Some(r.put_ltp),
                put_oi: r.put_oi,
                put_change_oi: r.put_change_oi,
            })
            .collect();
        rows.push(TableRowView {
            strike: TOTAL_LABEL.to_string(),
            nearest: false,
            call_ltp: None,
            call_oi: table.summary.call_oi,
            call_change_oi: table.summary.call_change_oi,
            put_ltp: None,
            put_oi: table.summary.put_oi,
            put_change_oi: table.summary.put_change_oi,
        });

        Self {
            timestamp: snapshot.timestamp,
            expiry: snapshot.expiry.clone(),
            spot: snapshot.spot,
            nearest_strike: table.nearest_strike,
            rows,
            full_chain,
        }
    }
}

/// Process-wide refresh state.
#[derive(Debug, Default)]
pub struct DashboardState {
    /// Last successfully captured snapshot; stays put across failed polls.
    pub last_snapshot: Option<Snapshot>,
    /// View computed from `last_snapshot`.
    pub last_view: Option<DashboardView>,
    /// Non-blocking error notice; cleared by the next successful poll.
    pub last_error: Option<String>,
    pub last_success_at: Option<DateTime<Utc>>,
    /// When the next scheduled refresh is due.
    pub next_due: Option<DateTime<Utc>>,
    pub polls: u64,
    pub failures: u64,
}

impl DashboardState {
    /// A poll succeeded: install the new snapshot and clear the notice.
    pub fn on_snapshot(&mut self, snapshot: Snapshot, view: DashboardView) {
        self.last_success_at = Some(snapshot.timestamp);
        self.last_snapshot = Some(snapshot);
        self.last_view = Some(view);
        self.last_error = None;
        self.polls += 1;
    }

    /// A poll failed: keep the stale snapshot visible, set the notice.
    pub fn on_failure(&mut self, error: String) {
        self.last_error = Some(error);
        self.polls += 1;
        self.failures += 1;
    }
}
