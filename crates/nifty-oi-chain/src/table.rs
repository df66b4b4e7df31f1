//! The ranked display table: a windowed view of normalized rows plus one
//! synthetic summary row.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::normalize::NormalizedRow;
use crate::select::{nearest_strike_of, select, StrikeWindow};

/// Sentinel label carried in the summary row's strike-price column.
pub const TOTAL_LABEL: &str = "TOTAL";

/// Column sums over the windowed rows (not the full chain). Last-price
/// columns are omitted; a sum of last prices means nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub call_oi: i64,
    pub call_change_oi: i64,
    pub put_oi: i64,
    pub put_change_oi: i64,
}

impl SummaryRow {
    /// Sum the numeric columns over exactly the rows given.
    pub fn over<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a NormalizedRow>,
    {
        let mut summary = SummaryRow {
            call_oi: 0,
            call_change_oi: 0,
            put_oi: 0,
            put_change_oi: 0,
        };
        for row in rows {
            summary.call_oi += row.call_oi;
            summary.call_change_oi += row.call_change_oi;
            summary.put_oi += row.put_oi;
            summary.put_change_oi += row.put_change_oi;
        }
        summary
    }
}

/// Ordered windowed rows plus exactly one summary row, ready for a
/// presentation layer. The rows are a borrowed view of the normalized set;
/// only the summary row is owned by the table.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedTable<'a> {
    /// Window rows, ascending by strike.
    pub rows: Vec<&'a NormalizedRow>,
    /// Column sums over `rows`.
    pub summary: SummaryRow,
    /// The strike minimizing |strike − spot| within the window.
    pub nearest_strike: Option<i64>,
    pub spot: f64,
}

impl<'a> RankedTable<'a> {
    /// Select the display window around `spot` and attach the summary row
    /// and nearest-strike marker.
    pub fn build(rows: &'a [NormalizedRow], spot: f64, window: &StrikeWindow) -> Self {
        let selected = select(rows, spot, window);
        let summary = SummaryRow::over(selected.iter().copied());
        let nearest = nearest_strike_of(selected.iter().map(|r| r.strike), spot);
        Self {
            rows: selected,
            summary,
            nearest_strike: nearest,
            spot,
        }
    }
}

impl fmt::Display for RankedTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>8}  {:>10} {:>12} {:>12}  {:>10} {:>12} {:>12}",
            "STRIKE", "CALL_LTP", "CALL_OI", "CALL_CHG_OI", "PUT_LTP", "PUT_OI", "PUT_CHG_OI"
        )?;
        for row in &self.rows {
            let marker = if Some(row.strike) == self.nearest_strike {
                "*"
            } else {
                " "
            };
            writeln!(
                f,
                "{:>7}{}  {:>10.2} {:>12} {:>12}  {:>10.2} {:>12} {:>12}",
                row.strike,
                marker,
                row.call_ltp,
                row.call_oi,
                row.call_change_oi,
                row.put_ltp,
                row.put_oi,
                row.put_change_oi
            )?;
        }
        writeln!(
            f,
            "{:>8}  {:>10} {:>12} {:>12}  {:>10} {:>12} {:>12}",
            TOTAL_LABEL,
            "",
            self.summary.call_oi,
            self.summary.call_change_oi,
            "",
            self.summary.put_oi,
            self.summary.put_change_oi
        )
    }
}
