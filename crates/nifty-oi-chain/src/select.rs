//! Strike-range selection: restrict normalized rows to the display window
//! around the spot price.

use serde::{Deserialize, Serialize};

use crate::normalize::NormalizedRow;

/// Display-window policy. Both variants are observed in practice and are
/// supported as configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "kebab-case")]
pub enum StrikeWindow {
    /// Every strike within an absolute distance of spot (e.g. ±500 points).
    FixedBand { points: i64 },
    /// The N strikes closest to spot, regardless of absolute distance.
    /// Ties go to the lower strike.
    NearestN { count: usize },
}

impl Default for StrikeWindow {
    fn default() -> Self {
        StrikeWindow::FixedBand { points: 500 }
    }
}

/// Distance ranking key: absolute distance from spot scaled to centipoints,
/// then the strike itself so that ties resolve to the lower strike.
///
/// Distances within half a centipoint of each other round to the same key
/// and count as a tie. Exact for integral index strikes.
fn distance_key(strike: i64, spot: f64) -> (i64, i64) {
    let dist = ((strike as f64 - spot).abs() * 100.0).round() as i64;
    (dist, strike)
}

/// Select the window of rows around `spot`, sorted ascending by strike.
///
/// Spot need not match any strike exactly; distance is |strike − spot|.
pub fn select<'a>(
    rows: &'a [NormalizedRow],
    spot: f64,
    window: &StrikeWindow,
) -> Vec<&'a NormalizedRow> {
    let mut selected: Vec<&NormalizedRow> = match window {
        StrikeWindow::FixedBand { points } => rows
            .iter()
            .filter(|r| (r.strike as f64 - spot).abs() <= *points as f64)
            .collect(),
        StrikeWindow::NearestN { count } => {
            let mut ranked: Vec<&NormalizedRow> = rows.iter().collect();
            ranked.sort_by_key(|r| distance_key(r.strike, spot));
            ranked.truncate(*count);
            ranked
        }
    };
    selected.sort_by_key(|r| r.strike);
    selected
}

/// The single strike minimizing |strike − spot|; under a tie, the lower
/// strike wins. `None` only for an empty row set.
pub fn nearest_strike(rows: &[NormalizedRow], spot: f64) -> Option<i64> {
    nearest_strike_of(rows.iter().map(|r| r.strike), spot)
}

/// [`nearest_strike`] over bare strikes, for callers holding a borrowed
/// selection rather than a slice.
pub fn nearest_strike_of<I>(strikes: I, spot: f64) -> Option<i64>
where
    I: IntoIterator<Item = i64>,
{
    strikes.into_iter().min_by_key(|&s| distance_key(s, spot))
}
