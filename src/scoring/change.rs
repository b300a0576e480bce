//! Signed percentage change between two scores

use crate::stats::round_to;

/// Change from `previous` to `current` in percent, rounded to 2 decimals.
///
/// No previous value reads as no change. A previous score of zero followed by
/// any positive score is reported as exactly 100.
pub fn percentage_change(previous: Option<f64>, current: f64) -> f64 {
    let Some(previous) = previous else {
        return 0.0;
    };
    if previous == 0.0 {
        return if current > 0.0 { 100.0 } else { 0.0 };
    }
    let change = (current - previous) / previous * 100.0;
    if change.is_finite() {
        round_to(change, 2)
    } else {
        0.0
    }
}
