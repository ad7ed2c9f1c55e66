//! Match-Rate Engine: converts one raw value into a percentage of the
//! benchmark baseline, aware of the sub-test's scale direction.

use super::catalog::ScaleDirection;

/// Compute a sub-test match rate, or `None` when the record cannot
/// contribute: no baseline, a zero baseline (division-by-zero policy: the
/// sub-test is excluded for everyone), or corrupted non-finite input.
///
/// Normal scales score `value / baseline * 100`, so out-performing the
/// benchmark legitimately exceeds 100. Inverse scales give full credit at or
/// below the baseline and erode proportionally above it, floored at 0.
pub fn match_rate(direction: ScaleDirection, value: f64, baseline: Option<f64>) -> Option<f64> {
    let baseline = baseline?;
    if baseline == 0.0 || !baseline.is_finite() || !value.is_finite() {
        return None;
    }

    let rate = match direction {
        ScaleDirection::Normal => value / baseline * 100.0,
        ScaleDirection::Inverse => {
            let overshoot = (value - baseline).max(0.0);
            100.0 - overshoot / baseline * 100.0
        }
    };

    if !rate.is_finite() {
        return None;
    }

    // Corrupted negative inputs clamp to zero instead of vanishing from the
    // group mean; inverse overshoot lands here as its floor.
    Some(rate.max(0.0))
}
