//! Rate and percentage arithmetic over counter pairs.
//!
//! Every exporter goes through these helpers, so counter regressions and
//! degenerate intervals are handled in exactly one place. All functions are
//! total: the worst possible result is `0.0`.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Interval
// ---------------------------------------------------------------------------

/// Elapsed time between the previous and the current snapshot.
///
/// Stored in hundredths of a second, the resolution of the uptime counter the
/// collectors record alongside every sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Interval {
    centis: u64,
}

impl Interval {
    /// Builds an interval from hundredths of a second.
    pub const fn from_centis(centis: u64) -> Self {
        Self { centis }
    }

    /// Builds an interval from two uptime readings (hundredths of a second).
    ///
    /// A clock going backwards yields a zero interval.
    pub fn between(prev_uptime_cs: u64, curr_uptime_cs: u64) -> Self {
        Self::from_centis(curr_uptime_cs.saturating_sub(prev_uptime_cs))
    }

    pub fn centis(self) -> u64 {
        self.centis
    }

    pub fn as_secs_f64(self) -> f64 {
        self.centis as f64 / 100.0
    }

    pub fn is_zero(self) -> bool {
        self.centis == 0
    }
}

// ---------------------------------------------------------------------------
// Delta helpers
// ---------------------------------------------------------------------------

/// Counter delta, `None` on regression (counter reset or re-registration).
pub fn delta(prev: u64, curr: u64) -> Option<u64> {
    curr.checked_sub(prev)
}

/// Per-unit rate `(curr - prev) / interval`.
///
/// Returns `0.0` when the counter went backwards or the interval is not
/// strictly positive.
pub fn rate(prev: u64, curr: u64, interval: f64) -> f64 {
    if interval <= 0.0 || !interval.is_finite() {
        return 0.0;
    }
    delta(prev, curr).map_or(0.0, |d| d as f64 / interval)
}

/// Per-second rate over an [`Interval`].
pub fn per_sec(prev: u64, curr: u64, itv: Interval) -> f64 {
    rate(prev, curr, itv.as_secs_f64())
}

/// Share of `total_interval` spent in a busy state, in percent.
///
/// `(curr_busy - prev_busy) * 100 / total_interval`, clamped to `0.0` on
/// regression or an empty interval.
pub fn busy_percent(prev_busy: u64, curr_busy: u64, total_interval: u64) -> f64 {
    if total_interval == 0 {
        return 0.0;
    }
    delta(prev_busy, curr_busy).map_or(0.0, |d| d as f64 * 100.0 / total_interval as f64)
}

/// `numerator * 100 / denominator`, `0.0` for an empty denominator.
pub fn share_percent(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 * 100.0 / denominator as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_is_delta_over_interval() {
        assert!((rate(100, 350, 5.0) - 50.0).abs() < 1e-9);
        assert!((rate(0, 1, 4.0) - 0.25).abs() < 1e-9);
        assert!((rate(7, 7, 1.0)).abs() < 1e-9);
    }

    #[test]
    fn rate_clamps_regression_to_zero() {
        assert_eq!(rate(500, 10, 1.0), 0.0);
        assert_eq!(rate(u64::MAX, 0, 3.0), 0.0);
    }

    #[test]
    fn rate_with_empty_interval_is_zero() {
        assert_eq!(rate(0, 1000, 0.0), 0.0);
        assert_eq!(rate(0, 1000, -1.0), 0.0);
        assert_eq!(rate(0, 1000, f64::NAN), 0.0);
    }

    #[test]
    fn per_sec_uses_hundredths() {
        let itv = Interval::from_centis(250);
        assert!((per_sec(0, 500, itv) - 200.0).abs() < 1e-9);
        assert_eq!(per_sec(0, 500, Interval::default()), 0.0);
    }

    #[test]
    fn interval_between_saturates() {
        assert_eq!(Interval::between(1000, 1500).centis(), 500);
        assert!(Interval::between(1500, 1000).is_zero());
    }

    #[test]
    fn busy_percent_basic_and_clamped() {
        assert!((busy_percent(10, 35, 100) - 25.0).abs() < 1e-9);
        assert_eq!(busy_percent(35, 10, 100), 0.0);
        assert_eq!(busy_percent(10, 35, 0), 0.0);
    }

    #[test]
    fn share_percent_guards_zero_denominator() {
        assert_eq!(share_percent(42, 0), 0.0);
        assert_eq!(share_percent(0, 0), 0.0);
        assert!((share_percent(50, 200) - 25.0).abs() < 1e-9);
    }

    #[test]
    fn delta_detects_regression() {
        assert_eq!(delta(3, 5), Some(2));
        assert_eq!(delta(5, 3), None);
    }
}
