//! Timeline derivations over an assignment's date range.
//!
//! All inputs are Unix epoch milliseconds. Every function is total over the
//! full `i64` range; differences are taken in `i128` so they cannot overflow.

use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

pub const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Elapsed share of `[start, end]` at `now`, in `[0, 100]`.
pub fn progress_percent(start: i64, end: i64, now: i64) -> f64 {
    if now < start {
        return 0.0;
    }
    if now >= end {
        // Also covers zero-length ranges.
        return 100.0;
    }
    let elapsed = (i128::from(now) - i128::from(start)) as f64;
    let total = (i128::from(end) - i128::from(start)) as f64;
    (elapsed * 100.0 / total).clamp(0.0, 100.0)
}

/// Remaining whole days until an assignment ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "days")]
pub enum DaysRemaining {
    Completed,
    DueToday,
    Days(i64),
}

impl Display for DaysRemaining {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "Completed"),
            Self::DueToday => write!(f, "Due today"),
            Self::Days(1) => write!(f, "1 day"),
            Self::Days(days) => write!(f, "{days} days"),
        }
    }
}

/// `ceil((end - now) / 1 day)`, labelled.
pub fn days_remaining(end: i64, now: i64) -> DaysRemaining {
    let diff_days = ceil_div(i128::from(end) - i128::from(now), i128::from(MILLIS_PER_DAY));
    match diff_days {
        d if d < 0 => DaysRemaining::Completed,
        0 => DaysRemaining::DueToday,
        // |diff| / MILLIS_PER_DAY always fits back into i64.
        d => DaysRemaining::Days(i64::try_from(d).unwrap_or(i64::MAX)),
    }
}

fn ceil_div(value: i128, divisor: i128) -> i128 {
    -((-value).div_euclid(divisor))
}

/// Current wall-clock time in epoch milliseconds.
///
/// Only callers read the clock; everything in this crate takes `now` explicitly.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{days_remaining, progress_percent, DaysRemaining, MILLIS_PER_DAY};

    // 2024-01-01T00:00:00Z
    const JAN_1_2024: i64 = 1_704_067_200_000;

    fn day(n: i64) -> i64 {
        JAN_1_2024 + (n - 1) * MILLIS_PER_DAY
    }

    #[test]
    fn progress_is_half_way_at_midpoint() {
        assert_eq!(progress_percent(day(1), day(11), day(6)), 50.0);
    }

    #[test]
    fn progress_is_clamped_outside_range() {
        assert_eq!(progress_percent(day(5), day(10), day(1)), 0.0);
        assert_eq!(progress_percent(day(5), day(10), day(12)), 100.0);
        assert_eq!(progress_percent(day(5), day(5), day(5)), 100.0);
        assert_eq!(progress_percent(day(5), day(5), day(4)), 0.0);
    }

    #[test]
    fn days_remaining_rounds_partial_days_up() {
        let now = day(1);
        assert_eq!(days_remaining(now + MILLIS_PER_DAY / 2, now), DaysRemaining::Days(1));
        assert_eq!(days_remaining(now + 3 * MILLIS_PER_DAY, now), DaysRemaining::Days(3));
        assert_eq!(days_remaining(now, now), DaysRemaining::DueToday);
    }

    #[test]
    fn less_than_a_day_overdue_is_still_due_today() {
        let now = day(3);
        assert_eq!(days_remaining(now - MILLIS_PER_DAY / 2, now), DaysRemaining::DueToday);
        assert_eq!(days_remaining(now - MILLIS_PER_DAY, now), DaysRemaining::Completed);
        assert_eq!(days_remaining(now - 3 * MILLIS_PER_DAY, now), DaysRemaining::Completed);
    }

    #[test]
    fn extreme_dates_do_not_overflow() {
        assert_eq!(progress_percent(i64::MIN, i64::MAX, 0), 50.0);
        assert_eq!(progress_percent(i64::MIN, i64::MAX, i64::MIN), 0.0);
        assert_eq!(progress_percent(i64::MIN, i64::MAX, i64::MAX), 100.0);
        assert_eq!(progress_percent(i64::MIN, i64::MIN, i64::MAX), 100.0);

        assert_eq!(days_remaining(i64::MIN, i64::MAX), DaysRemaining::Completed);
        let DaysRemaining::Days(days) = days_remaining(i64::MAX, i64::MIN) else {
            panic!("expected a day count");
        };
        assert_eq!(days, (u64::MAX / MILLIS_PER_DAY as u64) as i64 + 1);
    }

    #[test]
    fn labels_match_dashboard_copy() {
        assert_eq!(DaysRemaining::Completed.to_string(), "Completed");
        assert_eq!(DaysRemaining::DueToday.to_string(), "Due today");
        assert_eq!(DaysRemaining::Days(4).to_string(), "4 days");
    }
}
