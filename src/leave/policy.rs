use chrono::{Datelike, NaiveDate};

/// First calendar year of the per-year reset rule for casual and sick leave.
pub const CALENDAR_RESET_EFFECTIVE_YEAR: i32 = 2026;

/// Accrual rule for the flat-rate categories (casual, sick), dispatched by
/// the as-of date so that recomputing a historical balance reproduces the
/// rule that was actually in effect then.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AccrualPolicy {
    /// Entitlement grows since joining and usage is counted all-time.
    CumulativeSinceJoining,
    /// Entitlement and usage reset each calendar year, crediting half a day
    /// per elapsed month including the current one.
    CalendarYearReset,
}

impl AccrualPolicy {
    pub fn in_effect(as_of: NaiveDate) -> Self {
        if as_of.year() >= CALENDAR_RESET_EFFECTIVE_YEAR {
            AccrualPolicy::CalendarYearReset
        } else {
            AccrualPolicy::CumulativeSinceJoining
        }
    }

    /// Allocated casual or sick days. `after_six` is the months of regular
    /// (non-trainee) service beyond the six-month threshold.
    pub fn allocation(&self, joined: NaiveDate, as_of: NaiveDate, after_six: i32) -> f64 {
        match self {
            AccrualPolicy::CumulativeSinceJoining => after_six as f64 * 0.5,
            AccrualPolicy::CalendarYearReset => {
                if joined.year() >= as_of.year() {
                    // Joined during the current year: the yearly reset has
                    // nothing to reset, fall back to the cumulative schedule.
                    after_six as f64 * 0.5
                } else if after_six > 0 {
                    0.5 * (as_of.month0() + 1) as f64
                } else {
                    0.0
                }
            }
        }
    }

    /// Whether an approved application starting on `start_date` counts
    /// toward casual/sick usage under this policy.
    pub fn counts_usage(&self, start_date: NaiveDate, as_of: NaiveDate) -> bool {
        match self {
            AccrualPolicy::CumulativeSinceJoining => true,
            AccrualPolicy::CalendarYearReset => start_date.year() == as_of.year(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn cutover_switches_on_new_years_day() {
        assert_eq!(
            AccrualPolicy::in_effect(date(2025, 12, 31)),
            AccrualPolicy::CumulativeSinceJoining
        );
        assert_eq!(
            AccrualPolicy::in_effect(date(2026, 1, 1)),
            AccrualPolicy::CalendarYearReset
        );
    }

    #[test]
    fn cumulative_pays_half_day_per_month_past_threshold() {
        let policy = AccrualPolicy::CumulativeSinceJoining;
        assert_eq!(policy.allocation(date(2024, 1, 10), date(2025, 7, 10), 12), 6.0);
        assert_eq!(policy.allocation(date(2024, 1, 10), date(2024, 5, 10), 0), 0.0);
    }

    #[test]
    fn yearly_reset_credits_the_current_month() {
        let policy = AccrualPolicy::CalendarYearReset;
        // July of the as-of year for an established employee.
        assert_eq!(policy.allocation(date(2024, 1, 10), date(2026, 7, 15), 24), 3.5);
        // January credits one month.
        assert_eq!(policy.allocation(date(2024, 1, 10), date(2026, 1, 15), 18), 0.5);
    }

    #[test]
    fn yearly_reset_holds_zero_inside_the_threshold() {
        let policy = AccrualPolicy::CalendarYearReset;
        assert_eq!(policy.allocation(date(2025, 10, 1), date(2026, 2, 1), 0), 0.0);
    }

    #[test]
    fn joining_mid_year_falls_back_to_cumulative() {
        let policy = AccrualPolicy::CalendarYearReset;
        assert_eq!(policy.allocation(date(2026, 1, 5), date(2026, 9, 5), 2), 1.0);
    }

    #[test]
    fn usage_window_depends_on_policy() {
        let as_of = date(2026, 6, 1);
        assert!(AccrualPolicy::CumulativeSinceJoining.counts_usage(date(2023, 2, 1), as_of));
        assert!(!AccrualPolicy::CalendarYearReset.counts_usage(date(2025, 12, 29), as_of));
        assert!(AccrualPolicy::CalendarYearReset.counts_usage(date(2026, 3, 2), as_of));
    }
}
