use chrono::{Datelike, Months, NaiveDate};
use derive_more::Display;

use crate::leave::policy::AccrualPolicy;
use crate::model::employee::Employee;
use crate::model::leave_application::{LeaveApplication, LeaveStatus, LeaveType};
use crate::model::leave_balance::{CategoryBalance, LeaveBalances};

/// Trainee service never reduces regular service by more than a year.
pub const TRAINEE_CAP_MONTHS: i32 = 12;

/// Casual/sick accrual starts after this much regular service.
const THRESHOLD_MONTHS: i32 = 6;

/// Privilege leave earned per month once past the six-month anchor.
const PRIVILEGE_MONTHLY_RATE: f64 = 1.25;

#[derive(Debug, Display, PartialEq, Eq)]
pub enum AccrualError {
    /// The record cannot be computed, as opposed to legitimately zero.
    #[display(fmt = "date of joining is not set")]
    JoiningDateUnavailable,
}

impl std::error::Error for AccrualError {}

/// Whole calendar months between two dates, decremented by one when the
/// day-of-month has not yet recurred. Never negative.
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    if to < from {
        return 0;
    }
    let mut months =
        (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    if to.day() < from.day() {
        months -= 1;
    }
    months.max(0)
}

fn is_trainee_position(position: &str) -> bool {
    position.to_lowercase().contains("trainee")
}

/// Months spent as a trainee, capped at [`TRAINEE_CAP_MONTHS`]. The current
/// position wins; otherwise the first previous organization with a trainee
/// position counts, an open end date running up to the as-of day.
fn trainee_months(employee: &Employee, months_of_service: i32, as_of: NaiveDate) -> i32 {
    if is_trainee_position(&employee.position) {
        return months_of_service.min(TRAINEE_CAP_MONTHS);
    }
    employee
        .previous_organizations
        .iter()
        .find(|org| is_trainee_position(&org.position))
        .map(|org| {
            months_between(org.start_date, org.end_date.unwrap_or(as_of)).min(TRAINEE_CAP_MONTHS)
        })
        .unwrap_or(0)
}

fn used_days<F>(applications: &[LeaveApplication], leave_type: LeaveType, window: F) -> f64
where
    F: Fn(&LeaveApplication) -> bool,
{
    applications
        .iter()
        .filter(|a| a.status == LeaveStatus::Approved && a.leave_type == leave_type && window(a))
        .map(|a| a.total_days)
        .sum()
}

/// Per-category entitlement for an employee as of the given day.
///
/// Casual and sick leave follow the flat half-day-per-month schedule under
/// the policy in effect at `as_of`. Privilege leave runs on its own
/// two-regime schedule anchored six months after joining: before the anchor
/// one unit accrues per month of service and only usage inside the as-of
/// calendar month counts (monthly expiry); from the anchor on, 1.25 units
/// accrue per month and every application dated at or after the anchor
/// counts.
pub fn compute_balances(
    employee: &Employee,
    applications: &[LeaveApplication],
    as_of: NaiveDate,
) -> Result<LeaveBalances, AccrualError> {
    let joined = employee
        .date_of_joining
        .ok_or(AccrualError::JoiningDateUnavailable)?;

    let months_of_service = months_between(joined, as_of);
    let trainee = trainee_months(employee, months_of_service, as_of);
    let regular_months = (months_of_service - trainee).max(0);
    let after_six = (regular_months - THRESHOLD_MONTHS).max(0);

    let policy = AccrualPolicy::in_effect(as_of);
    let flat_allocated = policy.allocation(joined, as_of, after_six);
    let casual_used = used_days(applications, LeaveType::Casual, |a| {
        policy.counts_usage(a.start_date, as_of)
    });
    let sick_used = used_days(applications, LeaveType::Sick, |a| {
        policy.counts_usage(a.start_date, as_of)
    });

    let anchor = joined + Months::new(THRESHOLD_MONTHS as u32);
    let (privilege_allocated, privilege_used) = if as_of < anchor {
        let used = used_days(applications, LeaveType::Privilege, |a| {
            a.start_date.year() == as_of.year() && a.start_date.month() == as_of.month()
        });
        (months_of_service as f64, used)
    } else {
        let used = used_days(applications, LeaveType::Privilege, |a| a.start_date >= anchor);
        (
            PRIVILEGE_MONTHLY_RATE * months_between(anchor, as_of) as f64,
            used,
        )
    };

    Ok(LeaveBalances::new(
        CategoryBalance::new(flat_allocated, casual_used),
        CategoryBalance::new(flat_allocated, sick_used),
        CategoryBalance::new(privilege_allocated, privilege_used),
        months_of_service,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::employee::PreviousOrganization;
    use crate::model::leave_application::DayType;
    use sqlx::types::Json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn employee(position: &str, joined: Option<NaiveDate>) -> Employee {
        Employee {
            id: 1,
            employee_code: "EMP-001".to_string(),
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            email: "john@company.com".to_string(),
            phone: None,
            position: position.to_string(),
            date_of_joining: joined,
            previous_organizations: Json(Vec::new()),
            status: "active".to_string(),
        }
    }

    fn approved(
        leave_type: LeaveType,
        start: NaiveDate,
        end: NaiveDate,
        total_days: f64,
    ) -> LeaveApplication {
        LeaveApplication {
            id: 0,
            employee_id: 1,
            leave_type,
            start_date: start,
            end_date: end,
            day_type: DayType::FullDay,
            total_days,
            status: LeaveStatus::Approved,
            reason: None,
            created_at: None,
        }
    }

    #[test]
    fn months_between_respects_day_of_month() {
        assert_eq!(months_between(date(2024, 1, 10), date(2025, 7, 10)), 18);
        assert_eq!(months_between(date(2024, 1, 10), date(2025, 7, 9)), 17);
        assert_eq!(months_between(date(2024, 1, 10), date(2024, 1, 5)), 0);
        assert_eq!(months_between(date(2024, 1, 31), date(2024, 3, 1)), 1);
    }

    #[test]
    fn eighteen_months_of_service_earns_six_each() {
        // Joined 2024-01-10, not a trainee, as of 2025-07-10: 18 months of
        // service, 12 past the threshold.
        let emp = employee("Engineer", Some(date(2024, 1, 10)));
        let balances = compute_balances(&emp, &[], date(2025, 7, 10)).unwrap();
        assert_eq!(balances.months_of_service, 18);
        assert_eq!(balances.casual.allocated, 6.0);
        assert_eq!(balances.sick.allocated, 6.0);
    }

    #[test]
    fn missing_joining_date_is_an_error_not_zero() {
        let emp = employee("Engineer", None);
        assert_eq!(
            compute_balances(&emp, &[], date(2025, 7, 10)).unwrap_err(),
            AccrualError::JoiningDateUnavailable
        );
    }

    #[test]
    fn trainee_position_delays_the_flat_categories() {
        // 18 months of service entirely as trainee up to the 12-month cap:
        // 6 regular months, none past the threshold.
        let emp = employee("Trainee Engineer", Some(date(2024, 1, 10)));
        let balances = compute_balances(&emp, &[], date(2025, 7, 10)).unwrap();
        assert_eq!(balances.casual.allocated, 0.0);
        assert_eq!(balances.sick.allocated, 0.0);
    }

    #[test]
    fn previous_organization_trainee_period_is_deducted() {
        let mut emp = employee("Engineer", Some(date(2024, 1, 10)));
        emp.previous_organizations = Json(vec![PreviousOrganization {
            organization: "Acme".to_string(),
            position: "Graduate Trainee".to_string(),
            start_date: date(2023, 1, 10),
            end_date: Some(date(2023, 5, 10)),
        }]);
        // 18 months of service minus 4 trainee months: 14 regular, 8 past
        // the threshold.
        let balances = compute_balances(&emp, &[], date(2025, 7, 10)).unwrap();
        assert_eq!(balances.casual.allocated, 4.0);
    }

    #[test]
    fn pre_cutover_usage_counts_all_time() {
        let emp = employee("Engineer", Some(date(2023, 1, 10)));
        let apps = vec![
            approved(LeaveType::Casual, date(2023, 9, 4), date(2023, 9, 5), 2.0),
            approved(LeaveType::Casual, date(2025, 2, 3), date(2025, 2, 3), 1.0),
        ];
        let balances = compute_balances(&emp, &apps, date(2025, 7, 10)).unwrap();
        assert_eq!(balances.casual.used, 3.0);
    }

    #[test]
    fn post_cutover_usage_is_scoped_to_the_year() {
        let emp = employee("Engineer", Some(date(2023, 1, 10)));
        let apps = vec![
            approved(LeaveType::Sick, date(2025, 11, 3), date(2025, 11, 4), 2.0),
            approved(LeaveType::Sick, date(2026, 2, 2), date(2026, 2, 2), 1.0),
        ];
        let balances = compute_balances(&emp, &apps, date(2026, 7, 10)).unwrap();
        assert_eq!(balances.sick.used, 1.0);
        // July under the yearly reset credits seven half-days.
        assert_eq!(balances.sick.allocated, 3.5);
    }

    #[test]
    fn rejected_and_pending_applications_never_count() {
        let emp = employee("Engineer", Some(date(2023, 1, 10)));
        let mut app = approved(LeaveType::Casual, date(2025, 2, 3), date(2025, 2, 4), 2.0);
        app.status = LeaveStatus::Pending;
        let balances = compute_balances(&emp, &[app], date(2025, 7, 10)).unwrap();
        assert_eq!(balances.casual.used, 0.0);
    }

    #[test]
    fn privilege_before_anchor_accrues_one_per_month_and_expires_monthly() {
        // Joined 2025-03-01, as of 2025-07-15: anchor is 2025-09-01, still
        // in the pre-anchor regime with 4 months of service.
        let emp = employee("Engineer", Some(date(2025, 3, 1)));
        let apps = vec![
            // Same calendar month as the as-of day: counts.
            approved(LeaveType::Privilege, date(2025, 7, 7), date(2025, 7, 7), 1.0),
            // Earlier month: expired, does not count.
            approved(LeaveType::Privilege, date(2025, 5, 12), date(2025, 5, 12), 1.0),
        ];
        let balances = compute_balances(&emp, &apps, date(2025, 7, 15)).unwrap();
        assert_eq!(balances.privilege.allocated, 4.0);
        assert_eq!(balances.privilege.used, 1.0);
    }

    #[test]
    fn privilege_after_anchor_carries_forward_from_the_anchor() {
        // Joined 2024-01-10, anchor 2024-07-10, as of 2025-07-10: 12 months
        // past the anchor.
        let emp = employee("Engineer", Some(date(2024, 1, 10)));
        let apps = vec![
            // Before the anchor: outside the carried-forward window.
            approved(LeaveType::Privilege, date(2024, 6, 3), date(2024, 6, 3), 1.0),
            approved(LeaveType::Privilege, date(2024, 12, 2), date(2024, 12, 4), 3.0),
        ];
        let balances = compute_balances(&emp, &apps, date(2025, 7, 10)).unwrap();
        assert_eq!(balances.privilege.allocated, 15.0);
        assert_eq!(balances.privilege.used, 3.0);
        assert_eq!(balances.privilege.balance, 12.0);
    }

    #[test]
    fn allocation_never_decreases_with_service() {
        // Holding usage fixed, each additional month of service keeps the
        // casual allocation non-decreasing.
        let emp = employee("Engineer", Some(date(2024, 1, 10)));
        let mut last = 0.0;
        for month in 0..24 {
            let as_of = date(2024, 1, 10) + Months::new(month);
            let balances = compute_balances(&emp, &[], as_of).unwrap();
            assert!(
                balances.casual.allocated >= last,
                "allocation dropped at month {}",
                month
            );
            last = balances.casual.allocated;
        }
    }

    #[test]
    fn balance_identity_holds_per_category() {
        let emp = employee("Engineer", Some(date(2023, 1, 10)));
        let apps = vec![
            approved(LeaveType::Casual, date(2025, 2, 3), date(2025, 2, 4), 2.0),
            approved(LeaveType::Privilege, date(2025, 3, 3), date(2025, 3, 5), 3.0),
        ];
        let b = compute_balances(&emp, &apps, date(2025, 7, 10)).unwrap();
        for cat in [&b.casual, &b.sick, &b.privilege] {
            assert_eq!(cat.balance, cat.allocated - cat.used);
        }
        assert_eq!(
            b.total_balance,
            b.casual.balance + b.sick.balance + b.privilege.balance
        );
    }
}
