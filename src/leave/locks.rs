use chrono::{Duration, NaiveDate};
use sqlx::MySqlPool;

use crate::model::leave_application::{LeaveApplication, LeaveStatus};
use crate::model::timesheet::{week_start_of, DAYS_PER_WEEK};

/// Monday through Friday; weekend cells are never reported locked.
const BUSINESS_DAYS: usize = 5;

/// Lock mask for one week derived straight from approved applications,
/// independent of whatever the timesheet documents currently say.
pub fn locked_days_for_week(
    week_start: NaiveDate,
    applications: &[LeaveApplication],
) -> [bool; DAYS_PER_WEEK] {
    let mut locked = [false; DAYS_PER_WEEK];
    for (day, slot) in locked.iter_mut().enumerate().take(BUSINESS_DAYS) {
        let date = week_start + Duration::days(day as i64);
        *slot = applications
            .iter()
            .any(|a| a.status == LeaveStatus::Approved && a.covers(date));
    }
    locked
}

/// Lock mask for the week containing `week_start` (normalized to its
/// Monday), read fresh from the application store.
pub async fn locked_days(
    pool: &MySqlPool,
    employee_id: u64,
    week_start: NaiveDate,
) -> Result<[bool; DAYS_PER_WEEK], sqlx::Error> {
    let week_start = week_start_of(week_start);
    let week_end = week_start + Duration::days(6);

    let applications = sqlx::query_as::<_, LeaveApplication>(
        r#"
        SELECT *
        FROM leave_applications
        WHERE employee_id = ?
        AND status = 'approved'
        AND start_date <= ?
        AND end_date >= ?
        "#,
    )
    .bind(employee_id)
    .bind(week_end)
    .bind(week_start)
    .fetch_all(pool)
    .await?;

    Ok(locked_days_for_week(week_start, &applications))
}
