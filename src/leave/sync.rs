use std::collections::BTreeMap;

use chrono::NaiveDate;
use derive_more::Display;
use sqlx::MySqlPool;
use tracing::warn;

use crate::model::leave_application::{DayType, LeaveApplication, LeaveStatus};
use crate::model::timesheet::{day_index, week_start_of, Timesheet};

/// Reload-and-reapply attempts before giving up on a contended week.
const COMMIT_ATTEMPTS: u32 = 3;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LeaveTransition {
    /// The application became approved: write hours and locks.
    Approved,
    /// The application moved away from approved: undo them.
    Reverted,
}

impl LeaveTransition {
    pub fn from_status(status: LeaveStatus) -> Self {
        match status {
            LeaveStatus::Approved => LeaveTransition::Approved,
            LeaveStatus::Pending | LeaveStatus::Rejected => LeaveTransition::Reverted,
        }
    }
}

#[derive(Debug, Display)]
pub enum SyncError {
    #[display(fmt = "database error: {}", _0)]
    Db(sqlx::Error),
    #[display(fmt = "timesheet write conflict persisted across retries")]
    Contention,
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Db(e) => Some(e),
            SyncError::Contention => None,
        }
    }
}

impl From<sqlx::Error> for SyncError {
    fn from(e: sqlx::Error) -> Self {
        SyncError::Db(e)
    }
}

/// One week's share of a leave span: the day indexes (0 = Monday) the span
/// covers within that week.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekMutation {
    pub week_start: NaiveDate,
    pub days: Vec<usize>,
}

/// Split the span into per-week mutations, one per distinct week, in week
/// order. Each week is later fetched at most once and written exactly once.
pub fn plan_weeks(application: &LeaveApplication) -> Vec<WeekMutation> {
    let mut weeks: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
    for day in application
        .start_date
        .iter_days()
        .take_while(|d| *d <= application.end_date)
    {
        weeks
            .entry(week_start_of(day))
            .or_default()
            .push(day_index(day));
    }
    weeks
        .into_iter()
        .map(|(week_start, days)| WeekMutation { week_start, days })
        .collect()
}

fn apply_mutation(
    timesheet: &mut Timesheet,
    mutation: &WeekMutation,
    transition: LeaveTransition,
    day_type: DayType,
) {
    for &day in &mutation.days {
        match transition {
            LeaveTransition::Approved => timesheet.apply_leave_day(day, day_type),
            LeaveTransition::Reverted => timesheet.revert_leave_day(day),
        }
    }
}

/// Propagate a status transition into every timesheet week the span touches.
///
/// Earlier weeks stay committed if a later week fails; re-issuing the same
/// transition converges because the per-day mutations recompute absolute
/// state instead of toggling it.
pub async fn sync_timesheets(
    pool: &MySqlPool,
    application: &LeaveApplication,
    transition: LeaveTransition,
) -> Result<(), SyncError> {
    for mutation in plan_weeks(application) {
        let mut timesheet =
            match load_week(pool, application.employee_id, mutation.week_start).await? {
                Some(sheet) => sheet,
                None if transition == LeaveTransition::Approved => {
                    Timesheet::new_week(application.employee_id, mutation.week_start)
                }
                // Nothing was ever written for this week, nothing to revert.
                None => continue,
            };
        apply_mutation(&mut timesheet, &mutation, transition, application.day_type);
        commit_week(pool, timesheet, &mutation, transition, application.day_type).await?;
    }
    Ok(())
}

async fn load_week(
    pool: &MySqlPool,
    employee_id: u64,
    week_start: NaiveDate,
) -> Result<Option<Timesheet>, sqlx::Error> {
    sqlx::query_as::<_, Timesheet>(
        r#"
        SELECT *
        FROM timesheets
        WHERE employee_id = ?
        AND week_start = ?
        "#,
    )
    .bind(employee_id)
    .bind(week_start)
    .fetch_optional(pool)
    .await
}

async fn insert_week(pool: &MySqlPool, timesheet: &Timesheet) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO timesheets
        (employee_id, week_start, week_end, entries, version)
        VALUES (?, ?, ?, ?, 1)
        "#,
    )
    .bind(timesheet.employee_id)
    .bind(timesheet.week_start)
    .bind(timesheet.week_end)
    .bind(&timesheet.entries)
    .execute(pool)
    .await
    .map(|_| ())
}

fn is_duplicate_key(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23000"),
        _ => false,
    }
}

/// Write one week, conditioned on the version read. A concurrent writer
/// bumps the version and the update matches zero rows; the week is then
/// reloaded, this span's days reapplied, and the write retried.
async fn commit_week(
    pool: &MySqlPool,
    mut timesheet: Timesheet,
    mutation: &WeekMutation,
    transition: LeaveTransition,
    day_type: DayType,
) -> Result<(), SyncError> {
    for _ in 0..COMMIT_ATTEMPTS {
        if timesheet.id == 0 {
            match insert_week(pool, &timesheet).await {
                Ok(()) => return Ok(()),
                // A concurrent writer created the row first: reload it below
                // and continue on the update path.
                Err(e) if is_duplicate_key(&e) => {}
                Err(e) => return Err(e.into()),
            }
        } else {
            let result = sqlx::query(
                r#"
                UPDATE timesheets
                SET entries = ?, version = version + 1
                WHERE id = ?
                AND version = ?
                "#,
            )
            .bind(&timesheet.entries)
            .bind(timesheet.id)
            .bind(timesheet.version)
            .execute(pool)
            .await
            .map_err(SyncError::Db)?;

            if result.rows_affected() > 0 {
                return Ok(());
            }
            warn!(
                employee_id = timesheet.employee_id,
                week_start = %timesheet.week_start,
                "timesheet version conflict, reloading"
            );
        }

        timesheet = match load_week(pool, timesheet.employee_id, mutation.week_start).await? {
            Some(sheet) => sheet,
            None if transition == LeaveTransition::Approved => {
                Timesheet::new_week(timesheet.employee_id, mutation.week_start)
            }
            // The contending writer deleted the week; a reversal has nothing
            // left to undo there.
            None => return Ok(()),
        };
        apply_mutation(&mut timesheet, mutation, transition, day_type);
    }
    Err(SyncError::Contention)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::leave_application::LeaveType;
    use crate::model::timesheet::{EntryType, TimesheetEntry, FULL_DAY_HOURS};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn application(start: NaiveDate, end: NaiveDate, day_type: DayType) -> LeaveApplication {
        LeaveApplication {
            id: 9,
            employee_id: 1,
            leave_type: LeaveType::Casual,
            start_date: start,
            end_date: end,
            day_type,
            total_days: (end - start).num_days() as f64 + 1.0,
            status: LeaveStatus::Approved,
            reason: None,
            created_at: None,
        }
    }

    #[test]
    fn single_week_span_plans_one_mutation() {
        // Monday and Tuesday of the same week.
        let app = application(date(2025, 3, 10), date(2025, 3, 11), DayType::FullDay);
        let plan = plan_weeks(&app);
        assert_eq!(
            plan,
            vec![WeekMutation {
                week_start: date(2025, 3, 10),
                days: vec![0, 1],
            }]
        );
    }

    #[test]
    fn cross_week_span_groups_days_by_week() {
        // Friday through the following Tuesday.
        let app = application(date(2025, 3, 14), date(2025, 3, 18), DayType::FullDay);
        let plan = plan_weeks(&app);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].week_start, date(2025, 3, 10));
        assert_eq!(plan[0].days, vec![4, 5, 6]);
        assert_eq!(plan[1].week_start, date(2025, 3, 17));
        assert_eq!(plan[1].days, vec![0, 1]);
    }

    #[test]
    fn transition_follows_the_new_status() {
        assert_eq!(
            LeaveTransition::from_status(LeaveStatus::Approved),
            LeaveTransition::Approved
        );
        assert_eq!(
            LeaveTransition::from_status(LeaveStatus::Rejected),
            LeaveTransition::Reverted
        );
        assert_eq!(
            LeaveTransition::from_status(LeaveStatus::Pending),
            LeaveTransition::Reverted
        );
    }

    #[test]
    fn approval_then_reversal_restores_the_week() {
        let app = application(date(2025, 3, 10), date(2025, 3, 11), DayType::FullDay);
        let plan = plan_weeks(&app);

        let mut sheet = Timesheet::new_week(1, date(2025, 3, 10));
        sheet.entries.push(TimesheetEntry {
            project: "Atlas".to_string(),
            task: "Backend".to_string(),
            entry_type: EntryType::Project,
            hours: [8.0; 7],
            locked_days: None,
        });

        apply_mutation(&mut sheet, &plan[0], LeaveTransition::Approved, app.day_type);
        assert_eq!(sheet.leave_entry().unwrap().hours[0], FULL_DAY_HOURS);
        assert_eq!(sheet.entries[0].locked_days.unwrap()[0], true);

        apply_mutation(&mut sheet, &plan[0], LeaveTransition::Reverted, app.day_type);
        assert!(sheet.leave_entry().is_none());
        assert_eq!(sheet.entries[0].locked_days.unwrap(), [false; 7]);
    }

    #[test]
    fn reapplying_an_approval_is_idempotent() {
        let app = application(date(2025, 3, 10), date(2025, 3, 12), DayType::HalfDay);
        let plan = plan_weeks(&app);

        let mut once = Timesheet::new_week(1, date(2025, 3, 10));
        apply_mutation(&mut once, &plan[0], LeaveTransition::Approved, app.day_type);

        let mut twice = Timesheet::new_week(1, date(2025, 3, 10));
        apply_mutation(&mut twice, &plan[0], LeaveTransition::Approved, app.day_type);
        apply_mutation(&mut twice, &plan[0], LeaveTransition::Approved, app.day_type);

        assert_eq!(once.entries.0, twice.entries.0);
    }
}
