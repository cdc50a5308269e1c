use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use sqlx::types::Json;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::leave::locks;
use crate::model::timesheet::{
    DAYS_PER_WEEK, EntryType, Timesheet, TimesheetEntry, week_start_of,
};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct TimesheetQuery {
    /// Employee the week belongs to; defaults to the caller's own record
    #[param(example = 1000)]
    pub employee_id: Option<u64>,
    /// Any day of the wanted week; normalized to its Monday
    #[param(example = "2025-03-10", value_type = String)]
    pub week_start: NaiveDate,
}

#[derive(Serialize, ToSchema)]
pub struct TimesheetResponse {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "2025-03-10", value_type = String, format = "date")]
    pub week_start: NaiveDate,
    #[schema(example = "2025-03-16", value_type = String, format = "date")]
    pub week_end: NaiveDate,
    pub entries: Vec<TimesheetEntry>,
}

impl From<Timesheet> for TimesheetResponse {
    fn from(sheet: Timesheet) -> Self {
        Self {
            employee_id: sheet.employee_id,
            week_start: sheet.week_start,
            week_end: sheet.week_end,
            entries: sheet.entries.0,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct LockedDaysResponse {
    #[schema(example = "2025-03-10", value_type = String, format = "date")]
    pub week_start: NaiveDate,
    /// Monday..Sunday; true where edits are refused
    #[schema(value_type = Vec<bool>)]
    pub locked_days: [bool; DAYS_PER_WEEK],
}

/// A user-entered project line. The synthetic leave line is never accepted
/// here; it is owned by the leave workflow.
#[derive(Deserialize, ToSchema)]
pub struct ProjectEntryInput {
    #[schema(example = "Atlas Migration")]
    pub project: String,
    #[schema(example = "Backend")]
    pub task: String,
    #[schema(value_type = Vec<f64>)]
    pub hours: [f64; DAYS_PER_WEEK],
}

#[derive(Deserialize, ToSchema)]
pub struct SaveTimesheet {
    /// Employee the week belongs to; defaults to the caller's own record
    #[schema(example = 1000, nullable = true)]
    pub employee_id: Option<u64>,
    #[schema(example = "2025-03-10", format = "date", value_type = String)]
    pub week_start: NaiveDate,
    pub entries: Vec<ProjectEntryInput>,
}

async fn load_week(
    pool: &MySqlPool,
    employee_id: u64,
    week_start: NaiveDate,
) -> Result<Option<Timesheet>, sqlx::Error> {
    sqlx::query_as::<_, Timesheet>(
        "SELECT * FROM timesheets WHERE employee_id = ? AND week_start = ?",
    )
    .bind(employee_id)
    .bind(week_start)
    .fetch_optional(pool)
    .await
}

/// Weekly timesheet fetch
#[utoipa::path(
    get,
    path = "/api/v1/timesheets",
    params(TimesheetQuery),
    responses(
        (status = 200, description = "Timesheet for the week", body = TimesheetResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "No timesheet for that week", body = Object, example = json!({
            "message": "No timesheet for that week"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Timesheet"
)]
pub async fn get_timesheet(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<TimesheetQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = match query.employee_id {
        Some(id) => id,
        None => auth.own_employee_id()?,
    };
    auth.require_self_or_hr(employee_id)?;

    let week_start = week_start_of(query.week_start);

    let sheet = load_week(pool.get_ref(), employee_id, week_start)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, employee_id, "Failed to fetch timesheet");
            ErrorInternalServerError("Internal Server Error")
        })?;

    match sheet {
        Some(sheet) => Ok(HttpResponse::Ok().json(TimesheetResponse::from(sheet))),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "No timesheet for that week"
        }))),
    }
}

/// Locked days of a week
///
/// Derived from approved leave alone, so the UI can grey cells out without
/// loading the timesheet document.
#[utoipa::path(
    get,
    path = "/api/v1/timesheets/locked-days",
    params(TimesheetQuery),
    responses(
        (status = 200, description = "Per-day lock mask", body = LockedDaysResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Timesheet"
)]
pub async fn get_locked_days(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<TimesheetQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = match query.employee_id {
        Some(id) => id,
        None => auth.own_employee_id()?,
    };
    auth.require_self_or_hr(employee_id)?;

    let week_start = week_start_of(query.week_start);

    let locked_days = locks::locked_days(pool.get_ref(), employee_id, week_start)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, employee_id, "Failed to resolve locked days");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(LockedDaysResponse {
        week_start,
        locked_days,
    }))
}

/// Save a week's project entries
///
/// The synthetic leave line and the per-day locks written by the leave
/// workflow are carried over from the stored document; hours on a day
/// locked by full-day approved leave are refused.
#[utoipa::path(
    put,
    path = "/api/v1/timesheets",
    request_body = SaveTimesheet,
    responses(
        (status = 200, description = "Timesheet saved", body = Object, example = json!({
            "message": "Timesheet saved"
        })),
        (status = 400, description = "Locked day or invalid entries", body = Object, example = json!({
            "message": "Day 0 is locked by approved leave"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Concurrent modification", body = Object, example = json!({
            "message": "Timesheet was modified concurrently; retry"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Timesheet"
)]
pub async fn save_timesheet(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<SaveTimesheet>,
) -> actix_web::Result<impl Responder> {
    let employee_id = match payload.employee_id {
        Some(id) => id,
        None => auth.own_employee_id()?,
    };
    auth.require_self_or_hr(employee_id)?;

    let week_start = week_start_of(payload.week_start);

    let existing = load_week(pool.get_ref(), employee_id, week_start)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, employee_id, "Failed to fetch timesheet");
            ErrorInternalServerError("Internal Server Error")
        })?;

    let mut sheet = existing.unwrap_or_else(|| Timesheet::new_week(employee_id, week_start));
    let lock_mask = sheet.full_day_leave_mask();

    for entry in &payload.entries {
        for (day, hours) in entry.hours.iter().enumerate() {
            if lock_mask[day] && *hours > 0.0 {
                return Ok(HttpResponse::BadRequest().json(json!({
                    "message": format!("Day {} is locked by approved leave", day)
                })));
            }
        }
    }

    // Rebuild the week: submitted project lines, locks reapplied from the
    // leave line, leave line preserved untouched.
    let leave_line = sheet.leave_entry().cloned();
    let mut entries: Vec<TimesheetEntry> = payload
        .entries
        .iter()
        .map(|entry| TimesheetEntry {
            project: entry.project.clone(),
            task: entry.task.clone(),
            entry_type: EntryType::Project,
            hours: entry.hours,
            locked_days: Some(lock_mask),
        })
        .collect();
    if let Some(leave_line) = leave_line {
        entries.push(leave_line);
    }

    if sheet.id == 0 {
        sheet.entries = Json(entries);
        sqlx::query(
            r#"
            INSERT INTO timesheets
            (employee_id, week_start, week_end, entries, version)
            VALUES (?, ?, ?, ?, 1)
            "#,
        )
        .bind(sheet.employee_id)
        .bind(sheet.week_start)
        .bind(sheet.week_end)
        .bind(&sheet.entries)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, employee_id, "Failed to create timesheet");
            ErrorInternalServerError("Internal Server Error")
        })?;
    } else {
        let result = sqlx::query(
            r#"
            UPDATE timesheets
            SET entries = ?, version = version + 1
            WHERE id = ?
            AND version = ?
            "#,
        )
        .bind(Json(&entries))
        .bind(sheet.id)
        .bind(sheet.version)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, employee_id, "Failed to save timesheet");
            ErrorInternalServerError("Internal Server Error")
        })?;

        if result.rows_affected() == 0 {
            return Ok(HttpResponse::Conflict().json(json!({
                "message": "Timesheet was modified concurrently; retry"
            })));
        }
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Timesheet saved"
    })))
}
