use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::leave::sync::{self, LeaveTransition};
use crate::model::leave_application::{
    DayType, LeaveApplication, LeaveStatus, LeaveType, charged_days,
};

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    /// Employee to file for; defaults to the caller's own record. Filing
    /// for someone else requires HR/Admin.
    #[schema(example = 1000, nullable = true)]
    pub employee_id: Option<u64>,
    #[schema(example = "casual")]
    pub leave_type: LeaveType,
    #[schema(example = "2025-03-10", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2025-03-11", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "full_day")]
    pub day_type: DayType,
    #[schema(example = "Family function", nullable = true)]
    pub reason: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    /// Filter by employee ID
    #[param(example = 1000)]
    pub employee_id: Option<u64>,
    /// Filter by leave status
    #[param(example = "pending")]
    pub status: Option<LeaveStatus>,
    /// Pagination page number (start with 1)
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Pagination per page number
    #[param(example = 10)]
    pub per_page: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveApplication>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    Str(String),
}

/* =========================
Create leave application
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/leave",
    request_body(
        content = CreateLeave,
        description = "Leave application payload",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Leave application submitted successfully",
         body = Object,
         example = json!({
            "message": "Leave application submitted",
            "status": "pending",
            "total_days": 2.0
         })
        ),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    let employee_id = match payload.employee_id {
        Some(id) => {
            auth.require_self_or_hr(id)?;
            id
        }
        None => auth.own_employee_id()?,
    };

    if payload.start_date > payload.end_date {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "start_date cannot be after end_date"
        })));
    }

    let total_days = charged_days(payload.start_date, payload.end_date, payload.day_type);

    sqlx::query(
        r#"
        INSERT INTO leave_applications
            (employee_id, leave_type, start_date, end_date, day_type, total_days, status, reason)
        VALUES (?, ?, ?, ?, ?, ?, 'pending', ?)
        "#,
    )
    .bind(employee_id)
    .bind(payload.leave_type)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.day_type)
    .bind(total_days)
    .bind(&payload.reason)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, employee_id, "Failed to create leave application");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Leave application submitted",
        "status": "pending",
        "total_days": total_days
    })))
}

async fn fetch_application(
    pool: &MySqlPool,
    leave_id: u64,
) -> Result<Option<LeaveApplication>, sqlx::Error> {
    sqlx::query_as::<_, LeaveApplication>("SELECT * FROM leave_applications WHERE id = ?")
        .bind(leave_id)
        .fetch_optional(pool)
        .await
}

/// Set the status, then push the transition into the affected timesheet
/// weeks. The status write commits first; a failed push is reported so the
/// caller can re-issue the same transition, which converges.
async fn transition_leave(
    pool: &MySqlPool,
    leave_id: u64,
    status: LeaveStatus,
) -> actix_web::Result<HttpResponse> {
    let application = fetch_application(pool, leave_id).await.map_err(|e| {
        tracing::error!(error = %e, leave_id, "Failed to fetch leave application");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let mut application = match application {
        Some(app) => app,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "Leave application not found"
            })));
        }
    };

    sqlx::query("UPDATE leave_applications SET status = ? WHERE id = ?")
        .bind(status)
        .bind(leave_id)
        .execute(pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, leave_id, "Leave status update failed");
            ErrorInternalServerError("Internal Server Error")
        })?;

    application.status = status;
    let transition = LeaveTransition::from_status(status);

    if let Err(e) = sync::sync_timesheets(pool, &application, transition).await {
        tracing::error!(error = %e, leave_id, "Timesheet synchronization failed");
        return Ok(HttpResponse::InternalServerError().json(json!({
            "message": "Leave status updated but timesheet sync is incomplete; \
                        re-issue the same status change to finish it"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Leave {}", status)
    })))
}

/* =========================
Approve leave (HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave application to approve")
    ),
    responses(
        (status = 200, description = "Leave approved successfully", body = Object, example = json!({
            "message": "Leave approved"
        })),
        (status = 404, description = "Leave application not found", body = Object, example = json!({
            "message": "Leave application not found"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    transition_leave(pool.get_ref(), path.into_inner(), LeaveStatus::Approved).await
}

/* =========================
Reject leave (HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave application to reject")
    ),
    responses(
        (status = 200, description = "Leave rejected successfully", body = Object, example = json!({
            "message": "Leave rejected"
        })),
        (status = 404, description = "Leave application not found", body = Object, example = json!({
            "message": "Leave application not found"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    transition_leave(pool.get_ref(), path.into_inner(), LeaveStatus::Rejected).await
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/v1/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave application to fetch")
    ),
    responses(
        (status = 200, description = "Leave application found", body = LeaveApplication),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave application not found", body = Object, example = json!({
            "message": "Leave application not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave_id = path.into_inner();

    let application = fetch_application(pool.get_ref(), leave_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, leave_id, "Failed to fetch leave application");
            ErrorInternalServerError("Internal Server Error")
        })?;

    match application {
        Some(app) => {
            auth.require_self_or_hr(app.employee_id)?;
            Ok(HttpResponse::Ok().json(app))
        }
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Leave application not found"
        }))),
    }
}

/// for getting leave applications endpoint
#[utoipa::path(
    get,
    path = "/api/v1/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    // -------------------------
    // Pagination
    // -------------------------
    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    // -------------------------
    // WHERE clause
    // -------------------------
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(emp_id) = query.employee_id {
        where_sql.push_str(" AND employee_id = ?");
        args.push(FilterValue::U64(emp_id));
    }

    if let Some(status) = query.status {
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status.to_string()));
    }

    // -------------------------
    // COUNT query
    // -------------------------
    let count_sql = format!("SELECT COUNT(*) FROM leave_applications{}", where_sql);

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(s),
        };
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to count leave applications");
        ErrorInternalServerError("Internal Server Error")
    })?;

    // -------------------------
    // DATA query
    // -------------------------
    let data_sql = format!(
        r#"
        SELECT *
        FROM leave_applications
        {}
        ORDER BY created_at DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, LeaveApplication>(&data_sql);
    for arg in &args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(*v),
            FilterValue::Str(s) => data_q.bind(s),
        };
    }

    let applications = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch leave list");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data: applications,
        page: page as u32,
        per_page: per_page as u32,
        total,
    }))
}
