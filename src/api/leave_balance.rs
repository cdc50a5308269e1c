use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde_json::json;
use sqlx::MySqlPool;

use crate::auth::auth::AuthUser;
use crate::leave::accrual::AccrualError;
use crate::leave::snapshot::{self, ManualOverride, SnapshotError};

fn snapshot_error_response(error: SnapshotError, employee_id: u64) -> actix_web::Result<HttpResponse> {
    match error {
        SnapshotError::EmployeeNotFound => Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        }))),
        // A missing joining date means the balance cannot be computed;
        // reporting zero here would be indistinguishable from a real zero.
        SnapshotError::Accrual(AccrualError::JoiningDateUnavailable) => {
            Ok(HttpResponse::UnprocessableEntity().json(json!({
                "message": "Leave balance unavailable: date of joining is not set"
            })))
        }
        SnapshotError::Db(e) => {
            tracing::error!(error = %e, employee_id, "Leave balance query failed");
            Err(ErrorInternalServerError("Internal Server Error"))
        }
    }
}

/// Balance for the authenticated employee
#[utoipa::path(
    get,
    path = "/api/v1/leave/balance",
    responses(
        (status = 200, description = "Current leave balance", body = crate::model::leave_balance::LeaveBalances),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile"),
        (status = 422, description = "Balance unavailable", body = Object, example = json!({
            "message": "Leave balance unavailable: date of joining is not set"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Balance"
)]
pub async fn get_my_balance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.own_employee_id()?;

    match snapshot::get(pool.get_ref(), employee_id).await {
        Ok(balances) => Ok(HttpResponse::Ok().json(balances)),
        Err(e) => snapshot_error_response(e, employee_id),
    }
}

/// Balance for a given employee (self or HR/Admin)
#[utoipa::path(
    get,
    path = "/api/v1/leave/balance/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Current leave balance", body = crate::model::leave_balance::LeaveBalances),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found"),
        (status = 422, description = "Balance unavailable")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Balance"
)]
pub async fn get_balance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();
    auth.require_self_or_hr(employee_id)?;

    match snapshot::get(pool.get_ref(), employee_id).await {
        Ok(balances) => Ok(HttpResponse::Ok().json(balances)),
        Err(e) => snapshot_error_response(e, employee_id),
    }
}

/// Persist a balance snapshot, optionally hand-tuning category balances
#[utoipa::path(
    put,
    path = "/api/v1/leave/balance/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    request_body(
        content = ManualOverride,
        description = "Optional per-category balance overrides; omitted categories keep the computed value",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Snapshot saved", body = crate::model::leave_balance::LeaveBalances),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found"),
        (status = 422, description = "Balance unavailable")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Balance"
)]
pub async fn save_balance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<ManualOverride>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let employee_id = path.into_inner();
    let manual = body.into_inner();
    let manual = if manual.is_empty() { None } else { Some(&manual) };

    match snapshot::save(pool.get_ref(), employee_id, manual).await {
        Ok(balances) => Ok(HttpResponse::Ok().json(balances)),
        Err(e) => snapshot_error_response(e, employee_id),
    }
}

/// Recompute every employee's snapshot (Admin)
#[utoipa::path(
    post,
    path = "/api/v1/leave/balance/sync-all",
    responses(
        (status = 200, description = "Batch sync report", body = crate::leave::snapshot::SyncReport),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Balance"
)]
pub async fn sync_all_balances(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let report = snapshot::sync_all(pool.get_ref()).await.map_err(|e| {
        tracing::error!(error = %e, "Balance sync-all failed");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(report))
}
