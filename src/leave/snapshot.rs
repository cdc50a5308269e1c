use chrono::{Datelike, NaiveDate, Utc};
use derive_more::Display;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

use crate::leave::accrual::{self, AccrualError};
use crate::model::employee::Employee;
use crate::model::leave_application::LeaveApplication;
use crate::model::leave_balance::{CategoryBalance, LeaveBalanceRow, LeaveBalances};
use crate::utils::employee_cache;

#[derive(Debug, Display)]
pub enum SnapshotError {
    #[display(fmt = "employee not found")]
    EmployeeNotFound,
    #[display(fmt = "{}", _0)]
    Accrual(AccrualError),
    #[display(fmt = "database error: {}", _0)]
    Db(sqlx::Error),
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnapshotError::EmployeeNotFound => None,
            SnapshotError::Accrual(e) => Some(e),
            SnapshotError::Db(e) => Some(e),
        }
    }
}

impl From<AccrualError> for SnapshotError {
    fn from(e: AccrualError) -> Self {
        SnapshotError::Accrual(e)
    }
}

impl From<sqlx::Error> for SnapshotError {
    fn from(e: sqlx::Error) -> Self {
        SnapshotError::Db(e)
    }
}

/// Hand-tuned balances supplied by an admin. Only the categories present
/// are overridden; true usage is always preserved underneath.
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct ManualOverride {
    #[schema(example = 4.5, nullable = true)]
    pub casual: Option<f64>,

    #[schema(example = 6.0, nullable = true)]
    pub sick: Option<f64>,

    #[schema(example = 10.0, nullable = true)]
    pub privilege: Option<f64>,
}

impl ManualOverride {
    pub fn is_empty(&self) -> bool {
        self.casual.is_none() && self.sick.is_none() && self.privilege.is_none()
    }
}

/// Re-anchor the allocation so the admin's balance holds against the
/// system-computed usage: `allocated = manual_balance + used`.
pub fn apply_manual_override(system: &LeaveBalances, manual: &ManualOverride) -> LeaveBalances {
    fn overridden(category: &CategoryBalance, manual: Option<f64>) -> CategoryBalance {
        match manual {
            Some(balance) => CategoryBalance::new(balance + category.used, category.used),
            None => category.clone(),
        }
    }
    LeaveBalances::new(
        overridden(&system.casual, manual.casual),
        overridden(&system.sick, manual.sick),
        overridden(&system.privilege, manual.privilege),
        system.months_of_service,
    )
}

async fn fetch_snapshot(
    pool: &MySqlPool,
    employee_id: u64,
) -> Result<Option<LeaveBalanceRow>, sqlx::Error> {
    sqlx::query_as::<_, LeaveBalanceRow>(
        r#"
        SELECT *
        FROM leave_balances
        WHERE employee_id = ?
        "#,
    )
    .bind(employee_id)
    .fetch_optional(pool)
    .await
}

async fn fetch_approved(
    pool: &MySqlPool,
    employee_id: u64,
) -> Result<Vec<LeaveApplication>, sqlx::Error> {
    sqlx::query_as::<_, LeaveApplication>(
        r#"
        SELECT *
        FROM leave_applications
        WHERE employee_id = ?
        AND status = 'approved'
        "#,
    )
    .bind(employee_id)
    .fetch_all(pool)
    .await
}

async fn compute_for(
    pool: &MySqlPool,
    employee: &Employee,
    as_of: NaiveDate,
) -> Result<LeaveBalances, SnapshotError> {
    let approved = fetch_approved(pool, employee.id).await?;
    Ok(accrual::compute_balances(employee, &approved, as_of)?)
}

/// Current balance for an employee. A snapshot stamped with the current
/// year is returned verbatim so manual overrides survive reads; anything
/// older falls through to a fresh computation, which `get` does not
/// persist.
pub async fn get(pool: &MySqlPool, employee_id: u64) -> Result<LeaveBalances, SnapshotError> {
    let as_of = Utc::now().date_naive();

    if let Some(row) = fetch_snapshot(pool, employee_id).await? {
        if row.year == as_of.year() {
            return Ok(row.into_balances());
        }
    }

    let employee = employee_cache::get_or_load(pool, employee_id)
        .await?
        .ok_or(SnapshotError::EmployeeNotFound)?;
    compute_for(pool, &employee, as_of).await
}

async fn upsert_snapshot(
    pool: &MySqlPool,
    employee_id: u64,
    year: i32,
    balances: &LeaveBalances,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO leave_balances
        (employee_id, year,
         casual_allocated, casual_used,
         sick_allocated, sick_used,
         privilege_allocated, privilege_used,
         months_of_service, last_updated)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, NOW())
        ON DUPLICATE KEY UPDATE
            year = VALUES(year),
            casual_allocated = VALUES(casual_allocated),
            casual_used = VALUES(casual_used),
            sick_allocated = VALUES(sick_allocated),
            sick_used = VALUES(sick_used),
            privilege_allocated = VALUES(privilege_allocated),
            privilege_used = VALUES(privilege_used),
            months_of_service = VALUES(months_of_service),
            last_updated = NOW()
        "#,
    )
    .bind(employee_id)
    .bind(year)
    .bind(balances.casual.allocated)
    .bind(balances.casual.used)
    .bind(balances.sick.allocated)
    .bind(balances.sick.used)
    .bind(balances.privilege.allocated)
    .bind(balances.privilege.used)
    .bind(balances.months_of_service)
    .execute(pool)
    .await
    .map(|_| ())
}

/// Recompute and persist one employee's snapshot, stamped with the current
/// year. With a manual override the supplied balances are re-anchored on
/// top of the freshly computed usage.
pub async fn save(
    pool: &MySqlPool,
    employee_id: u64,
    manual: Option<&ManualOverride>,
) -> Result<LeaveBalances, SnapshotError> {
    let as_of = Utc::now().date_naive();

    let employee = sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = ?")
        .bind(employee_id)
        .fetch_optional(pool)
        .await?
        .ok_or(SnapshotError::EmployeeNotFound)?;

    let system = compute_for(pool, &employee, as_of).await?;
    let balances = match manual {
        Some(manual) if !manual.is_empty() => apply_manual_override(&system, manual),
        _ => system,
    };

    upsert_snapshot(pool, employee_id, as_of.year(), &balances).await?;
    employee_cache::put(employee).await;
    Ok(balances)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SyncFailure {
    #[schema(example = 42)]
    pub employee_id: u64,

    #[schema(example = "date of joining is not set")]
    pub error: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SyncReport {
    #[schema(example = 120)]
    pub synced: u32,

    pub failed: Vec<SyncFailure>,
}

/// Recompute and upsert every employee's snapshot. Overwrites manual
/// overrides whose values diverge from the computed figures. One
/// employee's failure is recorded and the batch moves on; writes are
/// independent per row.
pub async fn sync_all(pool: &MySqlPool) -> Result<SyncReport, sqlx::Error> {
    // Drain the id stream before the per-employee writes start so the
    // streaming connection goes back to the pool first.
    let mut employee_ids = Vec::new();
    {
        let mut stream = sqlx::query_scalar::<_, u64>("SELECT id FROM employees").fetch(pool);
        while let Some(row) = stream.next().await {
            employee_ids.push(row?);
        }
    }

    let mut report = SyncReport {
        synced: 0,
        failed: Vec::new(),
    };

    for employee_id in employee_ids {
        match save(pool, employee_id, None).await {
            Ok(_) => report.synced += 1,
            Err(e) => {
                error!(employee_id, error = %e, "Balance snapshot sync failed");
                report.failed.push(SyncFailure {
                    employee_id,
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balances() -> LeaveBalances {
        LeaveBalances::new(
            CategoryBalance::new(6.0, 2.0),
            CategoryBalance::new(6.0, 0.5),
            CategoryBalance::new(12.5, 3.0),
            18,
        )
    }

    #[test]
    fn override_preserves_system_usage() {
        let manual = ManualOverride {
            casual: Some(10.0),
            sick: None,
            privilege: None,
        };
        let adjusted = apply_manual_override(&balances(), &manual);

        // The admin asked for a balance of 10 against 2 days already used.
        assert_eq!(adjusted.casual.allocated, 12.0);
        assert_eq!(adjusted.casual.used, 2.0);
        assert_eq!(adjusted.casual.balance, 10.0);

        // Untouched categories pass through unchanged.
        assert_eq!(adjusted.sick, balances().sick);
        assert_eq!(adjusted.privilege, balances().privilege);
    }

    #[test]
    fn override_can_set_each_category() {
        let manual = ManualOverride {
            casual: Some(0.0),
            sick: Some(1.5),
            privilege: Some(20.0),
        };
        let adjusted = apply_manual_override(&balances(), &manual);
        assert_eq!(adjusted.casual.balance, 0.0);
        assert_eq!(adjusted.sick.balance, 1.5);
        assert_eq!(adjusted.privilege.balance, 20.0);
        assert_eq!(adjusted.total_balance, 21.5);
    }

    #[test]
    fn empty_override_detected() {
        assert!(ManualOverride::default().is_empty());
        assert!(!ManualOverride {
            casual: Some(1.0),
            ..Default::default()
        }
        .is_empty());
    }
}
