use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Entitlement for a single leave category. `balance` is always derived,
/// never stored on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CategoryBalance {
    #[schema(example = 6.0)]
    pub allocated: f64,

    #[schema(example = 1.5)]
    pub used: f64,

    #[schema(example = 4.5)]
    pub balance: f64,
}

impl CategoryBalance {
    pub fn new(allocated: f64, used: f64) -> Self {
        Self {
            allocated,
            used,
            balance: allocated - used,
        }
    }
}

/// Full per-category breakdown returned by the balance endpoints and
/// produced by the accrual computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LeaveBalances {
    pub casual: CategoryBalance,
    pub sick: CategoryBalance,
    pub privilege: CategoryBalance,

    #[schema(example = 11.0)]
    pub total_balance: f64,

    #[schema(example = 18)]
    pub months_of_service: i32,
}

impl LeaveBalances {
    pub fn new(
        casual: CategoryBalance,
        sick: CategoryBalance,
        privilege: CategoryBalance,
        months_of_service: i32,
    ) -> Self {
        let total_balance = casual.balance + sick.balance + privilege.balance;
        Self {
            casual,
            sick,
            privilege,
            total_balance,
            months_of_service,
        }
    }
}

/// Persisted year-scoped snapshot row. Authoritative only while `year`
/// matches the current calendar year.
#[derive(Debug, sqlx::FromRow)]
pub struct LeaveBalanceRow {
    pub employee_id: u64,
    pub year: i32,
    pub casual_allocated: f64,
    pub casual_used: f64,
    pub sick_allocated: f64,
    pub sick_used: f64,
    pub privilege_allocated: f64,
    pub privilege_used: f64,
    pub months_of_service: i32,
    pub last_updated: Option<DateTime<Utc>>,
}

impl LeaveBalanceRow {
    pub fn into_balances(self) -> LeaveBalances {
        LeaveBalances::new(
            CategoryBalance::new(self.casual_allocated, self.casual_used),
            CategoryBalance::new(self.sick_allocated, self.sick_used),
            CategoryBalance::new(self.privilege_allocated, self.privilege_used),
            self.months_of_service,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_is_allocated_minus_used() {
        let cat = CategoryBalance::new(6.0, 2.5);
        assert_eq!(cat.balance, 3.5);
    }

    #[test]
    fn total_balance_sums_categories() {
        let balances = LeaveBalances::new(
            CategoryBalance::new(6.0, 1.0),
            CategoryBalance::new(6.0, 0.0),
            CategoryBalance::new(10.0, 4.0),
            18,
        );
        assert_eq!(balances.total_balance, 5.0 + 6.0 + 6.0);
    }

    #[test]
    fn snapshot_row_round_trips_into_breakdown() {
        let row = LeaveBalanceRow {
            employee_id: 7,
            year: 2025,
            casual_allocated: 6.0,
            casual_used: 2.0,
            sick_allocated: 6.0,
            sick_used: 0.5,
            privilege_allocated: 12.5,
            privilege_used: 3.0,
            months_of_service: 18,
            last_updated: None,
        };
        let balances = row.into_balances();
        assert_eq!(balances.casual.balance, 4.0);
        assert_eq!(balances.sick.balance, 5.5);
        assert_eq!(balances.privilege.balance, 9.5);
        assert_eq!(balances.total_balance, 19.0);
        assert_eq!(balances.months_of_service, 18);
    }
}
