use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// The three accrual categories: casual, sick and privilege (earned) leave.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LeaveType {
    Casual,
    Sick,
    Privilege,
}

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DayType {
    FullDay,
    HalfDay,
}

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

/// A leave application as stored. Only `approved` rows count toward balance
/// usage and timesheet locking.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveApplication {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 1000)]
    pub employee_id: u64,

    #[schema(example = "casual")]
    pub leave_type: LeaveType,

    #[schema(example = "2025-03-10", value_type = String, format = "date")]
    pub start_date: NaiveDate,

    #[schema(example = "2025-03-11", value_type = String, format = "date")]
    pub end_date: NaiveDate,

    #[schema(example = "full_day")]
    pub day_type: DayType,

    /// Computed at application time: one per calendar day of the span,
    /// halved for half-day applications.
    #[schema(example = 2.0)]
    pub total_days: f64,

    #[schema(example = "pending")]
    pub status: LeaveStatus,

    #[schema(example = "Family function", nullable = true)]
    pub reason: Option<String>,

    #[schema(example = "2025-03-01T00:00:00Z", value_type = Option<String>, format = "date-time")]
    pub created_at: Option<DateTime<Utc>>,
}

impl LeaveApplication {
    /// Whether the span covers the given calendar day, inclusive on both ends.
    pub fn covers(&self, day: NaiveDate) -> bool {
        self.start_date <= day && day <= self.end_date
    }
}

/// Days charged for a span of the given type. A single-day half-day
/// application charges 0.5; longer half-day spans charge 0.5 per day.
pub fn charged_days(start_date: NaiveDate, end_date: NaiveDate, day_type: DayType) -> f64 {
    let span = (end_date - start_date).num_days() + 1;
    match day_type {
        DayType::FullDay => span as f64,
        DayType::HalfDay => span as f64 * 0.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn charged_days_full_day_span() {
        assert_eq!(
            charged_days(date(2025, 3, 10), date(2025, 3, 12), DayType::FullDay),
            3.0
        );
    }

    #[test]
    fn charged_days_single_half_day() {
        assert_eq!(
            charged_days(date(2025, 3, 10), date(2025, 3, 10), DayType::HalfDay),
            0.5
        );
    }

    #[test]
    fn leave_type_round_trips_through_strings() {
        assert_eq!(LeaveType::Privilege.to_string(), "privilege");
        assert_eq!(LeaveType::from_str("sick").unwrap(), LeaveType::Sick);
        assert_eq!(LeaveStatus::from_str("approved").unwrap(), LeaveStatus::Approved);
        assert!(LeaveType::from_str("annual").is_err());
    }

    #[test]
    fn covers_is_inclusive() {
        let app = LeaveApplication {
            id: 1,
            employee_id: 1,
            leave_type: LeaveType::Casual,
            start_date: date(2025, 3, 10),
            end_date: date(2025, 3, 11),
            day_type: DayType::FullDay,
            total_days: 2.0,
            status: LeaveStatus::Approved,
            reason: None,
            created_at: None,
        };
        assert!(app.covers(date(2025, 3, 10)));
        assert!(app.covers(date(2025, 3, 11)));
        assert!(!app.covers(date(2025, 3, 12)));
    }
}
