use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use utoipa::ToSchema;

/// A stint at a prior employer, kept on the employee document. The accrual
/// engine scans these for a trainee period when the current position is not
/// itself a trainee one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PreviousOrganization {
    #[schema(example = "Acme Corp")]
    pub organization: String,

    #[schema(example = "Trainee Engineer")]
    pub position: String,

    #[schema(example = "2022-06-01", value_type = String, format = "date")]
    pub start_date: NaiveDate,

    /// Open-ended when the stint was still running at the time of record.
    #[schema(example = "2023-02-28", value_type = Option<String>, format = "date", nullable = true)]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_code": "EMP-001",
        "first_name": "John",
        "last_name": "Doe",
        "email": "john.doe@company.com",
        "phone": "+8801712345678",
        "position": "Software Engineer",
        "date_of_joining": "2024-01-10",
        "previous_organizations": [],
        "status": "active"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "EMP-001")]
    pub employee_code: String,

    #[schema(example = "John")]
    pub first_name: String,

    #[schema(example = "Doe")]
    pub last_name: String,

    #[schema(example = "john.doe@company.com")]
    pub email: String,

    #[schema(example = "+8801712345678", nullable = true)]
    pub phone: Option<String>,

    #[schema(example = "Software Engineer")]
    pub position: String,

    /// Accrual anchor. Nullable in the store; balance computation reports
    /// the record as unavailable rather than substituting zero.
    #[schema(
        example = "2024-01-10",
        value_type = Option<String>,
        format = "date",
        nullable = true
    )]
    pub date_of_joining: Option<NaiveDate>,

    #[schema(value_type = Vec<PreviousOrganization>)]
    pub previous_organizations: Json<Vec<PreviousOrganization>>,

    #[schema(example = "active")]
    pub status: String,
}
