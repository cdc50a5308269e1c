use crate::api::employee::{CreateEmployee, EmployeeListResponse, EmployeeQuery, UpdateEmployee};
use crate::api::leave_application::{CreateLeave, LeaveFilter, LeaveListResponse};
use crate::api::timesheet::{
    LockedDaysResponse, ProjectEntryInput, SaveTimesheet, TimesheetQuery, TimesheetResponse,
};
use crate::leave::snapshot::{ManualOverride, SyncFailure, SyncReport};
use crate::model::employee::{Employee, PreviousOrganization};
use crate::model::leave_application::{DayType, LeaveApplication, LeaveStatus, LeaveType};
use crate::model::leave_balance::{CategoryBalance, LeaveBalances};
use crate::model::timesheet::{EntryType, TimesheetEntry};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HR Operations API",
        version = "1.0.0",
        description = r#"
## HR Operations Service

This API powers leave administration for an organization: applications,
per-category accrued balances, and the weekly timesheets kept in step with
leave decisions.

### 🔹 Key Features
- **Employee Management**
  - Create, update, list, and view employee profiles
- **Leave Management**
  - Apply for leave, approve/reject applications, and view leave history
- **Leave Balances**
  - Accrued casual/sick/privilege balances, manual overrides, batch recompute
- **Timesheets**
  - Weekly entries, leave-day locking, per-week lock masks

### 🔐 Security
All endpoints are protected using **JWT Bearer authentication** issued by
the identity service. Sensitive operations require **Admin** or **HR**.

### 📦 Response Format
- JSON-based RESTful responses
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::leave_application::leave_list,
        crate::api::leave_application::get_leave,
        crate::api::leave_application::create_leave,
        crate::api::leave_application::approve_leave,
        crate::api::leave_application::reject_leave,

        crate::api::leave_balance::get_my_balance,
        crate::api::leave_balance::get_balance,
        crate::api::leave_balance::save_balance,
        crate::api::leave_balance::sync_all_balances,

        crate::api::timesheet::get_timesheet,
        crate::api::timesheet::get_locked_days,
        crate::api::timesheet::save_timesheet,

        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::list_employees,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee
    ),
    components(
        schemas(
            CreateEmployee,
            UpdateEmployee,
            EmployeeQuery,
            Employee,
            EmployeeListResponse,
            PreviousOrganization,
            CreateLeave,
            LeaveFilter,
            LeaveListResponse,
            LeaveApplication,
            LeaveType,
            LeaveStatus,
            DayType,
            CategoryBalance,
            LeaveBalances,
            ManualOverride,
            SyncFailure,
            SyncReport,
            TimesheetQuery,
            TimesheetResponse,
            TimesheetEntry,
            EntryType,
            ProjectEntryInput,
            SaveTimesheet,
            LockedDaysResponse
        )
    ),
    tags(
        (name = "Leave", description = "Leave application APIs"),
        (name = "Leave Balance", description = "Accrued balance APIs"),
        (name = "Timesheet", description = "Weekly timesheet APIs"),
        (name = "Employee", description = "Employee management APIs"),
    )
)]
pub struct ApiDoc;
