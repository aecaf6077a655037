use crate::api::employee::EmployeeForm;
use crate::model::attendance::{Attendance, AttendanceStatus, MarkAttendance};
use crate::model::dashboard::DashboardStats;
use crate::model::employee::{CreateEmployee, Employee, UpdateEmployee};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRMS Lite API",
        version = "1.0.0",
        description = r#"
## HRMS Lite

A lightweight **Human Resource Management** backend.

### Features
- **Employees**: create (JSON or multipart with an optional photo), list, view, update, delete
- **Attendance**: mark a day as Present/Absent (re-marking overwrites), per-employee history with date range
- **Dashboard**: head count and today's attendance

### Response format
- JSON bodies; errors are `{"detail": "..."}`
- List endpoints take `skip` and `limit`

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::employee::create_employee,
        crate::api::employee::create_employee_json,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::attendance::mark_attendance,
        crate::api::attendance::employee_attendance,
        crate::api::attendance::list_attendance,
        crate::api::attendance::get_attendance,

        crate::api::dashboard::dashboard_stats,
        crate::api::health::health
    ),
    components(
        schemas(
            Employee,
            CreateEmployee,
            UpdateEmployee,
            EmployeeForm,
            Attendance,
            AttendanceStatus,
            MarkAttendance,
            DashboardStats
        )
    ),
    tags(
        (name = "Employee", description = "Employee management APIs"),
        (name = "Attendance", description = "Attendance management APIs"),
        (name = "Dashboard", description = "Dashboard statistics"),
        (name = "Health", description = "Liveness check"),
    )
)]
pub struct ApiDoc;
