use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::utils::validation;

pub const MAX_EMPLOYEE_ID_LEN: usize = 50;
pub const MAX_NAME_LEN: usize = 100;
pub const MAX_DEPARTMENT_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_id": "EMP-001",
        "full_name": "John Doe",
        "email": "john.doe@company.com",
        "department": "Engineering",
        "photo_path": "uploads/photos/20260101_090000_1a2b3c4d_john.png",
        "created_at": "2026-01-01T09:00:00",
        "updated_at": "2026-01-01T09:00:00"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: i64,

    #[schema(example = "EMP-001")]
    pub employee_id: String,

    #[schema(example = "John Doe")]
    pub full_name: String,

    #[schema(example = "john.doe@company.com")]
    pub email: String,

    #[schema(example = "Engineering")]
    pub department: String,

    #[schema(nullable = true)]
    pub photo_path: Option<String>,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,

    #[schema(value_type = String, format = "date-time")]
    pub updated_at: NaiveDateTime,
}

/// Fields accepted when creating an employee.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "EMP-001")]
    pub employee_id: String,
    #[schema(example = "John Doe")]
    pub full_name: String,
    #[schema(example = "john.doe@company.com", format = "email")]
    pub email: String,
    #[schema(example = "Engineering")]
    pub department: String,
    #[serde(default)]
    #[schema(nullable = true)]
    pub photo_path: Option<String>,
}

impl CreateEmployee {
    /// Returns a copy with every text field trimmed, or the first validation failure.
    pub fn validated(&self) -> AppResult<CreateEmployee> {
        Ok(CreateEmployee {
            employee_id: validation::required_text(
                "employee_id",
                &self.employee_id,
                MAX_EMPLOYEE_ID_LEN,
            )?,
            full_name: validation::required_text("full_name", &self.full_name, MAX_NAME_LEN)?,
            email: validation::email(&self.email)?,
            department: validation::required_text(
                "department",
                &self.department,
                MAX_DEPARTMENT_LEN,
            )?,
            photo_path: self
                .photo_path
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateEmployee {
    #[schema(example = "Jane Doe")]
    pub full_name: Option<String>,
    #[schema(example = "jane.doe@company.com", format = "email")]
    pub email: Option<String>,
    #[schema(example = "Finance")]
    pub department: Option<String>,
}

impl UpdateEmployee {
    pub fn validated(&self) -> AppResult<UpdateEmployee> {
        if self.full_name.is_none() && self.email.is_none() && self.department.is_none() {
            return Err(AppError::validation("No fields provided for update"));
        }

        Ok(UpdateEmployee {
            full_name: self
                .full_name
                .as_deref()
                .map(|v| validation::required_text("full_name", v, MAX_NAME_LEN))
                .transpose()?,
            email: self.email.as_deref().map(validation::email).transpose()?,
            department: self
                .department
                .as_deref()
                .map(|v| validation::required_text("department", v, MAX_DEPARTMENT_LEN))
                .transpose()?,
        })
    }
}
