use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};
use utoipa::ToSchema;

use crate::error::AppResult;
use crate::utils::validation;

use super::employee::MAX_EMPLOYEE_ID_LEN;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString, ToSchema,
)]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl TryFrom<String> for AttendanceStatus {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Attendance {
    #[schema(example = 1)]
    pub id: i64,

    #[schema(example = "EMP-001")]
    pub employee_id: String,

    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub date: NaiveDate,

    #[sqlx(try_from = "String")]
    pub status: AttendanceStatus,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,

    #[schema(value_type = String, format = "date-time")]
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct MarkAttendance {
    #[schema(example = "EMP-001")]
    pub employee_id: String,

    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub date: NaiveDate,

    pub status: AttendanceStatus,
}

impl MarkAttendance {
    pub fn validated(&self) -> AppResult<MarkAttendance> {
        Ok(MarkAttendance {
            employee_id: validation::required_text(
                "employee_id",
                &self.employee_id,
                MAX_EMPLOYEE_ID_LEN,
            )?,
            date: self.date,
            status: self.status,
        })
    }
}

/// Whether an upsert inserted a new row or overwrote an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}
