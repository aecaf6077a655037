use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

/// Unique key that an insert or update collided with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateField {
    EmployeeId,
    Email,
    EmployeeDate,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    DuplicateKey {
        field: Option<DuplicateField>,
        message: String,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Attachment(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn employee_not_found(employee_id: &str) -> Self {
        AppError::NotFound(format!("Employee with ID '{employee_id}' not found"))
    }

    pub fn duplicate_employee_id(employee_id: &str) -> Self {
        AppError::DuplicateKey {
            field: Some(DuplicateField::EmployeeId),
            message: format!("Employee ID '{employee_id}' already exists"),
        }
    }

    pub fn duplicate_email(email: &str) -> Self {
        AppError::DuplicateKey {
            field: Some(DuplicateField::Email),
            message: format!("Email '{email}' already exists"),
        }
    }

    pub fn duplicate_attendance(employee_id: &str, date: chrono::NaiveDate) -> Self {
        AppError::DuplicateKey {
            field: Some(DuplicateField::EmployeeDate),
            message: format!("Attendance for '{employee_id}' on {date} already exists"),
        }
    }

    pub fn duplicate_entry() -> Self {
        AppError::DuplicateKey {
            field: None,
            message: "Duplicate entry or constraint violation. Please check your input."
                .to_string(),
        }
    }

    /// Client-input errors are reported verbatim; everything else is internal.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_)
                | AppError::DuplicateKey { .. }
                | AppError::NotFound(_)
                | AppError::Attachment(_)
        )
    }
}

/// True when the store rejected a write on a UNIQUE constraint. SQLite does not
/// report which constraint, so callers work out the field themselves.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::DuplicateKey { .. } | AppError::Attachment(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let detail = if self.is_client_error() {
            self.to_string()
        } else {
            tracing::error!(error = %self, "Request failed");
            "Internal Server Error".to_string()
        };

        HttpResponse::build(self.status_code()).json(json!({ "detail": detail }))
    }
}
