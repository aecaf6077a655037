//! Employee creation, with or without a photo.
//!
//! A photo is stored only after the employee row is committed. If storing it
//! fails the employee stays as created, without a photo, and the failure is
//! only logged.

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::model::employee::{CreateEmployee, Employee};
use crate::store;
use crate::utils::photo_store::PhotoStore;

pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

pub fn photo_too_large() -> AppError {
    AppError::Attachment("Photo size must be less than 5MB".to_string())
}

/// An uploaded photo held in memory until the employee exists.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    pub fn validate(&self) -> AppResult<()> {
        let is_image = self
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"));
        if !is_image {
            return Err(AppError::Attachment(
                "Uploaded file must be an image".to_string(),
            ));
        }

        if self.bytes.is_empty() {
            return Err(AppError::Attachment("Uploaded photo is empty".to_string()));
        }
        if self.bytes.len() > MAX_PHOTO_BYTES {
            return Err(photo_too_large());
        }

        Ok(())
    }
}

/// Creates an employee from a structured body; no attachment handling.
pub async fn create_employee(pool: &SqlitePool, input: &CreateEmployee) -> AppResult<Employee> {
    let input = input.validated()?;
    store::employee::create_employee(pool, &input).await
}

/// Creates an employee and, best effort, attaches `photo`.
///
/// The photo is validated before anything is written, so a bad upload leaves no
/// employee behind.
pub async fn create_employee_with_photo(
    pool: &SqlitePool,
    photos: &dyn PhotoStore,
    input: &CreateEmployee,
    photo: Option<PhotoUpload>,
) -> AppResult<Employee> {
    let mut input = input.validated()?;
    input.photo_path = None;

    if let Some(photo) = &photo {
        photo.validate()?;
    }

    let employee = store::employee::create_employee(pool, &input).await?;

    let Some(photo) = photo else {
        return Ok(employee);
    };

    match attach_photo(pool, photos, &employee, &photo).await {
        Ok(Some(updated)) => Ok(updated),
        Ok(None) => Ok(employee),
        Err(e) => {
            warn!(
                error = %e,
                employee_id = %employee.employee_id,
                "Photo not saved; employee kept without photo"
            );
            Ok(employee)
        }
    }
}

async fn attach_photo(
    pool: &SqlitePool,
    photos: &dyn PhotoStore,
    employee: &Employee,
    photo: &PhotoUpload,
) -> AppResult<Option<Employee>> {
    let stored = photos.save(&photo.file_name, &photo.bytes)?;

    match store::employee::set_photo_path(pool, &employee.employee_id, &stored).await {
        Ok(updated) => {
            info!(employee_id = %employee.employee_id, photo_path = %stored, "Photo attached");
            Ok(updated)
        }
        Err(e) => {
            if let Err(rm) = photos.remove(&stored) {
                warn!(error = %rm, photo_path = %stored, "Failed to remove orphaned photo");
            }
            Err(e)
        }
    }
}
