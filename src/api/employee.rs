use std::collections::HashMap;

use actix_multipart::{Multipart, MultipartError};
use actix_web::{HttpResponse, web};
use futures_util::TryStreamExt;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::debug;
use utoipa::ToSchema;

use crate::api::Pagination;
use crate::error::{AppError, AppResult};
use crate::model::employee::{CreateEmployee, Employee, UpdateEmployee};
use crate::provisioning::{self, MAX_PHOTO_BYTES, PhotoUpload, photo_too_large};
use crate::store;
use crate::utils::photo_store::PhotoStore;

const MAX_TEXT_FIELD_BYTES: usize = 4 * 1024;

/// Multipart body of `POST /api/employees`.
#[allow(dead_code)]
#[derive(ToSchema)]
pub struct EmployeeForm {
    #[schema(example = "EMP-001")]
    employee_id: String,
    #[schema(example = "John Doe")]
    full_name: String,
    #[schema(example = "john.doe@company.com", format = "email")]
    email: String,
    #[schema(example = "Engineering")]
    department: String,
    /// Optional image, at most 5 MiB
    #[schema(value_type = String, format = Binary)]
    photo: Option<Vec<u8>>,
}

fn malformed(e: MultipartError) -> AppError {
    AppError::validation(format!("Malformed multipart payload: {e}"))
}

fn required(fields: &mut HashMap<String, String>, key: &str) -> AppResult<String> {
    fields
        .remove(key)
        .ok_or_else(|| AppError::validation(format!("{key} is required")))
}

/// Buffers the whole form so nothing is persisted before every part is checked.
async fn read_employee_form(
    mut payload: Multipart,
) -> AppResult<(CreateEmployee, Option<PhotoUpload>)> {
    let mut fields: HashMap<String, String> = HashMap::new();
    let mut photo = None;

    while let Some(mut field) = payload.try_next().await.map_err(malformed)? {
        let name = field.name().to_string();

        if name == "photo" {
            let file_name = field
                .content_disposition()
                .get_filename()
                .unwrap_or_default()
                .to_string();
            let content_type = field.content_type().map(|m| m.essence_str().to_string());

            let mut bytes = Vec::new();
            while let Some(chunk) = field.try_next().await.map_err(malformed)? {
                if bytes.len() + chunk.len() > MAX_PHOTO_BYTES {
                    return Err(photo_too_large());
                }
                bytes.extend_from_slice(&chunk);
            }

            // browsers send an empty part when no file was picked
            if file_name.is_empty() && bytes.is_empty() {
                continue;
            }

            photo = Some(PhotoUpload {
                file_name,
                content_type,
                bytes,
            });
            continue;
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(malformed)? {
            if bytes.len() + chunk.len() > MAX_TEXT_FIELD_BYTES {
                return Err(AppError::validation(format!("{name} is too long")));
            }
            bytes.extend_from_slice(&chunk);
        }
        let value = String::from_utf8(bytes)
            .map_err(|_| AppError::validation(format!("{name} must be valid UTF-8")))?;
        fields.insert(name, value);
    }

    let input = CreateEmployee {
        employee_id: required(&mut fields, "employee_id")?,
        full_name: required(&mut fields, "full_name")?,
        email: required(&mut fields, "email")?,
        department: required(&mut fields, "department")?,
        photo_path: None,
    };

    Ok((input, photo))
}

/// Create Employee (multipart, optional photo)
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body(content = EmployeeForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "Invalid input, bad photo or duplicate employee", body = Object, example = json!({
            "detail": "Employee ID 'EMP-001' already exists"
        })),
        (status = 500, description = "Internal server error", body = Object, example = json!({
            "detail": "Internal Server Error"
        }))
    ),
    tag = "Employee"
)]
pub async fn create_employee(
    pool: web::Data<SqlitePool>,
    photos: web::Data<dyn PhotoStore>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let (input, photo) = read_employee_form(payload).await?;
    debug!(employee_id = %input.employee_id, has_photo = photo.is_some(), "Creating employee");

    let employee =
        provisioning::create_employee_with_photo(pool.get_ref(), photos.get_ref(), &input, photo)
            .await?;

    Ok(HttpResponse::Created().json(employee))
}

/// Create Employee (JSON, no photo)
#[utoipa::path(
    post,
    path = "/api/employees/json",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "Invalid input or duplicate employee"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee"
)]
pub async fn create_employee_json(
    pool: web::Data<SqlitePool>,
    payload: web::Json<CreateEmployee>,
) -> AppResult<HttpResponse> {
    let employee = provisioning::create_employee(pool.get_ref(), &payload).await?;
    Ok(HttpResponse::Created().json(employee))
}

#[utoipa::path(
    get,
    path = "/api/employees",
    params(Pagination),
    responses(
        (status = 200, description = "Employees in insertion order", body = [Employee]),
        (status = 400, description = "Invalid skip/limit")
    ),
    tag = "Employee"
)]
pub async fn list_employees(
    pool: web::Data<SqlitePool>,
    query: web::Query<Pagination>,
) -> AppResult<HttpResponse> {
    let (skip, limit) = query.window()?;
    let employees = store::employee::list_employees(pool.get_ref(), skip, limit).await?;
    Ok(HttpResponse::Ok().json(employees))
}

/// Get Employee by employee_id
#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}",
    params(
        ("employee_id" = String, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "detail": "Employee with ID 'EMP-001' not found"
        }))
    ),
    tag = "Employee"
)]
pub async fn get_employee(
    pool: web::Data<SqlitePool>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let employee_id = path.into_inner();

    match store::employee::get_employee(pool.get_ref(), &employee_id).await? {
        Some(emp) => Ok(HttpResponse::Ok().json(emp)),
        None => Err(AppError::employee_not_found(&employee_id)),
    }
}

/// Update Employee
#[utoipa::path(
    put,
    path = "/api/employees/{employee_id}",
    params(
        ("employee_id" = String, Path, description = "Employee ID")
    ),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 400, description = "Invalid input or email already taken"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee"
)]
pub async fn update_employee(
    pool: web::Data<SqlitePool>,
    path: web::Path<String>,
    body: web::Json<UpdateEmployee>,
) -> AppResult<HttpResponse> {
    let employee_id = path.into_inner();
    let changes = body.validated()?;

    match store::employee::update_employee(pool.get_ref(), &employee_id, &changes).await? {
        Some(emp) => Ok(HttpResponse::Ok().json(emp)),
        None => Err(AppError::employee_not_found(&employee_id)),
    }
}

/// Delete Employee and its attendance
#[utoipa::path(
    delete,
    path = "/api/employees/{employee_id}",
    params(
        ("employee_id" = String, Path, description = "Employee ID")
    ),
    responses(
        (status = 204, description = "Employee and attendance deleted"),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "detail": "Employee with ID 'EMP-001' not found"
        }))
    ),
    tag = "Employee"
)]
pub async fn delete_employee(
    pool: web::Data<SqlitePool>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let employee_id = path.into_inner();

    match store::employee::delete_employee(pool.get_ref(), &employee_id).await? {
        Some(_) => Ok(HttpResponse::NoContent().finish()),
        None => Err(AppError::employee_not_found(&employee_id)),
    }
}
