use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, error, info, warn};

use crate::db::{WriteTx, finish};
use crate::error::{AppError, AppResult, is_unique_violation};
use crate::model::employee::{CreateEmployee, Employee, UpdateEmployee};

const COLUMNS: &str =
    "id, employee_id, full_name, email, department, photo_path, created_at, updated_at";

async fn find_by_employee_id(
    conn: &mut SqliteConnection,
    employee_id: &str,
) -> Result<Option<Employee>, sqlx::Error> {
    sqlx::query_as::<_, Employee>(&format!(
        "SELECT {COLUMNS} FROM employees WHERE employee_id = ?"
    ))
    .bind(employee_id)
    .fetch_optional(conn)
    .await
}

async fn find_by_email(
    conn: &mut SqliteConnection,
    email: &str,
) -> Result<Option<Employee>, sqlx::Error> {
    sqlx::query_as::<_, Employee>(&format!("SELECT {COLUMNS} FROM employees WHERE email = ?"))
        .bind(email)
        .fetch_optional(conn)
        .await
}

/// Finds the employee already holding `employee_id` or `email` and returns the
/// matching `DuplicateKey`. The employee with row id `except` is ignored, so an
/// update can keep its own values.
async fn find_collision(
    conn: &mut SqliteConnection,
    employee_id: Option<&str>,
    email: Option<&str>,
    except: Option<i64>,
) -> Result<Option<AppError>, sqlx::Error> {
    if let Some(employee_id) = employee_id {
        if let Some(other) = find_by_employee_id(conn, employee_id).await? {
            if Some(other.id) != except {
                return Ok(Some(AppError::duplicate_employee_id(employee_id)));
            }
        }
    }
    if let Some(email) = email {
        if let Some(other) = find_by_email(conn, email).await? {
            if Some(other.id) != except {
                return Ok(Some(AppError::duplicate_email(email)));
            }
        }
    }
    Ok(None)
}

/// Turns a unique violation into a `DuplicateKey`. The driver does not say which
/// constraint fired, so the colliding row is looked up again to name the field.
/// Other errors pass through unchanged.
async fn map_write_error(
    conn: &mut SqliteConnection,
    e: sqlx::Error,
    employee_id: Option<&str>,
    email: Option<&str>,
    except: Option<i64>,
) -> AppError {
    if !is_unique_violation(&e) {
        return AppError::Database(e);
    }
    match find_collision(conn, employee_id, email, except).await {
        Ok(Some(duplicate)) => duplicate,
        Ok(None) => AppError::duplicate_entry(),
        Err(lookup_err) => {
            warn!(error = %lookup_err, "Could not name the duplicated field");
            AppError::duplicate_entry()
        }
    }
}

/// Inserts a new employee. `input` must already be validated.
///
/// Both natural keys are checked under the write lock first, so the error names
/// the field that collided.
pub async fn create_employee(pool: &SqlitePool, input: &CreateEmployee) -> AppResult<Employee> {
    let mut tx = WriteTx::begin(pool).await?;
    let result = insert_employee(&mut tx, input).await;
    let employee = finish(tx, result).await.inspect_err(|e| {
        if !e.is_client_error() {
            error!(error = %e, employee_id = %input.employee_id, "Failed to create employee");
        }
    })?;

    info!(employee_id = %employee.employee_id, id = employee.id, "Employee created");
    Ok(employee)
}

async fn insert_employee(
    conn: &mut SqliteConnection,
    input: &CreateEmployee,
) -> AppResult<Employee> {
    let employee_id = Some(input.employee_id.as_str());
    let email = Some(input.email.as_str());

    if let Some(duplicate) = find_collision(conn, employee_id, email, None).await? {
        return Err(duplicate);
    }

    let now = Utc::now().naive_utc();

    let inserted = sqlx::query_as::<_, Employee>(&format!(
        r#"
        INSERT INTO employees
            (employee_id, full_name, email, department, photo_path, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(&input.employee_id)
    .bind(&input.full_name)
    .bind(&input.email)
    .bind(&input.department)
    .bind(&input.photo_path)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await;

    match inserted {
        Ok(employee) => Ok(employee),
        Err(e) => Err(map_write_error(conn, e, employee_id, email, None).await),
    }
}

pub async fn get_employee(pool: &SqlitePool, employee_id: &str) -> AppResult<Option<Employee>> {
    let mut conn = pool.acquire().await?;
    Ok(find_by_employee_id(&mut conn, employee_id).await?)
}

pub async fn get_employee_by_email(pool: &SqlitePool, email: &str) -> AppResult<Option<Employee>> {
    let mut conn = pool.acquire().await?;
    Ok(find_by_email(&mut conn, email).await?)
}

/// Employees in insertion order.
pub async fn list_employees(pool: &SqlitePool, skip: i64, limit: i64) -> AppResult<Vec<Employee>> {
    debug!(skip, limit, "Listing employees");

    let employees = sqlx::query_as::<_, Employee>(&format!(
        "SELECT {COLUMNS} FROM employees ORDER BY id ASC LIMIT ? OFFSET ?"
    ))
    .bind(limit)
    .bind(skip)
    .fetch_all(pool)
    .await?;

    Ok(employees)
}

/// Updates the mutable profile fields. Returns `None` when the employee is unknown.
pub async fn update_employee(
    pool: &SqlitePool,
    employee_id: &str,
    changes: &UpdateEmployee,
) -> AppResult<Option<Employee>> {
    let mut tx = WriteTx::begin(pool).await?;
    let result = apply_update(&mut tx, employee_id, changes).await;
    finish(tx, result).await
}

async fn apply_update(
    conn: &mut SqliteConnection,
    employee_id: &str,
    changes: &UpdateEmployee,
) -> AppResult<Option<Employee>> {
    let Some(current) = find_by_employee_id(conn, employee_id).await? else {
        return Ok(None);
    };

    if let Some(duplicate) =
        find_collision(conn, None, changes.email.as_deref(), Some(current.id)).await?
    {
        return Err(duplicate);
    }

    let full_name = changes.full_name.as_deref().unwrap_or(&current.full_name);
    let email = changes.email.as_deref().unwrap_or(&current.email);
    let department = changes.department.as_deref().unwrap_or(&current.department);

    let updated = sqlx::query_as::<_, Employee>(&format!(
        r#"
        UPDATE employees
        SET full_name = ?, email = ?, department = ?, updated_at = ?
        WHERE id = ?
        RETURNING {COLUMNS}
        "#
    ))
    .bind(full_name)
    .bind(email)
    .bind(department)
    .bind(Utc::now().naive_utc())
    .bind(current.id)
    .fetch_one(&mut *conn)
    .await;

    match updated {
        Ok(employee) => Ok(Some(employee)),
        Err(e) => Err(map_write_error(conn, e, None, Some(email), Some(current.id)).await),
    }
}

/// Points `photo_path` at a stored artifact. Returns `None` when the employee
/// vanished in the meantime.
pub async fn set_photo_path(
    pool: &SqlitePool,
    employee_id: &str,
    photo_path: &str,
) -> AppResult<Option<Employee>> {
    let mut tx = WriteTx::begin(pool).await?;
    let result = sqlx::query_as::<_, Employee>(&format!(
        r#"
        UPDATE employees
        SET photo_path = ?, updated_at = ?
        WHERE employee_id = ?
        RETURNING {COLUMNS}
        "#
    ))
    .bind(photo_path)
    .bind(Utc::now().naive_utc())
    .bind(employee_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(AppError::from);

    finish(tx, result).await
}

/// Deletes the employee together with every attendance row that references it.
/// Returns the deleted snapshot, or `None` when nothing matched.
pub async fn delete_employee(pool: &SqlitePool, employee_id: &str) -> AppResult<Option<Employee>> {
    let mut tx = WriteTx::begin(pool).await?;
    let result = cascade_delete(&mut tx, employee_id).await;
    let deleted = finish(tx, result).await.inspect_err(|e| {
        error!(error = %e, employee_id, "Failed to delete employee");
    })?;

    if deleted.is_some() {
        info!(employee_id, "Employee deleted");
    }
    Ok(deleted)
}

async fn cascade_delete(
    conn: &mut SqliteConnection,
    employee_id: &str,
) -> AppResult<Option<Employee>> {
    let Some(employee) = find_by_employee_id(conn, employee_id).await? else {
        return Ok(None);
    };

    let removed = sqlx::query("DELETE FROM attendance WHERE employee_id = ?")
        .bind(employee_id)
        .execute(&mut *conn)
        .await?;
    debug!(employee_id, rows = removed.rows_affected(), "Attendance removed");

    sqlx::query("DELETE FROM employees WHERE id = ?")
        .bind(employee.id)
        .execute(&mut *conn)
        .await?;

    Ok(Some(employee))
}

pub async fn count_employees(pool: &SqlitePool) -> AppResult<i64> {
    Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employees")
        .fetch_one(pool)
        .await?)
}


#[cfg(test)]
mod tests {
    use super::test_support::{new_employee, seed};
    use super::*;
    use crate::db::test_support::{file_pool, memory_pool};
    use crate::error::DuplicateField;

    #[actix_web::test]
    async fn create_assigns_id_and_timestamps() {
        let pool = memory_pool().await;

        let emp = create_employee(&pool, &new_employee(1)).await.unwrap();
        assert!(emp.id > 0);
        assert_eq!(emp.employee_id, "EMP-001");
        assert_eq!(emp.photo_path, None);
        assert_eq!(emp.created_at, emp.updated_at);

        let fetched = get_employee(&pool, "EMP-001").await.unwrap().unwrap();
        assert_eq!(fetched, emp);
        let by_email = get_employee_by_email(&pool, "employee1@corp.io").await.unwrap();
        assert_eq!(by_email, Some(emp));
    }

    #[actix_web::test]
    async fn duplicate_employee_id_is_named() {
        let pool = memory_pool().await;
        create_employee(&pool, &new_employee(1)).await.unwrap();

        let mut again = new_employee(1);
        again.email = "other@corp.io".into();
        let err = create_employee(&pool, &again).await.unwrap_err();

        match err {
            AppError::DuplicateKey { field, message } => {
                assert_eq!(field, Some(DuplicateField::EmployeeId));
                assert_eq!(message, "Employee ID 'EMP-001' already exists");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(count_employees(&pool).await.unwrap(), 1);
    }

    #[actix_web::test]
    async fn duplicate_email_is_named() {
        let pool = memory_pool().await;
        create_employee(&pool, &new_employee(1)).await.unwrap();

        let mut again = new_employee(2);
        again.email = "employee1@corp.io".into();
        let err = create_employee(&pool, &again).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::DuplicateKey { field: Some(DuplicateField::Email), .. }
        ));
        assert!(err.is_client_error());
        assert_eq!(get_employee(&pool, "EMP-002").await.unwrap(), None);
    }

    #[actix_web::test]
    async fn raw_unique_violation_names_the_field() {
        let pool = memory_pool().await;
        create_employee(&pool, &new_employee(1)).await.unwrap();

        let insert = |employee_id: &'static str, email: &'static str| {
            sqlx::query(
                "INSERT INTO employees (employee_id, full_name, email, department, created_at, updated_at)
                 VALUES (?, 'X', ?, 'D', '2026-01-01 00:00:00', '2026-01-01 00:00:00')",
            )
            .bind(employee_id)
            .bind(email)
        };

        let e = insert("EMP-001", "x@corp.io").execute(&pool).await.unwrap_err();
        let mut conn = pool.acquire().await.unwrap();
        let mapped = map_write_error(&mut conn, e, Some("EMP-001"), Some("x@corp.io"), None).await;
        assert!(matches!(
            mapped,
            AppError::DuplicateKey { field: Some(DuplicateField::EmployeeId), .. }
        ));
        drop(conn);

        let e = insert("EMP-999", "employee1@corp.io").execute(&pool).await.unwrap_err();
        let mut conn = pool.acquire().await.unwrap();
        let mapped =
            map_write_error(&mut conn, e, Some("EMP-999"), Some("employee1@corp.io"), None).await;
        assert_eq!(mapped.to_string(), "Email 'employee1@corp.io' already exists");
        assert!(matches!(
            mapped,
            AppError::DuplicateKey { field: Some(DuplicateField::Email), .. }
        ));
        drop(conn);

        let mut conn = pool.acquire().await.unwrap();
        let other = map_write_error(&mut conn, sqlx::Error::RowNotFound, None, None, None).await;
        assert!(matches!(other, AppError::Database(_)));
    }

    #[actix_web::test]
    async fn concurrent_creates_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let pool = file_pool(&dir).await;

        let inputs: Vec<_> = (1..=100).map(new_employee).collect();
        let results =
            futures_util::future::join_all(inputs.iter().map(|input| create_employee(&pool, input)))
                .await;

        let failed: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();
        assert!(failed.is_empty(), "{} creates failed: {:?}", failed.len(), failed.first());
        assert_eq!(count_employees(&pool).await.unwrap(), 100);
    }

    #[actix_web::test]
    async fn concurrent_duplicates_yield_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let pool = file_pool(&dir).await;

        let input = new_employee(7);
        let results =
            futures_util::future::join_all((0..8).map(|_| create_employee(&pool, &input))).await;

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(matches!(
                err,
                AppError::DuplicateKey { field: Some(DuplicateField::EmployeeId), .. }
            ));
        }
        assert_eq!(count_employees(&pool).await.unwrap(), 1);
    }

    #[actix_web::test]
    async fn list_is_windowed_in_insertion_order() {
        let pool = memory_pool().await;
        let seeded = seed(&pool, 5).await;

        let first = list_employees(&pool, 0, 2).await.unwrap();
        assert_eq!(first, seeded[..2].to_vec());

        let tail = list_employees(&pool, 4, 2).await.unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].employee_id, "EMP-005");

        assert!(list_employees(&pool, 10, 2).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn update_changes_fields_and_guards_email() {
        let pool = memory_pool().await;
        seed(&pool, 2).await;

        let changes = UpdateEmployee {
            full_name: Some("Renamed".into()),
            ..Default::default()
        };
        let updated = update_employee(&pool, "EMP-001", &changes).await.unwrap().unwrap();
        assert_eq!(updated.full_name, "Renamed");
        assert_eq!(updated.email, "employee1@corp.io");
        assert!(updated.updated_at >= updated.created_at);

        let steal = UpdateEmployee {
            email: Some("employee2@corp.io".into()),
            ..Default::default()
        };
        let err = update_employee(&pool, "EMP-001", &steal).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::DuplicateKey { field: Some(DuplicateField::Email), .. }
        ));

        let same = UpdateEmployee {
            email: Some("employee1@corp.io".into()),
            ..Default::default()
        };
        assert!(update_employee(&pool, "EMP-001", &same).await.unwrap().is_some());

        assert_eq!(update_employee(&pool, "NOPE", &changes).await.unwrap(), None);
    }

    #[actix_web::test]
    async fn photo_path_is_attached() {
        let pool = memory_pool().await;
        seed(&pool, 1).await;

        let emp = set_photo_path(&pool, "EMP-001", "uploads/photos/a.png")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(emp.photo_path.as_deref(), Some("uploads/photos/a.png"));

        assert_eq!(set_photo_path(&pool, "NOPE", "x").await.unwrap(), None);
    }

    #[actix_web::test]
    async fn delete_returns_snapshot_then_not_found() {
        let pool = memory_pool().await;
        let seeded = seed(&pool, 2).await;

        let deleted = delete_employee(&pool, "EMP-001").await.unwrap();
        assert_eq!(deleted.as_ref(), Some(&seeded[0]));
        assert_eq!(get_employee(&pool, "EMP-001").await.unwrap(), None);
        assert_eq!(delete_employee(&pool, "EMP-001").await.unwrap(), None);
        assert_eq!(count_employees(&pool).await.unwrap(), 1);
    }
}
