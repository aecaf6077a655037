use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, error};

use crate::db::{WriteTx, finish};
use crate::error::{AppError, AppResult, is_unique_violation};
use crate::model::attendance::{Attendance, MarkAttendance, UpsertOutcome};

const COLUMNS: &str = "id, employee_id, date, status, created_at, updated_at";

/// Creates or overwrites the attendance row for `(employee_id, date)`.
///
/// The lookup and the write run under the database write lock, so concurrent
/// marks of the same key are applied one after another and the last one wins.
/// The caller is responsible for checking that the employee exists.
pub async fn mark_attendance(
    pool: &SqlitePool,
    mark: &MarkAttendance,
) -> AppResult<(Attendance, UpsertOutcome)> {
    let mut tx = WriteTx::begin(pool).await?;
    let result = upsert(&mut tx, mark).await;
    let (record, outcome) = finish(tx, result).await.inspect_err(|e| {
        if !e.is_client_error() {
            error!(error = %e, employee_id = %mark.employee_id, date = %mark.date, "Failed to mark attendance");
        }
    })?;

    debug!(employee_id = %record.employee_id, date = %record.date, ?outcome, "Attendance marked");
    Ok((record, outcome))
}

async fn upsert(
    conn: &mut SqliteConnection,
    mark: &MarkAttendance,
) -> AppResult<(Attendance, UpsertOutcome)> {
    let now = Utc::now().naive_utc();

    let existing = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM attendance WHERE employee_id = ? AND date = ?",
    )
    .bind(&mark.employee_id)
    .bind(mark.date)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(id) = existing {
        let record = sqlx::query_as::<_, Attendance>(&format!(
            "UPDATE attendance SET status = ?, updated_at = ? WHERE id = ? RETURNING {COLUMNS}"
        ))
        .bind(mark.status.as_ref())
        .bind(now)
        .bind(id)
        .fetch_one(conn)
        .await?;

        return Ok((record, UpsertOutcome::Updated));
    }

    let record = sqlx::query_as::<_, Attendance>(&format!(
        r#"
        INSERT INTO attendance (employee_id, date, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(&mark.employee_id)
    .bind(mark.date)
    .bind(mark.status.as_ref())
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::duplicate_attendance(&mark.employee_id, mark.date)
        } else {
            AppError::Database(e)
        }
    })?;

    Ok((record, UpsertOutcome::Created))
}

pub async fn get_attendance(pool: &SqlitePool, attendance_id: i64) -> AppResult<Option<Attendance>> {
    let record = sqlx::query_as::<_, Attendance>(&format!(
        "SELECT {COLUMNS} FROM attendance WHERE id = ?"
    ))
    .bind(attendance_id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Attendance of one employee, newest date first, optionally limited to an
/// inclusive date range.
pub async fn get_attendance_by_employee(
    pool: &SqlitePool,
    employee_id: &str,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    skip: i64,
    limit: i64,
) -> AppResult<Vec<Attendance>> {
    let mut conditions = vec!["employee_id = ?"];
    if start_date.is_some() {
        conditions.push("date >= ?");
    }
    if end_date.is_some() {
        conditions.push("date <= ?");
    }

    let sql = format!(
        "SELECT {COLUMNS} FROM attendance WHERE {} ORDER BY date DESC, id DESC LIMIT ? OFFSET ?",
        conditions.join(" AND ")
    );
    debug!(sql = %sql, employee_id, ?start_date, ?end_date, skip, limit, "Fetching attendance");

    let mut query = sqlx::query_as::<_, Attendance>(&sql).bind(employee_id);
    if let Some(start) = start_date {
        query = query.bind(start);
    }
    if let Some(end) = end_date {
        query = query.bind(end);
    }

    let records = query.bind(limit).bind(skip).fetch_all(pool).await?;
    Ok(records)
}

pub async fn list_attendance(pool: &SqlitePool, skip: i64, limit: i64) -> AppResult<Vec<Attendance>> {
    let records = sqlx::query_as::<_, Attendance>(&format!(
        "SELECT {COLUMNS} FROM attendance ORDER BY date DESC, id DESC LIMIT ? OFFSET ?"
    ))
    .bind(limit)
    .bind(skip)
    .fetch_all(pool)
    .await?;

    Ok(records)
}
