use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::SqlitePool;
use utoipa::IntoParams;

use crate::api::{Pagination, window};
use crate::error::{AppError, AppResult};
use crate::model::attendance::{Attendance, MarkAttendance, UpsertOutcome};
use crate::store;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AttendanceFilter {
    /// Earliest date, inclusive
    #[param(value_type = Option<String>, format = Date)]
    pub start_date: Option<NaiveDate>,
    /// Latest date, inclusive
    #[param(value_type = Option<String>, format = Date)]
    pub end_date: Option<NaiveDate>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

async fn require_employee(pool: &SqlitePool, employee_id: &str) -> AppResult<()> {
    match store::employee::get_employee(pool, employee_id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::employee_not_found(employee_id)),
    }
}

/// Mark or update attendance. 201 when created, 200 when overwritten.
#[utoipa::path(
    post,
    path = "/api/attendance",
    request_body = MarkAttendance,
    responses(
        (status = 201, description = "Attendance created", body = Attendance),
        (status = 200, description = "Attendance updated", body = Attendance),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "detail": "Employee with ID 'EMP-001' not found"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn mark_attendance(
    pool: web::Data<SqlitePool>,
    payload: web::Json<MarkAttendance>,
) -> AppResult<HttpResponse> {
    let mark = payload.validated()?;
    require_employee(pool.get_ref(), &mark.employee_id).await?;

    let (record, outcome) = store::attendance::mark_attendance(pool.get_ref(), &mark).await?;

    Ok(match outcome {
        UpsertOutcome::Created => HttpResponse::Created().json(record),
        UpsertOutcome::Updated => HttpResponse::Ok().json(record),
    })
}

#[utoipa::path(
    get,
    path = "/api/attendance/employee/{employee_id}",
    params(
        ("employee_id" = String, Path, description = "Employee ID"),
        AttendanceFilter
    ),
    responses(
        (status = 200, description = "Attendance, newest first", body = [Attendance]),
        (status = 400, description = "Invalid filter"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Attendance"
)]
pub async fn employee_attendance(
    pool: web::Data<SqlitePool>,
    path: web::Path<String>,
    query: web::Query<AttendanceFilter>,
) -> AppResult<HttpResponse> {
    let employee_id = path.into_inner();
    let (skip, limit) = window(query.skip, query.limit)?;

    if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
        if start > end {
            return Err(AppError::validation("start_date cannot be after end_date"));
        }
    }

    require_employee(pool.get_ref(), &employee_id).await?;

    let records = store::attendance::get_attendance_by_employee(
        pool.get_ref(),
        &employee_id,
        query.start_date,
        query.end_date,
        skip,
        limit,
    )
    .await?;

    Ok(HttpResponse::Ok().json(records))
}

#[utoipa::path(
    get,
    path = "/api/attendance",
    params(Pagination),
    responses(
        (status = 200, description = "All attendance, newest first", body = [Attendance])
    ),
    tag = "Attendance"
)]
pub async fn list_attendance(
    pool: web::Data<SqlitePool>,
    query: web::Query<Pagination>,
) -> AppResult<HttpResponse> {
    let (skip, limit) = query.window()?;
    let records = store::attendance::list_attendance(pool.get_ref(), skip, limit).await?;
    Ok(HttpResponse::Ok().json(records))
}

#[utoipa::path(
    get,
    path = "/api/attendance/{attendance_id}",
    params(
        ("attendance_id" = i64, Path, description = "Attendance record id")
    ),
    responses(
        (status = 200, description = "Attendance record", body = Attendance),
        (status = 404, description = "Attendance record not found")
    ),
    tag = "Attendance"
)]
pub async fn get_attendance(
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let attendance_id = path.into_inner();

    match store::attendance::get_attendance(pool.get_ref(), attendance_id).await? {
        Some(record) => Ok(HttpResponse::Ok().json(record)),
        None => Err(AppError::NotFound(format!(
            "Attendance record {attendance_id} not found"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use serde_json::json;

    use super::*;
    use crate::db::test_support::memory_pool;
    use crate::model::attendance::AttendanceStatus;
    use crate::provisioning::test_support::FailingPhotoStore;
    use crate::routes::{self, AppState};
    use crate::store::employee::test_support::seed;

    #[actix_web::test]
    async fn mark_reports_created_then_updated() {
        let pool = memory_pool().await;
        seed(&pool, 1).await;
        let state = AppState::new(pool.clone(), Arc::new(FailingPhotoStore));
        let app = test::init_service(App::new().configure(|cfg| routes::configure(cfg, &state))).await;

        let req = test::TestRequest::post()
            .uri("/api/attendance")
            .set_json(json!({ "employee_id": "EMP-001", "date": "2026-10-01", "status": "Present" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri("/api/attendance")
            .set_json(json!({ "employee_id": "EMP-001", "date": "2026-10-01", "status": "Absent" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let record: Attendance = test::read_body_json(resp).await;
        assert_eq!(record.status, AttendanceStatus::Absent);

        let req = test::TestRequest::get()
            .uri(&format!("/api/attendance/{}", record.id))
            .to_request();
        let fetched: Attendance = test::call_and_read_body_json(&app, req).await;
        assert_eq!(fetched, record);
    }

    #[actix_web::test]
    async fn mark_unknown_employee_is_404() {
        let pool = memory_pool().await;
        let state = AppState::new(pool.clone(), Arc::new(FailingPhotoStore));
        let app = test::init_service(App::new().configure(|cfg| routes::configure(cfg, &state))).await;

        let req = test::TestRequest::post()
            .uri("/api/attendance")
            .set_json(json!({ "employee_id": "GHOST", "date": "2026-10-01", "status": "Present" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(store::attendance::list_attendance(&pool, 0, 10).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn malformed_input_is_400() {
        let pool = memory_pool().await;
        seed(&pool, 1).await;
        let state = AppState::new(pool, Arc::new(FailingPhotoStore));
        let app = test::init_service(App::new().configure(|cfg| routes::configure(cfg, &state))).await;

        for body in [
            json!({ "employee_id": "EMP-001", "date": "2026-13-01", "status": "Present" }),
            json!({ "employee_id": "EMP-001", "date": "2026-10-01", "status": "Late" }),
            json!({ "employee_id": "   ", "date": "2026-10-01", "status": "Present" }),
        ] {
            let req = test::TestRequest::post()
                .uri("/api/attendance")
                .set_json(body)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

            let body: serde_json::Value = test::read_body_json(resp).await;
            assert!(body["detail"].is_string());
        }
    }

    #[actix_web::test]
    async fn employee_history_filters_range() {
        let pool = memory_pool().await;
        seed(&pool, 1).await;
        for (date, status) in [
            ("2026-10-01", AttendanceStatus::Present),
            ("2026-10-02", AttendanceStatus::Absent),
            ("2026-10-03", AttendanceStatus::Present),
        ] {
            let mark = MarkAttendance {
                employee_id: "EMP-001".into(),
                date: date.parse().unwrap(),
                status,
            };
            store::attendance::mark_attendance(&pool, &mark).await.unwrap();
        }
        let state = AppState::new(pool, Arc::new(FailingPhotoStore));
        let app = test::init_service(App::new().configure(|cfg| routes::configure(cfg, &state))).await;

        let req = test::TestRequest::get()
            .uri("/api/attendance/employee/EMP-001?start_date=2026-10-02&end_date=2026-10-03")
            .to_request();
        let rows: Vec<Attendance> = test::call_and_read_body_json(&app, req).await;
        let dates: Vec<String> = rows.iter().map(|r| r.date.to_string()).collect();
        assert_eq!(dates, vec!["2026-10-03", "2026-10-02"]);

        let req = test::TestRequest::get()
            .uri("/api/attendance/employee/EMP-001?start_date=2026-10-03&end_date=2026-10-01")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri("/api/attendance/employee/NOBODY")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get().uri("/api/attendance?limit=2").to_request();
        let rows: Vec<Attendance> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(rows.len(), 2);

        let req = test::TestRequest::get().uri("/api/attendance/424242").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }
}
