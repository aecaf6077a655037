use chrono::NaiveDate;
use sqlx::SqlitePool;

use crate::error::AppResult;
use crate::model::dashboard::DashboardStats;

/// Head count plus the present/absent tallies for `today`, read in one statement.
pub async fn dashboard_stats(pool: &SqlitePool, today: NaiveDate) -> AppResult<DashboardStats> {
    let stats = sqlx::query_as::<_, DashboardStats>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM employees) AS total_employees,
            (SELECT COUNT(*) FROM attendance WHERE date = ? AND status = 'Present') AS present_today,
            (SELECT COUNT(*) FROM attendance WHERE date = ? AND status = 'Absent') AS absent_today
        "#,
    )
    .bind(today)
    .bind(today)
    .fetch_one(pool)
    .await?;

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::memory_pool;
    use crate::model::attendance::{AttendanceStatus, MarkAttendance};
    use crate::store::attendance::mark_attendance;
    use crate::store::employee::test_support::seed;

    async fn mark(pool: &SqlitePool, employee_id: &str, date: NaiveDate, status: AttendanceStatus) {
        let m = MarkAttendance {
            employee_id: employee_id.to_string(),
            date,
            status,
        };
        mark_attendance(pool, &m).await.unwrap();
    }

    #[actix_web::test]
    async fn empty_store_reports_zeroes() {
        let pool = memory_pool().await;
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();

        let stats = dashboard_stats(&pool, today).await.unwrap();
        assert_eq!(
            stats,
            DashboardStats {
                total_employees: 0,
                present_today: 0,
                absent_today: 0
            }
        );
    }

    #[actix_web::test]
    async fn counts_only_today() {
        let pool = memory_pool().await;
        seed(&pool, 5).await;

        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let yesterday = today.pred_opt().unwrap();

        mark(&pool, "EMP-001", today, AttendanceStatus::Present).await;
        mark(&pool, "EMP-002", today, AttendanceStatus::Present).await;
        mark(&pool, "EMP-003", today, AttendanceStatus::Absent).await;
        mark(&pool, "EMP-004", yesterday, AttendanceStatus::Present).await;
        mark(&pool, "EMP-005", yesterday, AttendanceStatus::Absent).await;

        let stats = dashboard_stats(&pool, today).await.unwrap();
        assert_eq!(stats.total_employees, 5);
        assert_eq!(stats.present_today, 2);
        assert_eq!(stats.absent_today, 1);
    }
}
