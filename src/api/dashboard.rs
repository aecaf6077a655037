use actix_web::{HttpResponse, web};
use chrono::Local;
use sqlx::SqlitePool;

use crate::error::AppResult;
use crate::model::dashboard::DashboardStats;
use crate::store;

/// Total head count plus today's present/absent tallies
#[utoipa::path(
    get,
    path = "/api/dashboard/stats",
    responses(
        (status = 200, description = "Dashboard statistics", body = DashboardStats),
        (status = 500, description = "Internal server error")
    ),
    tag = "Dashboard"
)]
pub async fn dashboard_stats(pool: web::Data<SqlitePool>) -> AppResult<HttpResponse> {
    let today = Local::now().date_naive();
    let stats = store::dashboard::dashboard_stats(pool.get_ref(), today).await?;
    Ok(HttpResponse::Ok().json(stats))
}
