use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "total_employees": 42,
    "present_today": 37,
    "absent_today": 3
}))]
pub struct DashboardStats {
    pub total_employees: i64,
    pub present_today: i64,
    pub absent_today: i64,
}
