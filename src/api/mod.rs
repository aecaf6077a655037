pub mod attendance;
pub mod dashboard;
pub mod employee;
pub mod health;

use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::{AppError, AppResult};

pub const DEFAULT_LIMIT: i64 = 100;
pub const MAX_LIMIT: i64 = 1000;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Pagination {
    /// Rows to skip (default 0)
    pub skip: Option<i64>,
    /// Rows to return, 1..=1000 (default 100)
    pub limit: Option<i64>,
}

impl Pagination {
    /// Resolves defaults and rejects out-of-range values as `(skip, limit)`.
    pub fn window(&self) -> AppResult<(i64, i64)> {
        window(self.skip, self.limit)
    }
}

pub fn window(skip: Option<i64>, limit: Option<i64>) -> AppResult<(i64, i64)> {
    let skip = skip.unwrap_or(0);
    let limit = limit.unwrap_or(DEFAULT_LIMIT);

    if skip < 0 {
        return Err(AppError::validation("skip must be greater than or equal to 0"));
    }
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(AppError::validation(format!(
            "limit must be between 1 and {MAX_LIMIT}"
        )));
    }

    Ok((skip, limit))
}
