use std::sync::Arc;

use actix_web::web::{self, Data};
use sqlx::SqlitePool;

use crate::{
    api::{attendance, dashboard, employee, health},
    error::AppError,
    utils::photo_store::PhotoStore,
};

/// Everything the handlers need, shared across workers.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub photos: Arc<dyn PhotoStore>,
    pub api_prefix: String,
}

impl AppState {
    pub fn new(pool: SqlitePool, photos: Arc<dyn PhotoStore>) -> Self {
        Self {
            pool,
            photos,
            api_prefix: "/api".to_string(),
        }
    }

    pub fn with_prefix(mut self, api_prefix: impl Into<String>) -> Self {
        self.api_prefix = api_prefix.into();
        self
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, state: &AppState) {
    // extractor failures answer with the same `{"detail": ...}` body as handlers
    cfg.app_data(Data::new(state.pool.clone()))
        .app_data(Data::from(state.photos.clone()))
        .app_data(
            web::JsonConfig::default()
                .error_handler(|err, _| AppError::validation(err.to_string()).into()),
        )
        .app_data(
            web::QueryConfig::default()
                .error_handler(|err, _| AppError::validation(err.to_string()).into()),
        )
        .app_data(
            web::PathConfig::default()
                .error_handler(|err, _| AppError::validation(err.to_string()).into()),
        )
        .service(health::index)
        .service(health::openapi_json);

    cfg.service(
        web::scope(&state.api_prefix)
            .service(web::resource("/health").route(web::get().to(health::health)))
            .service(
                web::scope("/employees")
                    // /employees
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    // /employees/json
                    .service(
                        web::resource("/json")
                            .route(web::post().to(employee::create_employee_json)),
                    )
                    // /employees/{employee_id}
                    .service(
                        web::resource("/{employee_id}")
                            .route(web::get().to(employee::get_employee))
                            .route(web::put().to(employee::update_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    // /attendance
                    .service(
                        web::resource("")
                            .route(web::post().to(attendance::mark_attendance))
                            .route(web::get().to(attendance::list_attendance)),
                    )
                    // /attendance/employee/{employee_id}
                    .service(
                        web::resource("/employee/{employee_id}")
                            .route(web::get().to(attendance::employee_attendance)),
                    )
                    // /attendance/{attendance_id}
                    .service(
                        web::resource("/{attendance_id}")
                            .route(web::get().to(attendance::get_attendance)),
                    ),
            )
            .service(
                web::scope("/dashboard").service(
                    web::resource("/stats").route(web::get().to(dashboard::dashboard_stats)),
                ),
            ),
    );
}
