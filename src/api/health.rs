use actix_web::{HttpResponse, Responder, get};
use serde_json::json;
use utoipa::OpenApi;

use crate::docs::ApiDoc;

#[get("/")]
pub async fn index() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "message": "Welcome to HRMS Lite API",
        "docs": "/api-doc/openapi.json",
        "health": "/api/health",
    }))
}

#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "API is healthy", body = Object, example = json!({
            "status": "healthy",
            "version": "0.1.0"
        }))
    ),
    tag = "Health"
)]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[get("/api-doc/openapi.json")]
pub async fn openapi_json() -> impl Responder {
    HttpResponse::Ok().json(ApiDoc::openapi())
}
