use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::{Logger, NormalizePath};
use actix_web::{App, HttpServer};
use anyhow::Context;
use dotenvy::dotenv;

use hrms_lite::config::Config;
use hrms_lite::db::init_db;
use hrms_lite::routes::{self, AppState};
use hrms_lite::utils::photo_store::DiskPhotoStore;
use tracing::info;
use tracing_appender::rolling;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    info!(addr = %config.server_addr, "Server starting...");

    let pool = init_db(&config.database_url, config.db_max_connections)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;

    let photos = DiskPhotoStore::init(&config.upload_dir, &config.photo_url_prefix)
        .with_context(|| format!("failed to create upload directory {}", config.upload_dir))?;

    let state = AppState::new(pool, Arc::new(photos)).with_prefix(config.api_prefix.clone());
    let origins = config.allowed_origins();

    HttpServer::new(move || {
        let cors = origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allow_any_method()
            .allow_any_header()
            .supports_credentials();

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .configure(|cfg| routes::configure(cfg, &state))
    })
    .bind(&config.server_addr)
    .with_context(|| format!("failed to bind {}", config.server_addr))?
    .run()
    .await?;

    Ok(())
}
