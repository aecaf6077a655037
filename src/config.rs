use std::env;
use std::fmt::Display;
use std::str::FromStr;

use anyhow::{Context, Result};
use dotenvy::dotenv;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: String,
    pub database_url: String,
    pub db_max_connections: u32,

    // Photo uploads: on-disk directory, and the relative prefix recorded on employees
    pub upload_dir: String,
    pub photo_url_prefix: String,

    pub api_prefix: String,
    pub frontend_url: String,

    // Logging
    pub log_dir: String,
    pub log_level: tracing::Level,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: var_or("SERVER_ADDR", "0.0.0.0:8000"),
            database_url: var_or("DATABASE_URL", "sqlite://hrms.db"),
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", "5")?,
            upload_dir: var_or("UPLOAD_DIR", "uploads/photos"),
            photo_url_prefix: var_or("PHOTO_URL_PREFIX", "uploads/photos"),
            api_prefix: var_or("API_PREFIX", "/api"),
            frontend_url: var_or("FRONTEND_URL", "http://localhost:5173"),
            log_dir: var_or("LOG_DIR", "logs"),
            log_level: parse_or("LOG_LEVEL", "info")?,
        })
    }

    /// Origins allowed to call the API from a browser.
    pub fn allowed_origins(&self) -> Vec<String> {
        let mut origins = vec![self.frontend_url.clone()];
        for host in ["localhost", "127.0.0.1"] {
            for port in [3000, 5173, 5174, 5175, 5176, 5177] {
                let origin = format!("http://{host}:{port}");
                if !origins.contains(&origin) {
                    origins.push(origin);
                }
            }
        }
        origins
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = var_or(key, default);
    raw.parse::<T>()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("{key} has invalid value '{raw}'"))
}
