use std::ops::{Deref, DerefMut};
use std::str::FromStr;
use std::time::Duration;

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use tracing::{info, warn};

use crate::error::AppResult;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS employees (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        employee_id TEXT NOT NULL,
        full_name   TEXT NOT NULL,
        email       TEXT NOT NULL,
        department  TEXT NOT NULL,
        photo_path  TEXT,
        created_at  TEXT NOT NULL,
        updated_at  TEXT NOT NULL,
        CONSTRAINT uq_employee_id UNIQUE (employee_id),
        CONSTRAINT uq_email UNIQUE (email)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS ix_employees_full_name ON employees (full_name)",
    "CREATE INDEX IF NOT EXISTS ix_employees_department ON employees (department)",
    r#"
    CREATE TABLE IF NOT EXISTS attendance (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        employee_id TEXT NOT NULL,
        date        TEXT NOT NULL,
        status      TEXT NOT NULL CHECK (status IN ('Present', 'Absent')),
        created_at  TEXT NOT NULL,
        updated_at  TEXT NOT NULL,
        CONSTRAINT uq_employee_date UNIQUE (employee_id, date)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS ix_attendance_date ON attendance (date)",
];

pub async fn init_db(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    // writers queue on the database lock instead of failing with SQLITE_BUSY
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;
    info!(database_url, "Database ready");

    Ok(pool)
}

pub async fn create_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// A write transaction opened with `BEGIN IMMEDIATE`.
///
/// The database write lock is taken before the first read, so a
/// check-then-write sequence never interleaves with another writer. Concurrent
/// writers wait in the busy handler and run one after another.
///
/// Dropping an unfinished transaction detaches its connection from the pool, so
/// a half-done transaction is closed and never handed to the next caller.
pub struct WriteTx {
    conn: Option<PoolConnection<Sqlite>>,
}

impl WriteTx {
    pub async fn begin(pool: &SqlitePool) -> Result<Self, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        Ok(Self { conn: Some(conn) })
    }

    pub async fn commit(self) -> Result<(), sqlx::Error> {
        self.end("COMMIT").await
    }

    pub async fn rollback(self) -> Result<(), sqlx::Error> {
        self.end("ROLLBACK").await
    }

    async fn end(mut self, statement: &'static str) -> Result<(), sqlx::Error> {
        if let Some(conn) = self.conn.as_deref_mut() {
            sqlx::query(statement).execute(conn).await?;
        }
        // back to the pool
        self.conn.take();
        Ok(())
    }
}

impl Deref for WriteTx {
    type Target = SqliteConnection;

    fn deref(&self) -> &SqliteConnection {
        match self.conn.as_deref() {
            Some(conn) => conn,
            None => unreachable!("write transaction used after it ended"),
        }
    }
}

impl DerefMut for WriteTx {
    fn deref_mut(&mut self) -> &mut SqliteConnection {
        match self.conn.as_deref_mut() {
            Some(conn) => conn,
            None => unreachable!("write transaction used after it ended"),
        }
    }
}

impl Drop for WriteTx {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            warn!("Write transaction dropped before commit; closing its connection");
            drop(conn.detach());
        }
    }
}

/// Commits `tx` when `result` is `Ok`, otherwise rolls it back before handing the
/// error to the caller.
pub async fn finish<T>(tx: WriteTx, result: AppResult<T>) -> AppResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            Err(e)
        }
    }
}
