#![allow(clippy::unwrap_used, clippy::expect_used)]
#![allow(dead_code)]

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tallybook::AppState;
use tempfile::TempDir;

pub async fn temp_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("connect sqlite::memory:");
    sqlx::query("PRAGMA foreign_keys=ON;")
        .execute(&pool)
        .await
        .unwrap();
    pool
}

/// File-backed state with migrations applied and a default wallet created.
/// Keep the TempDir alive for as long as the state is in use.
pub async fn temp_state() -> (TempDir, AppState) {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = AppState::open(&dir.path().join("tallybook.sqlite3"))
        .await
        .expect("open app state");
    (dir, state)
}
