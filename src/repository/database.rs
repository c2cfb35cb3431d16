use anyhow::Result;
use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Sqlite, SqlitePool};
use std::path::Path;
use tokio::fs;
use tracing::info;

pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    // Ensure the directory exists
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let db_url = format!("sqlite://{}", db_path.display());

    if !Sqlite::database_exists(&db_url).await? {
        info!(path = %db_path.display(), "Creating session database");
        Sqlite::create_database(&db_url).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(2)
        .connect(&db_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

pub async fn init_test_database() -> Result<SqlitePool> {
    // A single connection keeps the in-memory database alive and shared
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;

    #[tokio::test]
    async fn test_init_test_database() {
        let pool = init_test_database().await.unwrap();

        let row = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'auth_session'")
            .fetch_optional(&pool)
            .await
            .unwrap();
        assert!(row.is_some());
        assert_eq!(row.unwrap().get::<String, _>("name"), "auth_session");
    }

    #[tokio::test]
    async fn test_init_database_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("session.db");

        let pool = init_database(&path).await.unwrap();
        pool.close().await;

        assert!(path.exists());
    }
}
