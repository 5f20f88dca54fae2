//! SQLite pool construction and schema bootstrap.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

/// Open (and create if necessary) the SQLite database at `database_url`
/// and ensure the schema exists.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;
    init_schema(&pool).await?;
    Ok(pool)
}

async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS refresh_runs (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             started_at TEXT NOT NULL,
             finished_at TEXT NOT NULL,
             total INTEGER NOT NULL,
             succeeded INTEGER NOT NULL,
             failed INTEGER NOT NULL,
             cancelled INTEGER NOT NULL DEFAULT 0
         )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS check_outcomes (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             run_id INTEGER,
             provider TEXT NOT NULL,
             outcome TEXT NOT NULL,
             price TEXT,
             checked_at TEXT NOT NULL
         )",
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_pool_initialises_schema_on_in_memory_database() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        // both tables exist and are queryable
        sqlx::query("SELECT COUNT(*) FROM refresh_runs")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("SELECT COUNT(*) FROM check_outcomes")
            .execute(&pool)
            .await
            .unwrap();
    }
}
