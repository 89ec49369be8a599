/// Database layer
///
/// Manages the SQLite connection pool and the embedded migrations. Every
/// manager receives a clone of the same pool.
use crate::error::{BoardError, BoardResult};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;

/// Database connection options
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub max_connections: u32,
    pub enable_wal: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            enable_wal: true,
        }
    }
}

/// Create a SQLite connection pool
pub async fn create_pool(path: &Path, options: DatabaseOptions) -> BoardResult<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(options.max_connections)
        .connect_with(
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(if options.enable_wal {
                    SqliteJournalMode::Wal
                } else {
                    SqliteJournalMode::Delete
                })
                .foreign_keys(true)
                .busy_timeout(std::time::Duration::from_secs(5)),
        )
        .await?;

    Ok(pool)
}

/// In-memory database with migrations applied
///
/// A single connection that never expires, because every new SQLite
/// in-memory connection would open an empty database.
pub async fn memory_pool() -> BoardResult<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(
            SqliteConnectOptions::new()
                .in_memory(true)
                .foreign_keys(true),
        )
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

/// Run migrations for a database
/// Migrations are embedded at compile time from ./migrations directory
pub async fn run_migrations(pool: &SqlitePool) -> BoardResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Read a TEXT column into a `text_enum!` type
///
/// A value the enum does not know means the row was written by something
/// else, so it is reported as an internal error rather than bad input.
pub fn parse_column<T>(row: &SqliteRow, column: &str) -> BoardResult<T>
where
    T: FromStr<Err = BoardError>,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|_| {
        BoardError::Internal(format!("Invalid value '{}' in column {}", raw, column))
    })
}

/// Nullable variant of [`parse_column`]
pub fn parse_optional_column<T>(row: &SqliteRow, column: &str) -> BoardResult<Option<T>>
where
    T: FromStr<Err = BoardError>,
{
    let raw: Option<String> = row.try_get(column)?;
    match raw {
        Some(value) => value.parse().map(Some).map_err(|_| {
            BoardError::Internal(format!("Invalid value '{}' in column {}", value, column))
        }),
        None => Ok(None),
    }
}

/// Encode a timestamp for storage
///
/// Fixed-width RFC 3339 in UTC so that TEXT comparisons in SQL order the
/// same way as the instants they encode.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(row: &SqliteRow, column: &str) -> BoardResult<DateTime<Utc>> {
    let raw: String = row.try_get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| BoardError::Internal(format!("Invalid timestamp in {}: {}", column, e)))
}

pub fn parse_optional_timestamp(
    row: &SqliteRow,
    column: &str,
) -> BoardResult<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|value| {
        DateTime::parse_from_rfc3339(&value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| BoardError::Internal(format!("Invalid timestamp in {}: {}", column, e)))
    })
    .transpose()
}

/// Test database connection
pub async fn test_connection(pool: &SqlitePool) -> BoardResult<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(BoardError::Database)?;

    Ok(())
}
