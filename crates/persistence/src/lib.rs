//! Persistence layer for the wallet report tool
//!
//! SQLite cache of raw API payloads (trades, positions, market tags) plus
//! storage for computed wallet stats.

pub mod repository;
pub mod schema;

pub use sqlx::sqlite::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type DbResult<T> = Result<T, DbError>;

const PRAGMAS: &[&str] = &[
    // WAL allows concurrent reads while a sync writes
    "PRAGMA journal_mode=WAL",
    "PRAGMA synchronous=NORMAL",
    "PRAGMA foreign_keys=ON",
    // 8 MB page cache (negative = KiB)
    "PRAGMA cache_size=-8000",
];

/// Database connection pool
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the cache database at `path`
    pub async fn new(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        Self::open(&format!("sqlite:{}?mode=rwc", path.display()), 5).await
    }

    /// In-memory database for tests
    pub async fn in_memory() -> DbResult<Self> {
        Self::open("sqlite::memory:", 1).await
    }

    async fn open(url: &str, max_connections: u32) -> DbResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;

        let db = Self { pool };
        db.bootstrap().await?;
        Ok(db)
    }

    /// Create the schema and apply pragmas. Statements run one at a time
    /// since sqlx executes a single statement per query.
    async fn bootstrap(&self) -> DbResult<()> {
        for statement in schema::CREATE_TABLES.split(';') {
            let sql: String = statement
                .lines()
                .filter(|line| !line.trim_start().starts_with("--"))
                .collect::<Vec<_>>()
                .join("\n");
            if sql.trim().is_empty() {
                continue;
            }
            sqlx::query(sql.trim())
                .execute(&self.pool)
                .await
                .map_err(|e| DbError::Migration(format!("{e}: {}", sql.trim())))?;
        }

        for pragma in PRAGMAS {
            sqlx::query(pragma)
                .execute(&self.pool)
                .await
                .map_err(|e| DbError::Connection(format!("{pragma} failed: {e}")))?;
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bootstrap_creates_every_table() {
        let db = Database::in_memory().await.unwrap();

        for table in [
            "wallets",
            "wallet_trades",
            "closed_positions",
            "open_positions",
            "market_tags",
            "wallet_stats",
        ] {
            let found: Option<(String,)> = sqlx::query_as(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            )
            .bind(table)
            .fetch_optional(db.pool())
            .await
            .unwrap();
            assert!(found.is_some(), "table {table} missing");
        }
    }
}
