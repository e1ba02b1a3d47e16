use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;

use crate::errors::{AppError, AppResult};

/// One row of `upload_history`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub attempt_id: String,
    pub file_name: String,
    pub media_kind: Option<String>,
    pub file_size: i64,
    pub status: String, // "confirmed", "failed", "cancelled"
    pub error_message: Option<String>,
    pub remote_url: Option<String>,
    pub attempted_at: String,
}

/// Local SQLite store backing the durable snapshot and the attempt history.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        log::info!("Database path: {}", db_path.display());

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| {
                log::error!("Failed to open database {}: {}", db_path.display(), e);
                AppError::Config(format!("Cannot open database: {}", e))
            })?;

        let db = Self { pool };
        db.init_schema().await?;
        log::info!("Database initialized successfully");
        Ok(db)
    }

    /// Private in-memory database. A single connection keeps every query on the
    /// same memory instance.
    pub async fn in_memory() -> AppResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }

    async fn init_schema(&self) -> AppResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS persisted_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS upload_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                attempt_id TEXT NOT NULL UNIQUE,
                file_name TEXT NOT NULL,
                media_kind TEXT,
                file_size INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL,
                error_message TEXT,
                remote_url TEXT,
                attempted_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_upload_history_date ON upload_history(attempted_at)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_upload_history_status ON upload_history(status)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_value(&self, key: &str) -> AppResult<Option<String>> {
        let row = sqlx::query("SELECT value FROM persisted_state WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get::<String, _>("value")))
    }

    pub async fn put_value(&self, key: &str, value: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO persisted_state (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete_value(&self, key: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM persisted_state WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn record_attempt(&self, record: &AttemptRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO upload_history
                (attempt_id, file_name, media_kind, file_size, status, error_message, remote_url, attempted_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.attempt_id)
        .bind(&record.file_name)
        .bind(&record.media_kind)
        .bind(record.file_size)
        .bind(&record.status)
        .bind(&record.error_message)
        .bind(&record.remote_url)
        .bind(&record.attempted_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn recent_attempts(&self, limit: i64) -> AppResult<Vec<AttemptRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT attempt_id, file_name, media_kind, file_size, status, error_message, remote_url, attempted_at
            FROM upload_history
            ORDER BY attempted_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let records = rows
            .into_iter()
            .map(|row| AttemptRecord {
                attempt_id: row.get("attempt_id"),
                file_name: row.get("file_name"),
                media_kind: row.get("media_kind"),
                file_size: row.get("file_size"),
                status: row.get("status"),
                error_message: row.get("error_message"),
                remote_url: row.get("remote_url"),
                attempted_at: row.get("attempted_at"),
            })
            .collect();

        Ok(records)
    }

    pub async fn cleanup_old_attempts(&self, days: u32) -> AppResult<u64> {
        let cutoff = chrono::Utc::now() - chrono::Duration::days(i64::from(days));

        let result = sqlx::query("DELETE FROM upload_history WHERE attempted_at < ?")
            .bind(cutoff.to_rfc3339())
            .execute(&self.pool)
            .await?;

        let removed = result.rows_affected();
        if removed > 0 {
            log::info!("Removed {} upload history entries older than {} days", removed, days);
        }
        Ok(removed)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, status: &str, attempted_at: String) -> AttemptRecord {
        AttemptRecord {
            attempt_id: id.to_string(),
            file_name: "cat.png".to_string(),
            media_kind: Some("image".to_string()),
            file_size: 200_000,
            status: status.to_string(),
            error_message: None,
            remote_url: None,
            attempted_at,
        }
    }

    #[tokio::test]
    async fn test_put_get_delete_value() {
        let db = Database::in_memory().await.unwrap();
        assert_eq!(db.get_value("user").await.unwrap(), None);

        db.put_value("user", r#"{"id":"1"}"#).await.unwrap();
        db.put_value("user", r#"{"id":"2"}"#).await.unwrap();
        assert_eq!(
            db.get_value("user").await.unwrap().as_deref(),
            Some(r#"{"id":"2"}"#)
        );

        assert!(db.delete_value("user").await.unwrap());
        assert!(!db.delete_value("user").await.unwrap());
    }

    #[tokio::test]
    async fn test_history_listing_and_cleanup() {
        let db = Database::in_memory().await.unwrap();
        let old = (chrono::Utc::now() - chrono::Duration::days(90)).to_rfc3339();
        let fresh = chrono::Utc::now().to_rfc3339();

        db.record_attempt(&record("old", "failed", old)).await.unwrap();
        db.record_attempt(&record("new", "confirmed", fresh)).await.unwrap();

        let all = db.recent_attempts(10).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].attempt_id, "new");

        assert_eq!(db.cleanup_old_attempts(30).await.unwrap(), 1);
        let remaining = db.recent_attempts(10).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].status, "confirmed");
    }
}
