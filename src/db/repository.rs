//! Database repository core: the shared pool, the global revision counter and
//! the row helpers every aggregate uses.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::errors::AppError;
use crate::models::RevisionInfo;

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pub(super) pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the current revision ID.
    pub async fn get_revision_id(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("revision_id"))
    }

    pub async fn get_revision_info(&self) -> Result<RevisionInfo, AppError> {
        let row = sqlx::query("SELECT revision_id, generated_at FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(RevisionInfo {
            revision_id: row.get("revision_id"),
            generated_at: row.get("generated_at"),
        })
    }

    /// Increment the revision ID and return the new value.
    pub async fn increment_revision(&self) -> Result<i64, AppError> {
        let mut conn = self.pool.acquire().await?;
        bump_revision(&mut conn).await?;
        drop(conn);
        self.get_revision_id().await
    }
}

/// Bump the revision inside an open transaction.
pub(super) async fn bump_revision(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
        .bind(now())
        .execute(conn)
        .await?;
    Ok(())
}

pub(super) fn now() -> String {
    Utc::now().to_rfc3339()
}

/// Reject a write whose `expectedVersion` no longer matches.
pub(super) fn check_version(
    what: &str,
    expected: Option<i64>,
    current: i64,
) -> Result<(), AppError> {
    match expected {
        Some(expected) if expected != current => Err(AppError::Conflict {
            message: format!(
                "{} version mismatch: expected {}, current {}",
                what, expected, current
            ),
            current_version: current,
        }),
        _ => Ok(()),
    }
}

/// Error for a conditional `UPDATE ... WHERE version = ?` that matched nothing.
pub(super) fn concurrent_modification(what: &str, current_version: i64) -> AppError {
    AppError::Conflict {
        message: format!("Concurrent modification detected for {}", what),
        current_version,
    }
}

pub(super) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

pub(super) fn parse_json_array<T: DeserializeOwned>(s: &str) -> Vec<T> {
    serde_json::from_str(s).unwrap_or_default()
}

pub(super) fn to_json_array<T: Serialize>(items: &[T]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

pub(super) fn flag(row: &sqlx::sqlite::SqliteRow, column: &str) -> bool {
    let value: i64 = row.get(column);
    value != 0
}

pub(super) fn optional_flag(row: &sqlx::sqlite::SqliteRow, column: &str) -> Option<bool> {
    let value: Option<i64> = row.get(column);
    value.map(|v| v != 0)
}
