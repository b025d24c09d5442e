//! RSS subscription persistence.

use sqlx::Row;

use super::repository::{bump_revision, is_unique_violation, now, Repository};
use crate::errors::AppError;
use crate::models::RssSubscription;

impl Repository {
    // ==================== RSS OPERATIONS ====================

    pub async fn list_rss_subscriptions(&self, owner_id: i64) -> Result<Vec<RssSubscription>, AppError> {
        let rows = sqlx::query("SELECT * FROM rss_subscriptions WHERE owner_id = ? ORDER BY name")
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(subscription_from_row).collect())
    }

    /// Subscribe `owner_id` to a feed that files entries into `collection_id`.
    pub async fn create_rss_subscription(
        &self,
        owner_id: i64,
        name: &str,
        url: &str,
        collection_id: i64,
    ) -> Result<RssSubscription, AppError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "INSERT INTO rss_subscriptions (name, url, owner_id, collection_id, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(name)
        .bind(url)
        .bind(owner_id)
        .bind(collection_id)
        .bind(now())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::AlreadyExists(format!("A subscription named \"{}\" already exists", name))
            } else {
                e.into()
            }
        })?;
        bump_revision(&mut tx).await?;
        tx.commit().await?;

        let row = sqlx::query("SELECT * FROM rss_subscriptions WHERE id = ?")
            .bind(result.last_insert_rowid())
            .fetch_one(&self.pool)
            .await?;
        Ok(subscription_from_row(&row))
    }

    pub async fn delete_rss_subscription(&self, owner_id: i64, id: i64) -> Result<(), AppError> {
        let row = sqlx::query("SELECT owner_id FROM rss_subscriptions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("RSS subscription {} not found", id)))?;
        let subscription_owner: i64 = row.get("owner_id");
        if subscription_owner != owner_id {
            return Err(AppError::Forbidden(
                "You do not own this RSS subscription".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM rss_subscriptions WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        bump_revision(&mut tx).await?;
        tx.commit().await?;
        Ok(())
    }
}

fn subscription_from_row(row: &sqlx::sqlite::SqliteRow) -> RssSubscription {
    RssSubscription {
        id: row.get("id"),
        name: row.get("name"),
        url: row.get("url"),
        owner_id: row.get("owner_id"),
        collection_id: row.get("collection_id"),
        created_at: row.get("created_at"),
    }
}
