//! Highlight persistence.

use sqlx::Row;

use super::repository::{bump_revision, now, Repository};
use crate::errors::AppError;
use crate::models::Highlight;
use crate::schemas::PostHighlight;

impl Repository {
    // ==================== HIGHLIGHT OPERATIONS ====================

    pub async fn create_highlight(
        &self,
        user_id: i64,
        request: &PostHighlight,
    ) -> Result<Highlight, AppError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r#"INSERT INTO highlights
                (link_id, user_id, color, comment, start_offset, end_offset, text, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(request.link_id)
        .bind(user_id)
        .bind(&request.color)
        .bind(&request.comment)
        .bind(request.start_offset)
        .bind(request.end_offset)
        .bind(&request.text)
        .bind(now())
        .execute(&mut *tx)
        .await?;
        bump_revision(&mut tx).await?;
        tx.commit().await?;

        self.get_highlight(result.last_insert_rowid())
            .await?
            .ok_or_else(|| AppError::Internal("Highlight vanished after insert".to_string()))
    }

    pub async fn get_highlight(&self, id: i64) -> Result<Option<Highlight>, AppError> {
        let row = sqlx::query("SELECT * FROM highlights WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(highlight_from_row))
    }

    /// The user's highlights on one link, in reading order.
    pub async fn list_highlights(&self, link_id: i64, user_id: i64) -> Result<Vec<Highlight>, AppError> {
        let rows = sqlx::query(
            "SELECT * FROM highlights WHERE link_id = ? AND user_id = ? ORDER BY start_offset, id",
        )
        .bind(link_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(highlight_from_row).collect())
    }

    pub async fn delete_highlight(&self, user_id: i64, id: i64) -> Result<Highlight, AppError> {
        let highlight = self
            .get_highlight(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Highlight {} not found", id)))?;
        if highlight.user_id != user_id {
            return Err(AppError::Forbidden("You do not own this highlight".to_string()));
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM highlights WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        bump_revision(&mut tx).await?;
        tx.commit().await?;
        Ok(highlight)
    }
}

fn highlight_from_row(row: &sqlx::sqlite::SqliteRow) -> Highlight {
    Highlight {
        id: row.get("id"),
        link_id: row.get("link_id"),
        user_id: row.get("user_id"),
        color: row.get("color"),
        comment: row.get("comment"),
        start_offset: row.get("start_offset"),
        end_offset: row.get("end_offset"),
        text: row.get("text"),
        created_at: row.get("created_at"),
    }
}
