//! Tag persistence.

use sqlx::{Row, SqliteConnection};

use super::repository::{bump_revision, is_unique_violation, now, optional_flag, Repository};
use crate::errors::AppError;
use crate::models::Tag;
use crate::schemas::{PostTag, TagInput, UpdateTag};

const TAG_SELECT: &str = "SELECT t.id, t.name, t.owner_id, t.archive_as_screenshot, \
    t.archive_as_monolith, t.archive_as_pdf, t.archive_as_readable, \
    t.archive_as_wayback_machine, t.ai_tag, t.created_at, t.updated_at, \
    (SELECT COUNT(*) FROM link_tags lt WHERE lt.tag_id = t.id) AS link_count \
    FROM tags t";

impl Repository {
    // ==================== TAG OPERATIONS ====================

    pub async fn list_tags(&self, owner_id: i64) -> Result<Vec<Tag>, AppError> {
        let rows = sqlx::query(&format!("{} WHERE t.owner_id = ? ORDER BY t.name", TAG_SELECT))
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(tag_from_row).collect())
    }

    pub async fn get_tag(&self, id: i64) -> Result<Option<Tag>, AppError> {
        let row = sqlx::query(&format!("{} WHERE t.id = ?", TAG_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(tag_from_row))
    }

    async fn require_own_tag(&self, owner_id: i64, id: i64) -> Result<Tag, AppError> {
        let tag = self
            .get_tag(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tag {} not found", id)))?;
        if tag.owner_id != owner_id {
            return Err(AppError::Forbidden("You do not own this tag".to_string()));
        }
        Ok(tag)
    }

    /// Create tags by label; existing labels get their explicitly set overrides updated.
    pub async fn upsert_tags(&self, owner_id: i64, request: &PostTag) -> Result<Vec<Tag>, AppError> {
        let now = now();
        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(request.tags.len());

        for tag in &request.tags {
            let o = &tag.overrides;
            sqlx::query(
                r#"INSERT INTO tags
                    (name, owner_id, archive_as_screenshot, archive_as_monolith, archive_as_pdf,
                     archive_as_readable, archive_as_wayback_machine, ai_tag, created_at, updated_at)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                   ON CONFLICT (name, owner_id) DO UPDATE SET
                     archive_as_screenshot = COALESCE(excluded.archive_as_screenshot, tags.archive_as_screenshot),
                     archive_as_monolith = COALESCE(excluded.archive_as_monolith, tags.archive_as_monolith),
                     archive_as_pdf = COALESCE(excluded.archive_as_pdf, tags.archive_as_pdf),
                     archive_as_readable = COALESCE(excluded.archive_as_readable, tags.archive_as_readable),
                     archive_as_wayback_machine = COALESCE(excluded.archive_as_wayback_machine, tags.archive_as_wayback_machine),
                     ai_tag = COALESCE(excluded.ai_tag, tags.ai_tag),
                     updated_at = excluded.updated_at"#,
            )
            .bind(&tag.label)
            .bind(owner_id)
            .bind(o.archive_as_screenshot)
            .bind(o.archive_as_monolith)
            .bind(o.archive_as_pdf)
            .bind(o.archive_as_readable)
            .bind(o.archive_as_wayback_machine)
            .bind(o.ai_tag)
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

            let id: i64 = sqlx::query("SELECT id FROM tags WHERE name = ? AND owner_id = ?")
                .bind(&tag.label)
                .bind(owner_id)
                .fetch_one(&mut *tx)
                .await?
                .get("id");
            if !ids.contains(&id) {
                ids.push(id);
            }
        }

        bump_revision(&mut tx).await?;
        tx.commit().await?;

        let mut tags = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(tag) = self.get_tag(id).await? {
                tags.push(tag);
            }
        }
        Ok(tags)
    }

    pub async fn rename_tag(
        &self,
        owner_id: i64,
        id: i64,
        request: &UpdateTag,
    ) -> Result<Tag, AppError> {
        self.require_own_tag(owner_id, id).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE tags SET name = ?, updated_at = ? WHERE id = ?")
            .bind(&request.name)
            .bind(now())
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::AlreadyExists(format!("Tag \"{}\" already exists", request.name))
                } else {
                    e.into()
                }
            })?;
        bump_revision(&mut tx).await?;
        tx.commit().await?;

        self.require_own_tag(owner_id, id).await
    }

    /// Delete a tag and return the ids of links that carried it.
    pub async fn delete_tag(&self, owner_id: i64, id: i64) -> Result<Vec<i64>, AppError> {
        self.require_own_tag(owner_id, id).await?;

        let link_ids: Vec<i64> = sqlx::query("SELECT link_id FROM link_tags WHERE tag_id = ?")
            .bind(id)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(|row| row.get("link_id"))
            .collect();

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        bump_revision(&mut tx).await?;
        tx.commit().await?;

        Ok(link_ids)
    }

    /// Connect-or-create tags by name for `owner_id` inside an open transaction.
    pub(super) async fn resolve_tags(
        conn: &mut SqliteConnection,
        owner_id: i64,
        inputs: &[TagInput],
    ) -> Result<Vec<Tag>, AppError> {
        let now = now();
        let mut tags: Vec<Tag> = Vec::with_capacity(inputs.len());
        for input in inputs {
            if input.name.is_empty() || tags.iter().any(|t| t.name == input.name) {
                continue;
            }
            sqlx::query(
                "INSERT INTO tags (name, owner_id, created_at, updated_at) VALUES (?, ?, ?, ?) ON CONFLICT (name, owner_id) DO NOTHING",
            )
            .bind(&input.name)
            .bind(owner_id)
            .bind(&now)
            .bind(&now)
            .execute(&mut *conn)
            .await?;

            let row = sqlx::query(&format!("{} WHERE t.name = ? AND t.owner_id = ?", TAG_SELECT))
                .bind(&input.name)
                .bind(owner_id)
                .fetch_one(&mut *conn)
                .await?;
            tags.push(tag_from_row(&row));
        }
        Ok(tags)
    }
}

fn tag_from_row(row: &sqlx::sqlite::SqliteRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        owner_id: row.get("owner_id"),
        archive_as_screenshot: optional_flag(row, "archive_as_screenshot"),
        archive_as_monolith: optional_flag(row, "archive_as_monolith"),
        archive_as_pdf: optional_flag(row, "archive_as_pdf"),
        archive_as_readable: optional_flag(row, "archive_as_readable"),
        archive_as_wayback_machine: optional_flag(row, "archive_as_wayback_machine"),
        ai_tag: optional_flag(row, "ai_tag"),
        link_count: row.get("link_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
