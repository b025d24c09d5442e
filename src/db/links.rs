//! Link persistence: listing, tagging, pins and preserved-artifact state.

use sqlx::{QueryBuilder, Row, Sqlite};

use super::repository::{bump_revision, check_version, concurrent_modification, now, Repository};
use crate::errors::AppError;
use crate::models::{AccountSettings, Collection, Link, LinkCollectionRef, LinkType, Sort, TagRef};
use crate::preservation::{ArchivePreferences, ArtifactKind, UNAVAILABLE};
use crate::schemas::{ArchiveAction, PostLink, SchemaEnum, UpdateLink};

const LINK_SELECT: &str = "SELECT l.id, l.name, l.type, l.url, l.description, l.icon, \
    l.icon_weight, l.color, l.collection_id, l.created_by_id, l.image, l.pdf, l.readable, \
    l.monolith, l.last_preserved, l.text_content, l.created_at, l.updated_at, l.version, \
    c.name AS collection_name, c.owner_id AS collection_owner_id \
    FROM links l JOIN collections c ON c.id = l.collection_id";

/// Default page size for link listings.
pub const DEFAULT_LINK_LIMIT: i64 = 50;
/// Largest page a single listing may return.
pub const MAX_LINK_LIMIT: i64 = 200;

/// Filters for [`Repository::list_links`].
#[derive(Debug, Clone)]
pub struct LinkQuery {
    /// Restrict to one collection; access is checked by the caller.
    pub collection_id: Option<i64>,
    pub tag_id: Option<i64>,
    pub pinned_only: bool,
    pub sort: Sort,
    pub limit: i64,
    pub offset: i64,
}

impl Default for LinkQuery {
    fn default() -> Self {
        Self {
            collection_id: None,
            tag_id: None,
            pinned_only: false,
            sort: Sort::default(),
            limit: DEFAULT_LINK_LIMIT,
            offset: 0,
        }
    }
}

impl Repository {
    // ==================== LINK OPERATIONS ====================

    /// Fill in tags and the viewer's pin state.
    async fn attach_relations(&self, links: &mut [Link], viewer_id: i64) -> Result<(), AppError> {
        for link in links.iter_mut() {
            let rows = sqlx::query(
                "SELECT t.id, t.name FROM link_tags lt JOIN tags t ON t.id = lt.tag_id WHERE lt.link_id = ? ORDER BY t.name",
            )
            .bind(link.id)
            .fetch_all(&self.pool)
            .await?;
            link.tags = rows
                .iter()
                .map(|row| TagRef {
                    id: row.get("id"),
                    name: row.get("name"),
                })
                .collect();

            let pinned = sqlx::query("SELECT 1 FROM pinned_links WHERE link_id = ? AND user_id = ?")
                .bind(link.id)
                .bind(viewer_id)
                .fetch_optional(&self.pool)
                .await?;
            link.pinned = pinned.is_some();
        }
        Ok(())
    }

    async fn hydrate_links(
        &self,
        rows: Vec<sqlx::sqlite::SqliteRow>,
        viewer_id: i64,
    ) -> Result<Vec<Link>, AppError> {
        let mut links: Vec<Link> = rows.iter().map(link_from_row).collect();
        self.attach_relations(&mut links, viewer_id).await?;
        Ok(links)
    }

    pub async fn get_link(&self, id: i64, viewer_id: i64) -> Result<Option<Link>, AppError> {
        let row = sqlx::query(&format!("{} WHERE l.id = ?", LINK_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        let links = self.hydrate_links(row.into_iter().collect(), viewer_id).await?;
        Ok(links.into_iter().next())
    }

    pub async fn require_link(&self, id: i64, viewer_id: i64) -> Result<Link, AppError> {
        self.get_link(id, viewer_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Link {} not found", id)))
    }

    /// Links visible to `viewer_id`, filtered and ordered by `query`.
    pub async fn list_links(&self, viewer_id: i64, query: &LinkQuery) -> Result<Vec<Link>, AppError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(LINK_SELECT);
        builder.push(" WHERE 1 = 1");
        match query.collection_id {
            Some(collection_id) => {
                builder.push(" AND l.collection_id = ").push_bind(collection_id);
            }
            None => {
                builder
                    .push(" AND (c.owner_id = ")
                    .push_bind(viewer_id)
                    .push(" OR EXISTS (SELECT 1 FROM collection_members m WHERE m.collection_id = l.collection_id AND m.user_id = ")
                    .push_bind(viewer_id)
                    .push("))");
            }
        }
        if let Some(tag_id) = query.tag_id {
            builder
                .push(" AND EXISTS (SELECT 1 FROM link_tags lt WHERE lt.link_id = l.id AND lt.tag_id = ")
                .push_bind(tag_id)
                .push(")");
        }
        if query.pinned_only {
            builder
                .push(" AND EXISTS (SELECT 1 FROM pinned_links p WHERE p.link_id = l.id AND p.user_id = ")
                .push_bind(viewer_id)
                .push(")");
        }
        builder.push(" ORDER BY ").push(query.sort.order_by());
        builder
            .push(" LIMIT ")
            .push_bind(query.limit.clamp(1, MAX_LINK_LIMIT))
            .push(" OFFSET ")
            .push_bind(query.offset.max(0));

        let rows = builder.build().fetch_all(&self.pool).await?;
        self.hydrate_links(rows, viewer_id).await
    }

    pub(super) async fn links_in_collection(&self, collection_id: i64) -> Result<Vec<Link>, AppError> {
        let rows = sqlx::query(&format!("{} WHERE l.collection_id = ? ORDER BY l.id", LINK_SELECT))
            .bind(collection_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(link_from_row).collect())
    }

    /// Every URL saved in a collection, oldest first, for "open all links".
    pub async fn collection_urls(&self, collection_id: i64) -> Result<Vec<String>, AppError> {
        let rows = sqlx::query(
            "SELECT url FROM links WHERE collection_id = ? AND url IS NOT NULL ORDER BY id",
        )
        .bind(collection_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(|row| row.get("url")).collect())
    }

    /// Whether `owner_id` already saved `url` in one of their collections.
    pub async fn link_with_url_exists(&self, owner_id: i64, url: &str) -> Result<bool, AppError> {
        let row = sqlx::query(
            "SELECT 1 FROM links l JOIN collections c ON c.id = l.collection_id WHERE c.owner_id = ? AND l.url = ? LIMIT 1",
        )
        .bind(owner_id)
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    /// Insert a link into `collection` with its initial artifact states.
    pub async fn create_link(
        &self,
        creator: &AccountSettings,
        collection: &Collection,
        request: &PostLink,
    ) -> Result<Link, AppError> {
        if creator.prevent_duplicate_links {
            if let Some(url) = &request.url {
                if self.link_with_url_exists(collection.owner_id, url).await? {
                    return Err(AppError::AlreadyExists(
                        "Link already exists in your collections".to_string(),
                    ));
                }
            }
        }

        let link_type = request.link_type.unwrap_or_default();
        let now = now();
        let mut tx = self.pool.begin().await?;

        let tags = Repository::resolve_tags(&mut tx, collection.owner_id, &request.tags).await?;
        let preferences = ArchivePreferences::from_account(creator).with_tag_overrides(&tags);
        let state = |kind: ArtifactKind| preferences.initial_state(link_type, kind);

        let result = sqlx::query(
            r#"INSERT INTO links
                (name, type, url, description, collection_id, created_by_id,
                 image, pdf, readable, monolith, created_at, updated_at, version)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1)"#,
        )
        .bind(request.name.as_deref().unwrap_or(""))
        .bind(link_type.as_str())
        .bind(&request.url)
        .bind(request.description.as_deref().unwrap_or(""))
        .bind(collection.id)
        .bind(creator.id)
        .bind(state(ArtifactKind::Image))
        .bind(state(ArtifactKind::Pdf))
        .bind(state(ArtifactKind::Readable))
        .bind(state(ArtifactKind::Monolith))
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        let id = result.last_insert_rowid();

        for tag in &tags {
            sqlx::query("INSERT OR IGNORE INTO link_tags (link_id, tag_id) VALUES (?, ?)")
                .bind(id)
                .bind(tag.id)
                .execute(&mut *tx)
                .await?;
        }

        bump_revision(&mut tx).await?;
        tx.commit().await?;

        tracing::info!("Created link {} in collection {}", id, collection.id);
        self.require_link(id, creator.id).await
    }

    /// Apply an update; `target` is the (already authorized) destination collection.
    pub async fn update_link(
        &self,
        viewer_id: i64,
        request: &UpdateLink,
        target: &Collection,
    ) -> Result<Link, AppError> {
        let existing = self.require_link(request.id, viewer_id).await?;
        check_version("Link", request.expected_version, existing.version)?;
        if target.owner_id != request.collection.owner_id {
            return Err(AppError::BadRequest(
                "Collection owner does not match the target collection".to_string(),
            ));
        }

        let name = request.name.clone().unwrap_or(existing.name);
        let description = request.description.clone().unwrap_or(existing.description);
        let url = match &request.url {
            Some(url) => url.clone(),
            None => existing.url,
        };
        let icon = match &request.icon {
            Some(icon) => icon.clone(),
            None => existing.icon,
        };
        let icon_weight = match &request.icon_weight {
            Some(weight) => weight.clone(),
            None => existing.icon_weight,
        };
        let color = match &request.color {
            Some(color) => color.clone(),
            None => existing.color,
        };
        let new_version = existing.version + 1;

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r#"UPDATE links SET
                name = ?, url = ?, description = ?, icon = ?, icon_weight = ?, color = ?,
                collection_id = ?, updated_at = ?, version = ?
               WHERE id = ? AND version = ?"#,
        )
        .bind(&name)
        .bind(&url)
        .bind(&description)
        .bind(&icon)
        .bind(&icon_weight)
        .bind(&color)
        .bind(target.id)
        .bind(now())
        .bind(new_version)
        .bind(existing.id)
        .bind(existing.version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.get_link(existing.id, viewer_id).await?;
            return Err(concurrent_modification(
                &format!("link {}", existing.id),
                current.map(|l| l.version).unwrap_or(0),
            ));
        }

        let tags = Repository::resolve_tags(&mut tx, target.owner_id, &request.tags).await?;
        sqlx::query("DELETE FROM link_tags WHERE link_id = ?")
            .bind(existing.id)
            .execute(&mut *tx)
            .await?;
        for tag in &tags {
            sqlx::query("INSERT OR IGNORE INTO link_tags (link_id, tag_id) VALUES (?, ?)")
                .bind(existing.id)
                .bind(tag.id)
                .execute(&mut *tx)
                .await?;
        }

        if let Some(pinned_by) = &request.pinned_by {
            let pin = if pinned_by.contains(&Some(viewer_id)) {
                "INSERT OR IGNORE INTO pinned_links (link_id, user_id) VALUES (?, ?)"
            } else {
                "DELETE FROM pinned_links WHERE link_id = ? AND user_id = ?"
            };
            sqlx::query(pin)
                .bind(existing.id)
                .bind(viewer_id)
                .execute(&mut *tx)
                .await?;
        }

        bump_revision(&mut tx).await?;
        tx.commit().await?;

        self.require_link(existing.id, viewer_id).await
    }

    pub async fn delete_link(&self, id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM links WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Link {} not found", id)));
        }
        bump_revision(&mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Record a stored artifact on the link. Readable uploads also carry the
    /// extracted text used for search.
    pub async fn store_artifact(
        &self,
        link_id: i64,
        kind: ArtifactKind,
        path: &str,
        text_content: Option<&str>,
        viewer_id: i64,
    ) -> Result<Link, AppError> {
        let now = now();
        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!(
            "UPDATE links SET {} = ?, text_content = COALESCE(?, text_content), last_preserved = ?, updated_at = ?, version = version + 1 WHERE id = ?",
            kind.column()
        ))
        .bind(path)
        .bind(text_content)
        .bind(&now)
        .bind(&now)
        .bind(link_id)
        .execute(&mut *tx)
        .await?;
        bump_revision(&mut tx).await?;
        tx.commit().await?;

        self.require_link(link_id, viewer_id).await
    }

    /// Owned url links selected by a bulk archive action.
    pub async fn links_for_archive_action(
        &self,
        owner_id: i64,
        action: ArchiveAction,
    ) -> Result<Vec<Link>, AppError> {
        let filter = match action {
            ArchiveAction::AllAndRePreserve => "",
            ArchiveAction::AllAndIgnore => " AND l.last_preserved IS NULL",
            ArchiveAction::AllBroken => {
                " AND ? IN (COALESCE(l.image, ''), COALESCE(l.pdf, ''), COALESCE(l.readable, ''), COALESCE(l.monolith, ''))"
            }
        };
        let sql = format!(
            "{} WHERE c.owner_id = ? AND l.type = 'url' AND l.url IS NOT NULL{} ORDER BY l.id",
            LINK_SELECT, filter
        );
        let mut query = sqlx::query(&sql).bind(owner_id);
        if action == ArchiveAction::AllBroken {
            query = query.bind(UNAVAILABLE);
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(link_from_row).collect())
    }

    /// Queue links for a fresh capture by clearing their artifact state.
    pub async fn reset_preservation(&self, link_ids: &[i64]) -> Result<(), AppError> {
        if link_ids.is_empty() {
            return Ok(());
        }
        let now = now();
        let mut tx = self.pool.begin().await?;
        for id in link_ids {
            sqlx::query(
                r#"UPDATE links SET image = NULL, pdf = NULL, readable = NULL, monolith = NULL,
                    last_preserved = NULL, text_content = NULL, updated_at = ?, version = version + 1
                   WHERE id = ?"#,
            )
            .bind(&now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }
        bump_revision(&mut tx).await?;
        tx.commit().await?;
        tracing::info!("Queued {} links for preservation", link_ids.len());
        Ok(())
    }

    /// Every link with its extracted text, for rebuilding the search index.
    pub async fn indexable_links(&self) -> Result<Vec<(Link, Option<String>)>, AppError> {
        let rows = sqlx::query(&format!("{} ORDER BY l.id", LINK_SELECT))
            .fetch_all(&self.pool)
            .await?;
        let texts: Vec<Option<String>> = rows.iter().map(|row| row.get("text_content")).collect();
        let mut links: Vec<Link> = rows.iter().map(link_from_row).collect();
        self.attach_relations(&mut links, 0).await?;
        Ok(links.into_iter().zip(texts).collect())
    }

    pub async fn link_text_content(&self, id: i64) -> Result<Option<String>, AppError> {
        let row = sqlx::query("SELECT text_content FROM links WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.and_then(|row| row.get("text_content")))
    }
}

fn link_from_row(row: &sqlx::sqlite::SqliteRow) -> Link {
    let link_type: String = row.get("type");
    let collection_id: i64 = row.get("collection_id");
    Link {
        id: row.get("id"),
        name: row.get("name"),
        link_type: LinkType::from_name(&link_type).unwrap_or_default(),
        url: row.get("url"),
        description: row.get("description"),
        icon: row.get("icon"),
        icon_weight: row.get("icon_weight"),
        color: row.get("color"),
        collection_id,
        collection: LinkCollectionRef {
            id: collection_id,
            name: row.get("collection_name"),
            owner_id: row.get("collection_owner_id"),
        },
        tags: Vec::new(),
        image: row.get("image"),
        pdf: row.get("pdf"),
        readable: row.get("readable"),
        monolith: row.get("monolith"),
        last_preserved: row.get("last_preserved"),
        pinned: false,
        href: String::new(),
        created_by_id: row.get("created_by_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    }
}
