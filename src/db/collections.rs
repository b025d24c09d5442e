//! Collection tree persistence: members, hierarchy checks and subtree removal.

use sqlx::{Row, SqliteConnection};

use super::repository::{
    bump_revision, check_version, concurrent_modification, flag, now, parse_json_array,
    Repository,
};
use crate::errors::AppError;
use crate::models::{
    Collection, CollectionAccess, CollectionCount, CollectionMember, Link, MemberPermissions,
    UserSummary, DEFAULT_COLLECTION_COLOR,
};
use crate::schemas::{ParentUpdate, PostCollection, UpdateCollection};

const COLLECTION_SELECT: &str = "SELECT c.id, c.name, c.description, c.color, c.icon, \
    c.icon_weight, c.is_public, c.parent_id, c.owner_id, c.created_at, c.updated_at, c.version, \
    (SELECT COUNT(*) FROM links l WHERE l.collection_id = c.id) AS link_count \
    FROM collections c";

/// Outcome of a delete request on a collection.
#[derive(Debug)]
pub enum CollectionRemoval {
    /// The owner deleted the collection and everything below it.
    Deleted {
        collection_ids: Vec<i64>,
        links: Vec<Link>,
    },
    /// A member left the collection; nothing was deleted.
    Left,
}

impl Repository {
    // ==================== COLLECTION OPERATIONS ====================

    async fn load_members(&self, collection_id: i64) -> Result<Vec<CollectionMember>, AppError> {
        let rows = sqlx::query(
            r#"SELECT m.user_id, m.can_create, m.can_update, m.can_delete,
                      u.name, u.username, u.image
               FROM collection_members m JOIN users u ON u.id = m.user_id
               WHERE m.collection_id = ?
               ORDER BY m.user_id"#,
        )
        .bind(collection_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(member_from_row).collect())
    }

    async fn hydrate_collections(
        &self,
        rows: Vec<sqlx::sqlite::SqliteRow>,
    ) -> Result<Vec<Collection>, AppError> {
        let mut collections = Vec::with_capacity(rows.len());
        for row in rows {
            let mut collection = collection_from_row(&row);
            collection.members = self.load_members(collection.id).await?;
            collections.push(collection);
        }
        Ok(collections)
    }

    pub async fn get_collection(&self, id: i64) -> Result<Option<Collection>, AppError> {
        let row = sqlx::query(&format!("{} WHERE c.id = ?", COLLECTION_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        let collections = self.hydrate_collections(row.into_iter().collect()).await?;
        Ok(collections.into_iter().next())
    }

    pub async fn require_collection(&self, id: i64) -> Result<Collection, AppError> {
        self.get_collection(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Collection {} not found", id)))
    }

    /// Collections the user owns or is a member of.
    pub async fn list_collections(&self, user_id: i64) -> Result<Vec<Collection>, AppError> {
        let rows = sqlx::query(&format!(
            "{} WHERE c.owner_id = ? OR EXISTS (SELECT 1 FROM collection_members m \
             WHERE m.collection_id = c.id AND m.user_id = ?) ORDER BY c.id",
            COLLECTION_SELECT
        ))
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        self.hydrate_collections(rows).await
    }

    /// Ids of `id` and every collection below it, parents before children.
    pub async fn subtree_ids(&self, id: i64) -> Result<Vec<i64>, AppError> {
        let mut conn = self.pool.acquire().await?;
        subtree_ids_in(&mut conn, id).await
    }

    pub async fn create_collection(
        &self,
        owner_id: i64,
        request: &PostCollection,
    ) -> Result<Collection, AppError> {
        if let Some(parent_id) = request.parent_id {
            let parent = self.require_collection(parent_id).await?;
            if parent.owner_id != owner_id {
                return Err(AppError::Forbidden(
                    "Sub-collections can only be created inside your own collections".to_string(),
                ));
            }
        }

        let now = now();
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r#"INSERT INTO collections
                (name, description, color, icon, icon_weight, parent_id, owner_id, created_at, updated_at, version)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1)"#,
        )
        .bind(&request.name)
        .bind(request.description.as_deref().unwrap_or(""))
        .bind(request.color.as_deref().unwrap_or(DEFAULT_COLLECTION_COLOR))
        .bind(&request.icon)
        .bind(&request.icon_weight)
        .bind(request.parent_id)
        .bind(owner_id)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        let id = result.last_insert_rowid();

        // New collections go to the end of the owner's sidebar order.
        let order: String = sqlx::query("SELECT collection_order FROM users WHERE id = ?")
            .bind(owner_id)
            .fetch_one(&mut *tx)
            .await?
            .get("collection_order");
        let mut order: Vec<i64> = parse_json_array(&order);
        order.push(id);
        Repository::save_collection_order(&mut tx, owner_id, &order).await?;

        bump_revision(&mut tx).await?;
        tx.commit().await?;

        tracing::info!("Created collection {} for user {}", id, owner_id);
        self.require_collection(id).await
    }

    /// Top-level collection of `owner_id` called `name`, created when missing.
    pub async fn find_or_create_collection_named(
        &self,
        owner_id: i64,
        name: &str,
    ) -> Result<Collection, AppError> {
        let existing = sqlx::query(
            "SELECT id FROM collections WHERE owner_id = ? AND name = ? AND parent_id IS NULL ORDER BY id LIMIT 1",
        )
        .bind(owner_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        match existing {
            Some(row) => self.require_collection(row.get("id")).await,
            None => {
                let request = PostCollection {
                    name: name.to_string(),
                    description: None,
                    color: None,
                    icon: None,
                    icon_weight: None,
                    parent_id: None,
                };
                self.create_collection(owner_id, &request).await
            }
        }
    }

    /// Owner-only update with cycle detection and member replacement.
    pub async fn update_collection(
        &self,
        user_id: i64,
        request: &UpdateCollection,
    ) -> Result<Collection, AppError> {
        let existing = self.require_collection(request.id).await?;
        if existing.owner_id != user_id {
            return Err(AppError::Forbidden(
                "Only the collection owner can update it".to_string(),
            ));
        }
        check_version("Collection", request.expected_version, existing.version)?;

        let parent_id = match request.parent {
            ParentUpdate::Keep => existing.parent_id,
            ParentUpdate::Root => None,
            ParentUpdate::Parent(parent_id) => {
                let parent = self.require_collection(parent_id).await?;
                if parent.owner_id != existing.owner_id {
                    return Err(AppError::Forbidden(
                        "Collections can only be nested inside your own collections".to_string(),
                    ));
                }
                Some(parent_id)
            }
        };

        let mut members: Vec<(i64, MemberPermissions)> = Vec::new();
        for member in &request.members {
            if member.user_id == existing.owner_id
                || members.iter().any(|(id, _)| *id == member.user_id)
            {
                continue;
            }
            self.require_user(member.user_id).await?;
            members.push((member.user_id, member.permissions));
        }

        let icon = match &request.icon {
            Some(icon) => icon.clone(),
            None => existing.icon.clone(),
        };
        let icon_weight = match &request.icon_weight {
            Some(weight) => weight.clone(),
            None => existing.icon_weight.clone(),
        };
        let new_version = existing.version + 1;

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r#"UPDATE collections SET
                name = ?, description = ?, color = ?, icon = ?, icon_weight = ?,
                is_public = ?, parent_id = ?, updated_at = ?, version = ?
               WHERE id = ? AND version = ?"#,
        )
        .bind(&request.name)
        .bind(request.description.as_ref().unwrap_or(&existing.description))
        .bind(request.color.as_ref().unwrap_or(&existing.color))
        .bind(&icon)
        .bind(&icon_weight)
        .bind(request.is_public.unwrap_or(existing.is_public))
        .bind(parent_id)
        .bind(now())
        .bind(new_version)
        .bind(existing.id)
        .bind(existing.version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.get_collection(existing.id).await?;
            return Err(concurrent_modification(
                &format!("collection {}", existing.id),
                current.map(|c| c.version).unwrap_or(0),
            ));
        }

        // The UPDATE above holds the write lock, so no other move can slip
        // in between this check and the commit.
        if let Some(parent_id) = parent_id.filter(|p| existing.parent_id != Some(*p)) {
            if subtree_ids_in(&mut tx, existing.id).await?.contains(&parent_id) {
                return Err(AppError::Validation(
                    "A collection cannot be moved into itself or one of its sub-collections"
                        .to_string(),
                ));
            }
        }

        sqlx::query("DELETE FROM collection_members WHERE collection_id = ?")
            .bind(existing.id)
            .execute(&mut *tx)
            .await?;
        for (member_id, permissions) in &members {
            sqlx::query(
                "INSERT INTO collection_members (collection_id, user_id, can_create, can_update, can_delete) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(existing.id)
            .bind(member_id)
            .bind(permissions.can_create)
            .bind(permissions.can_update)
            .bind(permissions.can_delete)
            .execute(&mut *tx)
            .await?;
        }

        bump_revision(&mut tx).await?;
        tx.commit().await?;

        self.require_collection(existing.id).await
    }

    /// Owners delete the collection with its whole subtree; members leave it.
    pub async fn remove_collection(
        &self,
        user_id: i64,
        id: i64,
    ) -> Result<CollectionRemoval, AppError> {
        let collection = self.require_collection(id).await?;

        match collection.access_for(user_id) {
            CollectionAccess::Owner => {
                let collection_ids = self.subtree_ids(id).await?;
                let mut links = Vec::new();
                for collection_id in &collection_ids {
                    links.extend(self.links_in_collection(*collection_id).await?);
                }

                let mut tx = self.pool.begin().await?;
                // Children first so no row ever points at a deleted parent.
                for collection_id in collection_ids.iter().rev() {
                    sqlx::query("DELETE FROM collections WHERE id = ?")
                        .bind(collection_id)
                        .execute(&mut *tx)
                        .await?;
                }

                let order: String = sqlx::query("SELECT collection_order FROM users WHERE id = ?")
                    .bind(collection.owner_id)
                    .fetch_one(&mut *tx)
                    .await?
                    .get("collection_order");
                let order: Vec<i64> = parse_json_array::<i64>(&order)
                    .into_iter()
                    .filter(|cid| !collection_ids.contains(cid))
                    .collect();
                Repository::save_collection_order(&mut tx, collection.owner_id, &order).await?;

                bump_revision(&mut tx).await?;
                tx.commit().await?;

                tracing::info!(
                    "Deleted collection {} ({} collections, {} links)",
                    id,
                    collection_ids.len(),
                    links.len()
                );
                Ok(CollectionRemoval::Deleted {
                    collection_ids,
                    links,
                })
            }
            CollectionAccess::Member(_) => {
                let mut tx = self.pool.begin().await?;
                sqlx::query("DELETE FROM collection_members WHERE collection_id = ? AND user_id = ?")
                    .bind(id)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await?;
                bump_revision(&mut tx).await?;
                tx.commit().await?;
                Ok(CollectionRemoval::Left)
            }
            CollectionAccess::Public | CollectionAccess::None => Err(AppError::Forbidden(
                "You do not have permission to delete this collection".to_string(),
            )),
        }
    }
}

/// Subtree of `id` read through `conn`. Depth is capped by the table size,
/// so a corrupted tree with a cycle still terminates.
async fn subtree_ids_in(conn: &mut SqliteConnection, id: i64) -> Result<Vec<i64>, AppError> {
    let rows = sqlx::query(
        r#"WITH RECURSIVE subtree(id, depth) AS (
               SELECT id, 0 FROM collections WHERE id = ?
               UNION
               SELECT c.id, s.depth + 1 FROM collections c JOIN subtree s ON c.parent_id = s.id
               WHERE s.depth < (SELECT COUNT(*) FROM collections)
           )
           SELECT id, MIN(depth) AS depth FROM subtree GROUP BY id ORDER BY depth, id"#,
    )
    .bind(id)
    .fetch_all(conn)
    .await?;
    Ok(rows.iter().map(|row| row.get("id")).collect())
}

fn member_from_row(row: &sqlx::sqlite::SqliteRow) -> CollectionMember {
    let user_id: i64 = row.get("user_id");
    CollectionMember {
        user_id,
        permissions: MemberPermissions {
            can_create: flag(row, "can_create"),
            can_update: flag(row, "can_update"),
            can_delete: flag(row, "can_delete"),
        },
        user: UserSummary {
            id: user_id,
            name: row.get("name"),
            username: row.get("username"),
            image: row.get("image"),
        },
    }
}

fn collection_from_row(row: &sqlx::sqlite::SqliteRow) -> Collection {
    Collection {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        color: row.get("color"),
        icon: row.get("icon"),
        icon_weight: row.get("icon_weight"),
        is_public: flag(row, "is_public"),
        parent_id: row.get("parent_id"),
        owner_id: row.get("owner_id"),
        members: Vec::new(),
        count: CollectionCount {
            links: row.get("link_count"),
        },
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use crate::schemas::PostUser;
    use serde_json::json;
    use tempfile::TempDir;

    async fn setup() -> (Repository, i64, TempDir) {
        let dir = TempDir::new().unwrap();
        let repo = Repository::new(init_database(&dir.path().join("t.sqlite")).await.unwrap());
        let user = PostUser::parse(&json!({ "username": "owner" }), false).unwrap();
        let owner = repo.create_user(&user, None).await.unwrap();
        (repo, owner.id, dir)
    }

    fn post(name: &str, parent_id: Option<i64>) -> PostCollection {
        let mut body = json!({ "name": name });
        if let Some(parent_id) = parent_id {
            body["parentId"] = json!(parent_id);
        }
        PostCollection::parse(&body).unwrap()
    }

    fn update(id: i64, name: &str, parent: serde_json::Value) -> UpdateCollection {
        UpdateCollection::parse(&json!({
            "id": id, "name": name, "members": [], "parentId": parent
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_appends_to_order() {
        let (repo, owner, _dir) = setup().await;
        let a = repo.create_collection(owner, &post("A", None)).await.unwrap();
        let b = repo.create_collection(owner, &post("B", Some(a.id))).await.unwrap();

        assert_eq!(b.parent_id, Some(a.id));
        let user = repo.require_user(owner).await.unwrap();
        assert_eq!(user.collection_order, vec![a.id, b.id]);
    }

    #[tokio::test]
    async fn test_move_under_descendant_rejected() {
        let (repo, owner, _dir) = setup().await;
        let a = repo.create_collection(owner, &post("A", None)).await.unwrap();
        let b = repo.create_collection(owner, &post("B", Some(a.id))).await.unwrap();
        let c = repo.create_collection(owner, &post("C", Some(b.id))).await.unwrap();

        for target in [a.id, c.id] {
            let result = repo.update_collection(owner, &update(a.id, "A", json!(target))).await;
            assert!(matches!(result, Err(AppError::Validation(_))));
        }
        // The rejected move was rolled back.
        let unchanged = repo.require_collection(a.id).await.unwrap();
        assert_eq!((unchanged.parent_id, unchanged.version), (None, 1));

        let moved = repo.update_collection(owner, &update(c.id, "C", json!("root"))).await.unwrap();
        assert_eq!(moved.parent_id, None);
        assert_eq!(moved.version, 2);
    }

    #[tokio::test]
    async fn test_version_mismatch() {
        let (repo, owner, _dir) = setup().await;
        let a = repo.create_collection(owner, &post("A", None)).await.unwrap();
        let mut request = update(a.id, "A2", serde_json::Value::Null);
        request.expected_version = Some(7);
        match repo.update_collection(owner, &request).await {
            Err(AppError::Conflict {
                current_version, ..
            }) => assert_eq!(current_version, 1),
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_owner_delete_removes_subtree() {
        let (repo, owner, _dir) = setup().await;
        let a = repo.create_collection(owner, &post("A", None)).await.unwrap();
        let b = repo.create_collection(owner, &post("B", Some(a.id))).await.unwrap();
        let keep = repo.create_collection(owner, &post("Keep", None)).await.unwrap();

        match repo.remove_collection(owner, a.id).await.unwrap() {
            CollectionRemoval::Deleted { collection_ids, .. } => {
                assert_eq!(collection_ids, vec![a.id, b.id]);
            }
            CollectionRemoval::Left => panic!("owner should delete"),
        }
        assert!(repo.get_collection(b.id).await.unwrap().is_none());
        let user = repo.require_user(owner).await.unwrap();
        assert_eq!(user.collection_order, vec![keep.id]);
    }

    #[tokio::test]
    async fn test_crossed_moves_cannot_both_commit() {
        let (repo, owner, _dir) = setup().await;
        let a = repo.create_collection(owner, &post("A", None)).await.unwrap();
        let b = repo.create_collection(owner, &post("B", None)).await.unwrap();

        let a_under_b = update(a.id, "A", json!(b.id));
        let b_under_a = update(b.id, "B", json!(a.id));
        let (first, second) = tokio::join!(
            repo.update_collection(owner, &a_under_b),
            repo.update_collection(owner, &b_under_a),
        );

        let committed = [&first, &second].iter().filter(|r| r.is_ok()).count();
        assert_eq!(committed, 1);
        assert!(matches!(
            if first.is_ok() { second } else { first },
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_subtree_terminates_on_cycle() {
        let (repo, owner, _dir) = setup().await;
        let a = repo.create_collection(owner, &post("A", None)).await.unwrap();
        let b = repo.create_collection(owner, &post("B", Some(a.id))).await.unwrap();
        sqlx::query("UPDATE collections SET parent_id = ? WHERE id = ?")
            .bind(b.id)
            .bind(a.id)
            .execute(&repo.pool)
            .await
            .unwrap();

        assert_eq!(repo.subtree_ids(a.id).await.unwrap(), vec![a.id, b.id]);
    }
}
