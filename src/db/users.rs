//! User account persistence.

use sqlx::Row;

use super::repository::{
    bump_revision, flag, is_unique_violation, now, parse_json_array, to_json_array, Repository,
};
use crate::errors::AppError;
use crate::models::{AccountSettings, AiTaggingMethod, LinksRouteTo, Theme};
use crate::schemas::{PostUser, SchemaEnum, UpdateUser, UpdateUserPreference};

const USER_COLUMNS: &str = "id, name, username, email, password_hash, image, \
    archive_as_screenshot, archive_as_monolith, archive_as_pdf, archive_as_readable, \
    archive_as_wayback_machine, links_route_to, ai_tagging_method, ai_predefined_tags, \
    ai_tag_existing_links, locale, is_private, prevent_duplicate_links, collection_order, \
    whitelisted_users, referred_by, theme, readable_font_family, readable_font_size, \
    readable_line_height, readable_line_width, created_at, updated_at";

impl Repository {
    // ==================== USER OPERATIONS ====================

    pub async fn get_user(&self, id: i64) -> Result<Option<AccountSettings>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    /// Fetch a user that must exist.
    pub async fn require_user(&self, id: i64) -> Result<AccountSettings, AppError> {
        self.get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    async fn ensure_identity_free(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        except_id: i64,
    ) -> Result<(), AppError> {
        if let Some(username) = username {
            let taken = sqlx::query("SELECT 1 FROM users WHERE username = ? AND id != ?")
                .bind(username)
                .bind(except_id)
                .fetch_optional(&self.pool)
                .await?;
            if taken.is_some() {
                return Err(AppError::AlreadyExists("Username is already taken".to_string()));
            }
        }
        if let Some(email) = email {
            let taken = sqlx::query("SELECT 1 FROM users WHERE email = ? AND id != ?")
                .bind(email)
                .bind(except_id)
                .fetch_optional(&self.pool)
                .await?;
            if taken.is_some() {
                return Err(AppError::AlreadyExists("Email is already taken".to_string()));
            }
        }
        Ok(())
    }

    /// Create an account. `password_hash` is already hashed by the caller.
    pub async fn create_user(
        &self,
        request: &PostUser,
        password_hash: Option<String>,
    ) -> Result<AccountSettings, AppError> {
        self.ensure_identity_free(request.username.as_deref(), request.email.as_deref(), 0)
            .await?;

        let now = now();
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "INSERT INTO users (name, username, email, password_hash, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.name)
        .bind(&request.username)
        .bind(&request.email)
        .bind(&password_hash)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::AlreadyExists("Username or email is already taken".to_string())
            } else {
                e.into()
            }
        })?;
        bump_revision(&mut tx).await?;
        tx.commit().await?;

        let id = result.last_insert_rowid();
        tracing::info!("Created user {}", id);
        self.require_user(id).await
    }

    /// Apply an account update. Password checks happen before this is called;
    /// `new_password_hash` replaces the stored hash when set.
    pub async fn update_user(
        &self,
        id: i64,
        request: &UpdateUser,
        new_password_hash: Option<String>,
    ) -> Result<AccountSettings, AppError> {
        let existing = self.require_user(id).await?;
        self.ensure_identity_free(request.username.as_deref(), request.email.as_deref(), id)
            .await?;

        let name = request.name.clone().or(existing.name);
        let username = request.username.clone().or(existing.username);
        let email = request.email.clone().or(existing.email);
        let image = match &request.image {
            Some(image) => image.clone(),
            None => existing.image,
        };
        let password_hash = new_password_hash.or(existing.password_hash);
        let referred_by = match &request.referred_by {
            Some(referred_by) => referred_by.clone(),
            None => existing.referred_by,
        };
        let ai_predefined_tags = request
            .ai_predefined_tags
            .clone()
            .unwrap_or(existing.ai_predefined_tags);
        let collection_order = request
            .collection_order
            .clone()
            .unwrap_or(existing.collection_order);
        let whitelisted_users: Vec<String> = match &request.whitelisted_users {
            Some(users) => normalize_usernames(users),
            None => existing.whitelisted_users,
        };

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"UPDATE users SET
                name = ?, username = ?, email = ?, image = ?, password_hash = ?,
                archive_as_screenshot = ?, archive_as_monolith = ?, archive_as_pdf = ?,
                archive_as_readable = ?, archive_as_wayback_machine = ?,
                links_route_to = ?, ai_tagging_method = ?, ai_predefined_tags = ?,
                ai_tag_existing_links = ?, locale = ?, is_private = ?,
                prevent_duplicate_links = ?, collection_order = ?, whitelisted_users = ?,
                referred_by = ?, updated_at = ?
            WHERE id = ?"#,
        )
        .bind(&name)
        .bind(&username)
        .bind(&email)
        .bind(&image)
        .bind(&password_hash)
        .bind(request.archive_as_screenshot.unwrap_or(existing.archive_as_screenshot))
        .bind(request.archive_as_monolith.unwrap_or(existing.archive_as_monolith))
        .bind(request.archive_as_pdf.unwrap_or(existing.archive_as_pdf))
        .bind(request.archive_as_readable.unwrap_or(existing.archive_as_readable))
        .bind(
            request
                .archive_as_wayback_machine
                .unwrap_or(existing.archive_as_wayback_machine),
        )
        .bind(request.links_route_to.unwrap_or(existing.links_route_to).as_str())
        .bind(request.ai_tagging_method.unwrap_or(existing.ai_tagging_method).as_str())
        .bind(to_json_array(&ai_predefined_tags))
        .bind(request.ai_tag_existing_links.unwrap_or(existing.ai_tag_existing_links))
        .bind(request.locale.clone().unwrap_or(existing.locale))
        .bind(request.is_private.unwrap_or(existing.is_private))
        .bind(
            request
                .prevent_duplicate_links
                .unwrap_or(existing.prevent_duplicate_links),
        )
        .bind(to_json_array(&collection_order))
        .bind(to_json_array(&whitelisted_users))
        .bind(&referred_by)
        .bind(now())
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::AlreadyExists("Username or email is already taken".to_string())
            } else {
                e.into()
            }
        })?;
        bump_revision(&mut tx).await?;
        tx.commit().await?;

        self.require_user(id).await
    }

    pub async fn update_preferences(
        &self,
        id: i64,
        request: &UpdateUserPreference,
    ) -> Result<AccountSettings, AppError> {
        let existing = self.require_user(id).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"UPDATE users SET theme = ?, readable_font_family = ?, readable_font_size = ?,
                readable_line_height = ?, readable_line_width = ?, updated_at = ?
            WHERE id = ?"#,
        )
        .bind(request.theme.unwrap_or(existing.theme).as_str())
        .bind(request.readable_font_family.clone().or(existing.readable_font_family))
        .bind(request.readable_font_size.clone().or(existing.readable_font_size))
        .bind(request.readable_line_height.clone().or(existing.readable_line_height))
        .bind(request.readable_line_width.clone().or(existing.readable_line_width))
        .bind(now())
        .bind(id)
        .execute(&mut *tx)
        .await?;
        bump_revision(&mut tx).await?;
        tx.commit().await?;

        self.require_user(id).await
    }

    /// Replace the stored collection order.
    pub(super) async fn save_collection_order(
        conn: &mut sqlx::SqliteConnection,
        user_id: i64,
        order: &[i64],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET collection_order = ? WHERE id = ?")
            .bind(to_json_array(order))
            .bind(user_id)
            .execute(conn)
            .await?;
        Ok(())
    }
}

/// Whitelist entries are compared against lowercase usernames.
fn normalize_usernames(users: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(users.len());
    for user in users {
        let normalized = user.trim().to_lowercase();
        if !normalized.is_empty() && !out.contains(&normalized) {
            out.push(normalized);
        }
    }
    out
}

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> AccountSettings {
    let links_route_to: String = row.get("links_route_to");
    let ai_tagging_method: String = row.get("ai_tagging_method");
    let theme: String = row.get("theme");
    let ai_predefined_tags: String = row.get("ai_predefined_tags");
    let collection_order: String = row.get("collection_order");
    let whitelisted_users: String = row.get("whitelisted_users");

    AccountSettings {
        id: row.get("id"),
        name: row.get("name"),
        username: row.get("username"),
        email: row.get("email"),
        image: row.get("image"),
        archive_as_screenshot: flag(row, "archive_as_screenshot"),
        archive_as_monolith: flag(row, "archive_as_monolith"),
        archive_as_pdf: flag(row, "archive_as_pdf"),
        archive_as_readable: flag(row, "archive_as_readable"),
        archive_as_wayback_machine: flag(row, "archive_as_wayback_machine"),
        links_route_to: LinksRouteTo::from_name(&links_route_to).unwrap_or_default(),
        ai_tagging_method: AiTaggingMethod::from_name(&ai_tagging_method).unwrap_or_default(),
        ai_predefined_tags: parse_json_array(&ai_predefined_tags),
        ai_tag_existing_links: flag(row, "ai_tag_existing_links"),
        locale: row.get("locale"),
        is_private: flag(row, "is_private"),
        prevent_duplicate_links: flag(row, "prevent_duplicate_links"),
        collection_order: parse_json_array(&collection_order),
        whitelisted_users: parse_json_array(&whitelisted_users),
        referred_by: row.get("referred_by"),
        theme: Theme::from_name(&theme).unwrap_or_default(),
        readable_font_family: row.get("readable_font_family"),
        readable_font_size: row.get("readable_font_size"),
        readable_line_height: row.get("readable_line_height"),
        readable_line_width: row.get("readable_line_width"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        password_hash: row.get("password_hash"),
    }
}
