//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for all application data. Repository
//! operations are split by aggregate; they all hang off [`Repository`].

mod collections;
mod dashboard;
mod highlights;
mod links;
mod repository;
mod rss;
mod tags;
mod users;

pub use collections::*;
pub use links::*;
pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meta (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            schema_version INTEGER NOT NULL DEFAULT 1,
            revision_id INTEGER NOT NULL DEFAULT 0,
            generated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        INSERT OR IGNORE INTO meta (id, schema_version, revision_id, generated_at)
        VALUES (1, 1, 0, datetime('now'));
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT,
            username TEXT UNIQUE,
            email TEXT UNIQUE,
            password_hash TEXT,
            image TEXT,
            archive_as_screenshot INTEGER NOT NULL DEFAULT 1,
            archive_as_monolith INTEGER NOT NULL DEFAULT 1,
            archive_as_pdf INTEGER NOT NULL DEFAULT 1,
            archive_as_readable INTEGER NOT NULL DEFAULT 1,
            archive_as_wayback_machine INTEGER NOT NULL DEFAULT 0,
            links_route_to TEXT NOT NULL DEFAULT 'ORIGINAL',
            ai_tagging_method TEXT NOT NULL DEFAULT 'DISABLED',
            ai_predefined_tags TEXT NOT NULL DEFAULT '[]',
            ai_tag_existing_links INTEGER NOT NULL DEFAULT 0,
            locale TEXT NOT NULL DEFAULT 'en',
            is_private INTEGER NOT NULL DEFAULT 0,
            prevent_duplicate_links INTEGER NOT NULL DEFAULT 0,
            collection_order TEXT NOT NULL DEFAULT '[]',
            whitelisted_users TEXT NOT NULL DEFAULT '[]',
            referred_by TEXT,
            theme TEXT NOT NULL DEFAULT 'auto',
            readable_font_family TEXT,
            readable_font_size TEXT,
            readable_line_height TEXT,
            readable_line_width TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collections (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            color TEXT NOT NULL DEFAULT '#0ea5e9',
            icon TEXT,
            icon_weight TEXT,
            is_public INTEGER NOT NULL DEFAULT 0,
            parent_id INTEGER REFERENCES collections(id) ON DELETE CASCADE,
            owner_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS collection_members (
            collection_id INTEGER NOT NULL REFERENCES collections(id) ON DELETE CASCADE,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            can_create INTEGER NOT NULL DEFAULT 0,
            can_update INTEGER NOT NULL DEFAULT 0,
            can_delete INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (collection_id, user_id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS links (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL DEFAULT '',
            type TEXT NOT NULL DEFAULT 'url',
            url TEXT,
            description TEXT NOT NULL DEFAULT '',
            icon TEXT,
            icon_weight TEXT,
            color TEXT,
            collection_id INTEGER NOT NULL REFERENCES collections(id) ON DELETE CASCADE,
            created_by_id INTEGER NOT NULL REFERENCES users(id),
            image TEXT,
            pdf TEXT,
            readable TEXT,
            monolith TEXT,
            last_preserved TEXT,
            text_content TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            owner_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            archive_as_screenshot INTEGER,
            archive_as_monolith INTEGER,
            archive_as_pdf INTEGER,
            archive_as_readable INTEGER,
            archive_as_wayback_machine INTEGER,
            ai_tag INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (name, owner_id)
        );

        CREATE TABLE IF NOT EXISTS link_tags (
            link_id INTEGER NOT NULL REFERENCES links(id) ON DELETE CASCADE,
            tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
            PRIMARY KEY (link_id, tag_id)
        );

        CREATE TABLE IF NOT EXISTS pinned_links (
            link_id INTEGER NOT NULL REFERENCES links(id) ON DELETE CASCADE,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            PRIMARY KEY (link_id, user_id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS highlights (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            link_id INTEGER NOT NULL REFERENCES links(id) ON DELETE CASCADE,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            color TEXT NOT NULL,
            comment TEXT,
            start_offset INTEGER NOT NULL,
            end_offset INTEGER NOT NULL,
            text TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS rss_subscriptions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            url TEXT NOT NULL,
            owner_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            collection_id INTEGER NOT NULL REFERENCES collections(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            UNIQUE (name, owner_id)
        );

        CREATE TABLE IF NOT EXISTS dashboard_sections (
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            type TEXT NOT NULL,
            collection_id INTEGER REFERENCES collections(id) ON DELETE CASCADE,
            enabled INTEGER NOT NULL,
            sort_order INTEGER NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_collections_owner ON collections(owner_id);
        CREATE INDEX IF NOT EXISTS idx_collections_parent ON collections(parent_id);
        CREATE INDEX IF NOT EXISTS idx_links_collection ON links(collection_id);
        CREATE INDEX IF NOT EXISTS idx_links_url ON links(url);
        CREATE INDEX IF NOT EXISTS idx_highlights_link ON highlights(link_id);
        CREATE INDEX IF NOT EXISTS idx_dashboard_user ON dashboard_sections(user_id);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
