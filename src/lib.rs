//! LinkVault Backend
//!
//! REST backend for saving, organizing and preserving links, with SQLite
//! persistence, a local artifact store and Tantivy full-text search.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod preservation;
pub mod schemas;
pub mod search;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use db::Repository;
use preservation::ArtifactStore;
use search::SearchIndex;

/// Room for multipart framing on top of the upload limit.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub search: Arc<SearchIndex>,
    pub store: Arc<ArtifactStore>,
    pub config: Arc<Config>,
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let psk = state.config.api_psk.clone();
    let body_limit = state.config.max_file_bytes() as usize + MULTIPART_OVERHEAD;

    let api_routes = Router::new()
        .route("/revision", get(api::get_revision))
        // Users
        .route("/users", post(api::create_user))
        .route("/users/me", get(api::get_me).put(api::update_me))
        .route("/users/me/preferences", put(api::update_preferences))
        .route("/users/me/email-change", post(api::email_change_notice))
        .route("/users/{id}", get(api::get_public_user))
        // Collections
        .route(
            "/collections",
            get(api::list_collections).post(api::create_collection),
        )
        .route(
            "/collections/{id}",
            get(api::get_collection_view)
                .put(api::update_collection)
                .delete(api::delete_collection),
        )
        // Links
        .route("/links", get(api::list_links).post(api::create_link))
        .route("/links/archive", post(api::archive_links))
        .route(
            "/links/{id}",
            get(api::get_link)
                .put(api::update_link)
                .delete(api::delete_link),
        )
        .route("/links/{id}/highlights", get(api::list_link_highlights))
        // Tags
        .route("/tags", get(api::list_tags).post(api::create_tags))
        .route("/tags/{id}", put(api::update_tag).delete(api::delete_tag))
        // Highlights
        .route("/highlights", post(api::create_highlight))
        .route("/highlights/{id}", delete(api::delete_highlight))
        // RSS
        .route(
            "/rss",
            get(api::list_rss_subscriptions).post(api::create_rss_subscription),
        )
        .route("/rss/{id}", delete(api::delete_rss_subscription))
        // Dashboard
        .route(
            "/dashboard",
            get(api::get_dashboard_layout).put(api::update_dashboard_layout),
        )
        // Search
        .route("/search", get(api::search_links))
        // Preserved artifacts
        .route("/preserved", post(api::upload_preserved));

    // Served at the root so preserved URLs stay `<instance>/preserved/<id>?format=`.
    let preserved_routes = Router::new().route("/preserved/{id}", get(api::serve_preserved));

    let protected = Router::new()
        .nest("/api", api_routes)
        .merge(preserved_routes)
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .merge(protected)
        .merge(health_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
