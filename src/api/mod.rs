//! REST API module.
//!
//! Handlers parse untyped JSON through `schemas`, call the repository and
//! answer in the `{ success, data, revisionId }` envelope.

mod collections;
mod dashboard;
mod highlights;
mod links;
mod preserved;
mod revision;
mod rss;
mod search;
mod tags;
mod users;

pub use collections::*;
pub use dashboard::*;
pub use highlights::*;
pub use links::*;
pub use preserved::*;
pub use revision::*;
pub use rss::*;
pub use search::*;
pub use tags::*;
pub use users::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::{AppError, AppErrorWithRevision};
use crate::models::{AccountSettings, Collection, CollectionAccess, Link};
use crate::preservation::generate_link_href;
use crate::AppState;

/// Success response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub revision_id: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T, revision_id: i64) -> Self {
        Self {
            success: true,
            data,
            revision_id,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppErrorWithRevision>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T, revision_id: i64) -> ApiResult<T> {
    Ok(ApiResponse::new(data, revision_id))
}

/// Create an error API response.
pub fn error<T: Serialize>(err: AppError, revision_id: i64) -> ApiResult<T> {
    Err(AppErrorWithRevision {
        error: err,
        revision_id,
    })
}

/// Wrap a handler outcome. Successful writes report the revision they produced.
async fn respond<T: Serialize>(
    state: &AppState,
    revision_id: i64,
    result: Result<T, AppError>,
) -> ApiResult<T> {
    match result {
        Ok(data) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(data, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// The account behind the `x-user-id` header. An unknown id is an
/// authentication failure, not a missing resource.
async fn current_user(state: &AppState, user_id: i64) -> Result<AccountSettings, AppError> {
    match state.repo.get_user(user_id).await? {
        Some(account) => Ok(account),
        None => Err(AppError::Unauthorized(format!("Unknown user {}", user_id))),
    }
}

/// Load a collection and the viewer's access to it, rejecting unreadable ones.
async fn readable_collection(
    state: &AppState,
    user_id: i64,
    collection_id: i64,
) -> Result<(Collection, CollectionAccess), AppError> {
    let collection = state.repo.require_collection(collection_id).await?;
    let access = collection.access_for(user_id);
    if !access.can_read() {
        return Err(AppError::Forbidden(
            "You do not have access to this collection".to_string(),
        ));
    }
    Ok((collection, access))
}

/// Fill in where `viewer` lands when opening `link`.
fn with_href(mut link: Link, viewer: &AccountSettings, state: &AppState) -> Link {
    let instance_url = Some(state.config.instance_url.as_str()).filter(|u| !u.is_empty());
    link.href = generate_link_href(&link, viewer.links_route_to, instance_url);
    link
}

/// Re-index links after a write. Index failures degrade search only.
async fn reindex_links(state: &AppState, link_ids: &[i64]) {
    for id in link_ids {
        let link = match state.repo.get_link(*id, 0).await {
            Ok(Some(link)) => link,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!("Failed to load link {} for reindex: {}", id, e);
                continue;
            }
        };
        let text = state.repo.link_text_content(*id).await.unwrap_or(None);
        if let Err(e) = state.search.index_link(&link, text.as_deref()).await {
            tracing::warn!("Failed to index link {}: {}", id, e);
        }
    }
}

async fn unindex_links(state: &AppState, link_ids: &[i64]) {
    if let Err(e) = state.search.remove_links(link_ids).await {
        tracing::warn!("Failed to remove {} links from the index: {}", link_ids.len(), e);
    }
}

/// Rebuild the whole search index from the database.
pub async fn rebuild_search_index(state: &AppState) {
    let links = match state.repo.indexable_links().await {
        Ok(links) => links,
        Err(e) => {
            tracing::warn!("Failed to list links for reindex: {}", e);
            return;
        }
    };
    if let Err(e) = state.search.rebuild(&links).await {
        tracing::warn!("Failed to rebuild search index: {}", e);
    }
}

/// Reject a body whose `id` disagrees with the path.
fn ensure_same_id(path_id: i64, body_id: i64) -> Result<(), AppError> {
    if path_id != body_id {
        return Err(AppError::BadRequest(format!(
            "Body id {} does not match path id {}",
            body_id, path_id
        )));
    }
    Ok(())
}
