//! Link API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    current_user, ensure_same_id, readable_collection, reindex_links, respond, unindex_links,
    with_href, ApiResult,
};
use crate::auth::ActingUser;
use crate::db::{LinkQuery, DEFAULT_LINK_LIMIT};
use crate::errors::AppError;
use crate::models::{Collection, Link, LinkType, Sort, UNORGANIZED_COLLECTION};
use crate::schemas::{LinkArchiveAction, PostLink, UpdateLink};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkListQuery {
    pub collection_id: Option<i64>,
    pub tag_id: Option<i64>,
    #[serde(default)]
    pub pinned_only: bool,
    pub sort: Option<i64>,
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: i64,
}

/// GET /api/links - Links visible to the user, filtered and sorted.
pub async fn list_links(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Query(params): Query<LinkListQuery>,
) -> ApiResult<Vec<Link>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result: Result<Vec<Link>, AppError> = async {
        let viewer = current_user(&state, user_id).await?;
        if let Some(collection_id) = params.collection_id {
            readable_collection(&state, user_id, collection_id).await?;
        }
        let sort = match params.sort {
            Some(index) => Sort::from_index(index)
                .ok_or_else(|| AppError::Validation(format!("Unknown sort order {}", index)))?,
            None => Sort::default(),
        };

        let query = LinkQuery {
            collection_id: params.collection_id,
            tag_id: params.tag_id,
            pinned_only: params.pinned_only,
            sort,
            limit: params.limit.unwrap_or(DEFAULT_LINK_LIMIT),
            offset: params.offset,
        };
        let links = state.repo.list_links(user_id, &query).await?;
        Ok(links
            .into_iter()
            .map(|link| with_href(link, &viewer, &state))
            .collect())
    }
    .await;

    respond(&state, revision_id, result).await
}

/// Where a new link goes: an explicit collection needs create permission,
/// a name picks (or makes) one of the user's top-level collections, and
/// nothing at all means "Unorganized".
async fn target_collection(
    state: &AppState,
    user_id: i64,
    request: &PostLink,
) -> Result<Collection, AppError> {
    let selector = request.collection.clone().unwrap_or_default();
    if let Some(id) = selector.id {
        let collection = state.repo.require_collection(id).await?;
        if !collection.access_for(user_id).can_create() {
            return Err(AppError::Forbidden(
                "You do not have permission to add links to this collection".to_string(),
            ));
        }
        return Ok(collection);
    }
    let name = selector
        .name
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNORGANIZED_COLLECTION.to_string());
    state.repo.find_or_create_collection_named(user_id, &name).await
}

/// POST /api/links - Save a link.
pub async fn create_link(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Json(body): Json<Value>,
) -> ApiResult<Link> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result: Result<Link, AppError> = async {
        let account = current_user(&state, user_id).await?;
        let request = PostLink::parse(&body)?;
        if request.link_type.unwrap_or_default() == LinkType::Url && request.url.is_none() {
            return Err(AppError::Validation("A url is required for url links".to_string()));
        }
        let collection = target_collection(&state, user_id, &request).await?;
        let link = state.repo.create_link(&account, &collection, &request).await?;
        reindex_links(&state, &[link.id]).await;
        Ok(with_href(link, &account, &state))
    }
    .await;

    respond(&state, revision_id, result).await
}

/// GET /api/links/{id}
pub async fn get_link(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Path(id): Path<i64>,
) -> ApiResult<Link> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result: Result<Link, AppError> = async {
        let viewer = current_user(&state, user_id).await?;
        let link = state.repo.require_link(id, user_id).await?;
        readable_collection(&state, user_id, link.collection_id).await?;
        Ok(with_href(link, &viewer, &state))
    }
    .await;

    respond(&state, revision_id, result).await
}

/// PUT /api/links/{id} - Update, move, retag and pin.
pub async fn update_link(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> ApiResult<Link> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result: Result<Link, AppError> = async {
        let viewer = current_user(&state, user_id).await?;
        let request = UpdateLink::parse(&body)?;
        ensure_same_id(id, request.id)?;

        let existing = state.repo.require_link(id, user_id).await?;
        let (_, access) = readable_collection(&state, user_id, existing.collection_id).await?;
        if !access.can_update() {
            return Err(AppError::Forbidden(
                "You do not have permission to update this link".to_string(),
            ));
        }

        let target = state.repo.require_collection(request.collection.id).await?;
        if target.id != existing.collection_id && !target.access_for(user_id).can_create() {
            return Err(AppError::Forbidden(
                "You do not have permission to move links into this collection".to_string(),
            ));
        }

        let link = state.repo.update_link(user_id, &request, &target).await?;
        reindex_links(&state, &[link.id]).await;
        Ok(with_href(link, &viewer, &state))
    }
    .await;

    respond(&state, revision_id, result).await
}

/// DELETE /api/links/{id} - Delete a link and its stored artifacts.
pub async fn delete_link(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Path(id): Path<i64>,
) -> ApiResult<Link> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result: Result<Link, AppError> = async {
        current_user(&state, user_id).await?;
        let link = state.repo.require_link(id, user_id).await?;
        let (_, access) = readable_collection(&state, user_id, link.collection_id).await?;
        if !access.can_delete() {
            return Err(AppError::Forbidden(
                "You do not have permission to delete this link".to_string(),
            ));
        }

        state.repo.delete_link(id).await?;
        state.store.remove_link_artifacts(&link).await;
        unindex_links(&state, &[id]).await;
        tracing::info!("Deleted link {}", id);
        Ok(link)
    }
    .await;

    respond(&state, revision_id, result).await
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveQueued {
    pub link_ids: Vec<i64>,
}

/// POST /api/links/archive - Queue links for a fresh capture.
///
/// Explicit `linkIds` take precedence over `action`; only url links are
/// re-preserved and their stored artifacts are dropped first.
pub async fn archive_links(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Json(body): Json<Value>,
) -> ApiResult<ArchiveQueued> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result: Result<ArchiveQueued, AppError> = async {
        current_user(&state, user_id).await?;
        let request = LinkArchiveAction::parse(&body)?;

        let links = match (&request.link_ids, request.action) {
            (Some(ids), _) => {
                let mut links = Vec::with_capacity(ids.len());
                for id in ids {
                    let link = state.repo.require_link(*id, user_id).await?;
                    let (_, access) =
                        readable_collection(&state, user_id, link.collection_id).await?;
                    if !access.can_update() {
                        return Err(AppError::Forbidden(format!(
                            "You do not have permission to re-preserve link {}",
                            id
                        )));
                    }
                    if link.link_type == LinkType::Url && link.url.is_some() {
                        links.push(link);
                    }
                }
                links
            }
            (None, Some(action)) => state.repo.links_for_archive_action(user_id, action).await?,
            (None, None) => {
                return Err(AppError::Validation(
                    "Either action or linkIds is required".to_string(),
                ))
            }
        };

        let link_ids: Vec<i64> = links.iter().map(|l| l.id).collect();
        state.repo.reset_preservation(&link_ids).await?;
        // Files go only once the rows no longer point at them.
        for link in &links {
            state.store.remove_link_artifacts(link).await;
        }
        reindex_links(&state, &link_ids).await;
        Ok(ArchiveQueued { link_ids })
    }
    .await;

    respond(&state, revision_id, result).await
}
