//! Collection API endpoints and the collection detail view.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    current_user, ensure_same_id, readable_collection, respond, unindex_links, with_href,
    ApiResult,
};
use crate::auth::ActingUser;
use crate::db::{CollectionRemoval, LinkQuery, MAX_LINK_LIMIT};
use crate::errors::AppError;
use crate::models::{Collection, CollectionView, Sort};
use crate::schemas::{PostCollection, UpdateCollection};
use crate::AppState;

/// GET /api/collections - Collections the user owns or is a member of.
pub async fn list_collections(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
) -> ApiResult<Vec<Collection>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let result: Result<Vec<Collection>, AppError> = async {
        current_user(&state, user_id).await?;
        state.repo.list_collections(user_id).await
    }
    .await;
    respond(&state, revision_id, result).await
}

/// POST /api/collections - Create a collection.
pub async fn create_collection(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Json(body): Json<Value>,
) -> ApiResult<Collection> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result: Result<Collection, AppError> = async {
        current_user(&state, user_id).await?;
        let request = PostCollection::parse(&body)?;
        state.repo.create_collection(user_id, &request).await
    }
    .await;

    respond(&state, revision_id, result).await
}

#[derive(Debug, Deserialize)]
pub struct CollectionViewQuery {
    /// `Sort` index, newest first when absent.
    #[serde(default)]
    pub sort: Option<i64>,
    /// Page of `links`; `openUrls` always covers the whole collection.
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: i64,
}

/// GET /api/collections/{id} - Everything the collection page shows.
pub async fn get_collection_view(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Path(id): Path<i64>,
    Query(params): Query<CollectionViewQuery>,
) -> ApiResult<CollectionView> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result: Result<CollectionView, AppError> = async {
        let viewer = current_user(&state, user_id).await?;
        let sort = match params.sort {
            Some(index) => Sort::from_index(index)
                .ok_or_else(|| AppError::Validation(format!("Unknown sort order {}", index)))?,
            None => Sort::default(),
        };

        let (collection, _) = readable_collection(&state, user_id, id).await?;
        let owner = state.repo.require_user(collection.owner_id).await?;
        // Children always share the owner, so the owner's list contains them.
        let owner_collections = state.repo.list_collections(collection.owner_id).await?;

        let query = LinkQuery {
            collection_id: Some(id),
            sort,
            limit: params.limit.unwrap_or(MAX_LINK_LIMIT),
            offset: params.offset,
            ..LinkQuery::default()
        };
        let links = state
            .repo
            .list_links(user_id, &query)
            .await?
            .into_iter()
            .map(|link| with_href(link, &viewer, &state))
            .collect();
        let open_urls = state.repo.collection_urls(id).await?;

        Ok(CollectionView::build(
            collection,
            owner.public_profile(),
            &owner_collections,
            user_id,
            links,
            open_urls,
        ))
    }
    .await;

    respond(&state, revision_id, result).await
}

/// PUT /api/collections/{id} - Owner-only update.
pub async fn update_collection(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> ApiResult<Collection> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result: Result<Collection, AppError> = async {
        current_user(&state, user_id).await?;
        let request = UpdateCollection::parse(&body)?;
        ensure_same_id(id, request.id)?;
        state.repo.update_collection(user_id, &request).await
    }
    .await;

    respond(&state, revision_id, result).await
}

/// What a delete request did.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionRemovalResult {
    /// The caller was a member and only left.
    pub left: bool,
    pub deleted_collection_ids: Vec<i64>,
    pub deleted_link_count: usize,
}

/// DELETE /api/collections/{id} - Owners delete the subtree, members leave.
pub async fn delete_collection(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Path(id): Path<i64>,
) -> ApiResult<CollectionRemovalResult> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result: Result<CollectionRemovalResult, AppError> = async {
        current_user(&state, user_id).await?;
        match state.repo.remove_collection(user_id, id).await? {
            CollectionRemoval::Deleted {
                collection_ids,
                links,
            } => {
                for link in &links {
                    state.store.remove_link_artifacts(link).await;
                }
                let link_ids: Vec<i64> = links.iter().map(|l| l.id).collect();
                unindex_links(&state, &link_ids).await;
                Ok(CollectionRemovalResult {
                    left: false,
                    deleted_collection_ids: collection_ids,
                    deleted_link_count: link_ids.len(),
                })
            }
            CollectionRemoval::Left => Ok(CollectionRemovalResult {
                left: true,
                deleted_collection_ids: Vec::new(),
                deleted_link_count: 0,
            }),
        }
    }
    .await;

    respond(&state, revision_id, result).await
}
