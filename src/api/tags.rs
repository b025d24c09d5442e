//! Tag API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use super::{current_user, rebuild_search_index, reindex_links, respond, ApiResult};
use crate::auth::ActingUser;
use crate::errors::AppError;
use crate::models::Tag;
use crate::schemas::{PostTag, UpdateTag};
use crate::AppState;

/// GET /api/tags - The user's tags with link counts.
pub async fn list_tags(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
) -> ApiResult<Vec<Tag>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let result: Result<Vec<Tag>, AppError> = async {
        current_user(&state, user_id).await?;
        state.repo.list_tags(user_id).await
    }
    .await;
    respond(&state, revision_id, result).await
}

/// POST /api/tags - Create tags in bulk, updating overrides of existing labels.
pub async fn create_tags(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Json(body): Json<Value>,
) -> ApiResult<Vec<Tag>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result: Result<Vec<Tag>, AppError> = async {
        current_user(&state, user_id).await?;
        let request = PostTag::parse(&body)?;
        state.repo.upsert_tags(user_id, &request).await
    }
    .await;

    respond(&state, revision_id, result).await
}

/// PUT /api/tags/{id} - Rename a tag.
pub async fn update_tag(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> ApiResult<Tag> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result: Result<Tag, AppError> = async {
        current_user(&state, user_id).await?;
        let request = UpdateTag::parse(&body)?;
        let tag = state.repo.rename_tag(user_id, id, &request).await?;
        // Tag names are indexed on every link that carries them.
        rebuild_search_index(&state).await;
        Ok(tag)
    }
    .await;

    respond(&state, revision_id, result).await
}

/// DELETE /api/tags/{id}
pub async fn delete_tag(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result: Result<(), AppError> = async {
        current_user(&state, user_id).await?;
        let link_ids = state.repo.delete_tag(user_id, id).await?;
        reindex_links(&state, &link_ids).await;
        Ok(())
    }
    .await;

    respond(&state, revision_id, result).await
}
