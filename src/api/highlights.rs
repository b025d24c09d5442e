//! Highlight API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use super::{current_user, readable_collection, respond, ApiResult};
use crate::auth::ActingUser;
use crate::errors::AppError;
use crate::models::Highlight;
use crate::schemas::PostHighlight;
use crate::AppState;

/// POST /api/highlights - Highlight a span of a link the user can read.
pub async fn create_highlight(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Json(body): Json<Value>,
) -> ApiResult<Highlight> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result: Result<Highlight, AppError> = async {
        current_user(&state, user_id).await?;
        let request = PostHighlight::parse(&body)?;
        let link = state.repo.require_link(request.link_id, user_id).await?;
        readable_collection(&state, user_id, link.collection_id).await?;
        state.repo.create_highlight(user_id, &request).await
    }
    .await;

    respond(&state, revision_id, result).await
}

/// GET /api/links/{id}/highlights - The user's own highlights on a link.
pub async fn list_link_highlights(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Path(link_id): Path<i64>,
) -> ApiResult<Vec<Highlight>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result: Result<Vec<Highlight>, AppError> = async {
        current_user(&state, user_id).await?;
        let link = state.repo.require_link(link_id, user_id).await?;
        readable_collection(&state, user_id, link.collection_id).await?;
        state.repo.list_highlights(link_id, user_id).await
    }
    .await;

    respond(&state, revision_id, result).await
}

/// DELETE /api/highlights/{id}
pub async fn delete_highlight(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Path(id): Path<i64>,
) -> ApiResult<Highlight> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let result: Result<Highlight, AppError> = async {
        current_user(&state, user_id).await?;
        state.repo.delete_highlight(user_id, id).await
    }
    .await;
    respond(&state, revision_id, result).await
}
