//! RSS subscription API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use super::{current_user, respond, ApiResult};
use crate::auth::ActingUser;
use crate::errors::AppError;
use crate::models::RssSubscription;
use crate::schemas::PostRssSubscription;
use crate::AppState;

/// GET /api/rss - The user's subscriptions.
pub async fn list_rss_subscriptions(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
) -> ApiResult<Vec<RssSubscription>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let result: Result<Vec<RssSubscription>, AppError> = async {
        current_user(&state, user_id).await?;
        state.repo.list_rss_subscriptions(user_id).await
    }
    .await;
    respond(&state, revision_id, result).await
}

/// POST /api/rss - Subscribe to a feed.
///
/// Entries land in `collectionId` (create permission needed) or in the
/// top-level collection named `collectionName`, falling back to the
/// subscription name.
pub async fn create_rss_subscription(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Json(body): Json<Value>,
) -> ApiResult<RssSubscription> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result: Result<RssSubscription, AppError> = async {
        current_user(&state, user_id).await?;
        let request = PostRssSubscription::parse(&body)?;

        let collection = match request.collection_id {
            Some(id) => {
                let collection = state.repo.require_collection(id).await?;
                if !collection.access_for(user_id).can_create() {
                    return Err(AppError::Forbidden(
                        "You do not have permission to add links to this collection".to_string(),
                    ));
                }
                collection
            }
            None => {
                let name = request.collection_name.as_deref().unwrap_or(&request.name);
                state.repo.find_or_create_collection_named(user_id, name).await?
            }
        };

        state
            .repo
            .create_rss_subscription(user_id, &request.name, &request.url, collection.id)
            .await
    }
    .await;

    respond(&state, revision_id, result).await
}

/// DELETE /api/rss/{id}
pub async fn delete_rss_subscription(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let result: Result<(), AppError> = async {
        current_user(&state, user_id).await?;
        state.repo.delete_rss_subscription(user_id, id).await
    }
    .await;
    respond(&state, revision_id, result).await
}
