//! Dashboard layout endpoints.

use axum::{extract::State, Json};
use serde_json::Value;

use super::{current_user, readable_collection, respond, ApiResult};
use crate::auth::ActingUser;
use crate::errors::AppError;
use crate::models::DashboardSection;
use crate::schemas::UpdateDashboardLayout;
use crate::AppState;

/// GET /api/dashboard
pub async fn get_dashboard_layout(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
) -> ApiResult<Vec<DashboardSection>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let result: Result<Vec<DashboardSection>, AppError> = async {
        current_user(&state, user_id).await?;
        state.repo.get_dashboard_layout(user_id).await
    }
    .await;
    respond(&state, revision_id, result).await
}

/// PUT /api/dashboard - Replace the layout. Collection sections must point
/// at collections the user can read.
pub async fn update_dashboard_layout(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Json(body): Json<Value>,
) -> ApiResult<Vec<DashboardSection>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result: Result<Vec<DashboardSection>, AppError> = async {
        current_user(&state, user_id).await?;
        let request = UpdateDashboardLayout::parse(&body)?;
        for section in &request.sections {
            if let Some(collection_id) = section.collection_id {
                readable_collection(&state, user_id, collection_id).await?;
            }
        }
        state
            .repo
            .replace_dashboard_layout(user_id, &request.sections)
            .await
    }
    .await;

    respond(&state, revision_id, result).await
}
