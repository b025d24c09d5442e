//! Account API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use super::{current_user, respond, ApiResult};
use crate::auth::{hash_password, verify_password, ActingUser};
use crate::errors::AppError;
use crate::models::{AccountSettings, EmailChangeNotice, PublicUser};
use crate::schemas::{EmailChange, PostUser, UpdateUser, UpdateUserPreference};
use crate::AppState;

/// POST /api/users - Create an account.
pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<AccountSettings> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result: Result<AccountSettings, AppError> = async {
        let request = PostUser::parse(&body, state.config.email_enabled)?;
        let password_hash = match &request.password {
            Some(password) => Some(hash_password(password)?),
            None => None,
        };
        state.repo.create_user(&request, password_hash).await
    }
    .await;

    respond(&state, revision_id, result).await
}

/// GET /api/users/me - The acting user's settings.
pub async fn get_me(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
) -> ApiResult<AccountSettings> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let result = current_user(&state, user_id).await;
    respond(&state, revision_id, result).await
}

/// PUT /api/users/me - Update account settings.
///
/// Changing the email of a password account needs the current `password`;
/// setting `newPassword` needs `oldPassword`.
pub async fn update_me(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Json(body): Json<Value>,
) -> ApiResult<AccountSettings> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result: Result<AccountSettings, AppError> = async {
        let account = current_user(&state, user_id).await?;
        let request = UpdateUser::parse(&body, state.config.email_enabled)?;

        let email_changes = request
            .email
            .as_ref()
            .is_some_and(|email| account.email.as_ref() != Some(email));
        if email_changes {
            if let Some(stored) = &account.password_hash {
                let password = request.password.as_deref().ok_or_else(|| {
                    AppError::BadRequest("Password is required to change the email".to_string())
                })?;
                if !verify_password(password, stored) {
                    return Err(AppError::Unauthorized("Invalid password".to_string()));
                }
            }
        }

        let new_password_hash = match &request.new_password {
            Some(new_password) => {
                if let Some(stored) = &account.password_hash {
                    let old = request.old_password.as_deref().ok_or_else(|| {
                        AppError::BadRequest("oldPassword is required to set a new password".to_string())
                    })?;
                    if !verify_password(old, stored) {
                        return Err(AppError::Unauthorized("Invalid password".to_string()));
                    }
                }
                Some(hash_password(new_password)?)
            }
            None => None,
        };

        state.repo.update_user(user_id, &request, new_password_hash).await
    }
    .await;

    respond(&state, revision_id, result).await
}

/// PUT /api/users/me/preferences - Reader preferences.
pub async fn update_preferences(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Json(body): Json<Value>,
) -> ApiResult<AccountSettings> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result: Result<AccountSettings, AppError> = async {
        current_user(&state, user_id).await?;
        let request = UpdateUserPreference::parse(&body)?;
        state.repo.update_preferences(user_id, &request).await
    }
    .await;

    respond(&state, revision_id, result).await
}

/// POST /api/users/me/email-change - What confirming an email change involves.
pub async fn email_change_notice(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Json(body): Json<Value>,
) -> ApiResult<EmailChangeNotice> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result: Result<EmailChangeNotice, AppError> = async {
        let account = current_user(&state, user_id).await?;
        let request = EmailChange::parse(&body)?;
        Ok(EmailChangeNotice::new(
            &account,
            request.email,
            state.config.stripe_enabled,
            state.config.google_sso_enabled,
        ))
    }
    .await;

    respond(&state, revision_id, result).await
}

/// GET /api/users/{id} - Public profile, subject to the privacy setting.
pub async fn get_public_user(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Path(id): Path<i64>,
) -> ApiResult<PublicUser> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result: Result<PublicUser, AppError> = async {
        let viewer = current_user(&state, user_id).await?;
        let target = state.repo.require_user(id).await?;
        if !target.visible_to(&viewer) {
            return Err(AppError::Forbidden("This profile is private".to_string()));
        }
        Ok(target.public_profile())
    }
    .await;

    respond(&state, revision_id, result).await
}
