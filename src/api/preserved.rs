//! Preserved-artifact upload and serving.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::{current_user, readable_collection, reindex_links, respond, with_href, ApiResult};
use crate::auth::ActingUser;
use crate::errors::{AppError, AppErrorWithRevision};
use crate::models::Link;
use crate::preservation::{ArchivedFormat, ArtifactStore, is_stored};
use crate::schemas::{SchemaEnum, UploadFile, UploadForm, UploadedFile};
use crate::AppState;

/// Collect the raw multipart fields; validation happens in [`UploadFile::parse`].
async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let field_name = field.name().map(|n| n.to_string());
        match field_name.as_deref() {
            Some("file") => {
                let filename = field.file_name().map(|n| n.to_string());
                let mimetype = field.content_type().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Read error: {}", e)))?
                    .to_vec();
                form.files.push(UploadedFile {
                    filename,
                    mimetype,
                    bytes,
                });
            }
            Some("id") => {
                form.id = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("Read error: {}", e)))?,
                );
            }
            Some("format") => {
                form.format = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("Read error: {}", e)))?,
                );
            }
            _ => {}
        }
    }

    Ok(form)
}

/// POST /api/preserved - Upload an artifact for a link (multipart: `file`, `id`, `format`).
pub async fn upload_preserved(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    multipart: Multipart,
) -> ApiResult<Link> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result: Result<Link, AppError> = async {
        let viewer = current_user(&state, user_id).await?;
        let form = read_upload_form(multipart).await?;
        let upload = UploadFile::parse(form, state.config.max_file_bytes() as usize)?;

        let link = state.repo.require_link(upload.id, user_id).await?;
        let (_, access) = readable_collection(&state, user_id, link.collection_id).await?;
        if !access.can_update() {
            return Err(AppError::Forbidden(
                "You do not have permission to update this link".to_string(),
            ));
        }

        let path = ArtifactStore::relative_path(link.collection_id, link.id, upload.format);
        let previous = upload.format.kind().value(&link).map(str::to_string);
        state.store.write(&path, &upload.file.bytes).await?;

        let text_content = (upload.format == ArchivedFormat::Readability)
            .then(|| String::from_utf8_lossy(&upload.file.bytes).into_owned());
        let link = state
            .repo
            .store_artifact(
                link.id,
                upload.format.kind(),
                &path,
                text_content.as_deref(),
                user_id,
            )
            .await?;
        // A jpeg replacing a png (or the reverse) leaves the old file behind.
        if let Some(previous) = previous.filter(|p| is_stored(Some(p.as_str())) && *p != path) {
            if let Err(e) = state.store.remove(&previous).await {
                tracing::warn!("Failed to remove replaced artifact {}: {}", previous, e);
            }
        }
        reindex_links(&state, &[link.id]).await;

        tracing::info!(
            "Stored {} artifact for link {} ({} bytes)",
            upload.format.as_str(),
            link.id,
            upload.file.bytes.len()
        );
        Ok(with_href(link, &viewer, &state))
    }
    .await;

    respond(&state, revision_id, result).await
}

#[derive(Debug, Deserialize)]
pub struct PreservedQuery {
    pub format: String,
}

/// GET /preserved/{id}?format= - Serve a stored artifact with its content type.
pub async fn serve_preserved(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Path(id): Path<i64>,
    Query(params): Query<PreservedQuery>,
) -> Result<Response, AppErrorWithRevision> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result: Result<Response, AppError> = async {
        current_user(&state, user_id).await?;
        let format = ArchivedFormat::from_name(&params.format).ok_or_else(|| {
            AppError::Validation(format!(
                "Invalid format, expected {}",
                ArchivedFormat::expected()
            ))
        })?;

        let link = state.repo.require_link(id, user_id).await?;
        readable_collection(&state, user_id, link.collection_id).await?;

        let stored = format.kind().value(&link);
        let Some(path) = stored.filter(|_| is_stored(stored)) else {
            return Err(AppError::NotFound(format!(
                "Link {} has no {} artifact",
                id,
                format.as_str()
            )));
        };

        let bytes = state.store.read(path).await?;
        Ok(([(header::CONTENT_TYPE, format.content_type())], bytes).into_response())
    }
    .await;

    result.map_err(|error| AppErrorWithRevision {
        error,
        revision_id,
    })
}
