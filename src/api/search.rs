//! Search API endpoint.

use std::collections::HashMap;

use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use super::{current_user, respond, with_href, ApiResult};
use crate::auth::ActingUser;
use crate::errors::AppError;
use crate::models::Link;
use crate::AppState;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    /// Maximum number of results (default: 20).
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

/// Maximum number of search results allowed.
const MAX_SEARCH_LIMIT: usize = 100;

/// Hits fetched from the index per requested result, leaving room for
/// links the viewer cannot read.
const OVERFETCH: usize = 4;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
    pub total: usize,
    pub limit: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub link: Link,
    pub score: f32,
}

/// GET /api/search - Full-text search over links the viewer can read.
pub async fn search_links(
    State(state): State<AppState>,
    ActingUser(user_id): ActingUser,
    Query(params): Query<SearchQuery>,
) -> ApiResult<SearchResponse> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result: Result<SearchResponse, AppError> = async {
        let viewer = current_user(&state, user_id).await?;
        let limit = params.limit.clamp(1, MAX_SEARCH_LIMIT);
        let hits = state.search.search(&params.q, limit * OVERFETCH)?;

        let mut readable: HashMap<i64, bool> = HashMap::new();
        let mut results = Vec::new();
        for hit in hits {
            if results.len() == limit {
                break;
            }
            let Some(link) = state.repo.get_link(hit.link_id, user_id).await? else {
                continue;
            };
            let can_read = match readable.get(&link.collection_id) {
                Some(can_read) => *can_read,
                None => {
                    let can_read = match state.repo.get_collection(link.collection_id).await? {
                        Some(collection) => collection.access_for(user_id).can_read(),
                        None => false,
                    };
                    readable.insert(link.collection_id, can_read);
                    can_read
                }
            };
            if can_read {
                results.push(SearchResultItem {
                    link: with_href(link, &viewer, &state),
                    score: hit.score,
                });
            }
        }

        let total = results.len();
        Ok(SearchResponse {
            results,
            total,
            limit,
        })
    }
    .await;

    respond(&state, revision_id, result).await
}
