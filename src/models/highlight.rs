//! Highlight model.

use serde::Serialize;

/// A commented text span inside a link's readable view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    pub id: i64,
    pub link_id: i64,
    pub user_id: i64,
    pub color: String,
    pub comment: Option<String>,
    pub start_offset: i64,
    pub end_offset: i64,
    pub text: String,
    pub created_at: String,
}
