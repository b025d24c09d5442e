//! Tag model.

use serde::Serialize;

/// A per-user label with optional archival overrides.
///
/// An unset override defers to the owner's account setting.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    pub archive_as_screenshot: Option<bool>,
    pub archive_as_monolith: Option<bool>,
    #[serde(rename = "archiveAsPDF")]
    pub archive_as_pdf: Option<bool>,
    pub archive_as_readable: Option<bool>,
    pub archive_as_wayback_machine: Option<bool>,
    pub ai_tag: Option<bool>,
    pub link_count: i64,
    pub created_at: String,
    pub updated_at: String,
}
