//! RSS subscription model.

use serde::Serialize;

/// A feed whose new entries are saved into a collection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RssSubscription {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub owner_id: i64,
    pub collection_id: i64,
    pub created_at: String,
}
