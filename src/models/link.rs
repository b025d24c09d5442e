//! Link model and list ordering.

use serde::{Deserialize, Serialize};

use crate::schemas::SchemaEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    #[default]
    Url,
    Pdf,
    Image,
}

impl SchemaEnum for LinkType {
    const ALL: &'static [Self] = &[LinkType::Url, LinkType::Pdf, LinkType::Image];

    fn as_str(&self) -> &'static str {
        match self {
            LinkType::Url => "url",
            LinkType::Pdf => "pdf",
            LinkType::Image => "image",
        }
    }
}

/// The collection a link lives in, as embedded in link payloads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkCollectionRef {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagRef {
    pub id: i64,
    pub name: String,
}

/// A saved link and the state of its preserved artifacts.
///
/// Artifact fields hold a storage path once captured, `"pending"` while a
/// capture is running, `"unavailable"` when disabled or failed, and nothing
/// while queued.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub link_type: LinkType,
    pub url: Option<String>,
    pub description: String,
    pub icon: Option<String>,
    pub icon_weight: Option<String>,
    pub color: Option<String>,
    pub collection_id: i64,
    pub collection: LinkCollectionRef,
    pub tags: Vec<TagRef>,
    pub image: Option<String>,
    pub pdf: Option<String>,
    pub readable: Option<String>,
    pub monolith: Option<String>,
    pub last_preserved: Option<String>,
    /// Pinned by the viewer.
    pub pinned: bool,
    /// Where the viewer's client should navigate.
    pub href: String,
    pub created_by_id: i64,
    pub created_at: String,
    pub updated_at: String,
    pub version: i64,
}

/// Link list ordering, numbered as the web client sends it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sort {
    #[default]
    DateNewestFirst,
    DateOldestFirst,
    NameAZ,
    NameZA,
    DescriptionAZ,
    DescriptionZA,
}

impl Sort {
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(Sort::DateNewestFirst),
            1 => Some(Sort::DateOldestFirst),
            2 => Some(Sort::NameAZ),
            3 => Some(Sort::NameZA),
            4 => Some(Sort::DescriptionAZ),
            5 => Some(Sort::DescriptionZA),
            _ => None,
        }
    }

    /// SQL `ORDER BY` clause over the `links` table aliased as `l`.
    pub fn order_by(&self) -> &'static str {
        match self {
            Sort::DateNewestFirst => "l.created_at DESC, l.id DESC",
            Sort::DateOldestFirst => "l.created_at ASC, l.id ASC",
            Sort::NameAZ => "l.name COLLATE NOCASE ASC, l.id ASC",
            Sort::NameZA => "l.name COLLATE NOCASE DESC, l.id DESC",
            Sort::DescriptionAZ => "l.description COLLATE NOCASE ASC, l.id ASC",
            Sort::DescriptionZA => "l.description COLLATE NOCASE DESC, l.id DESC",
        }
    }
}
