//! Dashboard layout model.

use serde::{Deserialize, Serialize};

use crate::schemas::SchemaEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DashboardSectionType {
    Stats,
    RecentLinks,
    PinnedLinks,
    Collection,
}

impl SchemaEnum for DashboardSectionType {
    const ALL: &'static [Self] = &[
        DashboardSectionType::Stats,
        DashboardSectionType::RecentLinks,
        DashboardSectionType::PinnedLinks,
        DashboardSectionType::Collection,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            DashboardSectionType::Stats => "STATS",
            DashboardSectionType::RecentLinks => "RECENT_LINKS",
            DashboardSectionType::PinnedLinks => "PINNED_LINKS",
            DashboardSectionType::Collection => "COLLECTION",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSection {
    #[serde(rename = "type")]
    pub section_type: DashboardSectionType,
    pub collection_id: Option<i64>,
    pub enabled: bool,
    pub order: i64,
}

impl DashboardSection {
    /// Layout shown before the user customizes anything.
    pub fn defaults() -> Vec<DashboardSection> {
        [
            DashboardSectionType::Stats,
            DashboardSectionType::RecentLinks,
            DashboardSectionType::PinnedLinks,
        ]
        .into_iter()
        .enumerate()
        .map(|(i, section_type)| DashboardSection {
            section_type,
            collection_id: None,
            enabled: true,
            order: i as i64,
        })
        .collect()
    }
}
