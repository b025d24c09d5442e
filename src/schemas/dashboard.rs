//! Dashboard layout replacement request.

use serde_json::Value;

use super::{FieldError, Input, Presence, ValidationErrors};
use crate::models::{DashboardSection, DashboardSectionType};

/// The body is a bare array of sections.
#[derive(Debug, Clone)]
pub struct UpdateDashboardLayout {
    pub sections: Vec<DashboardSection>,
}

impl UpdateDashboardLayout {
    pub fn parse(value: &Value) -> Result<Self, ValidationErrors> {
        let Some(items) = value.as_array() else {
            return Err(ValidationErrors::single("", "Expected array"));
        };

        let mut errors: Vec<FieldError> = Vec::new();
        let mut sections = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let mut input = Input::at(item, i.to_string());
            let section_type = input.choice::<DashboardSectionType>("type", Presence::Required);
            let collection_id = input.integer("collectionId", Presence::Nullish);
            let enabled = input.boolean("enabled", Presence::Required);
            let order = input.integer("order", Presence::Optional);
            if section_type == Some(DashboardSectionType::Collection) && collection_id.is_none() {
                input.error("collectionId", "Collection sections need a collectionId");
            }
            errors.extend(input.into_errors());

            if let (Some(section_type), Some(enabled)) = (section_type, enabled) {
                sections.push(DashboardSection {
                    section_type,
                    collection_id,
                    enabled,
                    order: order.unwrap_or(i as i64),
                });
            }
        }

        if !errors.is_empty() {
            return Err(errors.into());
        }
        Ok(Self { sections })
    }
}
