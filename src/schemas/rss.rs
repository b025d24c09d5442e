//! RSS subscription request.

use serde_json::Value;

use super::{Format, Input, Presence, Text, ValidationErrors};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRssSubscription {
    pub name: String,
    pub url: String,
    pub collection_id: Option<i64>,
    pub collection_name: Option<String>,
}

impl PostRssSubscription {
    pub fn parse(value: &Value) -> Result<Self, ValidationErrors> {
        let mut input = Input::new(value);
        let name = input.text("name", Text::required().max(50));
        let url = input.text("url", Text::required().max(2048).format(Format::Url));
        let collection_id = input.integer("collectionId", Presence::Optional);
        let collection_name = input.text("collectionName", Text::optional().max(50));
        input.finish()?;
        Ok(Self {
            name: name.unwrap_or_default(),
            url: url.unwrap_or_default(),
            collection_id,
            collection_name,
        })
    }
}
