//! Highlight creation request.

use serde_json::Value;

use super::{Input, Presence, Text, ValidationErrors};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostHighlight {
    pub color: String,
    pub comment: Option<String>,
    pub start_offset: i64,
    pub end_offset: i64,
    pub text: String,
    pub link_id: i64,
}

impl PostHighlight {
    pub fn parse(value: &Value) -> Result<Self, ValidationErrors> {
        let mut input = Input::new(value);
        let color = input.text("color", Text::required().trim().max(50));
        let comment = input.text("comment", Text::nullish().trim().max(2048));
        let start_offset = input.integer("startOffset", Presence::Required);
        let end_offset = input.integer("endOffset", Presence::Required);
        let text = input.text("text", Text::required().trim().max(2048));
        let link_id = input.integer("linkId", Presence::Required);

        if let (Some(start), Some(end)) = (start_offset, end_offset) {
            if start >= end {
                input.error("endOffset", "startOffset must be less than endOffset");
            }
        }
        input.finish()?;

        Ok(Self {
            color: color.unwrap_or_default(),
            comment,
            start_offset: start_offset.unwrap_or_default(),
            end_offset: end_offset.unwrap_or_default(),
            text: text.unwrap_or_default(),
            link_id: link_id.unwrap_or_default(),
        })
    }
}
