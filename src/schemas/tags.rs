//! Tag requests.

use serde_json::Value;

use super::{Input, Presence, Text, ValidationErrors};

const LABEL: Text = Text::required().trim().max(50);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTag {
    pub name: String,
}

impl UpdateTag {
    pub fn parse(value: &Value) -> Result<Self, ValidationErrors> {
        let mut input = Input::new(value);
        let name = input.text("name", LABEL);
        input.finish()?;
        Ok(Self {
            name: name.unwrap_or_default(),
        })
    }
}

/// Per-tag archival overrides; `None` defers to the account setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagOverrides {
    pub archive_as_screenshot: Option<bool>,
    pub archive_as_monolith: Option<bool>,
    pub archive_as_pdf: Option<bool>,
    pub archive_as_readable: Option<bool>,
    pub archive_as_wayback_machine: Option<bool>,
    pub ai_tag: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTag {
    pub label: String,
    pub overrides: TagOverrides,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostTag {
    pub tags: Vec<NewTag>,
}

impl PostTag {
    pub fn parse(value: &Value) -> Result<Self, ValidationErrors> {
        let mut input = Input::new(value);
        let tags = input.objects("tags", Presence::Required, |tag| NewTag {
            label: tag.text("label", LABEL).unwrap_or_default(),
            overrides: TagOverrides {
                archive_as_screenshot: tag.boolean("archiveAsScreenshot", Presence::Nullish),
                archive_as_monolith: tag.boolean("archiveAsMonolith", Presence::Nullish),
                archive_as_pdf: tag.boolean("archiveAsPDF", Presence::Nullish),
                archive_as_readable: tag.boolean("archiveAsReadable", Presence::Nullish),
                archive_as_wayback_machine: tag
                    .boolean("archiveAsWaybackMachine", Presence::Nullish),
                ai_tag: tag.boolean("aiTag", Presence::Nullish),
            },
        });
        input.finish()?;
        Ok(Self {
            tags: tags.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_update_tag_name_limit() {
        assert_eq!(
            UpdateTag::parse(&json!({ "name": " rust " })).unwrap().name,
            "rust"
        );
        let errors = UpdateTag::parse(&json!({ "name": "x".repeat(51) })).unwrap_err();
        assert_eq!(
            errors.messages_for("name"),
            vec!["String must contain at most 50 character(s)"]
        );
    }

    #[test]
    fn test_post_tag_overrides() {
        let parsed = PostTag::parse(&json!({
            "tags": [
                { "label": "news", "archiveAsPDF": false, "archiveAsMonolith": null },
                { "label": "docs" }
            ]
        }))
        .unwrap();
        assert_eq!(parsed.tags.len(), 2);
        assert_eq!(parsed.tags[0].overrides.archive_as_pdf, Some(false));
        assert_eq!(parsed.tags[0].overrides.archive_as_monolith, None);
        assert_eq!(parsed.tags[1].overrides, TagOverrides::default());
    }

    #[test]
    fn test_post_tag_requires_label() {
        let errors = PostTag::parse(&json!({ "tags": [{ "aiTag": "yes" }] })).unwrap_err();
        assert_eq!(errors.messages_for("tags.0.label"), vec!["Required"]);
        assert_eq!(
            errors.messages_for("tags.0.aiTag"),
            vec!["Expected boolean, received string"]
        );
    }
}
