//! Link creation, update and bulk re-archive requests.

use serde_json::Value;

use super::{Format, Input, Presence, SchemaEnum, Text, ValidationErrors};
use crate::models::LinkType;

const LONG_TEXT: Text = Text::optional().trim().max(2048);
const TAG_NAME: Text = Text::required().trim().max(50);
const STYLE: Text = Text::nullish().max(50);

/// Image format hint for uploaded image links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl SchemaEnum for ImageFormat {
    const ALL: &'static [Self] = &[ImageFormat::Jpeg, ImageFormat::Png];

    fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
        }
    }
}

/// Target collection by id or by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionSelector {
    pub id: Option<i64>,
    pub name: Option<String>,
}

/// A tag to attach: an existing one by id, or connect-or-create by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagInput {
    pub id: Option<i64>,
    pub name: String,
}

fn tag_list(input: &mut Input<'_>, presence: Presence) -> Option<Vec<TagInput>> {
    input.objects("tags", presence, |tag| TagInput {
        id: tag.integer("id", Presence::Optional),
        name: tag.text("name", TAG_NAME).unwrap_or_default(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostLink {
    pub link_type: Option<LinkType>,
    pub url: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub image: Option<ImageFormat>,
    pub collection: Option<CollectionSelector>,
    pub tags: Vec<TagInput>,
}

impl PostLink {
    pub fn parse(value: &Value) -> Result<Self, ValidationErrors> {
        let mut input = Input::new(value);
        let parsed = Self {
            link_type: input.choice("type", Presence::Nullish),
            url: input.text("url", LONG_TEXT.format(Format::Url)),
            name: input.text("name", LONG_TEXT),
            description: input.text("description", LONG_TEXT),
            image: input.choice("image", Presence::Optional),
            collection: input.object("collection", Presence::Optional, |c| CollectionSelector {
                id: c.integer("id", Presence::Optional),
                name: c.text("name", LONG_TEXT),
            }),
            tags: tag_list(&mut input, Presence::Optional).unwrap_or_default(),
        };
        input.finish()?;
        Ok(parsed)
    }
}

/// Destination collection for an update; the owner id must match the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionTarget {
    pub id: i64,
    pub owner_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateLink {
    pub id: i64,
    pub name: Option<String>,
    /// `Some(None)` clears the URL.
    pub url: Option<Option<String>>,
    pub description: Option<String>,
    pub icon: Option<Option<String>>,
    pub icon_weight: Option<Option<String>>,
    pub color: Option<Option<String>>,
    pub collection: CollectionTarget,
    pub tags: Vec<TagInput>,
    /// Users the link is pinned by; `None` leaves pins unchanged.
    pub pinned_by: Option<Vec<Option<i64>>>,
    pub expected_version: Option<i64>,
}

impl UpdateLink {
    pub fn parse(value: &Value) -> Result<Self, ValidationErrors> {
        const FIELD: Text = Text::nullish().trim().max(2048);
        let mut input = Input::new(value);
        let id = input.integer("id", Presence::Required);
        let name = input.text("name", FIELD);
        let url = input.nullable_text("url", FIELD);
        let description = input.text("description", FIELD);
        let icon = input.nullable_text("icon", STYLE);
        let icon_weight = input.nullable_text("iconWeight", STYLE);
        let color = input.nullable_text("color", STYLE);
        let collection = input.object("collection", Presence::Required, |c| {
            (
                c.integer("id", Presence::Required),
                c.integer("ownerId", Presence::Required),
            )
        });
        let tags = tag_list(&mut input, Presence::Required);
        let pinned_by = input.objects("pinnedBy", Presence::Optional, |pin| {
            pin.integer("id", Presence::Optional)
        });
        let expected_version = input.integer("expectedVersion", Presence::Optional);
        input.finish()?;

        let (collection_id, owner_id) = collection.unwrap_or_default();
        Ok(Self {
            id: id.unwrap_or_default(),
            name,
            url,
            description,
            icon,
            icon_weight,
            color,
            collection: CollectionTarget {
                id: collection_id.unwrap_or_default(),
                owner_id: owner_id.unwrap_or_default(),
            },
            tags: tags.unwrap_or_default(),
            pinned_by,
            expected_version,
        })
    }
}

/// Which links a bulk re-archive applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveAction {
    /// Every owned link.
    AllAndRePreserve,
    /// Owned links that were never preserved.
    AllAndIgnore,
    /// Owned links with at least one unavailable artifact.
    AllBroken,
}

impl SchemaEnum for ArchiveAction {
    const ALL: &'static [Self] = &[
        ArchiveAction::AllAndRePreserve,
        ArchiveAction::AllAndIgnore,
        ArchiveAction::AllBroken,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            ArchiveAction::AllAndRePreserve => "allAndRePreserve",
            ArchiveAction::AllAndIgnore => "allAndIgnore",
            ArchiveAction::AllBroken => "allBroken",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkArchiveAction {
    pub action: Option<ArchiveAction>,
    pub link_ids: Option<Vec<i64>>,
}

impl LinkArchiveAction {
    pub fn parse(value: &Value) -> Result<Self, ValidationErrors> {
        let mut input = Input::new(value);
        let parsed = Self {
            action: input.choice("action", Presence::Optional),
            link_ids: input.integers("linkIds", Presence::Optional),
        };
        input.finish()?;
        Ok(parsed)
    }
}
