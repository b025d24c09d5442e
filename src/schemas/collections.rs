//! Collection create/update requests.

use serde_json::Value;

use super::{Input, Presence, Text, ValidationErrors};
use crate::models::MemberPermissions;

const NAME: Text = Text::required().trim().max(2048);
const DESCRIPTION: Text = Text::optional().max(2048);
const STYLE: Text = Text::optional().max(50);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostCollection {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub icon_weight: Option<String>,
    pub parent_id: Option<i64>,
}

impl PostCollection {
    pub fn parse(value: &Value) -> Result<Self, ValidationErrors> {
        let mut input = Input::new(value);
        let name = input.text("name", NAME);
        if name.as_deref() == Some("") {
            input.error("name", "Collection name is required");
        }
        let parsed = Self {
            name: name.unwrap_or_default(),
            description: input.text("description", DESCRIPTION),
            color: input.text("color", STYLE),
            icon: input.text("icon", STYLE),
            icon_weight: input.text("iconWeight", STYLE),
            parent_id: input.integer("parentId", Presence::Optional),
        };
        input.finish()?;
        Ok(parsed)
    }
}

/// What an update does with the collection's parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParentUpdate {
    #[default]
    Keep,
    /// Detach to the top level.
    Root,
    Parent(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberInput {
    pub user_id: i64,
    pub permissions: MemberPermissions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCollection {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub is_public: Option<bool>,
    pub icon: Option<Option<String>>,
    pub icon_weight: Option<Option<String>>,
    pub parent: ParentUpdate,
    pub members: Vec<MemberInput>,
    pub expected_version: Option<i64>,
}

impl UpdateCollection {
    pub fn parse(value: &Value) -> Result<Self, ValidationErrors> {
        let mut input = Input::new(value);
        let id = input.integer("id", Presence::Required);
        let name = input.text("name", NAME);
        let description = input.text("description", DESCRIPTION);
        let color = input.text("color", STYLE);
        let is_public = input.boolean("isPublic", Presence::Optional);
        let icon = input.nullable_text("icon", STYLE);
        let icon_weight = input.nullable_text("iconWeight", STYLE);
        let parent = parent_update(&mut input);
        let members = input.objects("members", Presence::Required, |member| {
            let user_id = member.integer("userId", Presence::Required);
            let can_create = member.boolean("canCreate", Presence::Required);
            let can_update = member.boolean("canUpdate", Presence::Required);
            let can_delete = member.boolean("canDelete", Presence::Required);
            MemberInput {
                user_id: user_id.unwrap_or_default(),
                permissions: MemberPermissions {
                    can_create: can_create.unwrap_or_default(),
                    can_update: can_update.unwrap_or_default(),
                    can_delete: can_delete.unwrap_or_default(),
                },
            }
        });
        let expected_version = input.integer("expectedVersion", Presence::Optional);
        input.finish()?;

        Ok(Self {
            id: id.unwrap_or_default(),
            name: name.unwrap_or_default(),
            description,
            color,
            is_public,
            icon,
            icon_weight,
            parent,
            members: members.unwrap_or_default(),
            expected_version,
        })
    }
}

/// `parentId` accepts a number, the literal `"root"`, or nothing.
fn parent_update(input: &mut Input<'_>) -> ParentUpdate {
    match input.raw("parentId") {
        None | Some(Value::Null) => ParentUpdate::Keep,
        Some(Value::String(s)) if s == "root" => ParentUpdate::Root,
        Some(Value::String(_)) => {
            input.error("parentId", "Invalid literal value, expected \"root\"");
            ParentUpdate::Keep
        }
        Some(_) => input
            .integer("parentId", Presence::Nullish)
            .map(ParentUpdate::Parent)
            .unwrap_or_default(),
    }
}
