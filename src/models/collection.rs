//! Collection models: tree nodes, members and the detail view.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use super::{Link, PublicUser, UserSummary};

pub const DEFAULT_COLLECTION_COLOR: &str = "#0ea5e9";

/// Name of the collection that receives links created without one.
pub const UNORGANIZED_COLLECTION: &str = "Unorganized";

/// Per-member capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MemberPermissions {
    pub can_create: bool,
    pub can_update: bool,
    pub can_delete: bool,
}

/// A collaborator on a collection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionMember {
    pub user_id: i64,
    #[serde(flatten)]
    pub permissions: MemberPermissions,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct CollectionCount {
    pub links: i64,
}

/// A named, ownable node in the collection tree.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub color: String,
    pub icon: Option<String>,
    pub icon_weight: Option<String>,
    pub is_public: bool,
    pub parent_id: Option<i64>,
    pub owner_id: i64,
    pub members: Vec<CollectionMember>,
    #[serde(rename = "_count")]
    pub count: CollectionCount,
    pub created_at: String,
    pub updated_at: String,
    pub version: i64,
}

impl Collection {
    /// The viewer's relationship to this collection.
    pub fn access_for(&self, user_id: i64) -> CollectionAccess {
        if self.owner_id == user_id {
            return CollectionAccess::Owner;
        }
        if let Some(member) = self.members.iter().find(|m| m.user_id == user_id) {
            return CollectionAccess::Member(member.permissions);
        }
        if self.is_public {
            CollectionAccess::Public
        } else {
            CollectionAccess::None
        }
    }
}

/// How a viewer relates to a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionAccess {
    Owner,
    Member(MemberPermissions),
    /// Read-only access through a public collection.
    Public,
    None,
}

impl CollectionAccess {
    pub fn can_read(&self) -> bool {
        !matches!(self, CollectionAccess::None)
    }

    pub fn can_create(&self) -> bool {
        match self {
            CollectionAccess::Owner => true,
            CollectionAccess::Member(p) => p.can_create,
            _ => false,
        }
    }

    pub fn can_update(&self) -> bool {
        match self {
            CollectionAccess::Owner => true,
            CollectionAccess::Member(p) => p.can_update,
            _ => false,
        }
    }

    pub fn can_delete(&self) -> bool {
        match self {
            CollectionAccess::Owner => true,
            CollectionAccess::Member(p) => p.can_delete,
            _ => false,
        }
    }
}

// Owners serialize as `true`, members as their flags, everyone else as `false`.
impl Serialize for CollectionAccess {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CollectionAccess::Owner => serializer.serialize_bool(true),
            CollectionAccess::Member(p) => {
                let mut s = serializer.serialize_struct("MemberPermissions", 3)?;
                s.serialize_field("canCreate", &p.can_create)?;
                s.serialize_field("canUpdate", &p.can_update)?;
                s.serialize_field("canDelete", &p.can_delete)?;
                s.end()
            }
            CollectionAccess::Public | CollectionAccess::None => serializer.serialize_bool(false),
        }
    }
}

/// Everything the collection page renders in one payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionView {
    pub collection: Collection,
    pub owner: PublicUser,
    /// Members ordered by ascending user id.
    pub members: Vec<CollectionMember>,
    pub subcollections: Vec<Collection>,
    pub link_count: i64,
    pub permissions: CollectionAccess,
    pub links: Vec<Link>,
    /// Raw URLs for "open all links".
    pub open_urls: Vec<String>,
}

impl CollectionView {
    /// Assemble the view from already-loaded parts.
    ///
    /// `open_urls` covers every link in the collection, while `links` is one
    /// page of it. Subcollections the viewer cannot read are left out.
    pub fn build(
        collection: Collection,
        owner: PublicUser,
        all_collections: &[Collection],
        viewer_id: i64,
        links: Vec<Link>,
        open_urls: Vec<String>,
    ) -> Self {
        let mut members = collection.members.clone();
        members.sort_by_key(|m| m.user_id);

        let subcollections: Vec<Collection> = all_collections
            .iter()
            .filter(|c| c.parent_id == Some(collection.id))
            .filter(|c| c.access_for(viewer_id).can_read())
            .cloned()
            .collect();

        Self {
            link_count: collection.count.links,
            permissions: collection.access_for(viewer_id),
            collection,
            owner,
            members,
            subcollections,
            links,
            open_urls,
        }
    }
}
