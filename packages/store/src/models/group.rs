//! Support groups, their members and posts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ProfileRef;

/// Categories offered when creating a group.
pub const GROUP_CATEGORIES: &[&str] = &[
    "Anxiety",
    "Depression",
    "PTSD/Trauma",
    "Bipolar Disorder",
    "Eating Disorders",
    "Addiction",
    "Family Support",
    "Couples/Relationships",
    "Grief & Loss",
    "Wellness",
    "Other",
];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub is_private: bool,
    pub creator_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// `creator:profiles!groups_creator_id_fkey(full_name)`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<ProfileRef>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewGroup {
    pub name: String,
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub is_private: bool,
    pub creator_id: Uuid,
}

/// Row of the `group_members` join table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub group_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupPost {
    pub id: Uuid,
    pub group_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// `author:profiles!group_posts_author_id_fkey(full_name)`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<ProfileRef>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewGroupPost {
    pub group_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
}
