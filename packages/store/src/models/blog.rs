//! Blog posts written by patients and therapists (`blog_posts` table).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ProfileRef;
use crate::markdown;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    #[default]
    Published,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// `author:profiles!blog_posts_author_id_fkey(full_name)`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<ProfileRef>,
}

impl BlogPost {
    pub fn author_name(&self) -> Option<&str> {
        self.author.as_ref().map(|a| a.full_name.as_str())
    }

    pub fn render_html(&self) -> String {
        markdown::render_html(&self.content)
    }

    pub fn excerpt(&self) -> String {
        markdown::excerpt(&self.content)
    }
}

/// Insert payload for a new post.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewBlogPost {
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub status: PostStatus,
}

/// Fields an author may change on an existing post.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlogPostUpdate {
    pub title: String,
    pub content: String,
    pub status: PostStatus,
    pub updated_at: DateTime<Utc>,
}
