//! Support groups, memberships and group posts.

use std::collections::HashSet;

use tracing::{error, info};
use uuid::Uuid;

use store::models::{Group, GroupDraft, GroupMember, GroupPost, GroupPostDraft, NewGroup, NewGroupPost};
use store::validation::{validate_group, validate_group_post};

use super::Platform;
use crate::backend::{eq, insert_row, select_row, select_rows, Embed, Query, Table};
use crate::error::ApiError;
use crate::models::CurrentUser;

fn creator_embed() -> Embed {
    Embed::profile_name("creator", "creator_id")
}

impl Platform {
    /// Every group, newest first.
    pub async fn list_groups(&self, user: &CurrentUser) -> Result<Vec<Group>, ApiError> {
        let query = Query::new()
            .order_desc("created_at")
            .embed(creator_embed());
        select_rows(self.backend(), Table::Groups, &query, user.token()).await
    }

    /// Ids of the groups the caller belongs to.
    pub async fn joined_group_ids(&self, user: &CurrentUser) -> Result<HashSet<Uuid>, ApiError> {
        let query = Query::new().eq("user_id", user.id);
        let rows: Vec<GroupMember> =
            select_rows(self.backend(), Table::GroupMembers, &query, user.token()).await?;
        Ok(rows.into_iter().map(|m| m.group_id).collect())
    }

    pub async fn get_group(&self, user: &CurrentUser, id: Uuid) -> Result<Group, ApiError> {
        let query = Query::new().eq("id", id).embed(creator_embed());
        select_row(self.backend(), Table::Groups, &query, user.token())
            .await?
            .ok_or(ApiError::NotFound("Group"))
    }

    /// Create a group and add the creator as its first member.
    pub async fn create_group(
        &self,
        user: &CurrentUser,
        draft: GroupDraft,
    ) -> Result<Group, ApiError> {
        validate_group(&draft)?;
        let row = NewGroup {
            name: draft.name.trim().to_string(),
            description: draft.description.trim().to_string(),
            category: draft.category,
            is_private: draft.is_private,
            creator_id: user.id,
        };
        let stored: Group = insert_row(self.backend(), Table::Groups, &row, user.token()).await?;
        info!("{} created group {}", user.id, stored.id);

        if let Err(e) = self.add_member(user, stored.id).await {
            error!("Failed to add creator {} to group {}: {}", user.id, stored.id, e);
        }
        self.get_group(user, stored.id).await
    }

    pub async fn join_group(&self, user: &CurrentUser, id: Uuid) -> Result<(), ApiError> {
        self.get_group(user, id).await?;
        match self.add_member(user, id).await {
            Err(e) if e.is_duplicate() => Err(ApiError::Conflict("Already a member of this group")),
            Err(e) => Err(e),
            Ok(()) => {
                info!("{} joined group {}", user.id, id);
                Ok(())
            }
        }
    }

    pub async fn leave_group(&self, user: &CurrentUser, id: Uuid) -> Result<(), ApiError> {
        if !self.is_member(user, id).await? {
            return Err(ApiError::NotFound("Membership"));
        }
        self.backend
            .delete(
                Table::GroupMembers,
                &[eq("group_id", id), eq("user_id", user.id)],
                user.token(),
            )
            .await?;
        info!("{} left group {}", user.id, id);
        Ok(())
    }

    /// Posts of a group, newest first. Private groups show posts to members only.
    pub async fn list_group_posts(
        &self,
        user: &CurrentUser,
        group_id: Uuid,
    ) -> Result<Vec<GroupPost>, ApiError> {
        let group = self.get_group(user, group_id).await?;
        if group.is_private && !self.is_member(user, group_id).await? {
            return Err(ApiError::Forbidden("This group is private"));
        }
        let query = Query::new()
            .eq("group_id", group_id)
            .order_desc("created_at")
            .embed(Embed::profile_name("author", "author_id"));
        select_rows(self.backend(), Table::GroupPosts, &query, user.token()).await
    }

    pub async fn create_group_post(
        &self,
        user: &CurrentUser,
        group_id: Uuid,
        draft: GroupPostDraft,
    ) -> Result<GroupPost, ApiError> {
        validate_group_post(&draft)?;
        self.get_group(user, group_id).await?;
        if !self.is_member(user, group_id).await? {
            return Err(ApiError::Forbidden("Join the group to post"));
        }

        let row = NewGroupPost {
            group_id,
            author_id: user.id,
            content: draft.content.trim().to_string(),
        };
        let stored: GroupPost =
            insert_row(self.backend(), Table::GroupPosts, &row, user.token()).await?;
        let query = Query::new()
            .eq("id", stored.id)
            .embed(Embed::profile_name("author", "author_id"));
        Ok(select_row(self.backend(), Table::GroupPosts, &query, user.token())
            .await?
            .unwrap_or(stored))
    }

    async fn add_member(&self, user: &CurrentUser, group_id: Uuid) -> Result<(), ApiError> {
        let member = GroupMember {
            group_id,
            user_id: user.id,
        };
        let _: GroupMember =
            insert_row(self.backend(), Table::GroupMembers, &member, user.token()).await?;
        Ok(())
    }

    async fn is_member(&self, user: &CurrentUser, group_id: Uuid) -> Result<bool, ApiError> {
        let query = Query::new().eq("group_id", group_id).eq("user_id", user.id);
        let row: Option<GroupMember> =
            select_row(self.backend(), Table::GroupMembers, &query, user.token()).await?;
        Ok(row.is_some())
    }
}
