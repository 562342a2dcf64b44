//! Blog posts. Anyone signed in may read published posts and write their own;
//! only the author may change or delete a post.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use store::models::{BlogDraft, BlogPost, BlogPostUpdate, NewBlogPost, PostStatus};
use store::validation::validate_blog_post;

use super::Platform;
use crate::backend::{eq, insert_row, select_row, select_rows, update_rows, Embed, Query, Table};
use crate::error::ApiError;
use crate::models::CurrentUser;

fn author_embed() -> Embed {
    Embed::profile_name("author", "author_id")
}

impl Platform {
    /// Published posts, newest first, with author names.
    pub async fn list_posts(&self, user: &CurrentUser) -> Result<Vec<BlogPost>, ApiError> {
        let query = Query::new()
            .eq("status", PostStatus::Published.as_str())
            .order_desc("created_at")
            .embed(author_embed());
        select_rows(self.backend(), Table::BlogPosts, &query, user.token()).await
    }

    /// One post. Drafts are only visible to their author.
    pub async fn get_post(&self, user: &CurrentUser, id: Uuid) -> Result<BlogPost, ApiError> {
        let query = Query::new().eq("id", id).embed(author_embed());
        let post: BlogPost = select_row(self.backend(), Table::BlogPosts, &query, user.token())
            .await?
            .ok_or(ApiError::NotFound("Post"))?;
        if post.status == PostStatus::Draft && post.author_id != user.id {
            return Err(ApiError::NotFound("Post"));
        }
        Ok(post)
    }

    pub async fn create_post(
        &self,
        user: &CurrentUser,
        draft: BlogDraft,
    ) -> Result<BlogPost, ApiError> {
        validate_blog_post(&draft)?;
        let row = NewBlogPost {
            author_id: user.id,
            title: draft.title.trim().to_string(),
            content: draft.content,
            status: draft.status,
        };
        let stored: BlogPost =
            insert_row(self.backend(), Table::BlogPosts, &row, user.token()).await?;
        info!("{} published post {}", user.id, stored.id);
        // Reload so the author name is embedded.
        self.get_post(user, stored.id).await
    }

    pub async fn update_post(
        &self,
        user: &CurrentUser,
        id: Uuid,
        draft: BlogDraft,
    ) -> Result<BlogPost, ApiError> {
        validate_blog_post(&draft)?;
        self.authored_post(user, id).await?;

        let patch = BlogPostUpdate {
            title: draft.title.trim().to_string(),
            content: draft.content,
            status: draft.status,
            updated_at: Utc::now(),
        };
        let _: Vec<BlogPost> = update_rows(
            self.backend(),
            Table::BlogPosts,
            &[eq("id", id), eq("author_id", user.id)],
            &patch,
            user.token(),
        )
        .await?;
        self.get_post(user, id).await
    }

    pub async fn delete_post(&self, user: &CurrentUser, id: Uuid) -> Result<(), ApiError> {
        self.authored_post(user, id).await?;
        self.backend
            .delete(
                Table::BlogPosts,
                &[eq("id", id), eq("author_id", user.id)],
                user.token(),
            )
            .await?;
        info!("{} deleted post {}", user.id, id);
        Ok(())
    }

    async fn authored_post(&self, user: &CurrentUser, id: Uuid) -> Result<BlogPost, ApiError> {
        let query = Query::new().eq("id", id);
        let post: BlogPost = select_row(self.backend(), Table::BlogPosts, &query, user.token())
            .await?
            .ok_or(ApiError::NotFound("Post"))?;
        if post.author_id != user.id {
            return Err(ApiError::Forbidden("Only the author can change this post"));
        }
        Ok(post)
    }
}
