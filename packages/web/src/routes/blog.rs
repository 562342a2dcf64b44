use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use store::models::{BlogDraft, BlogPost};
use store::{BlogFilter, Filter};
use uuid::Uuid;

use super::refresh;
use crate::error::AppResult;
use crate::state::{SharedState, SignedIn};

#[derive(Debug, Default, Deserialize)]
pub struct BlogQuery {
    #[serde(default)]
    search: String,
    #[serde(default)]
    author: String,
}

/// A post in the listing, with a plain-text teaser.
#[derive(Serialize)]
pub struct PostSummary {
    #[serde(flatten)]
    post: BlogPost,
    excerpt: String,
}

/// A single post with its body rendered to HTML.
#[derive(Serialize)]
pub struct PostPage {
    #[serde(flatten)]
    post: BlogPost,
    html: String,
}

pub async fn list(
    State(state): State<SharedState>,
    SignedIn(user): SignedIn,
    Query(query): Query<BlogQuery>,
) -> AppResult<Json<Vec<PostSummary>>> {
    let cache = state.cache(user.id);
    let posts = refresh(&cache.posts, state.platform.list_posts(&user)).await?;
    let filter = BlogFilter {
        search: query.search,
        author: query.author,
    };
    Ok(Json(
        filter
            .apply(&posts)
            .into_iter()
            .map(|post| PostSummary {
                excerpt: post.excerpt(),
                post: post.clone(),
            })
            .collect(),
    ))
}

pub async fn show(
    State(state): State<SharedState>,
    SignedIn(user): SignedIn,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PostPage>> {
    let cache = state.cache(user.id);
    let post = match cache.posts.get(id) {
        Some(post) => post,
        None => state.platform.get_post(&user, id).await?,
    };
    cache.posts.select(Some(id));
    Ok(Json(PostPage {
        html: post.render_html(),
        post,
    }))
}

pub async fn create(
    State(state): State<SharedState>,
    SignedIn(user): SignedIn,
    Json(draft): Json<BlogDraft>,
) -> AppResult<(StatusCode, Json<BlogPost>)> {
    let post = state.platform.create_post(&user, draft).await?;
    state.cache(user.id).posts.prepend(post.clone());
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn update(
    State(state): State<SharedState>,
    SignedIn(user): SignedIn,
    Path(id): Path<Uuid>,
    Json(draft): Json<BlogDraft>,
) -> AppResult<Json<BlogPost>> {
    let post = state.platform.update_post(&user, id, draft).await?;
    state.cache(user.id).posts.update(post.clone());
    Ok(Json(post))
}

pub async fn remove(
    State(state): State<SharedState>,
    SignedIn(user): SignedIn,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.platform.delete_post(&user, id).await?;
    state.cache(user.id).posts.remove(id);
    Ok(StatusCode::NO_CONTENT)
}
