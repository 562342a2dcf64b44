use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use store::models::{Group, GroupDraft, GroupPost, GroupPostDraft};
use store::{Filter, GroupFilter, Membership};
use uuid::Uuid;

use super::refresh;
use crate::error::AppResult;
use crate::state::{SharedState, SignedIn};

#[derive(Debug, Default, Deserialize)]
pub struct GroupQuery {
    #[serde(default)]
    search: String,
    #[serde(default)]
    membership: Membership,
}

#[derive(Serialize)]
pub struct GroupCard {
    #[serde(flatten)]
    group: Group,
    is_member: bool,
}

pub async fn list(
    State(state): State<SharedState>,
    SignedIn(user): SignedIn,
    Query(query): Query<GroupQuery>,
) -> AppResult<Json<Vec<GroupCard>>> {
    let cache = state.cache(user.id);
    let groups = refresh(&cache.groups, state.platform.list_groups(&user)).await?;
    cache.set_joined_groups(state.platform.joined_group_ids(&user).await?);

    let filter = GroupFilter {
        search: query.search,
        membership: query.membership,
        joined: cache.joined_groups(),
    };
    Ok(Json(
        filter
            .apply(&groups)
            .into_iter()
            .map(|group| GroupCard {
                is_member: filter.joined.contains(&group.id),
                group: group.clone(),
            })
            .collect(),
    ))
}

pub async fn create(
    State(state): State<SharedState>,
    SignedIn(user): SignedIn,
    Json(draft): Json<GroupDraft>,
) -> AppResult<(StatusCode, Json<Group>)> {
    let group = state.platform.create_group(&user, draft).await?;
    let cache = state.cache(user.id);
    cache.groups.push(group.clone());
    cache.mark_joined(group.id);
    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn join(
    State(state): State<SharedState>,
    SignedIn(user): SignedIn,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.platform.join_group(&user, id).await?;
    state.cache(user.id).mark_joined(id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn leave(
    State(state): State<SharedState>,
    SignedIn(user): SignedIn,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.platform.leave_group(&user, id).await?;
    state.cache(user.id).mark_left(id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn posts(
    State(state): State<SharedState>,
    SignedIn(user): SignedIn,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<GroupPost>>> {
    let cache = state.cache(user.id);
    cache.groups.select(Some(id));
    let posts = refresh(&cache.group_posts, state.platform.list_group_posts(&user, id)).await?;
    Ok(Json(posts))
}

pub async fn create_post(
    State(state): State<SharedState>,
    SignedIn(user): SignedIn,
    Path(id): Path<Uuid>,
    Json(draft): Json<GroupPostDraft>,
) -> AppResult<(StatusCode, Json<GroupPost>)> {
    let post = state.platform.create_group_post(&user, id, draft).await?;
    state.cache(user.id).group_posts.prepend(post.clone());
    Ok((StatusCode::CREATED, Json(post)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use super::super::testing::*;

    #[tokio::test]
    async fn test_groups_membership_and_posts() {
        let app = app();
        let (owner, _) = sign_up(&app, "pat@example.com", "Pat Patient", "patient").await;
        let (other, _) = sign_up(&app, "dr@example.com", "Dr. Tess Ther", "therapist").await;

        let (status, group, _) = send(
            &app,
            "POST",
            "/api/groups",
            Some(&owner),
            Some(json!({
                "name": "Calm Minds",
                "description": "Sharing what helps with everyday anxiety.",
                "category": "Anxiety",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = group["id"].as_str().unwrap().to_string();

        let (_, list, _) =
            send(&app, "GET", "/api/groups?membership=available", Some(&other), None).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["is_member"], false);

        let post = json!({ "content": "Hello everyone" });
        let (status, _, _) = send(
            &app,
            "POST",
            &format!("/api/groups/{id}/posts"),
            Some(&other),
            Some(post.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _, _) =
            send(&app, "POST", &format!("/api/groups/{id}/join"), Some(&other), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _, _) =
            send(&app, "POST", &format!("/api/groups/{id}/join"), Some(&other), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, list, _) = send(&app, "GET", "/api/groups?membership=mine", Some(&other), None).await;
        assert_eq!(list[0]["is_member"], true);

        let (status, _, _) = send(
            &app,
            "POST",
            &format!("/api/groups/{id}/posts"),
            Some(&other),
            Some(post),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, posts, _) =
            send(&app, "GET", &format!("/api/groups/{id}/posts"), Some(&owner), None).await;
        assert_eq!(posts[0]["author"]["full_name"], "Dr. Tess Ther");

        let (status, _, _) =
            send(&app, "POST", &format!("/api/groups/{id}/leave"), Some(&other), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, list, _) = send(&app, "GET", "/api/groups?membership=mine", Some(&other), None).await;
        assert!(list.as_array().unwrap().is_empty());
    }
}
