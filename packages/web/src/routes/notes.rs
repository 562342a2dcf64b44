use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use store::models::{NoteDraft, NoteView};
use store::{Filter, NoteFilter};
use uuid::Uuid;

use super::{refresh, split_list};
use crate::error::AppResult;
use crate::state::{SharedState, SignedIn};

#[derive(Debug, Default, Deserialize)]
pub struct NoteQuery {
    #[serde(default)]
    search: String,
    /// Comma-separated.
    tags: Option<String>,
}

pub async fn list(
    State(state): State<SharedState>,
    SignedIn(user): SignedIn,
    Query(query): Query<NoteQuery>,
) -> AppResult<Json<Vec<NoteView>>> {
    let cache = state.cache(user.id);
    let notes = refresh(&cache.notes, state.platform.list_notes(&user)).await?;
    let filter = NoteFilter {
        search: query.search,
        tags: split_list(query.tags.as_deref()),
    };
    Ok(Json(filter.apply(&notes).into_iter().cloned().collect()))
}

pub async fn tags(
    State(state): State<SharedState>,
    SignedIn(user): SignedIn,
) -> AppResult<Json<Vec<String>>> {
    Ok(Json(state.platform.note_tags(&user).await?))
}

pub async fn create(
    State(state): State<SharedState>,
    SignedIn(user): SignedIn,
    Json(draft): Json<NoteDraft>,
) -> AppResult<(StatusCode, Json<NoteView>)> {
    let note = state.platform.create_note(&user, draft).await?;
    state.cache(user.id).notes.prepend(note.clone());
    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn update(
    State(state): State<SharedState>,
    SignedIn(user): SignedIn,
    Path(id): Path<Uuid>,
    Json(draft): Json<NoteDraft>,
) -> AppResult<Json<NoteView>> {
    let note = state.platform.update_note(&user, id, draft).await?;
    state.cache(user.id).notes.update(note.clone());
    Ok(Json(note))
}

pub async fn remove(
    State(state): State<SharedState>,
    SignedIn(user): SignedIn,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.platform.delete_note(&user, id).await?;
    state.cache(user.id).notes.remove(id);
    Ok(StatusCode::NO_CONTENT)
}
