use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use store::models::{TherapistProfile, TherapistProfileInput};
use store::{Filter, TherapistFilter};
use uuid::Uuid;

use super::refresh;
use crate::error::AppResult;
use crate::state::{SharedState, SignedIn};

#[derive(Debug, Default, Deserialize)]
pub struct TherapistQuery {
    #[serde(default)]
    search: String,
    specialization: Option<String>,
    #[serde(default)]
    min_rating: f64,
}

pub async fn list(
    State(state): State<SharedState>,
    SignedIn(user): SignedIn,
    Query(query): Query<TherapistQuery>,
) -> AppResult<Json<Vec<TherapistProfile>>> {
    let cache = state.cache(user.id);
    let therapists = refresh(&cache.therapists, state.platform.list_therapists(&user)).await?;
    let filter = TherapistFilter {
        search: query.search,
        specialization: query.specialization,
        min_rating: query.min_rating,
    };
    Ok(Json(filter.apply(&therapists).into_iter().cloned().collect()))
}

pub async fn show(
    State(state): State<SharedState>,
    SignedIn(user): SignedIn,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<TherapistProfile>> {
    let cache = state.cache(user.id);
    let therapist = match cache.therapists.find(|t| t.user_id == user_id) {
        Some(therapist) => therapist,
        None => state.platform.get_therapist(&user, user_id).await?,
    };
    cache.therapists.select(Some(therapist.id));
    Ok(Json(therapist))
}

/// The signed-in therapist's editable profile.
pub async fn mine(
    State(state): State<SharedState>,
    SignedIn(user): SignedIn,
) -> AppResult<Json<TherapistProfileInput>> {
    Ok(Json(state.platform.my_therapist_profile(&user).await?))
}

pub async fn save_mine(
    State(state): State<SharedState>,
    SignedIn(user): SignedIn,
    Json(input): Json<TherapistProfileInput>,
) -> AppResult<Json<TherapistProfile>> {
    let saved = state.platform.save_therapist_profile(&user, input).await?;
    let cache = state.cache(user.id);
    if !cache.therapists.update(saved.clone()) {
        cache.therapists.push(saved.clone());
    }
    Ok(Json(saved))
}
