//! # JSON routes
//!
//! | Prefix | Module |
//! |--------|--------|
//! | `/api/auth`, `/api/dashboard` | [`auth`] |
//! | `/api/therapists` | [`therapists`] |
//! | `/api/appointments` | [`appointments`] |
//! | `/api/notes` | [`notes`] |
//! | `/api/blog` | [`blog`] |
//! | `/api/groups` | [`groups`] |
//!
//! List routes reload the signed-in user's [`store::ClientCache`] slice from
//! the backend and filter the fresh snapshot. Mutations patch the slice in
//! place so it tracks what the user just did. Detail routes answer from the
//! slice when the entity is cached and fall back to the backend otherwise.
//! `/api/dashboard/cache` reports each slice's loading and error state.
//!
//! Every route runs behind [`crate::state::renew_on_unauthorized`], inside
//! the session layer.

mod appointments;
mod auth;
mod blog;
mod groups;
mod notes;
mod therapists;

use std::future::Future;

use api::ApiError;
use axum::middleware;
use axum::routing::{get, patch, post, put};
use axum::Router;
use chrono::{Local, NaiveDate, NaiveDateTime};
use store::{Entity, EntityCache};
use tower_sessions::cookie::time::Duration;
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::error::AppResult;
use crate::state::{renew_on_unauthorized, SharedState};

pub fn router(state: SharedState) -> Router {
    let session_days = state.config.server.session_days;
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(Duration::days(session_days.into())));

    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/dashboard/sections", get(auth::sections))
        .route("/api/dashboard/cache", get(auth::cache_status))
        .route("/api/therapists", get(therapists::list))
        .route("/api/therapists/me", get(therapists::mine).put(therapists::save_mine))
        .route("/api/therapists/{user_id}", get(therapists::show))
        .route(
            "/api/appointments",
            get(appointments::list).post(appointments::book),
        )
        .route("/api/appointments/slots", get(appointments::slots))
        .route("/api/appointments/{id}/status", patch(appointments::set_status))
        .route("/api/appointments/{id}/join", post(appointments::join))
        .route("/api/notes", get(notes::list).post(notes::create))
        .route("/api/notes/tags", get(notes::tags))
        .route("/api/notes/{id}", put(notes::update).delete(notes::remove))
        .route("/api/blog", get(blog::list).post(blog::create))
        .route(
            "/api/blog/{id}",
            get(blog::show).put(blog::update).delete(blog::remove),
        )
        .route("/api/groups", get(groups::list).post(groups::create))
        .route("/api/groups/{id}/join", post(groups::join))
        .route("/api/groups/{id}/leave", post(groups::leave))
        .route(
            "/api/groups/{id}/posts",
            get(groups::posts).post(groups::create_post),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            renew_on_unauthorized,
        ))
        .layer(session_layer)
        .with_state(state)
}

/// Reload a cache slice. A failed load is recorded on the slice and returned.
async fn refresh<T, F>(cache: &EntityCache<T>, load: F) -> AppResult<Vec<T>>
where
    T: Entity,
    F: Future<Output = Result<Vec<T>, ApiError>>,
{
    cache.begin_fetch();
    match load.await {
        Ok(items) => {
            cache.finish_fetch(items);
            Ok(cache.items())
        }
        Err(e) => {
            cache.fail_fetch(e.to_string());
            Err(e.into())
        }
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Comma-separated query values, trimmed, blanks dropped.
fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}
