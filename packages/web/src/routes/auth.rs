use api::auth::SESSION_USER_KEY;
use api::{CurrentUser, UserInfo};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use store::models::{Credentials, DashboardSection, Registration};
use store::CacheStatus;
use tower_sessions::Session;

use super::today;
use crate::error::AppResult;
use crate::state::{SharedState, SignedIn};

/// Store the user in a fresh session id.
async fn start_session(session: &Session, user: &CurrentUser) -> AppResult<()> {
    session.cycle_id().await?;
    session.insert(SESSION_USER_KEY, user).await?;
    Ok(())
}

pub async fn register(
    State(state): State<SharedState>,
    session: Session,
    Json(form): Json<Registration>,
) -> AppResult<(StatusCode, Json<UserInfo>)> {
    let user = state.platform.register(form, today()).await?;
    start_session(&session, &user).await?;
    Ok((StatusCode::CREATED, Json(user.to_info())))
}

pub async fn login(
    State(state): State<SharedState>,
    session: Session,
    Json(credentials): Json<Credentials>,
) -> AppResult<Json<UserInfo>> {
    let user = state.platform.login(credentials).await?;
    start_session(&session, &user).await?;
    Ok(Json(user.to_info()))
}

pub async fn logout(State(state): State<SharedState>, session: Session) -> AppResult<StatusCode> {
    if let Some(user) = session.get::<CurrentUser>(SESSION_USER_KEY).await? {
        state.platform.logout(&user).await;
        state.drop_cache(user.id);
        tracing::info!("User {} signed out", user.id);
    }
    session.flush().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(session: Session) -> AppResult<Json<Option<UserInfo>>> {
    let user: Option<CurrentUser> = session.get(SESSION_USER_KEY).await?;
    Ok(Json(user.map(|u| u.to_info())))
}

#[derive(Serialize)]
pub struct SectionLink {
    section: DashboardSection,
    label: &'static str,
    path: &'static str,
}

pub async fn sections(SignedIn(user): SignedIn) -> Json<Vec<SectionLink>> {
    Json(
        user.role
            .sections()
            .into_iter()
            .map(|section| SectionLink {
                section,
                label: section.label(),
                path: section.path(),
            })
            .collect(),
    )
}

/// Loading and error state of the signed-in user's cached lists.
pub async fn cache_status(
    State(state): State<SharedState>,
    SignedIn(user): SignedIn,
) -> Json<CacheStatus> {
    Json(state.cache(user.id).status())
}

#[cfg(test)]
mod tests {
    use api::backend::MemoryBackend;
    use axum::http::StatusCode;
    use chrono::Duration;
    use serde_json::json;

    use super::super::testing::*;

    #[tokio::test]
    async fn test_register_me_logout() {
        let app = app();
        let (status, body, _) = send(&app, "GET", "/api/auth/me", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_null());

        let (cookie, id) = sign_up(&app, "pat@example.com", "Pat Patient", "patient").await;
        let (_, body, _) = send(&app, "GET", "/api/auth/me", Some(&cookie), None).await;
        assert_eq!(body["id"], id);
        assert_eq!(body["role"], "patient");
        assert!(body.get("tokens").is_none());

        let (status, _, _) = send(&app, "POST", "/api/auth/logout", Some(&cookie), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, body, _) = send(&app, "GET", "/api/auth/me", Some(&cookie), None).await;
        assert!(body.is_null());
    }

    #[tokio::test]
    async fn test_login_and_sections() {
        let app = app();
        sign_up(&app, "dr@example.com", "Dr. Tess Ther", "therapist").await;

        let (status, body, cookie) = send(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "dr@example.com", "password": "Secret123" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["role"], "therapist");

        let cookie = cookie.unwrap();
        let (_, body, _) = send(&app, "GET", "/api/dashboard/sections", Some(&cookie), None).await;
        let sections: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["section"].as_str().unwrap().to_string())
            .collect();
        assert!(sections.contains(&"profile".to_string()));
        assert!(!sections.contains(&"notes".to_string()));
    }

    #[tokio::test]
    async fn test_signed_out_requests_are_unauthorized() {
        let app = app();
        let (status, body, _) = send(&app, "GET", "/api/notes", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Not signed in");
    }

    #[tokio::test]
    async fn test_expired_token_is_renewed_and_request_replayed() {
        let backend = MemoryBackend::new();
        let (app, _) = app_with(backend.clone());
        let (cookie, _) = sign_up(&app, "pat@example.com", "Pat Patient", "patient").await;

        backend.expire_access_tokens();
        let note = json!({ "title": "After expiry", "content": "Still here", "tags": [] });
        let (status, body, _) = send(&app, "POST", "/api/notes", Some(&cookie), Some(note)).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");

        let (status, list, _) = send(&app, "GET", "/api/notes", Some(&cookie), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_tokens_near_expiry_are_renewed_up_front() {
        let backend = MemoryBackend::new().with_token_ttl(Duration::seconds(30));
        let (app, _) = app_with(backend);
        let (cookie, _) = sign_up(&app, "pat@example.com", "Pat Patient", "patient").await;

        for _ in 0..3 {
            let (status, _, _) = send(&app, "GET", "/api/notes", Some(&cookie), None).await;
            assert_eq!(status, StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_refused_renewal_signs_out_and_drops_cache() {
        let backend = MemoryBackend::new();
        let (app, _) = app_with(backend.clone());
        let (cookie, _) = sign_up(&app, "pat@example.com", "Pat Patient", "patient").await;
        let post = json!({
            "title": "Cached post",
            "content": "A post long enough to pass validation and end up in the cache.",
        });
        send(&app, "POST", "/api/blog", Some(&cookie), Some(post)).await;
        let (_, status, _) = send(&app, "GET", "/api/dashboard/cache", Some(&cookie), None).await;
        assert_eq!(status["posts"]["len"], 1);

        backend.revoke_all_sessions();
        let (status, _, _) = send(&app, "GET", "/api/blog", Some(&cookie), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (_, me, _) = send(&app, "GET", "/api/auth/me", Some(&cookie), None).await;
        assert!(me.is_null());

        let (_, _, cookie) = send(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "pat@example.com", "password": "Secret123" })),
        )
        .await;
        let (_, status, _) =
            send(&app, "GET", "/api/dashboard/cache", cookie.as_deref(), None).await;
        assert_eq!(status["posts"]["len"], 0);
    }

    #[tokio::test]
    async fn test_invalid_registration_lists_fields() {
        let app = app();
        let mut form = registration("not-an-email", "P", "patient");
        form["phone"] = json!("call me");
        let (status, body, _) = send(&app, "POST", "/api/auth/register", None, Some(form)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let fields: Vec<_> = body["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["field"].as_str().unwrap())
            .collect();
        assert_eq!(fields, vec!["full_name", "email", "phone"]);
    }
}
