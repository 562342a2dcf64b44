//! # Video rooms: 100ms management API
//!
//! Appointments of type video get a room on the video provider. The server
//! talks to the provider's management API; browsers only ever receive the
//! short-lived auth token for one room.
//!
//! | Operation | Endpoint |
//! |-----------|----------|
//! | management token | `POST /management-tokens` (cached until a call is rejected with 401) |
//! | create room | `POST /rooms` |
//! | room details | `GET /rooms/{id}` |
//! | auth token | `POST /auth-tokens` |
//! | end room | `POST /rooms/{id}/end-room` |
//!
//! A management call answered with 401 drops the cached token, fetches a new
//! one and is sent once more.
//!
//! [`VideoProvider`] is the seam services depend on, so appointment flows can
//! be exercised without the network.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use store::models::UserRole;

use crate::error::ApiError;

pub const DEFAULT_API_URL: &str = "https://api.100ms.live/v2";

/// Values shipped in the `.env` template; treated as "not configured".
const PLACEHOLDERS: [&str; 3] = [
    "your_100ms_access_key_here",
    "your_100ms_secret_key_here",
    "your_100ms_template_id_here",
];

#[derive(Clone, Debug, PartialEq)]
pub struct VideoSettings {
    pub access_key: String,
    pub secret_key: String,
    pub template_id: String,
    pub api_url: String,
    pub region: String,
}

impl VideoSettings {
    /// `None` unless all three credentials are present and not placeholders.
    pub fn from_parts(
        access_key: Option<String>,
        secret_key: Option<String>,
        template_id: Option<String>,
        api_url: Option<String>,
        region: &str,
    ) -> Option<Self> {
        let usable = |v: Option<String>| {
            v.map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty() && !PLACEHOLDERS.contains(&s.as_str()))
        };
        Some(Self {
            access_key: usable(access_key)?,
            secret_key: usable(secret_key)?,
            template_id: usable(template_id)?,
            api_url: api_url
                .filter(|u| !u.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            region: region.to_string(),
        })
    }
}

/// Role a participant joins the room with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoRole {
    Host,
    Guest,
}

impl VideoRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoRole::Host => "host",
            VideoRole::Guest => "guest",
        }
    }
}

impl From<UserRole> for VideoRole {
    fn from(role: UserRole) -> Self {
        match role {
            UserRole::Therapist => VideoRole::Host,
            UserRole::Patient => VideoRole::Guest,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub enabled: Option<bool>,
}

/// What a participant needs to join: returned by the join-session route.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionToken {
    pub token: String,
    pub room_id: String,
    pub role: VideoRole,
}

/// Room name used for an appointment.
pub fn room_name(appointment_id: Uuid) -> String {
    format!("therapy-session-{}", appointment_id)
}

#[async_trait]
pub trait VideoProvider: Send + Sync {
    async fn create_room(&self, name: &str, description: &str) -> Result<Room, ApiError>;

    async fn get_room(&self, room_id: &str) -> Result<Room, ApiError>;

    async fn auth_token(
        &self,
        room_id: &str,
        user_id: Uuid,
        role: VideoRole,
        user_name: &str,
    ) -> Result<String, ApiError>;

    async fn end_room(&self, room_id: &str) -> Result<(), ApiError>;
}

#[derive(Deserialize)]
struct TokenBody {
    token: String,
}

pub struct HmsClient {
    http: Client,
    settings: VideoSettings,
    management_token: Mutex<Option<String>>,
}

impl HmsClient {
    pub fn new(settings: VideoSettings) -> Self {
        Self {
            http: Client::new(),
            settings,
            management_token: Mutex::new(None),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.settings.api_url, path)
    }

    fn check(response: Response, what: &str) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let reason = status.canonical_reason().unwrap_or("request failed");
            Err(ApiError::Video(format!("Failed to {}: {} {}", what, status.as_u16(), reason)))
        }
    }

    async fn management_token(&self) -> Result<String, ApiError> {
        let mut cached = self.management_token.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }
        let response = self
            .http
            .post(self.url("management-tokens"))
            .json(&serde_json::json!({
                "access_key": self.settings.access_key,
                "secret": self.settings.secret_key,
            }))
            .send()
            .await?;
        let body: TokenBody = Self::check(response, "get management token")?
            .json()
            .await?;
        tracing::debug!("Obtained video management token");
        *cached = Some(body.token.clone());
        Ok(body.token)
    }

    /// Drop `stale` unless another call already replaced it.
    async fn forget_management_token(&self, stale: &str) {
        let mut cached = self.management_token.lock().await;
        if cached.as_deref() == Some(stale) {
            *cached = None;
        }
    }

    /// Send a management call built by `build` for a bearer token, retrying
    /// once with a new token when the cached one is rejected.
    async fn send_managed<F>(&self, what: &str, build: F) -> Result<Response, ApiError>
    where
        F: Fn(&str) -> RequestBuilder + Send + Sync,
    {
        let token = self.management_token().await?;
        let response = build(&token).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Self::check(response, what);
        }
        tracing::debug!("Video management token rejected, fetching a new one");
        self.forget_management_token(&token).await;
        let token = self.management_token().await?;
        Self::check(build(&token).send().await?, what)
    }
}

#[async_trait]
impl VideoProvider for HmsClient {
    async fn create_room(&self, name: &str, description: &str) -> Result<Room, ApiError> {
        let body = serde_json::json!({
            "name": name,
            "description": description,
            "template_id": self.settings.template_id,
            "region": self.settings.region,
        });
        let response = self
            .send_managed("create room", |token| {
                self.http.post(self.url("rooms")).bearer_auth(token).json(&body)
            })
            .await?;
        let room: Room = response.json().await?;
        tracing::info!("Created video room {} ({})", room.id, name);
        Ok(room)
    }

    async fn get_room(&self, room_id: &str) -> Result<Room, ApiError> {
        let url = self.url(&format!("rooms/{}", room_id));
        let response = self
            .send_managed("get room details", |token| {
                self.http.get(&url).bearer_auth(token)
            })
            .await?;
        Ok(response.json().await?)
    }

    async fn auth_token(
        &self,
        room_id: &str,
        user_id: Uuid,
        role: VideoRole,
        user_name: &str,
    ) -> Result<String, ApiError> {
        let body = serde_json::json!({
            "room_id": room_id,
            "user_id": user_id,
            "role": role.as_str(),
            "type": "app",
            "user_metadata": { "name": user_name },
        });
        let response = self
            .send_managed("generate auth token", |token| {
                self.http.post(self.url("auth-tokens")).bearer_auth(token).json(&body)
            })
            .await?;
        let body: TokenBody = response.json().await?;
        Ok(body.token)
    }

    async fn end_room(&self, room_id: &str) -> Result<(), ApiError> {
        let url = self.url(&format!("rooms/{}/end-room", room_id));
        self.send_managed("end room", |token| {
            self.http.post(&url).bearer_auth(token).json(&serde_json::json!({}))
        })
        .await?;
        tracing::info!("Ended video room {}", room_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_mean_unconfigured() {
        let s = |v: &str| Some(v.to_string());
        assert!(VideoSettings::from_parts(
            s("your_100ms_access_key_here"),
            s("secret"),
            s("tmpl"),
            None,
            "us"
        )
        .is_none());
        assert!(VideoSettings::from_parts(s("key"), None, s("tmpl"), None, "us").is_none());
        assert!(VideoSettings::from_parts(s("key"), s(" "), s("tmpl"), None, "us").is_none());

        let ok = VideoSettings::from_parts(s("key"), s("secret"), s("tmpl"), None, "us").unwrap();
        assert_eq!(ok.api_url, DEFAULT_API_URL);
        assert_eq!(ok.region, "us");
    }

    #[test]
    fn test_role_mapping_and_room_name() {
        assert_eq!(VideoRole::from(UserRole::Therapist), VideoRole::Host);
        assert_eq!(VideoRole::from(UserRole::Patient).as_str(), "guest");
        assert_eq!(room_name(Uuid::nil()), format!("therapy-session-{}", Uuid::nil()));
    }

    mod management_api {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        use axum::extract::{Path, State};
        use axum::http::{HeaderMap, StatusCode};
        use axum::routing::{get, post};
        use axum::{Json, Router};
        use serde_json::{json, Value};

        use super::*;

        /// Issues numbered management tokens and accepts only those numbered
        /// at least `first_accepted`.
        #[derive(Default)]
        struct Issuer {
            issued: AtomicUsize,
            first_accepted: AtomicUsize,
        }

        async fn issue(State(issuer): State<Arc<Issuer>>) -> Json<Value> {
            let n = issuer.issued.fetch_add(1, Ordering::SeqCst) + 1;
            Json(json!({ "token": format!("mgmt-{}", n) }))
        }

        async fn room(
            State(issuer): State<Arc<Issuer>>,
            Path(id): Path<String>,
            headers: HeaderMap,
        ) -> Result<Json<Value>, StatusCode> {
            let number = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer mgmt-"))
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or(StatusCode::UNAUTHORIZED)?;
            if number < issuer.first_accepted.load(Ordering::SeqCst) {
                return Err(StatusCode::UNAUTHORIZED);
            }
            Ok(Json(json!({ "id": id, "name": "therapy", "enabled": true })))
        }

        async fn serve(issuer: Arc<Issuer>) -> HmsClient {
            let app = Router::new()
                .route("/management-tokens", post(issue))
                .route("/rooms/{id}", get(room))
                .with_state(issuer);
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
            HmsClient::new(VideoSettings {
                access_key: "key".to_string(),
                secret_key: "secret".to_string(),
                template_id: "tmpl".to_string(),
                api_url: format!("http://{}", addr),
                region: "us".to_string(),
            })
        }

        #[tokio::test]
        async fn test_rejected_management_token_is_replaced() {
            let issuer = Arc::new(Issuer::default());
            let client = serve(issuer.clone()).await;

            client.get_room("r1").await.unwrap();
            assert_eq!(issuer.issued.load(Ordering::SeqCst), 1);
            client.get_room("r1").await.unwrap();
            assert_eq!(issuer.issued.load(Ordering::SeqCst), 1);

            // The provider revokes mgmt-1.
            issuer.first_accepted.store(2, Ordering::SeqCst);
            let room = client.get_room("r2").await.unwrap();
            assert_eq!(room.id, "r2");
            assert_eq!(issuer.issued.load(Ordering::SeqCst), 2);
        }

        #[tokio::test]
        async fn test_retries_only_once() {
            let issuer = Arc::new(Issuer::default());
            issuer.first_accepted.store(usize::MAX, Ordering::SeqCst);
            let client = serve(issuer.clone()).await;

            let err = client.get_room("r1").await.unwrap_err();
            assert!(matches!(err, ApiError::Video(_)));
            assert_eq!(issuer.issued.load(Ordering::SeqCst), 2);
        }
    }
}
