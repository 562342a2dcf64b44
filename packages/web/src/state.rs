//! Shared server state, the signed-in-user extractor and token renewal.
//!
//! Access tokens stored in the session expire. [`SignedIn`] renews them
//! shortly before they do, and [`renew_on_unauthorized`] renews and replays a
//! request once when the backend rejects the token anyway. When renewal is
//! refused the session is flushed and the user's cache dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use api::auth::SESSION_USER_KEY;
use api::{ApiError, CurrentUser, MindCareConfig, Platform};
use axum::body::{Body, Bytes};
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use store::ClientCache;
use tower_sessions::Session;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Largest request body kept around for a replay.
const REPLAY_LIMIT: usize = 1024 * 1024;

struct CacheEntry {
    cache: ClientCache,
    last_used: Instant,
}

pub struct AppState {
    pub platform: Platform,
    pub config: MindCareConfig,
    caches: Mutex<HashMap<Uuid, CacheEntry>>,
    cache_idle: Duration,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Caches unused for as long as a session may stay idle are evicted.
    pub fn new(platform: Platform, config: MindCareConfig) -> SharedState {
        let idle = Duration::from_secs(u64::from(config.server.session_days) * 24 * 60 * 60);
        Self::with_cache_idle(platform, config, idle)
    }

    pub fn with_cache_idle(
        platform: Platform,
        config: MindCareConfig,
        cache_idle: Duration,
    ) -> SharedState {
        Arc::new(Self {
            platform,
            config,
            caches: Mutex::new(HashMap::new()),
            cache_idle,
        })
    }

    fn caches(&self) -> MutexGuard<'_, HashMap<Uuid, CacheEntry>> {
        self.caches.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The cache of one signed-in user, created on first use.
    pub fn cache(&self, user_id: Uuid) -> ClientCache {
        let now = Instant::now();
        let mut caches = self.caches();
        let before = caches.len();
        caches.retain(|id, entry| {
            *id == user_id || now.saturating_duration_since(entry.last_used) <= self.cache_idle
        });
        if caches.len() < before {
            debug!("Evicted {} idle client caches", before - caches.len());
        }
        let entry = caches.entry(user_id).or_insert_with(|| CacheEntry {
            cache: ClientCache::new(),
            last_used: now,
        });
        entry.last_used = now;
        entry.cache.clone()
    }

    pub fn drop_cache(&self, user_id: Uuid) {
        self.caches().remove(&user_id);
    }
}

/// Swap the user's tokens for fresh ones and store the result in the session.
/// A refused renewal signs the user out locally.
async fn renew(state: &AppState, session: &Session, user: &CurrentUser) -> AppResult<CurrentUser> {
    match state.platform.renew_session(user).await {
        Ok(renewed) => {
            session.insert(SESSION_USER_KEY, &renewed).await?;
            Ok(renewed)
        }
        Err(ApiError::Unauthorized) => {
            info!("Session of {} could not be renewed, signing out", user.id);
            state.drop_cache(user.id);
            session.flush().await?;
            Err(ApiError::Unauthorized.into())
        }
        Err(e) => Err(e.into()),
    }
}

/// Extracts the user stored in the session, rejecting with 401 when nobody
/// is signed in. Tokens close to expiry are renewed first.
pub struct SignedIn(pub CurrentUser);

impl FromRequestParts<SharedState> for SignedIn {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::MissingSession)?;
        let user: CurrentUser = session
            .get(SESSION_USER_KEY)
            .await?
            .ok_or(AppError::Api(ApiError::Unauthorized))?;
        if !user.needs_refresh(Utc::now()) {
            return Ok(SignedIn(user));
        }
        match renew(state, &session, &user).await {
            Ok(renewed) => Ok(SignedIn(renewed)),
            Err(AppError::Api(ApiError::Unauthorized)) => Err(ApiError::Unauthorized.into()),
            Err(e) => {
                warn!("Token renewal for {} failed, using current token: {}", user.id, e);
                Ok(SignedIn(user))
            }
        }
    }
}

fn replay_request(parts: &Parts, body: Bytes) -> Request {
    let mut request = Request::new(Body::from(body));
    *request.method_mut() = parts.method.clone();
    *request.uri_mut() = parts.uri.clone();
    *request.version_mut() = parts.version;
    *request.headers_mut() = parts.headers.clone();
    *request.extensions_mut() = parts.extensions.clone();
    request
}

/// Middleware: when a signed-in request comes back 401, renew the tokens and
/// send the request through once more.
pub async fn renew_on_unauthorized(
    State(state): State<SharedState>,
    session: Session,
    request: Request,
    next: Next,
) -> Response {
    let user = match session.get::<CurrentUser>(SESSION_USER_KEY).await {
        Ok(Some(user)) if user.refresh_token().is_some() => user,
        _ => return next.run(request).await,
    };

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, REPLAY_LIMIT).await {
        Ok(bytes) => bytes,
        Err(_) => return StatusCode::PAYLOAD_TOO_LARGE.into_response(),
    };
    let replay = replay_request(&parts, bytes.clone());
    let response = next
        .clone()
        .run(Request::from_parts(parts, Body::from(bytes)))
        .await;
    if response.status() != StatusCode::UNAUTHORIZED {
        return response;
    }

    // Leave it alone if the handler already renewed or signed out.
    match session.get::<CurrentUser>(SESSION_USER_KEY).await {
        Ok(Some(current)) if current.tokens == user.tokens => {}
        _ => return response,
    }
    match renew(&state, &session, &user).await {
        Ok(_) => {
            debug!("Replaying {} {} with renewed tokens", replay.method(), replay.uri());
            next.run(replay).await
        }
        Err(e) => e.into_response(),
    }
}
