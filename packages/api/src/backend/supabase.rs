//! REST client for a Supabase project.
//!
//! | Call | Endpoint |
//! |------|----------|
//! | sign up | `POST /auth/v1/signup` |
//! | sign in | `POST /auth/v1/token?grant_type=password` |
//! | refresh | `POST /auth/v1/token?grant_type=refresh_token` |
//! | sign out | `POST /auth/v1/logout` |
//! | current user | `GET /auth/v1/user` |
//! | table CRUD | `GET/POST/PATCH/DELETE /rest/v1/{table}` |
//!
//! Every request carries the project's anon key in `apikey`. Table calls are
//! authorized with the user's access token when one is given, so row-level
//! security applies; otherwise the anon key is used as the bearer.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::{AuthSession, AuthUser, Backend, Filter, Query, Table};
use crate::error::ApiError;
use crate::models::AuthTokens;

pub struct SupabaseBackend {
    http: Client,
    base_url: String,
    anon_key: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: AuthUser,
}

/// Older auth servers only send `expires_in`.
fn session_tokens(
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
) -> AuthTokens {
    let expires_at =
        expires_at.or_else(|| expires_in.map(|secs| Utc::now().timestamp() + secs));
    AuthTokens {
        access_token,
        refresh_token,
        expires_at,
    }
}

impl TokenResponse {
    fn into_session(self) -> AuthSession {
        let tokens = session_tokens(
            self.access_token,
            self.refresh_token,
            self.expires_at,
            self.expires_in,
        );
        AuthSession {
            user: self.user,
            tokens: Some(tokens),
        }
    }
}

/// Sign-up answers with a session, or with the bare user when e-mail
/// confirmation is pending.
#[derive(Debug, Deserialize)]
struct SignUpResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    user: Option<AuthUser>,
    #[serde(default)]
    id: Option<Uuid>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        self.message
            .or(self.msg)
            .or(self.error_description)
            .or(self.error)
    }
}

impl SupabaseBackend {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.name())
    }

    fn authorize(&self, request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(token.unwrap_or(&self.anon_key))
    }

    fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
        filters.iter().map(Filter::to_param).collect()
    }

    /// Pass successful responses through; turn the rest into [`ApiError::Backend`].
    async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(ErrorBody::into_message)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Backend request failed")
                    .to_string()
            });
        tracing::debug!("Backend returned {}: {}", status, message);
        Err(ApiError::Backend {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl Backend for SupabaseBackend {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, ApiError> {
        let response = self
            .authorize(self.http.post(self.auth_url("signup")), None)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;
        let body: SignUpResponse = Self::check(response).await?.json().await?;

        let user = match (body.user, body.id) {
            (Some(user), _) => user,
            (None, Some(id)) => AuthUser {
                id,
                email: body.email.unwrap_or_else(|| email.to_string()),
            },
            (None, None) => {
                return Err(ApiError::Backend {
                    status: 502,
                    message: "Sign-up response contained no user".to_string(),
                })
            }
        };
        let tokens = body.access_token.map(|access_token| {
            session_tokens(access_token, body.refresh_token, body.expires_at, body.expires_in)
        });
        Ok(AuthSession { user, tokens })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, ApiError> {
        let response = self
            .authorize(self.http.post(self.auth_url("token")), None)
            .query(&[("grant_type", "password")])
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;
        let body: TokenResponse = Self::check(response).await?.json().await?;
        Ok(body.into_session())
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, ApiError> {
        let response = self
            .authorize(self.http.post(self.auth_url("token")), None)
            .query(&[("grant_type", "refresh_token")])
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        match Self::check(response).await {
            Ok(response) => Ok(response.json::<TokenResponse>().await?.into_session()),
            Err(ApiError::Backend {
                status: 400 | 401, ..
            }) => Err(ApiError::Unauthorized),
            Err(e) => Err(e),
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), ApiError> {
        let response = self
            .authorize(self.http.post(self.auth_url("logout")), Some(access_token))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, ApiError> {
        let response = self
            .authorize(self.http.get(self.auth_url("user")), Some(access_token))
            .send()
            .await?;
        match Self::check(response).await {
            Ok(response) => Ok(response.json().await?),
            Err(ApiError::Backend { status: 401, .. }) => Err(ApiError::Unauthorized),
            Err(e) => Err(e),
        }
    }

    async fn select(
        &self,
        table: Table,
        query: &Query,
        token: Option<&str>,
    ) -> Result<Vec<Value>, ApiError> {
        let response = self
            .authorize(self.http.get(self.table_url(table)), token)
            .query(&query.to_params())
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn insert(
        &self,
        table: Table,
        row: Value,
        token: Option<&str>,
    ) -> Result<Value, ApiError> {
        let response = self
            .authorize(self.http.post(self.table_url(table)), token)
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        let rows: Vec<Value> = Self::check(response).await?.json().await?;
        rows.into_iter().next().ok_or(ApiError::Backend {
            status: 502,
            message: format!("Insert into {} returned no row", table.name()),
        })
    }

    async fn update(
        &self,
        table: Table,
        filters: &[Filter],
        patch: Value,
        token: Option<&str>,
    ) -> Result<Vec<Value>, ApiError> {
        let response = self
            .authorize(self.http.patch(self.table_url(table)), token)
            .header("Prefer", "return=representation")
            .query(&Self::filter_params(filters))
            .json(&patch)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn delete(
        &self,
        table: Table,
        filters: &[Filter],
        token: Option<&str>,
    ) -> Result<(), ApiError> {
        let response = self
            .authorize(self.http.delete(self.table_url(table)), token)
            .query(&Self::filter_params(filters))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let backend = SupabaseBackend::new("https://demo.supabase.co/", "anon");
        assert_eq!(backend.auth_url("signup"), "https://demo.supabase.co/auth/v1/signup");
        assert_eq!(
            backend.table_url(Table::PrivateNotes),
            "https://demo.supabase.co/rest/v1/private_notes"
        );
    }

    #[test]
    fn test_error_body_message_precedence() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"msg":"User already registered","error":"x"}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("User already registered"));
        let empty: ErrorBody = serde_json::from_str("{}").unwrap();
        assert!(empty.into_message().is_none());
    }

    #[test]
    fn test_sign_up_response_shapes() {
        let pending: SignUpResponse = serde_json::from_str(
            r#"{"id":"1f0c6a3e-5b7e-4a59-9a8e-0b7c1f3d2e11","email":"a@b.co"}"#,
        )
        .unwrap();
        assert!(pending.user.is_none());
        assert!(pending.access_token.is_none());
        assert!(pending.id.is_some());
    }

    #[test]
    fn test_expiry_from_expires_in() {
        let before = Utc::now().timestamp();
        let tokens = session_tokens("a".to_string(), Some("r".to_string()), None, Some(3600));
        let expires_at = tokens.expires_at.unwrap();
        assert!(expires_at >= before + 3600 && expires_at <= Utc::now().timestamp() + 3600);

        let explicit = session_tokens("a".to_string(), None, Some(42), Some(3600));
        assert_eq!(explicit.expires_at, Some(42));
    }

    /// Auth server that hands out a new session for "good-refresh" only.
    async fn auth_server() -> String {
        use axum::extract::Query as QueryParams;
        use axum::http::StatusCode;
        use axum::routing::post;
        use axum::{Json, Router};
        use std::collections::HashMap;

        async fn token(
            QueryParams(params): QueryParams<HashMap<String, String>>,
            Json(body): Json<Value>,
        ) -> (StatusCode, Json<Value>) {
            let refresh = params.get("grant_type").map(String::as_str) == Some("refresh_token");
            if refresh && body["refresh_token"] == "good-refresh" {
                let session = serde_json::json!({
                    "access_token": "fresh-access",
                    "refresh_token": "next-refresh",
                    "expires_in": 3600,
                    "user": { "id": Uuid::nil(), "email": "ada@example.com" }
                });
                return (StatusCode::OK, Json(session));
            }
            let error = serde_json::json!({ "error_description": "Invalid Refresh Token" });
            (StatusCode::BAD_REQUEST, Json(error))
        }

        let app = Router::new().route("/auth/v1/token", post(token));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_refresh_session_exchanges_refresh_token() {
        let backend = SupabaseBackend::new(&auth_server().await, "anon");

        let session = backend.refresh_session("good-refresh").await.unwrap();
        assert_eq!(session.user.email, "ada@example.com");
        let tokens = session.tokens.unwrap();
        assert_eq!(tokens.access_token, "fresh-access");
        assert_eq!(tokens.refresh_token.as_deref(), Some("next-refresh"));
        assert!(tokens.expires_at.is_some());

        let err = backend.refresh_session("stale-refresh").await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
    }
}
