//! # Backend-as-a-service client
//!
//! Identity and persistence are delegated to a hosted backend that exposes an
//! auth API and the relational tables over REST. [`Backend`] is the seam every
//! service talks through; rows cross it as `serde_json::Value` so the trait
//! stays object-safe and can sit behind `Arc<dyn Backend>` in server state.
//!
//! | Implementation | Used when |
//! |----------------|-----------|
//! | [`SupabaseBackend`] | `SUPABASE_URL` and `SUPABASE_ANON_KEY` are set |
//! | [`MemoryBackend`] | demo mode and tests |
//!
//! The typed helpers ([`select_rows`], [`select_row`], [`insert_row`], [`update_rows`])
//! convert between rows and the records in `store::models`.

mod memory;
mod query;
mod supabase;

pub use memory::MemoryBackend;
pub use query::{eq, is_null, Condition, Direction, Embed, Filter, OrderBy, Query};
pub use supabase::SupabaseBackend;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::AuthTokens;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Table {
    Profiles,
    TherapistProfiles,
    Appointments,
    BlogPosts,
    PrivateNotes,
    Groups,
    GroupMembers,
    GroupPosts,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Profiles => "profiles",
            Table::TherapistProfiles => "therapist_profiles",
            Table::Appointments => "appointments",
            Table::BlogPosts => "blog_posts",
            Table::PrivateNotes => "private_notes",
            Table::Groups => "groups",
            Table::GroupMembers => "group_members",
            Table::GroupPosts => "group_posts",
        }
    }
}

/// Identity as known to the auth API.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: String,
}

/// Result of sign-up, sign-in or a token refresh. Sign-up yields no tokens
/// when the backend requires e-mail confirmation first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: AuthUser,
    pub tokens: Option<AuthTokens>,
}

impl AuthSession {
    pub fn access_token(&self) -> Option<&str> {
        self.tokens.as_ref().map(|t| t.access_token.as_str())
    }
}

#[async_trait]
pub trait Backend: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, ApiError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, ApiError>;

    /// Exchange a refresh token for a new token pair. A rejected refresh
    /// token is reported as [`ApiError::Unauthorized`].
    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, ApiError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), ApiError>;

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, ApiError>;

    async fn select(
        &self,
        table: Table,
        query: &Query,
        token: Option<&str>,
    ) -> Result<Vec<Value>, ApiError>;

    /// Insert one row and return it as stored, with server defaults filled in.
    async fn insert(&self, table: Table, row: Value, token: Option<&str>)
        -> Result<Value, ApiError>;

    /// Apply `patch` to every row matching all `filters`; returns the updated rows.
    async fn update(
        &self,
        table: Table,
        filters: &[Filter],
        patch: Value,
        token: Option<&str>,
    ) -> Result<Vec<Value>, ApiError>;

    async fn delete(
        &self,
        table: Table,
        filters: &[Filter],
        token: Option<&str>,
    ) -> Result<(), ApiError>;
}

pub async fn select_rows<T: DeserializeOwned>(
    backend: &dyn Backend,
    table: Table,
    query: &Query,
    token: Option<&str>,
) -> Result<Vec<T>, ApiError> {
    backend
        .select(table, query, token)
        .await?
        .into_iter()
        .map(|row| serde_json::from_value(row).map_err(ApiError::from))
        .collect()
}

pub async fn select_row<T: DeserializeOwned>(
    backend: &dyn Backend,
    table: Table,
    query: &Query,
    token: Option<&str>,
) -> Result<Option<T>, ApiError> {
    let query = query.clone().limit(1);
    Ok(select_rows(backend, table, &query, token).await?.into_iter().next())
}

pub async fn insert_row<T: DeserializeOwned, R: Serialize>(
    backend: &dyn Backend,
    table: Table,
    row: &R,
    token: Option<&str>,
) -> Result<T, ApiError> {
    let stored = backend
        .insert(table, serde_json::to_value(row)?, token)
        .await?;
    Ok(serde_json::from_value(stored)?)
}

pub async fn update_rows<T: DeserializeOwned, P: Serialize>(
    backend: &dyn Backend,
    table: Table,
    filters: &[Filter],
    patch: &P,
    token: Option<&str>,
) -> Result<Vec<T>, ApiError> {
    backend
        .update(table, filters, serde_json::to_value(patch)?, token)
        .await?
        .into_iter()
        .map(|row| serde_json::from_value(row).map_err(ApiError::from))
        .collect()
}
