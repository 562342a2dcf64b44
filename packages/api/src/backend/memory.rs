use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{AuthSession, AuthUser, Backend, Condition, Direction, Filter, Query, Table};
use crate::auth::{hash_password, verify_password};
use crate::error::ApiError;
use crate::models::AuthTokens;

/// Lifetime of access tokens issued by the in-memory identity provider.
pub const ACCESS_TOKEN_TTL_SECS: i64 = 3600;

type Row = Map<String, Value>;

#[derive(Debug)]
struct Account {
    user: AuthUser,
    password_hash: String,
}

#[derive(Debug)]
struct IssuedToken {
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Db {
    tables: HashMap<Table, Vec<Row>>,
    accounts: HashMap<String, Account>,
    tokens: HashMap<String, IssuedToken>,
    /// Refresh token -> user. Each one can be used once.
    refresh_tokens: HashMap<String, Uuid>,
    token_ttl: Duration,
    last_stamp: Option<DateTime<Utc>>,
}

impl Default for Db {
    fn default() -> Self {
        Self {
            tables: HashMap::new(),
            accounts: HashMap::new(),
            tokens: HashMap::new(),
            refresh_tokens: HashMap::new(),
            token_ttl: Duration::seconds(ACCESS_TOKEN_TTL_SECS),
            last_stamp: None,
        }
    }
}

impl Db {
    fn issue(&mut self, user: AuthUser) -> AuthSession {
        let access_token = Uuid::new_v4().to_string();
        let refresh_token = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + self.token_ttl;
        self.tokens.insert(
            access_token.clone(),
            IssuedToken {
                user_id: user.id,
                expires_at,
            },
        );
        self.refresh_tokens.insert(refresh_token.clone(), user.id);
        AuthSession {
            user,
            tokens: Some(AuthTokens {
                access_token,
                refresh_token: Some(refresh_token),
                expires_at: Some(expires_at.timestamp()),
            }),
        }
    }

    /// The live user behind an access token.
    fn token_user(&self, access_token: &str) -> Option<Uuid> {
        self.tokens
            .get(access_token)
            .filter(|t| t.expires_at > Utc::now())
            .map(|t| t.user_id)
    }

    /// Table calls made without a token run as the anonymous role; a token
    /// that is unknown or expired is rejected like the REST gateway does.
    fn authorize(&self, token: Option<&str>) -> Result<(), ApiError> {
        match token {
            Some(token) if self.token_user(token).is_none() => Err(ApiError::Backend {
                status: 401,
                message: "JWT expired".to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Strictly increasing timestamps, so "newest first" is well defined even
    /// for rows inserted within the same clock tick.
    fn next_stamp(&mut self) -> String {
        let mut now = Utc::now();
        if let Some(last) = self.last_stamp {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_stamp = Some(now);
        now.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn rows(&self, table: Table) -> &[Row] {
        self.tables.get(&table).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// In-process backend for demo mode and tests. Auth accounts and table rows
/// live in memory; clones share the same data.
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
    db: Arc<Mutex<Db>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue access tokens that live for `ttl` instead of an hour.
    pub fn with_token_ttl(self, ttl: Duration) -> Self {
        self.db().token_ttl = ttl;
        self
    }

    /// Push every access token issued so far past its expiry. Refresh tokens
    /// stay valid.
    pub fn expire_access_tokens(&self) {
        let past = Utc::now() - Duration::seconds(1);
        for token in self.db().tokens.values_mut() {
            token.expires_at = past;
        }
    }

    /// Sign every user out: access and refresh tokens stop working.
    pub fn revoke_all_sessions(&self) {
        let mut db = self.db();
        db.tokens.clear();
        db.refresh_tokens.clear();
    }

    fn db(&self) -> MutexGuard<'_, Db> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of rows currently stored in `table`.
    pub fn row_count(&self, table: Table) -> usize {
        self.db().rows(table).len()
    }

    /// Raw stored rows, as the REST backend would persist them.
    pub fn raw_rows(&self, table: Table) -> Vec<Value> {
        self.db()
            .rows(table)
            .iter()
            .cloned()
            .map(Value::Object)
            .collect()
    }
}

fn unique_keys(table: Table) -> &'static [&'static str] {
    match table {
        Table::TherapistProfiles => &["user_id"],
        Table::GroupMembers => &["group_id", "user_id"],
        _ => &[],
    }
}

fn has_updated_at(table: Table) -> bool {
    matches!(table, Table::BlogPosts | Table::PrivateNotes)
}

fn is_missing(row: &Row, key: &str) -> bool {
    row.get(key).map(Value::is_null).unwrap_or(true)
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn matches_all(row: &Row, filters: &[Filter]) -> bool {
    filters.iter().all(|f| {
        let cell = row.get(f.column).and_then(cell_text);
        match &f.condition {
            Condition::Eq(value) => cell.as_deref() == Some(value.as_str()),
            Condition::IsNull => cell.is_none(),
        }
    })
}

fn compare_cells(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => cell_text(x).cmp(&cell_text(y)),
    }
}

fn duplicate() -> ApiError {
    ApiError::Backend {
        status: 409,
        message: "duplicate key value violates unique constraint".to_string(),
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, ApiError> {
        let email = email.trim().to_lowercase();
        let password_hash = hash_password(password)?;

        // Check and insert under one guard.
        let mut db = self.db();
        if db.accounts.contains_key(&email) {
            return Err(ApiError::Backend {
                status: 422,
                message: "User already registered".to_string(),
            });
        }
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: email.clone(),
        };
        db.accounts.insert(
            email,
            Account {
                user: user.clone(),
                password_hash,
            },
        );
        Ok(db.issue(user))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, ApiError> {
        let email = email.trim().to_lowercase();
        let invalid = || ApiError::Backend {
            status: 400,
            message: "Invalid login credentials".to_string(),
        };
        let (user, password_hash) = {
            let db = self.db();
            let account = db.accounts.get(&email).ok_or_else(invalid)?;
            (account.user.clone(), account.password_hash.clone())
        };
        if !verify_password(password, &password_hash)? {
            return Err(invalid());
        }
        Ok(self.db().issue(user))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, ApiError> {
        let mut db = self.db();
        let user_id = db
            .refresh_tokens
            .remove(refresh_token)
            .ok_or(ApiError::Unauthorized)?;
        let user = db
            .accounts
            .values()
            .find(|a| a.user.id == user_id)
            .map(|a| a.user.clone())
            .ok_or(ApiError::Unauthorized)?;
        Ok(db.issue(user))
    }

    /// Revokes the access token and every refresh token of its user.
    async fn sign_out(&self, access_token: &str) -> Result<(), ApiError> {
        let mut db = self.db();
        if let Some(issued) = db.tokens.remove(access_token) {
            db.refresh_tokens.retain(|_, user| *user != issued.user_id);
        }
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, ApiError> {
        let db = self.db();
        let id = db.token_user(access_token).ok_or(ApiError::Unauthorized)?;
        db.accounts
            .values()
            .find(|a| a.user.id == id)
            .map(|a| a.user.clone())
            .ok_or(ApiError::Unauthorized)
    }

    async fn select(
        &self,
        table: Table,
        query: &Query,
        token: Option<&str>,
    ) -> Result<Vec<Value>, ApiError> {
        let db = self.db();
        db.authorize(token)?;
        let mut rows: Vec<Row> = db
            .rows(table)
            .iter()
            .filter(|row| matches_all(row, &query.filters))
            .cloned()
            .collect();

        rows.sort_by(|a, b| {
            query
                .order
                .iter()
                .map(|o| {
                    let ord = compare_cells(a.get(o.column), b.get(o.column));
                    match o.direction {
                        Direction::Asc => ord,
                        Direction::Desc => ord.reverse(),
                    }
                })
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        for row in rows.iter_mut() {
            for embed in &query.embeds {
                let target = row.get(embed.foreign_key).and_then(cell_text);
                let related = target
                    .and_then(|id| {
                        db.rows(embed.table).iter().find(|r| {
                            r.get("id").and_then(cell_text).as_deref() == Some(id.as_str())
                        })
                    })
                    .map(|r| {
                        let projected: Row = embed
                            .columns
                            .iter()
                            .map(|c| (c.to_string(), r.get(*c).cloned().unwrap_or(Value::Null)))
                            .collect();
                        Value::Object(projected)
                    })
                    .unwrap_or(Value::Null);
                row.insert(embed.alias.to_string(), related);
            }
        }

        Ok(rows.into_iter().map(Value::Object).collect())
    }

    async fn insert(
        &self,
        table: Table,
        row: Value,
        token: Option<&str>,
    ) -> Result<Value, ApiError> {
        let Value::Object(mut row) = row else {
            return Err(ApiError::Backend {
                status: 400,
                message: "Row must be a JSON object".to_string(),
            });
        };

        let mut db = self.db();
        db.authorize(token)?;
        if is_missing(&row, "id") {
            row.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        }
        let stamp = db.next_stamp();
        if is_missing(&row, "created_at") {
            row.insert("created_at".to_string(), Value::String(stamp.clone()));
        }
        if has_updated_at(table) && is_missing(&row, "updated_at") {
            row.insert("updated_at".to_string(), Value::String(stamp));
        }

        let existing = db.rows(table);
        let same = |keys: &[&str], other: &Row| {
            keys.iter().all(|k| {
                row.get(*k).and_then(cell_text).is_some()
                    && row.get(*k).and_then(cell_text) == other.get(*k).and_then(cell_text)
            })
        };
        if existing
            .iter()
            .any(|other| same(&["id"], other) || (!unique_keys(table).is_empty() && same(unique_keys(table), other)))
        {
            return Err(duplicate());
        }

        db.tables.entry(table).or_default().push(row.clone());
        Ok(Value::Object(row))
    }

    async fn update(
        &self,
        table: Table,
        filters: &[Filter],
        patch: Value,
        token: Option<&str>,
    ) -> Result<Vec<Value>, ApiError> {
        let Value::Object(patch) = patch else {
            return Err(ApiError::Backend {
                status: 400,
                message: "Patch must be a JSON object".to_string(),
            });
        };
        let mut db = self.db();
        db.authorize(token)?;
        // Stamped here like the updated_at trigger on the hosted tables.
        let stamp = has_updated_at(table).then(|| db.next_stamp());
        let mut updated = Vec::new();
        if let Some(rows) = db.tables.get_mut(&table) {
            for row in rows.iter_mut().filter(|r| matches_all(r, filters)) {
                for (key, value) in &patch {
                    row.insert(key.clone(), value.clone());
                }
                if let Some(stamp) = &stamp {
                    row.insert("updated_at".to_string(), Value::String(stamp.clone()));
                }
                updated.push(Value::Object(row.clone()));
            }
        }
        Ok(updated)
    }

    async fn delete(
        &self,
        table: Table,
        filters: &[Filter],
        token: Option<&str>,
    ) -> Result<(), ApiError> {
        let mut db = self.db();
        db.authorize(token)?;
        if let Some(rows) = db.tables.get_mut(&table) {
            rows.retain(|r| !matches_all(r, filters));
        }
        Ok(())
    }
}
