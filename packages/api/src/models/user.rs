//! # The signed-in user
//!
//! Two representations of an account:
//!
//! ## [`CurrentUser`]
//!
//! What the server keeps in the session after sign-in: identity, role and the
//! backend [`AuthTokens`] that authorize table calls on the user's behalf. The
//! tokens never leave the server. Access tokens are short-lived; the refresh
//! token trades an expiring one for a new pair.
//!
//! ## [`UserInfo`]
//!
//! The client-safe projection returned by `/api/auth/me`. [`UserInfo::display_name`]
//! falls back to the e-mail address when no name is on file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use store::models::{DashboardSection, Profile, UserRole};

/// Renew this many seconds before the access token actually expires.
pub const REFRESH_MARGIN_SECS: i64 = 60;

/// Credentials issued by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix timestamp (seconds) at which `access_token` stops being accepted.
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl AuthTokens {
    /// True once the access token is within [`REFRESH_MARGIN_SECS`] of expiry
    /// and a refresh token is available to replace it.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        match (&self.refresh_token, self.expires_at) {
            (Some(_), Some(expires_at)) => expires_at - REFRESH_MARGIN_SECS <= now.timestamp(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: UserRole,
    pub tokens: Option<AuthTokens>,
}

impl CurrentUser {
    pub fn from_profile(email: &str, profile: &Profile, tokens: Option<AuthTokens>) -> Self {
        Self {
            id: profile.id,
            email: email.to_string(),
            full_name: Some(profile.full_name.clone()).filter(|n| !n.is_empty()),
            role: profile.user_type,
            tokens,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.tokens.as_ref().map(|t| t.access_token.as_str())
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.tokens.as_ref()?.refresh_token.as_deref()
    }

    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.tokens.as_ref().is_some_and(|t| t.needs_refresh(now))
    }

    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.email)
    }

    pub fn to_info(&self) -> UserInfo {
        UserInfo {
            id: self.id,
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            role: self.role,
            sections: self.role.sections(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: UserRole,
    /// Dashboard sections this user may open, in sidebar order.
    pub sections: Vec<DashboardSection>,
}

impl UserInfo {
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_hides_token() {
        let user = CurrentUser {
            id: Uuid::new_v4(),
            email: "sam@example.com".to_string(),
            full_name: None,
            role: UserRole::Therapist,
            tokens: Some(AuthTokens {
                access_token: "secret-token".to_string(),
                refresh_token: Some("refresh-me".to_string()),
                expires_at: None,
            }),
        };
        let info = user.to_info();
        assert_eq!(info.display_name(), "sam@example.com");
        assert!(info.sections.contains(&DashboardSection::Profile));
        let json = serde_json::to_string(&info).unwrap();
        assert!(!json.contains("secret-token"));
        assert!(!json.contains("refresh-me"));
    }

    #[test]
    fn test_refresh_is_due_inside_the_margin() {
        let now = Utc::now();
        let tokens = |expires_at: Option<i64>, refresh: Option<&str>| AuthTokens {
            access_token: "a".to_string(),
            refresh_token: refresh.map(str::to_string),
            expires_at,
        };
        let soon = now.timestamp() + REFRESH_MARGIN_SECS - 1;
        let later = now.timestamp() + 3600;

        assert!(tokens(Some(soon), Some("r")).needs_refresh(now));
        assert!(tokens(Some(now.timestamp() - 5), Some("r")).needs_refresh(now));
        assert!(!tokens(Some(later), Some("r")).needs_refresh(now));
        assert!(!tokens(Some(soon), None).needs_refresh(now));
        assert!(!tokens(None, Some("r")).needs_refresh(now));
    }
}
