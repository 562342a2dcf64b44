//! Session keys.

/// Key under which the serialized [`crate::models::CurrentUser`] is stored in
/// the cookie session.
pub const SESSION_USER_KEY: &str = "current_user";
