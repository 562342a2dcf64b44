//! Server-side account models.

mod user;

pub use user::{AuthTokens, CurrentUser, UserInfo, REFRESH_MARGIN_SECS};
