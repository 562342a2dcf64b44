//! # API crate: server-side services for MindCare
//!
//! Everything that needs secrets or the network lives here. The web binary
//! builds one [`Platform`] at startup and calls it from its route handlers.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`auth`] | Password hashing for in-memory accounts, session key |
//! | [`backend`] | Backend-as-a-service seam: REST client, in-memory implementation, query builder |
//! | [`crypto`] | AES-GCM encryption of private note content |
//! | [`error`] | [`ApiError`], the error every service returns |
//! | [`models`] | The signed-in user ([`CurrentUser`]) and its client-safe projection ([`UserInfo`]) |
//! | [`services`] | [`Platform`]: one method per user-facing operation |
//! | [`settings`] | Environment variables and the TOML tuning file |
//! | [`video`] | Video-room provider client |
//!
//! ## Data flow
//!
//! ```text
//! route handler ──> Platform ──> Backend (auth + tables)
//!                       │  └──> VideoProvider (rooms, tokens)
//!                       └─────> crypto (note content in and out)
//! ```

pub mod auth;
pub mod backend;
pub mod crypto;
pub mod error;
pub mod models;
pub mod services;
pub mod settings;
pub mod video;

pub use error::ApiError;
pub use models::{CurrentUser, UserInfo};
pub use services::Platform;
pub use settings::Settings;
pub use video::{SessionToken, VideoRole};

pub use store::MindCareConfig;
