//! # Platform services
//!
//! [`Platform`] is the one entry point the web layer calls. It bundles the
//! backend, the optional video provider, the note key and the join policy,
//! and exposes one async method per user-facing operation, grouped by area:
//!
//! | File | Operations |
//! |------|-----------|
//! | `auth.rs` | register, login, logout, refresh the signed-in user, renew tokens |
//! | `notes.rs` | list/create/update/delete private notes, tag list |
//! | `blog.rs` | list/read/create/update/delete blog posts |
//! | `therapists.rs` | therapist directory and the therapist's own profile |
//! | `appointments.rs` | list, book, change status, join a video session |
//! | `groups.rs` | list, create, join, leave, group posts |
//! | `demo.rs` | sample data for demo mode |
//!
//! Authorization lives here rather than in the routes: a patient can never
//! edit a therapist profile and a therapist can never touch private notes,
//! whatever client calls the API.

mod appointments;
mod auth;
mod blog;
mod demo;
mod groups;
mod notes;
mod therapists;

use std::sync::Arc;

use store::models::UserRole;
use store::JoinPolicy;

use crate::backend::Backend;
use crate::crypto::NoteKey;
use crate::error::ApiError;
use crate::models::CurrentUser;
use crate::video::VideoProvider;

pub use demo::{seed_demo, DEMO_PASSWORD};

#[derive(Clone)]
pub struct Platform {
    backend: Arc<dyn Backend>,
    video: Option<Arc<dyn VideoProvider>>,
    note_key: NoteKey,
    join_policy: JoinPolicy,
}

impl Platform {
    pub fn new(backend: Arc<dyn Backend>, note_key: NoteKey) -> Self {
        Self {
            backend,
            video: None,
            note_key,
            join_policy: JoinPolicy::default(),
        }
    }

    pub fn with_video(mut self, video: Arc<dyn VideoProvider>) -> Self {
        self.video = Some(video);
        self
    }

    pub fn with_join_policy(mut self, policy: JoinPolicy) -> Self {
        self.join_policy = policy;
        self
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn join_policy(&self) -> JoinPolicy {
        self.join_policy
    }

    pub fn video_enabled(&self) -> bool {
        self.video.is_some()
    }

    fn video(&self) -> Result<&dyn VideoProvider, ApiError> {
        self.video.as_deref().ok_or(ApiError::VideoNotConfigured)
    }
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform")
            .field("video_enabled", &self.video_enabled())
            .field("join_policy", &self.join_policy)
            .finish_non_exhaustive()
    }
}

fn require_role(
    user: &CurrentUser,
    role: UserRole,
    message: &'static str,
) -> Result<(), ApiError> {
    if user.role == role {
        Ok(())
    } else {
        Err(ApiError::Forbidden(message))
    }
}
