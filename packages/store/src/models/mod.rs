//! # Domain records mirrored from the backend tables
//!
//! Every entity the platform shows is a plain record read from a remote table.
//! Read types (`Appointment`, `BlogPost`, ...) match the rows returned by the
//! backend, including the `full_name` of related profiles when the select
//! embeds them. Write types (`New*`, `*Update`, `*Input`) carry only the
//! columns a client may set.
//!
//! | Table | Read type | Write type(s) |
//! |-------|-----------|---------------|
//! | `profiles` | [`Profile`] | [`Profile`] |
//! | `therapist_profiles` | [`TherapistProfile`] | [`TherapistProfileInput`] |
//! | `appointments` | [`Appointment`] | [`NewAppointment`] |
//! | `blog_posts` | [`BlogPost`] | [`NewBlogPost`], [`BlogPostUpdate`] |
//! | `private_notes` | [`PrivateNote`] | [`NewPrivateNote`], [`PrivateNoteUpdate`] |
//! | `groups` | [`Group`] | [`NewGroup`] |
//! | `group_members` | [`GroupMember`] | [`GroupMember`] |
//! | `group_posts` | [`GroupPost`] | [`NewGroupPost`] |
//!
//! Client submissions (`Registration`, `NoteDraft`, `BookingRequest`, ...) are
//! the form payloads before the server fills in session-derived ids.

mod appointment;
mod blog;
mod form;
mod group;
mod note;
mod profile;
mod therapist;

pub use appointment::{Appointment, AppointmentStatus, NewAppointment, SessionKind};
pub use blog::{BlogPost, BlogPostUpdate, NewBlogPost, PostStatus};
pub use form::{
    BlogDraft, BookingRequest, Credentials, GroupDraft, GroupPostDraft, NoteDraft, Registration,
};
pub use group::{Group, GroupMember, GroupPost, NewGroup, NewGroupPost, GROUP_CATEGORIES};
pub use note::{normalize_tags, NewPrivateNote, NoteView, PrivateNote, PrivateNoteUpdate};
pub use profile::{DashboardSection, Profile, ProfileRef, UserRole};
pub use therapist::{
    AvailabilitySlot, TherapistProfile, TherapistProfileInput, SPECIALIZATIONS,
};
