pub mod cache;
pub mod config;
pub mod filter;
pub mod markdown;
pub mod models;
pub mod schedule;
pub mod validation;

pub use cache::{CacheStatus, ClientCache, Entity, EntityCache, SliceStatus};
pub use config::MindCareConfig;
pub use filter::{BlogFilter, Filter, GroupFilter, Membership, NoteFilter, TherapistFilter};
pub use schedule::{can_join, join_window, AppointmentFilter, JoinPolicy, JoinWindow};
pub use validation::{FieldError, ValidationErrors};
