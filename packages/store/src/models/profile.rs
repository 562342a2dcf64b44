//! # Users, roles and dashboard sections
//!
//! A MindCare account is an identity-provider user plus a row in the `profiles`
//! table. The profile carries the [`UserRole`] that decides which dashboard
//! sections the account may open:
//!
//! | Section | Patient | Therapist |
//! |---------|---------|-----------|
//! | Blog | yes | yes |
//! | My Profile (therapist editor) | no | yes |
//! | Private Notes | yes | no |
//! | Doctors | yes | yes |
//! | Appointments | yes | yes |
//! | Groups | yes | yes |

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The two kinds of account on the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Patient,
    Therapist,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Patient => "patient",
            UserRole::Therapist => "therapist",
        }
    }

    /// Whether this role may open the given dashboard section.
    pub fn can_access(&self, section: DashboardSection) -> bool {
        match section {
            DashboardSection::Profile => *self == UserRole::Therapist,
            DashboardSection::Notes => *self == UserRole::Patient,
            DashboardSection::Blog
            | DashboardSection::Doctors
            | DashboardSection::Appointments
            | DashboardSection::Groups => true,
        }
    }

    /// Sections visible in the sidebar for this role, in display order.
    pub fn sections(&self) -> Vec<DashboardSection> {
        DashboardSection::ALL
            .into_iter()
            .filter(|s| self.can_access(*s))
            .collect()
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sub-page of the signed-in dashboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardSection {
    Blog,
    Profile,
    Notes,
    Doctors,
    Appointments,
    Groups,
}

impl DashboardSection {
    pub const ALL: [DashboardSection; 6] = [
        DashboardSection::Blog,
        DashboardSection::Profile,
        DashboardSection::Notes,
        DashboardSection::Doctors,
        DashboardSection::Appointments,
        DashboardSection::Groups,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DashboardSection::Blog => "Blog",
            DashboardSection::Profile => "My Profile",
            DashboardSection::Notes => "Private Notes",
            DashboardSection::Doctors => "Doctors",
            DashboardSection::Appointments => "Appointments",
            DashboardSection::Groups => "Groups",
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            DashboardSection::Blog => "/dashboard/blog",
            DashboardSection::Profile => "/dashboard/profile",
            DashboardSection::Notes => "/dashboard/notes",
            DashboardSection::Doctors => "/dashboard/doctors",
            DashboardSection::Appointments => "/dashboard/appointments",
            DashboardSection::Groups => "/dashboard/groups",
        }
    }
}

/// Row of the `profiles` table. `id` equals the identity-provider user id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub user_type: UserRole,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub primary_concern: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// The `full_name` projection embedded by joined selects
/// (e.g. `author:profiles!blog_posts_author_id_fkey(full_name)`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfileRef {
    pub full_name: String,
}
