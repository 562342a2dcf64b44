//! Therapist directory entries (`therapist_profiles` table).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ProfileRef;

/// Specializations offered in the profile editor.
pub const SPECIALIZATIONS: &[&str] = &[
    "Anxiety Disorders",
    "Depression",
    "PTSD/Trauma",
    "Bipolar Disorder",
    "Eating Disorders",
    "Addiction",
    "Family Therapy",
    "Couples Therapy",
    "Child Psychology",
    "Cognitive Behavioral Therapy",
    "Dialectical Behavior Therapy",
    "EMDR",
    "Mindfulness-Based Therapy",
    "Other",
];

fn default_hourly_rate() -> f64 {
    150.0
}

/// A weekly availability window, e.g. Monday 09:00-12:00.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySlot {
    pub day: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TherapistProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub specializations: Vec<String>,
    #[serde(default)]
    pub license_number: Option<String>,
    #[serde(default)]
    pub years_experience: u32,
    #[serde(default)]
    pub bio: String,
    #[serde(default = "default_hourly_rate")]
    pub hourly_rate: f64,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub availability_slots: Vec<AvailabilitySlot>,
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub total_reviews: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// `user_profile:profiles!user_id(full_name)`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_profile: Option<ProfileRef>,
}

impl TherapistProfile {
    /// Display name from the embedded profile, empty when the select did not join it.
    pub fn full_name(&self) -> &str {
        self.user_profile
            .as_ref()
            .map(|p| p.full_name.as_str())
            .unwrap_or("")
    }
}

/// Insert/update payload for a therapist profile. Rating fields are owned by
/// the backend and never written from here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TherapistProfileInput {
    /// Always overwritten with the signed-in therapist's id on save.
    #[serde(default)]
    pub user_id: Uuid,
    #[serde(default)]
    pub specializations: Vec<String>,
    #[serde(default)]
    pub license_number: Option<String>,
    #[serde(default)]
    pub years_experience: u32,
    #[serde(default)]
    pub bio: String,
    #[serde(default = "default_hourly_rate")]
    pub hourly_rate: f64,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub availability_slots: Vec<AvailabilitySlot>,
}

impl TherapistProfileInput {
    /// Empty profile used when a therapist opens the editor for the first time.
    pub fn blank(user_id: Uuid) -> Self {
        Self {
            user_id,
            specializations: Vec::new(),
            license_number: None,
            years_experience: 0,
            bio: String::new(),
            hourly_rate: default_hourly_rate(),
            location: None,
            avatar_url: None,
            availability_slots: Vec::new(),
        }
    }
}
