//! Payloads submitted by a signed-in client. Unlike the `New*` write types
//! they carry no ids the server derives from the session (author, patient,
//! creator), and note content is still plaintext.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    AppointmentStatus, NewAppointment, PostStatus, Profile, SessionKind, TherapistProfileInput,
    UserRole,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Sign-up form for either role. Patient-only and therapist-only fields are
/// optional here and required by validation for the matching role.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub full_name: String,
    pub phone: String,
    pub user_type: UserRole,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub primary_concern: Option<String>,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub license_number: Option<String>,
    #[serde(default)]
    pub years_experience: Option<i64>,
    #[serde(default)]
    pub bio: Option<String>,
}

impl Registration {
    /// The `profiles` row for the freshly created identity `id`.
    pub fn profile(&self, id: Uuid) -> Profile {
        Profile {
            id,
            full_name: self.full_name.trim().to_string(),
            phone: Some(self.phone.trim().to_string()),
            user_type: self.user_type,
            date_of_birth: self.date_of_birth,
            primary_concern: self.primary_concern.clone(),
            avatar_url: None,
            created_at: None,
        }
    }

    /// Initial `therapist_profiles` row; `None` for patients.
    pub fn therapist_profile(&self, user_id: Uuid) -> Option<TherapistProfileInput> {
        if self.user_type != UserRole::Therapist {
            return None;
        }
        let mut input = TherapistProfileInput::blank(user_id);
        input.specializations = self.specialization.iter().cloned().collect();
        input.license_number = self.license_number.clone();
        input.years_experience = self.years_experience.unwrap_or(0).clamp(0, 60) as u32;
        input.bio = self.bio.clone().unwrap_or_default();
        Some(input)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlogDraft {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub status: PostStatus,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupDraft {
    pub name: String,
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub is_private: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupPostDraft {
    pub content: String,
}

/// A patient's booking request from the scheduling form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub therapist_id: Uuid,
    #[serde(with = "super::appointment::date_prefix")]
    pub appointment_date: NaiveDate,
    #[serde(with = "super::appointment::clock_time")]
    pub appointment_time: NaiveTime,
    #[serde(rename = "type", default)]
    pub kind: SessionKind,
    #[serde(default)]
    pub notes: Option<String>,
}

impl BookingRequest {
    pub fn into_new_appointment(self, patient_id: Uuid) -> NewAppointment {
        NewAppointment {
            patient_id,
            therapist_id: self.therapist_id,
            appointment_date: self.appointment_date,
            appointment_time: self.appointment_time,
            kind: self.kind,
            status: AppointmentStatus::Scheduled,
            notes: self.notes.filter(|n| !n.trim().is_empty()),
        }
    }
}
