//! # Appointments between a patient and a therapist
//!
//! The `appointments` table stores the calendar day and the `HH:MM` start time
//! separately, the way the booking form collects them. [`Appointment::scheduled_at`]
//! combines both into the local wall-clock instant that the join window in
//! [`crate::schedule`] is computed from.
//!
//! Rows written by older clients carry a full ISO timestamp in
//! `appointment_date`; only its date part is meaningful, so the deserializer
//! keeps the first ten characters.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ProfileRef, UserRole};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

/// How the session is held.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    #[default]
    Video,
    Phone,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub therapist_id: Uuid,
    #[serde(with = "date_prefix")]
    pub appointment_date: NaiveDate,
    #[serde(with = "clock_time")]
    pub appointment_time: NaiveTime,
    #[serde(rename = "type", default)]
    pub kind: SessionKind,
    #[serde(default)]
    pub status: AppointmentStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub hms_room_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient: Option<ProfileRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub therapist: Option<ProfileRef>,
}

impl Appointment {
    /// Local date and time the session starts.
    pub fn scheduled_at(&self) -> NaiveDateTime {
        self.appointment_date.and_time(self.appointment_time)
    }

    /// Whether `user_id` is one of the two participants.
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.patient_id == user_id || self.therapist_id == user_id
    }

    /// Name of the other participant as seen by `viewer`.
    pub fn counterpart_name(&self, viewer: UserRole) -> Option<&str> {
        let other = match viewer {
            UserRole::Patient => self.therapist.as_ref(),
            UserRole::Therapist => self.patient.as_ref(),
        };
        other.map(|p| p.full_name.as_str())
    }
}

/// Booking payload sent when a patient schedules a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewAppointment {
    pub patient_id: Uuid,
    pub therapist_id: Uuid,
    #[serde(with = "date_prefix")]
    pub appointment_date: NaiveDate,
    #[serde(with = "clock_time")]
    pub appointment_time: NaiveTime,
    #[serde(rename = "type", default)]
    pub kind: SessionKind,
    #[serde(default)]
    pub status: AppointmentStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Accepts `YYYY-MM-DD` or any string starting with it.
pub(crate) mod date_prefix {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&date.format("%Y-%m-%d").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        let day = raw.get(..10).unwrap_or(&raw);
        NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(serde::de::Error::custom)
    }
}

/// `HH:MM` on the wire; `HH:MM:SS` (Postgres `time`) is accepted on input.
pub(crate) mod clock_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(&raw, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M"))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: &str, time: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "8d7f2b8e-2a4b-4f1e-9c61-3a1f0b6c9d00",
            "patient_id": "1f0c6a3e-5b7e-4a59-9a8e-0b7c1f3d2e11",
            "therapist_id": "b0e8a0c2-7f43-4d2e-8f0a-6c4f3e2d1a99",
            "appointment_date": date,
            "appointment_time": time,
            "type": "video",
            "status": "scheduled",
            "therapist": { "full_name": "Dr. Sarah Johnson" }
        })
    }

    #[test]
    fn test_parses_plain_date_and_short_time() {
        let appt: Appointment = serde_json::from_value(row("2026-03-05", "14:00")).unwrap();
        assert_eq!(
            appt.scheduled_at(),
            NaiveDate::from_ymd_opt(2026, 3, 5)
                .unwrap()
                .and_hms_opt(14, 0, 0)
                .unwrap()
        );
        assert_eq!(appt.status, AppointmentStatus::Scheduled);
        assert_eq!(appt.counterpart_name(UserRole::Patient), Some("Dr. Sarah Johnson"));
        assert_eq!(appt.counterpart_name(UserRole::Therapist), None);
    }

    #[test]
    fn test_parses_iso_timestamp_date_and_postgres_time() {
        let appt: Appointment =
            serde_json::from_value(row("2026-03-05T00:00:00.000Z", "09:30:00")).unwrap();
        assert_eq!(appt.appointment_date, NaiveDate::from_ymd_opt(2026, 3, 5).unwrap());
        assert_eq!(appt.appointment_time, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
    }

    #[test]
    fn test_serializes_wire_format() {
        let appt: Appointment = serde_json::from_value(row("2026-03-05", "14:00")).unwrap();
        let value = serde_json::to_value(&appt).unwrap();
        assert_eq!(value["appointment_date"], "2026-03-05");
        assert_eq!(value["appointment_time"], "14:00");
        assert_eq!(value["type"], "video");
    }
}
