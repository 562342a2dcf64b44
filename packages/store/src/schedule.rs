//! # Appointment timing: join window, list filters, booking calendar
//!
//! A scheduled appointment can be entered from ten minutes before its start
//! until sixty minutes after it. Both ends of the window are inclusive:
//!
//! ```text
//!   start-10m            start                      start+60m
//!      |<---------------------- joinable ----------------->|
//! ```
//!
//! Everything here is a pure function of the appointment and a caller-supplied
//! `now`, expressed in the local wall-clock frame the appointment was booked in.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::models::{Appointment, AppointmentStatus};

pub const JOIN_EARLY_MINUTES: u32 = 10;
pub const JOIN_LATE_MINUTES: u32 = 60;

/// Upper bound accepted for either join offset.
pub const MAX_JOIN_MINUTES: u32 = 24 * 60;

/// Start times offered by the booking form.
pub const DEFAULT_TIME_SLOTS: [&str; 6] = ["09:00", "10:00", "11:00", "14:00", "15:00", "16:00"];

/// Closed interval during which a session may be joined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl JoinWindow {
    pub fn contains(&self, now: NaiveDateTime) -> bool {
        self.start <= now && now <= self.end
    }
}

/// How far before and after the start time joining is allowed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinPolicy {
    #[serde(default = "default_early")]
    pub early_minutes: u32,
    #[serde(default = "default_late")]
    pub late_minutes: u32,
}

fn default_early() -> u32 {
    JOIN_EARLY_MINUTES
}

fn default_late() -> u32 {
    JOIN_LATE_MINUTES
}

impl Default for JoinPolicy {
    fn default() -> Self {
        Self {
            early_minutes: JOIN_EARLY_MINUTES,
            late_minutes: JOIN_LATE_MINUTES,
        }
    }
}

impl JoinPolicy {
    /// Offsets saturate at the ends of the calendar instead of overflowing.
    pub fn window(&self, scheduled_at: NaiveDateTime) -> JoinWindow {
        JoinWindow {
            start: scheduled_at
                .checked_sub_signed(Duration::minutes(self.early_minutes.into()))
                .unwrap_or(NaiveDateTime::MIN),
            end: scheduled_at
                .checked_add_signed(Duration::minutes(self.late_minutes.into()))
                .unwrap_or(NaiveDateTime::MAX),
        }
    }

    pub fn can_join(
        &self,
        status: AppointmentStatus,
        scheduled_at: NaiveDateTime,
        now: NaiveDateTime,
    ) -> bool {
        status == AppointmentStatus::Scheduled && self.window(scheduled_at).contains(now)
    }

    pub fn can_join_appointment(&self, appointment: &Appointment, now: NaiveDateTime) -> bool {
        self.can_join(appointment.status, appointment.scheduled_at(), now)
    }
}

/// `[scheduled_at - 10min, scheduled_at + 60min]`.
pub fn join_window(scheduled_at: NaiveDateTime) -> JoinWindow {
    JoinPolicy::default().window(scheduled_at)
}

/// True iff the appointment is scheduled and `now` falls inside its join window.
pub fn can_join(status: AppointmentStatus, scheduled_at: NaiveDateTime, now: NaiveDateTime) -> bool {
    JoinPolicy::default().can_join(status, scheduled_at, now)
}

/// Tabs of the appointments page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentFilter {
    #[default]
    All,
    Today,
    Upcoming,
    Completed,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment, now: NaiveDateTime) -> bool {
        match self {
            AppointmentFilter::All => true,
            AppointmentFilter::Today => appointment.appointment_date == now.date(),
            AppointmentFilter::Upcoming => {
                appointment.status == AppointmentStatus::Scheduled
                    && appointment.scheduled_at() >= now
            }
            AppointmentFilter::Completed => appointment.status == AppointmentStatus::Completed,
        }
    }

    /// Matching appointments in their original order.
    pub fn apply<'a>(&self, appointments: &'a [Appointment], now: NaiveDateTime) -> Vec<&'a Appointment> {
        appointments
            .iter()
            .filter(|a| self.matches(a, now))
            .collect()
    }
}

/// "Today", "Tomorrow", or e.g. "Mar 05, 2026".
pub fn date_label(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        "Today".to_string()
    } else if Some(date) == today.succ_opt() {
        "Tomorrow".to_string()
    } else {
        date.format("%b %d, %Y").to_string()
    }
}

/// The seven days of the current week (starting Sunday) offered for booking.
pub fn bookable_dates(today: NaiveDate) -> Vec<NaiveDate> {
    let week_start = today - Duration::days(today.weekday().num_days_from_sunday() as i64);
    (0..7).map(|i| week_start + Duration::days(i)).collect()
}

/// Parse `HH:MM` slot labels, skipping malformed entries.
pub fn parse_time_slots<S: AsRef<str>>(slots: &[S]) -> Vec<NaiveTime> {
    slots
        .iter()
        .filter_map(|s| NaiveTime::parse_from_str(s.as_ref(), "%H:%M").ok())
        .collect()
}
