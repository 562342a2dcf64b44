//! # Application configuration: `mindcare.toml`
//!
//! Non-secret tuning for the server. Secrets (backend keys, the note
//! encryption passphrase, video credentials) never go here; they come from the
//! environment.
//!
//! ## Structure
//!
//! ```toml
//! [server]
//! bind_addr = "127.0.0.1:3000"
//! session_days = 7
//!
//! [schedule]
//! join_early_minutes = 10
//! join_late_minutes = 60
//! time_slots = ["09:00", "10:00", "11:00", "14:00", "15:00", "16:00"]
//!
//! [video]
//! region = "us"
//! ```
//!
//! ## Types
//!
//! | Struct | Purpose |
//! |--------|---------|
//! | [`MindCareConfig`] | Top-level config with TOML (de)serialisation and the canonical filename. |
//! | [`ServerConfig`] | Listen address and session lifetime. |
//! | [`ScheduleConfig`] | Join-window offsets and the booking form's start times. |
//! | [`VideoConfig`] | Region new video rooms are created in. |
//!
//! Every field has a default, so a missing or empty file is equivalent to the
//! default configuration. [`MindCareConfig::validate`] rejects values that
//! parse but make no sense (an empty session lifetime, a join offset longer
//! than a day, a malformed time slot).

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::schedule::{
    parse_time_slots, JoinPolicy, DEFAULT_TIME_SLOTS, JOIN_EARLY_MINUTES, JOIN_LATE_MINUTES,
    MAX_JOIN_MINUTES,
};
use crate::validation::ValidationErrors;

/// Longest idle session lifetime accepted.
pub const MAX_SESSION_DAYS: u32 = 365;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MindCareConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub video: VideoConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Idle time after which a session cookie expires.
    #[serde(default = "default_session_days")]
    pub session_days: u32,
}

fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_session_days() -> u32 {
    7
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            session_days: default_session_days(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_early")]
    pub join_early_minutes: u32,
    #[serde(default = "default_late")]
    pub join_late_minutes: u32,
    #[serde(default = "default_time_slots")]
    pub time_slots: Vec<String>,
}

fn default_early() -> u32 {
    JOIN_EARLY_MINUTES
}

fn default_late() -> u32 {
    JOIN_LATE_MINUTES
}

fn default_time_slots() -> Vec<String> {
    DEFAULT_TIME_SLOTS.iter().map(|s| s.to_string()).collect()
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            join_early_minutes: default_early(),
            join_late_minutes: default_late(),
            time_slots: default_time_slots(),
        }
    }
}

impl ScheduleConfig {
    pub fn join_policy(&self) -> JoinPolicy {
        JoinPolicy {
            early_minutes: self.join_early_minutes,
            late_minutes: self.join_late_minutes,
        }
    }

    /// Configured slots that parse as `HH:MM`.
    pub fn slots(&self) -> Vec<NaiveTime> {
        parse_time_slots(&self.time_slots)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VideoConfig {
    #[serde(default = "default_region")]
    pub region: String,
}

fn default_region() -> String {
    "us".to_string()
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
        }
    }
}

impl MindCareConfig {
    /// Builder method to override the join window.
    pub fn with_join_window(mut self, early_minutes: u32, late_minutes: u32) -> Self {
        self.schedule.join_early_minutes = early_minutes;
        self.schedule.join_late_minutes = late_minutes;
        self
    }

    /// The well-known filename for the config file.
    pub fn filename() -> &'static str {
        "mindcare.toml"
    }

    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Range checks the TOML types cannot express.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if !(1..=MAX_SESSION_DAYS).contains(&self.server.session_days) {
            errors.add(
                "server.session_days",
                format!("session_days must be between 1 and {}", MAX_SESSION_DAYS),
            );
        }
        let schedule = &self.schedule;
        for (field, minutes) in [
            ("schedule.join_early_minutes", schedule.join_early_minutes),
            ("schedule.join_late_minutes", schedule.join_late_minutes),
        ] {
            if minutes > MAX_JOIN_MINUTES {
                errors.add(field, format!("{} must be at most {}", field, MAX_JOIN_MINUTES));
            }
        }
        if schedule.time_slots.is_empty() {
            errors.add("schedule.time_slots", "At least one time slot is required");
        } else if schedule.slots().len() != schedule.time_slots.len() {
            errors.add("schedule.time_slots", "Time slots must be written as HH:MM");
        }
        if self.video.region.trim().is_empty() {
            errors.add("video.region", "Video region is required");
        }
        errors.into_result()
    }
}
