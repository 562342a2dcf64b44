//! # Private notes
//!
//! A patient's journal entries. The `private_notes` table only ever holds the
//! cipher text produced by the note cipher in the `api` crate; [`PrivateNote`]
//! therefore has no plaintext field at all. Decrypted content lives in the
//! transient [`NoteView`], which is built at read time and never written back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Row of `private_notes` as persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrivateNote {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub title: String,
    pub encrypted_content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Insert payload; `encrypted_content` must already be cipher text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewPrivateNote {
    pub patient_id: Uuid,
    pub title: String,
    pub encrypted_content: String,
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrivateNoteUpdate {
    pub title: String,
    pub encrypted_content: String,
    pub tags: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

/// A note with its content decrypted for display.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoteView {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Set when the stored cipher text could not be decrypted; `content` is
    /// then empty.
    #[serde(default)]
    pub decrypt_failed: bool,
}

impl NoteView {
    pub fn new(note: &PrivateNote, content: String, decrypt_failed: bool) -> Self {
        Self {
            id: note.id,
            patient_id: note.patient_id,
            title: note.title.clone(),
            content,
            tags: note.tags.clone(),
            created_at: note.created_at,
            updated_at: note.updated_at,
            decrypt_failed,
        }
    }
}

/// Normalise a tag list from the editor: trimmed, non-empty, no duplicates,
/// first occurrence wins.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}
