//! Private notes. Content is encrypted before it reaches the backend and only
//! decrypted into [`NoteView`]s on the way out.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use store::filter::all_tags;
use store::models::{
    normalize_tags, NewPrivateNote, NoteDraft, NoteView, PrivateNote, PrivateNoteUpdate, UserRole,
};
use store::validation::validate_note;

use super::{require_role, Platform};
use crate::backend::{eq, insert_row, select_row, select_rows, update_rows, Query, Table};
use crate::crypto;
use crate::error::ApiError;
use crate::models::CurrentUser;

const PATIENTS_ONLY: &str = "Private notes are only available to patients";

impl Platform {
    /// The patient's notes, most recently updated first.
    pub async fn list_notes(&self, user: &CurrentUser) -> Result<Vec<NoteView>, ApiError> {
        require_role(user, UserRole::Patient, PATIENTS_ONLY)?;
        let query = Query::new()
            .eq("patient_id", user.id)
            .order_desc("updated_at");
        let rows: Vec<PrivateNote> =
            select_rows(self.backend(), Table::PrivateNotes, &query, user.token()).await?;
        Ok(rows.iter().map(|note| self.open_note(note)).collect())
    }

    pub async fn note_tags(&self, user: &CurrentUser) -> Result<Vec<String>, ApiError> {
        Ok(all_tags(&self.list_notes(user).await?))
    }

    pub async fn create_note(
        &self,
        user: &CurrentUser,
        draft: NoteDraft,
    ) -> Result<NoteView, ApiError> {
        require_role(user, UserRole::Patient, PATIENTS_ONLY)?;
        validate_note(&draft)?;

        let row = NewPrivateNote {
            patient_id: user.id,
            title: draft.title.trim().to_string(),
            encrypted_content: crypto::encrypt(&draft.content, &self.note_key)?,
            tags: normalize_tags(&draft.tags),
        };
        let stored: PrivateNote =
            insert_row(self.backend(), Table::PrivateNotes, &row, user.token()).await?;
        info!("Created note {} for {}", stored.id, user.id);
        Ok(NoteView::new(&stored, draft.content, false))
    }

    pub async fn update_note(
        &self,
        user: &CurrentUser,
        id: Uuid,
        draft: NoteDraft,
    ) -> Result<NoteView, ApiError> {
        require_role(user, UserRole::Patient, PATIENTS_ONLY)?;
        validate_note(&draft)?;
        self.own_note(user, id).await?;

        let patch = PrivateNoteUpdate {
            title: draft.title.trim().to_string(),
            encrypted_content: crypto::encrypt(&draft.content, &self.note_key)?,
            tags: normalize_tags(&draft.tags),
            updated_at: Utc::now(),
        };
        let filters = [eq("id", id), eq("patient_id", user.id)];
        let updated: Vec<PrivateNote> = update_rows(
            self.backend(),
            Table::PrivateNotes,
            &filters,
            &patch,
            user.token(),
        )
        .await?;
        let stored = updated.into_iter().next().ok_or(ApiError::NotFound("Note"))?;
        Ok(NoteView::new(&stored, draft.content, false))
    }

    pub async fn delete_note(&self, user: &CurrentUser, id: Uuid) -> Result<(), ApiError> {
        require_role(user, UserRole::Patient, PATIENTS_ONLY)?;
        self.own_note(user, id).await?;
        self.backend
            .delete(
                Table::PrivateNotes,
                &[eq("id", id), eq("patient_id", user.id)],
                user.token(),
            )
            .await?;
        info!("Deleted note {} for {}", id, user.id);
        Ok(())
    }

    /// A note of someone else is reported as missing, not forbidden.
    async fn own_note(&self, user: &CurrentUser, id: Uuid) -> Result<PrivateNote, ApiError> {
        let query = Query::new().eq("id", id).eq("patient_id", user.id);
        select_row(self.backend(), Table::PrivateNotes, &query, user.token())
            .await?
            .ok_or(ApiError::NotFound("Note"))
    }

    fn open_note(&self, note: &PrivateNote) -> NoteView {
        match crypto::decrypt(&note.encrypted_content, &self.note_key) {
            Ok(content) => NoteView::new(note, content, false),
            Err(e) => {
                warn!("Note {} could not be decrypted: {}", note.id, e);
                NoteView::new(note, String::new(), true)
            }
        }
    }
}
