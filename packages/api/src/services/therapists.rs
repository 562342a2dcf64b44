//! Therapist directory and the therapist's own profile editor.

use tracing::info;
use uuid::Uuid;

use store::models::{TherapistProfile, TherapistProfileInput, UserRole};
use store::validation::validate_therapist_profile;

use super::{require_role, Platform};
use crate::backend::{eq, insert_row, select_row, select_rows, update_rows, Embed, Query, Table};
use crate::error::ApiError;
use crate::models::CurrentUser;

fn name_embed() -> Embed {
    Embed::profile_name("user_profile", "user_id")
}

impl Platform {
    /// Every therapist, best rated first.
    pub async fn list_therapists(
        &self,
        user: &CurrentUser,
    ) -> Result<Vec<TherapistProfile>, ApiError> {
        let query = Query::new()
            .order_desc("average_rating")
            .embed(name_embed());
        select_rows(self.backend(), Table::TherapistProfiles, &query, user.token()).await
    }

    pub async fn get_therapist(
        &self,
        user: &CurrentUser,
        user_id: Uuid,
    ) -> Result<TherapistProfile, ApiError> {
        let query = Query::new().eq("user_id", user_id).embed(name_embed());
        select_row(self.backend(), Table::TherapistProfiles, &query, user.token())
            .await?
            .ok_or(ApiError::NotFound("Therapist"))
    }

    /// The signed-in therapist's profile, or a blank one to start editing from.
    pub async fn my_therapist_profile(
        &self,
        user: &CurrentUser,
    ) -> Result<TherapistProfileInput, ApiError> {
        require_role(user, UserRole::Therapist, "Only therapists have a profile to edit")?;
        let query = Query::new().eq("user_id", user.id);
        let existing: Option<TherapistProfile> =
            select_row(self.backend(), Table::TherapistProfiles, &query, user.token()).await?;
        Ok(existing
            .map(|p| TherapistProfileInput {
                user_id: p.user_id,
                specializations: p.specializations,
                license_number: p.license_number,
                years_experience: p.years_experience,
                bio: p.bio,
                hourly_rate: p.hourly_rate,
                location: p.location,
                avatar_url: p.avatar_url,
                availability_slots: p.availability_slots,
            })
            .unwrap_or_else(|| TherapistProfileInput::blank(user.id)))
    }

    /// Insert or update the signed-in therapist's directory entry.
    pub async fn save_therapist_profile(
        &self,
        user: &CurrentUser,
        mut input: TherapistProfileInput,
    ) -> Result<TherapistProfile, ApiError> {
        require_role(user, UserRole::Therapist, "Only therapists can edit a therapist profile")?;
        input.user_id = user.id;
        validate_therapist_profile(&input)?;

        let filters = [eq("user_id", user.id)];
        let updated: Vec<TherapistProfile> = update_rows(
            self.backend(),
            Table::TherapistProfiles,
            &filters,
            &input,
            user.token(),
        )
        .await?;
        if updated.is_empty() {
            let _: TherapistProfile =
                insert_row(self.backend(), Table::TherapistProfiles, &input, user.token()).await?;
            info!("Created therapist profile for {}", user.id);
        } else {
            info!("Updated therapist profile for {}", user.id);
        }
        self.get_therapist(user, user.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::backend::Backend;
    use store::models::AvailabilitySlot;

    fn profile_input() -> TherapistProfileInput {
        TherapistProfileInput {
            user_id: Uuid::nil(),
            specializations: vec!["Depression".to_string(), "EMDR".to_string()],
            license_number: Some("LIC-1001".to_string()),
            years_experience: 12,
            bio: "I help adults work through depression and trauma with EMDR and CBT."
                .to_string(),
            hourly_rate: 180.0,
            location: Some("Lisbon".to_string()),
            avatar_url: None,
            availability_slots: vec![AvailabilitySlot {
                day: "Monday".to_string(),
                start_time: "09:00".to_string(),
                end_time: "12:00".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn test_directory_lists_registered_therapists() {
        let (platform, _) = platform();
        let viewer = patient(&platform).await;
        let doctor = therapist(&platform).await;

        let list = platform.list_therapists(&viewer).await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].full_name(), "Dr. Tess Ther");

        let one = platform.get_therapist(&viewer, doctor.id).await.unwrap();
        assert_eq!(one.specializations, vec!["Anxiety Disorders"]);
        assert!(platform.get_therapist(&viewer, viewer.id).await.is_err());
    }

    #[tokio::test]
    async fn test_save_updates_existing_row() {
        let (platform, backend) = platform();
        let doctor = therapist(&platform).await;

        let saved = platform
            .save_therapist_profile(&doctor, profile_input())
            .await
            .unwrap();
        assert_eq!(saved.user_id, doctor.id);
        assert_eq!(saved.years_experience, 12);
        assert_eq!(saved.location.as_deref(), Some("Lisbon"));
        assert_eq!(backend.row_count(Table::TherapistProfiles), 1);

        let editor = platform.my_therapist_profile(&doctor).await.unwrap();
        assert_eq!(editor.availability_slots.len(), 1);
    }

    #[tokio::test]
    async fn test_save_inserts_when_missing() {
        let (platform, backend) = platform();
        let doctor = therapist(&platform).await;
        backend
            .delete(Table::TherapistProfiles, &[eq("user_id", doctor.id)], None)
            .await
            .unwrap();

        assert_eq!(
            platform.my_therapist_profile(&doctor).await.unwrap(),
            TherapistProfileInput::blank(doctor.id)
        );
        platform
            .save_therapist_profile(&doctor, profile_input())
            .await
            .unwrap();
        assert_eq!(backend.row_count(Table::TherapistProfiles), 1);
    }

    #[tokio::test]
    async fn test_patients_cannot_edit_therapist_profiles() {
        let (platform, backend) = platform();
        let user = patient(&platform).await;

        let err = platform
            .save_therapist_profile(&user, profile_input())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert_eq!(backend.row_count(Table::TherapistProfiles), 0);
    }

    #[tokio::test]
    async fn test_invalid_rate_is_rejected() {
        let (platform, _) = platform();
        let doctor = therapist(&platform).await;
        let mut input = profile_input();
        input.hourly_rate = 20.0;

        let err = platform
            .save_therapist_profile(&doctor, input)
            .await
            .unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                assert_eq!(errors.get("hourly_rate"), Some("Rate must be at least $50"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
