//! Appointments: listing by role, booking, status changes and joining the
//! video session.
//!
//! Joining is the one flow with real rules. The appointment must belong to the
//! caller, be `scheduled`, and `now` must fall inside the join window from the
//! configured [`store::JoinPolicy`]. The room is created on first join (or at
//! booking time when video is configured) and its id is persisted on the
//! appointment so both participants land in the same room.
//!
//! The id is only written while the column is still empty. When two joins
//! race, the one whose write lands first wins; the other ends the room it
//! created and uses the stored one. A stored room the provider reports as
//! disabled is replaced the same way.

use chrono::NaiveDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use store::models::{Appointment, AppointmentStatus, BookingRequest, Profile, SessionKind, UserRole};

use super::{require_role, Platform};
use crate::backend::{eq, insert_row, is_null, select_row, select_rows, update_rows, Embed, Query, Table};
use crate::error::ApiError;
use crate::models::CurrentUser;
use crate::video::{room_name, SessionToken, VideoRole};

fn with_names(query: Query) -> Query {
    query
        .embed(Embed::profile_name("patient", "patient_id"))
        .embed(Embed::profile_name("therapist", "therapist_id"))
}

fn room_description(appointment: &Appointment) -> String {
    let name = |p: &Option<store::models::ProfileRef>| {
        p.as_ref()
            .map(|p| p.full_name.clone())
            .unwrap_or_else(|| "unknown".to_string())
    };
    format!(
        "Therapy session between {} and {}",
        name(&appointment.patient),
        name(&appointment.therapist)
    )
}

impl Platform {
    /// The caller's appointments, soonest first. Patients see the sessions
    /// they booked, therapists the sessions booked with them.
    pub async fn list_appointments(
        &self,
        user: &CurrentUser,
    ) -> Result<Vec<Appointment>, ApiError> {
        let column = match user.role {
            UserRole::Patient => "patient_id",
            UserRole::Therapist => "therapist_id",
        };
        let query = with_names(
            Query::new()
                .eq(column, user.id)
                .order_asc("appointment_date")
                .order_asc("appointment_time"),
        );
        select_rows(self.backend(), Table::Appointments, &query, user.token()).await
    }

    /// One appointment the caller takes part in.
    pub async fn get_appointment(
        &self,
        user: &CurrentUser,
        id: Uuid,
    ) -> Result<Appointment, ApiError> {
        let query = with_names(Query::new().eq("id", id));
        let appointment: Appointment =
            select_row(self.backend(), Table::Appointments, &query, user.token())
                .await?
                .ok_or(ApiError::NotFound("Appointment"))?;
        if !appointment.involves(user.id) {
            return Err(ApiError::NotFound("Appointment"));
        }
        Ok(appointment)
    }

    pub async fn book_appointment(
        &self,
        user: &CurrentUser,
        request: BookingRequest,
    ) -> Result<Appointment, ApiError> {
        require_role(user, UserRole::Patient, "Only patients can book appointments")?;

        let query = Query::new().eq("id", request.therapist_id);
        let therapist: Option<Profile> =
            select_row(self.backend(), Table::Profiles, &query, user.token()).await?;
        if !matches!(therapist, Some(ref p) if p.user_type == UserRole::Therapist) {
            return Err(ApiError::NotFound("Therapist"));
        }

        let row = request.into_new_appointment(user.id);
        let stored: Appointment =
            insert_row(self.backend(), Table::Appointments, &row, user.token()).await?;
        info!(
            "{} booked appointment {} on {}",
            user.id,
            stored.id,
            stored.scheduled_at()
        );

        let appointment = self.get_appointment(user, stored.id).await?;
        if appointment.kind == SessionKind::Video && self.video_enabled() {
            match self.ensure_room(user, &appointment).await {
                Ok(room_id) => {
                    return Ok(Appointment {
                        hms_room_id: Some(room_id),
                        ..appointment
                    })
                }
                Err(e) => warn!("Room for appointment {} not created: {}", appointment.id, e),
            }
        }
        Ok(appointment)
    }

    /// Mark an appointment completed or cancelled. Ending a session also
    /// closes its video room.
    pub async fn update_appointment_status(
        &self,
        user: &CurrentUser,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, ApiError> {
        let appointment = self.get_appointment(user, id).await?;
        if appointment.status != AppointmentStatus::Scheduled {
            return Err(ApiError::Conflict("Appointment is no longer scheduled"));
        }
        if status == AppointmentStatus::Scheduled {
            return Ok(appointment);
        }

        let _: Vec<Appointment> = update_rows(
            self.backend(),
            Table::Appointments,
            &[eq("id", id)],
            &serde_json::json!({ "status": status }),
            user.token(),
        )
        .await?;
        info!("Appointment {} marked {}", id, status.as_str());

        if let (Some(room_id), Some(video)) = (&appointment.hms_room_id, &self.video) {
            if let Err(e) = video.end_room(room_id).await {
                warn!("Failed to end room {} for appointment {}: {}", room_id, id, e);
            }
        }

        Ok(Appointment {
            status,
            ..appointment
        })
    }

    /// Issue a video token for the caller's side of the session.
    pub async fn join_session(
        &self,
        user: &CurrentUser,
        id: Uuid,
        now: NaiveDateTime,
    ) -> Result<SessionToken, ApiError> {
        let video = self.video()?;
        let appointment = self.get_appointment(user, id).await?;

        if appointment.status != AppointmentStatus::Scheduled {
            return Err(ApiError::Forbidden("Appointment is not scheduled"));
        }
        let window = self.join_policy.window(appointment.scheduled_at());
        if !window.contains(now) {
            return Err(ApiError::OutsideJoinWindow {
                opens: window.start,
                closes: window.end,
            });
        }

        let room_id = self.ensure_room(user, &appointment).await?;
        let role = VideoRole::from(user.role);
        let token = video
            .auth_token(&room_id, user.id, role, user.display_name())
            .await?;
        info!("{} joined room {} as {}", user.id, room_id, role.as_str());
        Ok(SessionToken {
            token,
            room_id,
            role,
        })
    }

    /// The appointment's room id, creating and persisting a room if needed.
    async fn ensure_room(
        &self,
        user: &CurrentUser,
        appointment: &Appointment,
    ) -> Result<String, ApiError> {
        let video = self.video()?;
        let mut unclaimed = is_null("hms_room_id");
        if let Some(room_id) = &appointment.hms_room_id {
            match video.get_room(room_id).await {
                Ok(room) if room.enabled == Some(false) => {
                    info!(
                        "Room {} of appointment {} is disabled, replacing it",
                        room_id, appointment.id
                    );
                    unclaimed = eq("hms_room_id", room_id);
                }
                Ok(_) => return Ok(room_id.clone()),
                Err(e) => {
                    warn!("Could not check room {}: {}", room_id, e);
                    return Ok(room_id.clone());
                }
            }
        }

        let room = video
            .create_room(&room_name(appointment.id), &room_description(appointment))
            .await?;
        let claimed: Vec<Appointment> = update_rows(
            self.backend(),
            Table::Appointments,
            &[eq("id", appointment.id), unclaimed],
            &serde_json::json!({ "hms_room_id": room.id }),
            user.token(),
        )
        .await?;
        if !claimed.is_empty() {
            return Ok(room.id);
        }

        let current = self.get_appointment(user, appointment.id).await?;
        info!(
            "Appointment {} already has a room, ending duplicate {}",
            appointment.id, room.id
        );
        if let Err(e) = video.end_room(&room.id).await {
            warn!("Failed to end duplicate room {}: {}", room.id, e);
        }
        current
            .hms_room_id
            .ok_or(ApiError::Conflict("Video room could not be assigned"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{NaiveDate, NaiveTime};

    use super::super::testing::*;
    use super::*;

    fn booking(therapist_id: Uuid, kind: SessionKind) -> BookingRequest {
        BookingRequest {
            therapist_id,
            appointment_date: NaiveDate::from_ymd_opt(2026, 3, 5).unwrap(),
            appointment_time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            kind,
            notes: Some("  ".to_string()),
        }
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 5)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn with_fake_video(platform: Platform) -> (Platform, Arc<FakeVideo>) {
        let video = Arc::new(FakeVideo::default());
        (platform.with_video(video.clone()), video)
    }

    #[tokio::test]
    async fn test_booking_lists_for_both_participants() {
        let (platform, _) = platform();
        let pat = patient(&platform).await;
        let doc = therapist(&platform).await;

        let booked = platform
            .book_appointment(&pat, booking(doc.id, SessionKind::Phone))
            .await
            .unwrap();
        assert_eq!(booked.status, AppointmentStatus::Scheduled);
        assert_eq!(booked.notes, None);
        assert_eq!(booked.counterpart_name(UserRole::Patient), Some("Dr. Tess Ther"));

        let mine = platform.list_appointments(&pat).await.unwrap();
        let theirs = platform.list_appointments(&doc).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(theirs.len(), 1);
        assert_eq!(theirs[0].counterpart_name(UserRole::Therapist), Some("Pat Patient"));
    }

    #[tokio::test]
    async fn test_list_orders_by_date_then_time() {
        let (platform, _) = platform();
        let pat = patient(&platform).await;
        let doc = therapist(&platform).await;

        let mut later = booking(doc.id, SessionKind::Video);
        later.appointment_date = NaiveDate::from_ymd_opt(2026, 3, 6).unwrap();
        later.appointment_time = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let mut morning = booking(doc.id, SessionKind::Video);
        morning.appointment_time = NaiveTime::from_hms_opt(9, 0, 0).unwrap();

        for request in [later, booking(doc.id, SessionKind::Video), morning] {
            platform.book_appointment(&pat, request).await.unwrap();
        }
        let times: Vec<_> = platform
            .list_appointments(&pat)
            .await
            .unwrap()
            .iter()
            .map(|a| a.scheduled_at())
            .collect();
        let mut sorted = times.clone();
        sorted.sort();
        assert_eq!(times, sorted);
    }

    #[tokio::test]
    async fn test_booking_rules() {
        let (platform, _) = platform();
        let pat = patient(&platform).await;
        let doc = therapist(&platform).await;

        let err = platform
            .book_appointment(&doc, booking(pat.id, SessionKind::Video))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let err = platform
            .book_appointment(&pat, booking(pat.id, SessionKind::Video))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound("Therapist")));
    }

    #[tokio::test]
    async fn test_booking_video_creates_room_when_configured() {
        let (platform, backend) = platform();
        let pat = patient(&platform).await;
        let doc = therapist(&platform).await;
        let (platform, video) = with_fake_video(platform);

        let booked = platform
            .book_appointment(&pat, booking(doc.id, SessionKind::Video))
            .await
            .unwrap();
        assert_eq!(booked.hms_room_id.as_deref(), Some("room-1"));
        assert_eq!(
            video.created.lock().unwrap().as_slice(),
            [room_name(booked.id)]
        );
        assert_eq!(backend.raw_rows(Table::Appointments)[0]["hms_room_id"], "room-1");
    }

    #[tokio::test]
    async fn test_booking_survives_room_failure() {
        let (platform, _) = platform();
        let pat = patient(&platform).await;
        let doc = therapist(&platform).await;
        let platform = platform.with_video(Arc::new(FakeVideo {
            fail_create: true,
            ..Default::default()
        }));

        let booked = platform
            .book_appointment(&pat, booking(doc.id, SessionKind::Video))
            .await
            .unwrap();
        assert!(booked.hms_room_id.is_none());
    }

    #[tokio::test]
    async fn test_join_requires_video_configuration() {
        let (platform, _) = platform();
        let pat = patient(&platform).await;
        let doc = therapist(&platform).await;
        let booked = platform
            .book_appointment(&pat, booking(doc.id, SessionKind::Video))
            .await
            .unwrap();

        let err = platform
            .join_session(&pat, booked.id, at(14, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::VideoNotConfigured));
    }

    #[tokio::test]
    async fn test_join_window_is_enforced() {
        let (platform, _) = platform();
        let pat = patient(&platform).await;
        let doc = therapist(&platform).await;
        let booked = platform
            .book_appointment(&pat, booking(doc.id, SessionKind::Phone))
            .await
            .unwrap();
        let (platform, video) = with_fake_video(platform);

        for now in [at(13, 49), at(15, 1)] {
            let err = platform.join_session(&pat, booked.id, now).await.unwrap_err();
            assert!(matches!(err, ApiError::OutsideJoinWindow { .. }));
        }
        assert!(video.created.lock().unwrap().is_empty());

        let patient_token = platform.join_session(&pat, booked.id, at(13, 51)).await.unwrap();
        assert_eq!(patient_token.role, VideoRole::Guest);
        assert_eq!(patient_token.room_id, "room-1");
        assert!(patient_token.token.ends_with(":guest:Pat Patient"));

        let therapist_token = platform.join_session(&doc, booked.id, at(15, 0)).await.unwrap();
        assert_eq!(therapist_token.role, VideoRole::Host);
        assert_eq!(therapist_token.room_id, "room-1");
        assert_eq!(video.created.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_outsiders_and_finished_sessions_cannot_join() {
        let (platform, _) = platform();
        let pat = patient(&platform).await;
        let doc = therapist(&platform).await;
        let booked = platform
            .book_appointment(&pat, booking(doc.id, SessionKind::Video))
            .await
            .unwrap();
        let stranger = platform
            .register(patient_form("stranger@example.com", "Some Stranger"), today())
            .await
            .unwrap();
        let (platform, _) = with_fake_video(platform);

        let err = platform
            .join_session(&stranger, booked.id, at(14, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        platform
            .update_appointment_status(&doc, booked.id, AppointmentStatus::Cancelled)
            .await
            .unwrap();
        let err = platform.join_session(&pat, booked.id, at(14, 0)).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_completing_ends_the_room() {
        let (platform, _) = platform();
        let pat = patient(&platform).await;
        let doc = therapist(&platform).await;
        let (platform, video) = with_fake_video(platform);
        let booked = platform
            .book_appointment(&pat, booking(doc.id, SessionKind::Video))
            .await
            .unwrap();

        let done = platform
            .update_appointment_status(&doc, booked.id, AppointmentStatus::Completed)
            .await
            .unwrap();
        assert_eq!(done.status, AppointmentStatus::Completed);
        assert_eq!(video.ended.lock().unwrap().as_slice(), ["room-1"]);

        let err = platform
            .update_appointment_status(&pat, booked.id, AppointmentStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_simultaneous_joins_share_one_room() {
        let (platform, backend) = platform();
        let pat = patient(&platform).await;
        let doc = therapist(&platform).await;
        let booked = platform
            .book_appointment(&pat, booking(doc.id, SessionKind::Phone))
            .await
            .unwrap();
        let (platform, video) = with_fake_video(platform);

        let (a, b) = tokio::join!(
            platform.join_session(&pat, booked.id, at(14, 0)),
            platform.join_session(&doc, booked.id, at(14, 0)),
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.room_id, b.room_id);
        assert_eq!(video.created.lock().unwrap().len(), 2);

        let stored = backend.raw_rows(Table::Appointments)[0]["hms_room_id"].clone();
        assert_eq!(stored, a.room_id.as_str());
        let ended = video.ended.lock().unwrap().clone();
        assert_eq!(ended.len(), 1);
        assert_ne!(ended[0], a.room_id);
    }

    #[tokio::test]
    async fn test_disabled_room_is_replaced() {
        let (platform, backend) = platform();
        let pat = patient(&platform).await;
        let doc = therapist(&platform).await;
        let (platform, video) = with_fake_video(platform);
        let booked = platform
            .book_appointment(&pat, booking(doc.id, SessionKind::Video))
            .await
            .unwrap();
        assert_eq!(booked.hms_room_id.as_deref(), Some("room-1"));

        let token = platform.join_session(&pat, booked.id, at(14, 0)).await.unwrap();
        assert_eq!(token.room_id, "room-1");

        video.disabled.lock().unwrap().push("room-1".to_string());
        let token = platform.join_session(&doc, booked.id, at(14, 5)).await.unwrap();
        assert_eq!(token.room_id, "room-2");
        assert_eq!(backend.raw_rows(Table::Appointments)[0]["hms_room_id"], "room-2");
        assert!(video.ended.lock().unwrap().is_empty());
    }
}
