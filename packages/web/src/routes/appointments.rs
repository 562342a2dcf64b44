use api::SessionToken;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use store::models::{Appointment, AppointmentStatus, BookingRequest};
use store::schedule::{bookable_dates, date_label};
use store::{AppointmentFilter, JoinWindow};
use uuid::Uuid;

use super::{now, refresh, today};
use crate::error::AppResult;
use crate::state::{SharedState, SignedIn};

#[derive(Debug, Default, Deserialize)]
pub struct AppointmentQuery {
    #[serde(default)]
    filter: AppointmentFilter,
}

/// An appointment with the derived state the list view shows.
#[derive(Serialize)]
pub struct AppointmentCard {
    #[serde(flatten)]
    appointment: Appointment,
    date_label: String,
    join_window: JoinWindow,
    can_join: bool,
}

#[derive(Serialize)]
pub struct BookingSlots {
    dates: Vec<NaiveDate>,
    times: Vec<String>,
}

#[derive(Deserialize)]
pub struct StatusChange {
    status: AppointmentStatus,
}

pub async fn list(
    State(state): State<SharedState>,
    SignedIn(user): SignedIn,
    Query(query): Query<AppointmentQuery>,
) -> AppResult<Json<Vec<AppointmentCard>>> {
    let cache = state.cache(user.id);
    let appointments =
        refresh(&cache.appointments, state.platform.list_appointments(&user)).await?;

    let (now, today) = (now(), today());
    let policy = state.platform.join_policy();
    Ok(Json(
        query
            .filter
            .apply(&appointments, now)
            .into_iter()
            .map(|a| AppointmentCard {
                date_label: date_label(a.appointment_date, today),
                join_window: policy.window(a.scheduled_at()),
                can_join: policy.can_join_appointment(a, now),
                appointment: a.clone(),
            })
            .collect(),
    ))
}

/// Dates and start times offered by the booking form.
pub async fn slots(State(state): State<SharedState>, SignedIn(_): SignedIn) -> Json<BookingSlots> {
    Json(BookingSlots {
        dates: bookable_dates(today()),
        times: state
            .config
            .schedule
            .slots()
            .iter()
            .map(|t| t.format("%H:%M").to_string())
            .collect(),
    })
}

pub async fn book(
    State(state): State<SharedState>,
    SignedIn(user): SignedIn,
    Json(request): Json<BookingRequest>,
) -> AppResult<(StatusCode, Json<Appointment>)> {
    let appointment = state.platform.book_appointment(&user, request).await?;
    state.cache(user.id).appointments.push(appointment.clone());
    Ok((StatusCode::CREATED, Json(appointment)))
}

pub async fn set_status(
    State(state): State<SharedState>,
    SignedIn(user): SignedIn,
    Path(id): Path<Uuid>,
    Json(change): Json<StatusChange>,
) -> AppResult<Json<Appointment>> {
    let appointment = state
        .platform
        .update_appointment_status(&user, id, change.status)
        .await?;
    state.cache(user.id).appointments.update(appointment.clone());
    Ok(Json(appointment))
}

pub async fn join(
    State(state): State<SharedState>,
    SignedIn(user): SignedIn,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SessionToken>> {
    Ok(Json(state.platform.join_session(&user, id, now()).await?))
}
