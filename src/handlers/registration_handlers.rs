use crate::auth_utils::Organizer;
use crate::db::DbPool;
use crate::error_handler::ServiceError;
use crate::handlers::event_handlers::find_event;
use crate::models::{
    CreateRegistrationPayload, Event, EventStatus, NewRegistration, Registration,
    UpdateRegistrationChangeset, UpdateRegistrationPayload, Volunteer, REGISTRATION_REGISTERED,
};
use crate::schema::volunteer_event::{self, dsl::*};
use crate::schema::volunteers;
use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;
use serde_json::json;

#[derive(Serialize, Debug)]
pub struct RegistrationEntry {
    #[serde(flatten)]
    pub registration: Registration,
    pub volunteer: Option<Volunteer>,
}

/// Rejects registrations for events that are not open: archived, past the
/// deadline, or already at capacity. A capacity of 0 means unlimited.
fn check_registration_open(
    event: &Event,
    registered_count: i64,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    if EventStatus::parse(&event.status) == Some(EventStatus::Archived) {
        return Err(ServiceError::BadRequest(format!(
            "Event {} is archived",
            event.id
        )));
    }
    if let Some(deadline) = event.registration_deadline {
        if now > deadline {
            return Err(ServiceError::BadRequest(format!(
                "Registration for event {} closed at {}",
                event.id, deadline
            )));
        }
    }
    if event.max_volunteers > 0 && registered_count >= i64::from(event.max_volunteers) {
        return Err(ServiceError::BadRequest(format!(
            "Event {} is full ({} volunteers)",
            event.id, event.max_volunteers
        )));
    }
    Ok(())
}

/// Moving an existing row to "registered" is the same transition as a new
/// registration and goes through the same checks.
fn reopens_registration(current: &Registration, payload: &UpdateRegistrationPayload) -> bool {
    payload.sets_registered() && !current.is_registered()
}

async fn count_registered(
    conn: &mut AsyncPgConnection,
    event_to_count_id: i64,
) -> Result<i64, ServiceError> {
    volunteer_event
        .filter(event_id.eq(event_to_count_id))
        .filter(status.eq(REGISTRATION_REGISTERED))
        .count()
        .get_result::<i64>(conn)
        .await
        .map_err(ServiceError::from)
}

#[get("/{event_id_path}/registrations")]
pub async fn list_event_registrations_handler(
    pool: web::Data<DbPool>,
    _organizer: Organizer,
    event_id_path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let event_to_list_id = event_id_path.into_inner();

    let mut conn = pool.get().await?;
    find_event(&mut conn, event_to_list_id).await?;

    let rows = volunteer_event
        .filter(event_id.eq(event_to_list_id))
        .left_join(volunteers::table)
        .order(created_at.asc())
        .select((Registration::as_select(), Option::<Volunteer>::as_select()))
        .load::<(Registration, Option<Volunteer>)>(&mut conn)
        .await
        .map_err(ServiceError::from)?;

    let entries: Vec<RegistrationEntry> = rows
        .into_iter()
        .map(|(registration, volunteer)| RegistrationEntry {
            registration,
            volunteer,
        })
        .collect();

    Ok(HttpResponse::Ok().json(entries))
}

#[post("/{event_id_path}/registrations")]
pub async fn create_registration_handler(
    pool: web::Data<DbPool>,
    organizer: Organizer,
    event_id_path: web::Path<i64>,
    payload: web::Json<CreateRegistrationPayload>,
) -> Result<HttpResponse, ServiceError> {
    let event_to_join_id = event_id_path.into_inner();
    let volunteer_to_register = payload.volunteer_id;

    let mut conn = pool.get().await?;
    let event = find_event(&mut conn, event_to_join_id).await?;

    let existing = volunteer_event
        .filter(event_id.eq(event_to_join_id))
        .filter(volunteer_id.eq(volunteer_to_register))
        .select(Registration::as_select())
        .first::<Registration>(&mut conn)
        .await
        .optional()
        .map_err(ServiceError::from)?;

    if existing.as_ref().is_some_and(Registration::is_registered) {
        return Err(ServiceError::BadRequest(format!(
            "Volunteer {} is already registered for event {}",
            volunteer_to_register, event_to_join_id
        )));
    }

    let registered_count = count_registered(&mut conn, event_to_join_id).await?;
    check_registration_open(&event, registered_count, Utc::now())?;

    // A previous "not registered" row is flipped back rather than duplicated.
    let registration = match existing {
        Some(previous) => {
            let changes = UpdateRegistrationChangeset {
                status: Some(REGISTRATION_REGISTERED.to_string()),
                ..Default::default()
            };
            diesel::update(volunteer_event.filter(id.eq(previous.id)))
                .set(&changes)
                .get_result::<Registration>(&mut conn)
                .await
                .map_err(ServiceError::from)?
        }
        None => diesel::insert_into(volunteer_event::table)
            .values(&NewRegistration {
                volunteer_id: volunteer_to_register,
                event_id: event_to_join_id,
                status: REGISTRATION_REGISTERED.to_string(),
            })
            .get_result::<Registration>(&mut conn)
            .await
            .map_err(ServiceError::from)?,
    };

    log::info!(
        "Organizer {} registered volunteer {} for event {}",
        organizer.id,
        volunteer_to_register,
        event_to_join_id
    );
    Ok(HttpResponse::Created().json(registration))
}

#[put("/{registration_id_path}")]
pub async fn update_registration_handler(
    pool: web::Data<DbPool>,
    _organizer: Organizer,
    registration_id_path: web::Path<i64>,
    payload: web::Json<UpdateRegistrationPayload>,
) -> Result<HttpResponse, ServiceError> {
    let registration_to_update_id = registration_id_path.into_inner();
    let payload = payload.into_inner();
    payload.validate()?;

    let mut conn = pool.get().await?;

    let current = volunteer_event
        .filter(id.eq(registration_to_update_id))
        .select(Registration::as_select())
        .first::<Registration>(&mut conn)
        .await
        .map_err(|e| {
            ServiceError::not_found_or(
                e,
                format!("Registration with id {} not found", registration_to_update_id),
            )
        })?;

    if reopens_registration(&current, &payload) {
        let event = find_event(&mut conn, current.event_id).await?;
        let registered_count = count_registered(&mut conn, current.event_id).await?;
        check_registration_open(&event, registered_count, Utc::now())?;
    }

    let updated = diesel::update(volunteer_event.filter(id.eq(registration_to_update_id)))
        .set(&payload.into_changeset())
        .get_result::<Registration>(&mut conn)
        .await
        .map_err(|e| {
            ServiceError::not_found_or(
                e,
                format!("Registration with id {} not found", registration_to_update_id),
            )
        })?;

    Ok(HttpResponse::Ok().json(updated))
}

#[delete("/{registration_id_path}")]
pub async fn delete_registration_handler(
    pool: web::Data<DbPool>,
    _organizer: Organizer,
    registration_id_path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let registration_to_delete_id = registration_id_path.into_inner();

    let mut conn = pool.get().await?;

    let num_deleted = diesel::delete(volunteer_event.filter(id.eq(registration_to_delete_id)))
        .execute(&mut conn)
        .await
        .map_err(ServiceError::from)?;

    if num_deleted > 0 {
        Ok(HttpResponse::Ok().json(json!({
            "status": "success",
            "message": format!(
                "Registration with id {} deleted successfully",
                registration_to_delete_id
            )
        })))
    } else {
        Err(ServiceError::NotFound(format!(
            "Registration with id {} not found",
            registration_to_delete_id
        )))
    }
}
