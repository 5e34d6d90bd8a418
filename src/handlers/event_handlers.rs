use crate::auth_utils::Organizer;
use crate::db::DbPool;
use crate::error_handler::ServiceError;
use crate::gateways::storage::{event_image_path, ObjectStorage};
use crate::models::{
    parse_event_status, CreateEventPayload, Event, EventCategory, EventStatus,
    PaginatedResponse, PaginationParams, UpdateEventChangeset, UpdateEventPayload,
};
use crate::schema::events::{self, dsl::*};
use crate::schema::{chat_messages, email_logs, tasks, volunteer_event};
use actix_web::{delete, get, http::header, post, put, web, HttpRequest, HttpResponse};
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize, Debug)]
pub struct EventQueryParams {
    pub status: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

pub(crate) async fn find_event(
    conn: &mut AsyncPgConnection,
    event_to_find_id: i64,
) -> Result<Event, ServiceError> {
    events
        .filter(id.eq(event_to_find_id))
        .select(Event::as_select())
        .first::<Event>(conn)
        .await
        .map_err(|e| {
            ServiceError::not_found_or(e, format!("Event with id {} not found", event_to_find_id))
        })
}

#[post("")]
pub async fn create_event_handler(
    pool: web::Data<DbPool>,
    organizer: Organizer,
    payload: web::Json<CreateEventPayload>,
) -> Result<HttpResponse, ServiceError> {
    let payload = payload.into_inner();
    payload.validate()?;
    log::info!("Organizer {} creating event {:?}", organizer.id, payload.title);

    let mut conn = pool.get().await?;

    let event = diesel::insert_into(events::table)
        .values(&payload.into_new_event())
        .get_result::<Event>(&mut conn)
        .await
        .map_err(ServiceError::from)?;

    Ok(HttpResponse::Created().json(event))
}

#[get("")]
pub async fn list_events_handler(
    pool: web::Data<DbPool>,
    _organizer: Organizer,
    query: web::Query<EventQueryParams>,
) -> Result<HttpResponse, ServiceError> {
    let pagination = PaginationParams::sanitized(query.page, query.per_page);

    let status_filter = match &query.status {
        Some(raw) => Some(parse_event_status(raw)?),
        None => None,
    };
    let category_filter = match &query.category {
        Some(raw) => Some(EventCategory::parse(raw).ok_or_else(|| {
            ServiceError::BadRequest(format!("Invalid event category: {}", raw))
        })?),
        None => None,
    };
    let search_pattern = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s));

    let mut conn = pool.get().await?;

    let mut count_query = events.into_boxed();
    let mut query_builder = events.into_boxed();

    if let Some(wanted) = status_filter {
        count_query = count_query.filter(status.eq(wanted.as_str()));
        query_builder = query_builder.filter(status.eq(wanted.as_str()));
    }
    if let Some(wanted) = category_filter {
        count_query = count_query.filter(category.eq(wanted.as_str()));
        query_builder = query_builder.filter(category.eq(wanted.as_str()));
    }
    if let Some(pattern) = &search_pattern {
        count_query = count_query.filter(title.ilike(pattern.clone()));
        query_builder = query_builder.filter(title.ilike(pattern.clone()));
    }

    let total_items = count_query
        .count()
        .get_result::<i64>(&mut conn)
        .await
        .map_err(ServiceError::from)?;

    let event_list = query_builder
        .order(start_date.desc())
        .limit(pagination.per_page)
        .offset(pagination.offset())
        .select(Event::as_select())
        .load::<Event>(&mut conn)
        .await
        .map_err(ServiceError::from)?;

    Ok(HttpResponse::Ok().json(PaginatedResponse::new(
        event_list,
        total_items,
        &pagination,
    )))
}

#[get("/{event_id_path}")]
pub async fn get_event_handler(
    pool: web::Data<DbPool>,
    _organizer: Organizer,
    event_id_path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let mut conn = pool.get().await?;
    let event = find_event(&mut conn, event_id_path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(event))
}

#[put("/{event_id_path}")]
pub async fn update_event_handler(
    pool: web::Data<DbPool>,
    organizer: Organizer,
    event_id_path: web::Path<i64>,
    payload: web::Json<UpdateEventPayload>,
) -> Result<HttpResponse, ServiceError> {
    let event_to_update_id = event_id_path.into_inner();
    let payload = payload.into_inner();

    let mut conn = pool.get().await?;

    let current = find_event(&mut conn, event_to_update_id).await?;
    payload.validate_against(&current)?;
    log::info!("Organizer {} updating event {}", organizer.id, event_to_update_id);

    let updated_event = diesel::update(events.filter(id.eq(event_to_update_id)))
        .set(&payload.into_changeset())
        .get_result::<Event>(&mut conn)
        .await
        .map_err(ServiceError::from)?;

    Ok(HttpResponse::Ok().json(updated_event))
}

async fn set_event_status(
    pool: &DbPool,
    event_to_update_id: i64,
    new_status: EventStatus,
) -> Result<Event, ServiceError> {
    let mut conn = pool.get().await?;

    let changes = UpdateEventChangeset {
        status: Some(new_status.as_str().to_string()),
        updated_at: Some(Utc::now()),
        ..Default::default()
    };

    diesel::update(events.filter(id.eq(event_to_update_id)))
        .set(&changes)
        .get_result::<Event>(&mut conn)
        .await
        .map_err(|e| {
            ServiceError::not_found_or(e, format!("Event with id {} not found", event_to_update_id))
        })
}

#[put("/{event_id_path}/publish")]
pub async fn publish_event_handler(
    pool: web::Data<DbPool>,
    organizer: Organizer,
    event_id_path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let event_id_value = event_id_path.into_inner();
    log::info!("Organizer {} publishing event {}", organizer.id, event_id_value);
    let event = set_event_status(&pool, event_id_value, EventStatus::Published).await?;
    Ok(HttpResponse::Ok().json(event))
}

#[put("/{event_id_path}/archive")]
pub async fn archive_event_handler(
    pool: web::Data<DbPool>,
    organizer: Organizer,
    event_id_path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let event_id_value = event_id_path.into_inner();
    log::info!("Organizer {} archiving event {}", organizer.id, event_id_value);
    let event = set_event_status(&pool, event_id_value, EventStatus::Archived).await?;
    Ok(HttpResponse::Ok().json(event))
}

/// Deletes the event and every row referencing it, all or nothing.
pub(crate) async fn delete_event_cascade(
    conn: &mut AsyncPgConnection,
    event_to_delete_id: i64,
) -> Result<usize, ServiceError> {
    conn.transaction::<_, ServiceError, _>(|conn| {
        async move {
            // Rows referencing the event go first.
            diesel::delete(tasks::table.filter(tasks::event_id.eq(event_to_delete_id)))
                .execute(conn)
                .await?;
            diesel::delete(
                volunteer_event::table.filter(volunteer_event::event_id.eq(event_to_delete_id)),
            )
            .execute(conn)
            .await?;
            diesel::delete(
                chat_messages::table.filter(chat_messages::event_id.eq(event_to_delete_id)),
            )
            .execute(conn)
            .await?;
            diesel::delete(email_logs::table.filter(email_logs::event_id.eq(event_to_delete_id)))
                .execute(conn)
                .await?;

            let removed = diesel::delete(events.filter(id.eq(event_to_delete_id)))
                .execute(conn)
                .await?;
            Ok(removed)
        }
        .scope_boxed()
    })
    .await
}

#[delete("/{event_id_path}")]
pub async fn delete_event_handler(
    pool: web::Data<DbPool>,
    organizer: Organizer,
    event_id_path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let event_to_delete_id = event_id_path.into_inner();

    let mut conn = pool.get().await?;

    let num_deleted = delete_event_cascade(&mut conn, event_to_delete_id).await?;

    if num_deleted > 0 {
        log::info!("Organizer {} deleted event {}", organizer.id, event_to_delete_id);
        Ok(HttpResponse::Ok().json(json!({
            "status": "success",
            "message": format!("Event with id {} deleted successfully", event_to_delete_id)
        })))
    } else {
        Err(ServiceError::NotFound(format!(
            "Event with id {} not found",
            event_to_delete_id
        )))
    }
}

/// Raw image body; the `Content-Type` header selects the file extension.
#[post("/{event_id_path}/image")]
pub async fn upload_event_image_handler(
    pool: web::Data<DbPool>,
    storage: web::Data<ObjectStorage>,
    organizer: Organizer,
    event_id_path: web::Path<i64>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, ServiceError> {
    let event_id_value = event_id_path.into_inner();
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServiceError::BadRequest("Missing Content-Type header".to_string()))?
        .to_string();

    let mut conn = pool.get().await?;
    find_event(&mut conn, event_id_value).await?;

    let path = event_image_path(event_id_value, &content_type)?;
    log::info!(
        "Organizer {} uploading {} bytes for event {}",
        organizer.id,
        body.len(),
        event_id_value
    );
    let public_url = storage.upload(&path, &content_type, body.to_vec()).await?;

    let changes = UpdateEventChangeset {
        image_url: Some(Some(public_url)),
        updated_at: Some(Utc::now()),
        ..Default::default()
    };
    let updated_event = diesel::update(events.filter(id.eq(event_id_value)))
        .set(&changes)
        .get_result::<Event>(&mut conn)
        .await
        .map_err(ServiceError::from)?;

    Ok(HttpResponse::Ok().json(updated_event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewEvent, NewTask};
    use chrono::{Duration, TimeZone};

    // Needs a provisioned database; skipped unless TEST_DATABASE_URL is set.
    async fn test_connection() -> Option<AsyncPgConnection> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let mut conn = AsyncPgConnection::establish(&url).await.unwrap();
        conn.begin_test_transaction().await.unwrap();
        Some(conn)
    }

    #[actix_web::test]
    async fn failed_cascade_keeps_dependent_rows() {
        let Some(mut conn) = test_connection().await else {
            return;
        };

        let start = Utc.with_ymd_and_hms(2030, 6, 1, 9, 0, 0).unwrap();
        let event = diesel::insert_into(events::table)
            .values(&NewEvent {
                title: "Beach cleanup".to_string(),
                description: None,
                location: None,
                location_type: "physical".to_string(),
                category: "environment".to_string(),
                start_date: start,
                end_date: start + Duration::hours(3),
                registration_deadline: None,
                max_volunteers: 10,
                status: "draft".to_string(),
            })
            .get_result::<Event>(&mut conn)
            .await
            .unwrap();
        diesel::insert_into(tasks::table)
            .values(&NewTask {
                event_id: event.id,
                volunteer_id: None,
                volunteer_email: None,
                description: "Bring gloves".to_string(),
                status: "unassigned".to_string(),
            })
            .execute(&mut conn)
            .await
            .unwrap();

        // Makes a later cascade step fail; undone with the test transaction.
        diesel::sql_query("DROP TABLE email_logs")
            .execute(&mut conn)
            .await
            .unwrap();

        assert!(delete_event_cascade(&mut conn, event.id).await.is_err());

        let remaining_tasks = tasks::table
            .filter(tasks::event_id.eq(event.id))
            .count()
            .get_result::<i64>(&mut conn)
            .await
            .unwrap();
        assert_eq!(remaining_tasks, 1);
        assert!(find_event(&mut conn, event.id).await.is_ok());
    }
}
