use crate::auth_utils::Organizer;
use crate::db::DbPool;
use crate::error_handler::ServiceError;
use crate::models::{
    Event, PaginatedResponse, PaginationParams, Registration, Skill, Volunteer,
    VolunteerApiResponse, VolunteerSource,
};
use crate::schema::{
    events, skills, volunteer_event, volunteer_skills, volunteers, volunteers_non_auth,
};
use actix_web::{get, web, HttpResponse};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Deserialize, Debug)]
pub struct VolunteerQueryParams {
    #[serde(default)]
    pub source: VolunteerSource,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Deserialize, Debug)]
pub struct VolunteerSourceParam {
    #[serde(default)]
    pub source: VolunteerSource,
}

#[derive(Serialize, Debug)]
pub struct VolunteerEventEntry {
    pub registration: Registration,
    pub event: Event,
}

fn search_pattern(search: &Option<String>) -> Option<String> {
    search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s))
}

async fn load_auth_volunteers(
    conn: &mut AsyncPgConnection,
    pattern: Option<String>,
    pagination: &PaginationParams,
) -> Result<(i64, Vec<Volunteer>), ServiceError> {
    use crate::schema::volunteers::dsl::*;

    let mut count_query = volunteers.into_boxed();
    let mut query_builder = volunteers.into_boxed();
    if let Some(pattern) = pattern {
        count_query = count_query
            .filter(full_name.ilike(pattern.clone()).or(email.ilike(pattern.clone())));
        query_builder =
            query_builder.filter(full_name.ilike(pattern.clone()).or(email.ilike(pattern)));
    }

    let total_items = count_query
        .count()
        .get_result::<i64>(conn)
        .await
        .map_err(ServiceError::from)?;
    let items = query_builder
        .order(full_name.asc())
        .limit(pagination.per_page)
        .offset(pagination.offset())
        .select(Volunteer::as_select())
        .load::<Volunteer>(conn)
        .await
        .map_err(ServiceError::from)?;

    Ok((total_items, items))
}

async fn load_non_auth_volunteers(
    conn: &mut AsyncPgConnection,
    pattern: Option<String>,
    pagination: &PaginationParams,
) -> Result<(i64, Vec<Volunteer>), ServiceError> {
    use crate::schema::volunteers_non_auth::dsl::*;

    let mut count_query = volunteers_non_auth.into_boxed();
    let mut query_builder = volunteers_non_auth.into_boxed();
    if let Some(pattern) = pattern {
        count_query = count_query
            .filter(full_name.ilike(pattern.clone()).or(email.ilike(pattern.clone())));
        query_builder =
            query_builder.filter(full_name.ilike(pattern.clone()).or(email.ilike(pattern)));
    }

    let total_items = count_query
        .count()
        .get_result::<i64>(conn)
        .await
        .map_err(ServiceError::from)?;
    // Same column order as `Volunteer`.
    let items = query_builder
        .order(full_name.asc())
        .limit(pagination.per_page)
        .offset(pagination.offset())
        .select((
            id,
            full_name,
            email,
            phone,
            availability,
            onboarding_step,
            onboarding_completed,
            created_at,
        ))
        .load::<Volunteer>(conn)
        .await
        .map_err(ServiceError::from)?;

    Ok((total_items, items))
}

async fn find_volunteer(
    conn: &mut AsyncPgConnection,
    source: VolunteerSource,
    volunteer_to_find_id: Uuid,
) -> Result<Option<Volunteer>, ServiceError> {
    let found = match source {
        VolunteerSource::Auth => {
            volunteers::table
                .filter(volunteers::id.eq(volunteer_to_find_id))
                .select(Volunteer::as_select())
                .first::<Volunteer>(conn)
                .await
        }
        VolunteerSource::NonAuth => {
            volunteers_non_auth::table
                .filter(volunteers_non_auth::id.eq(volunteer_to_find_id))
                .select((
                    volunteers_non_auth::id,
                    volunteers_non_auth::full_name,
                    volunteers_non_auth::email,
                    volunteers_non_auth::phone,
                    volunteers_non_auth::availability,
                    volunteers_non_auth::onboarding_step,
                    volunteers_non_auth::onboarding_completed,
                    volunteers_non_auth::created_at,
                ))
                .first::<Volunteer>(conn)
                .await
        }
    };
    found.optional().map_err(ServiceError::from)
}

#[get("")]
pub async fn list_volunteers_handler(
    pool: web::Data<DbPool>,
    _organizer: Organizer,
    query: web::Query<VolunteerQueryParams>,
) -> Result<HttpResponse, ServiceError> {
    let pagination = PaginationParams::sanitized(query.page, query.per_page);
    let pattern = search_pattern(&query.search);

    let mut conn = pool.get().await?;

    let (total_items, items) = match query.source {
        VolunteerSource::Auth => load_auth_volunteers(&mut conn, pattern, &pagination).await?,
        VolunteerSource::NonAuth => {
            load_non_auth_volunteers(&mut conn, pattern, &pagination).await?
        }
    };

    Ok(HttpResponse::Ok().json(PaginatedResponse::new(items, total_items, &pagination)))
}

#[get("/{volunteer_id_path}")]
pub async fn get_volunteer_handler(
    pool: web::Data<DbPool>,
    _organizer: Organizer,
    volunteer_id_path: web::Path<Uuid>,
    query: web::Query<VolunteerSourceParam>,
) -> Result<HttpResponse, ServiceError> {
    let volunteer_to_find_id = volunteer_id_path.into_inner();

    let mut conn = pool.get().await?;

    let volunteer = find_volunteer(&mut conn, query.source, volunteer_to_find_id)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Volunteer with id {} not found", volunteer_to_find_id))
        })?;

    let volunteer_skill_list = volunteer_skills::table
        .filter(volunteer_skills::volunteer_id.eq(volunteer.id))
        .inner_join(skills::table)
        .select(Skill::as_select())
        .order(skills::skill.asc())
        .load::<Skill>(&mut conn)
        .await
        .map_err(ServiceError::from)?;

    Ok(HttpResponse::Ok().json(VolunteerApiResponse {
        volunteer,
        skills: volunteer_skill_list,
    }))
}

#[get("/{volunteer_id_path}/events")]
pub async fn list_volunteer_events_handler(
    pool: web::Data<DbPool>,
    _organizer: Organizer,
    volunteer_id_path: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    let volunteer_to_find_id = volunteer_id_path.into_inner();

    let mut conn = pool.get().await?;

    let rows = volunteer_event::table
        .filter(volunteer_event::volunteer_id.eq(volunteer_to_find_id))
        .inner_join(events::table)
        .order(events::start_date.desc())
        .select((Registration::as_select(), Event::as_select()))
        .load::<(Registration, Event)>(&mut conn)
        .await
        .map_err(ServiceError::from)?;

    let entries: Vec<VolunteerEventEntry> = rows
        .into_iter()
        .map(|(registration, event)| VolunteerEventEntry {
            registration,
            event,
        })
        .collect();

    Ok(HttpResponse::Ok().json(entries))
}
