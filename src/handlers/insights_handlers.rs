use crate::auth_utils::Organizer;
use crate::db::DbPool;
use crate::error_handler::ServiceError;
use crate::insights::{aggregate, fallback, InsightQuery};
use crate::models::{Event, Registration, Skill, Task, VolunteerSkill};
use crate::schema::{events, skills, tasks, volunteer_event, volunteer_skills, volunteers};
use actix_web::{get, web, HttpResponse};
use chrono::{Datelike, Utc};
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

// --- Row fetchers ---

async fn load_events(conn: &mut AsyncPgConnection) -> QueryResult<Vec<Event>> {
    events::table
        .select(Event::as_select())
        .load::<Event>(conn)
        .await
}

async fn load_tasks(conn: &mut AsyncPgConnection) -> QueryResult<Vec<Task>> {
    tasks::table
        .select(Task::as_select())
        .load::<Task>(conn)
        .await
}

async fn load_registrations(conn: &mut AsyncPgConnection) -> QueryResult<Vec<Registration>> {
    volunteer_event::table
        .select(Registration::as_select())
        .load::<Registration>(conn)
        .await
}

async fn count_volunteers(conn: &mut AsyncPgConnection) -> QueryResult<i64> {
    volunteers::table.count().get_result::<i64>(conn).await
}

fn requested_year(query: &InsightQuery) -> Result<i32, ServiceError> {
    let year = query.year.unwrap_or_else(|| Utc::now().year());
    if !(1970..=9999).contains(&year) {
        return Err(ServiceError::BadRequest(format!("Invalid year: {}", year)));
    }
    Ok(year)
}

// === GET /insights/overview ===
#[get("/overview")]
pub async fn get_overview_handler(
    pool: web::Data<DbPool>,
    organizer: Organizer,
) -> Result<HttpResponse, ServiceError> {
    log::info!("Organizer {} fetching insights overview", organizer.id);
    let mut conn = pool.get().await?;

    let live = async {
        let event_rows = load_events(&mut conn).await?;
        let task_rows = load_tasks(&mut conn).await?;
        let volunteer_total = count_volunteers(&mut conn).await?;
        let registration_rows = load_registrations(&mut conn).await?;
        Ok::<_, DieselError>(aggregate::overview(
            &event_rows,
            &task_rows,
            volunteer_total,
            &registration_rows,
        ))
    }
    .await;

    Ok(HttpResponse::Ok().json(fallback::with_fallback(live, fallback::overview)?))
}

// === GET /insights/events-by-category ===
#[get("/events-by-category")]
pub async fn get_events_by_category_handler(
    pool: web::Data<DbPool>,
    _organizer: Organizer,
) -> Result<HttpResponse, ServiceError> {
    let mut conn = pool.get().await?;

    let live = load_events(&mut conn)
        .await
        .map(|rows| aggregate::events_by_category(&rows));

    Ok(HttpResponse::Ok().json(fallback::with_fallback(live, fallback::events_by_category)?))
}

// === GET /insights/tasks-by-month ===
#[get("/tasks-by-month")]
pub async fn get_tasks_by_month_handler(
    pool: web::Data<DbPool>,
    _organizer: Organizer,
    query_params: web::Query<InsightQuery>,
) -> Result<HttpResponse, ServiceError> {
    let year = requested_year(&query_params)?;
    let mut conn = pool.get().await?;

    let live = load_tasks(&mut conn)
        .await
        .map(|rows| aggregate::tasks_by_month(&rows, year));

    Ok(HttpResponse::Ok().json(fallback::with_fallback(live, fallback::tasks_by_month)?))
}

// === GET /insights/registrations-by-month ===
#[get("/registrations-by-month")]
pub async fn get_registrations_by_month_handler(
    pool: web::Data<DbPool>,
    _organizer: Organizer,
    query_params: web::Query<InsightQuery>,
) -> Result<HttpResponse, ServiceError> {
    let year = requested_year(&query_params)?;
    let mut conn = pool.get().await?;

    let live = load_registrations(&mut conn)
        .await
        .map(|rows| aggregate::registrations_by_month(&rows, year));

    Ok(HttpResponse::Ok().json(fallback::with_fallback(
        live,
        fallback::registrations_by_month,
    )?))
}

// === GET /insights/task-status ===
#[get("/task-status")]
pub async fn get_task_status_handler(
    pool: web::Data<DbPool>,
    _organizer: Organizer,
) -> Result<HttpResponse, ServiceError> {
    let mut conn = pool.get().await?;

    let live = load_tasks(&mut conn)
        .await
        .map(|rows| aggregate::task_status_breakdown(&rows));

    Ok(HttpResponse::Ok().json(fallback::with_fallback(
        live,
        fallback::task_status_breakdown,
    )?))
}

// === GET /insights/skills ===
#[get("/skills")]
pub async fn get_skill_distribution_handler(
    pool: web::Data<DbPool>,
    _organizer: Organizer,
    query_params: web::Query<InsightQuery>,
) -> Result<HttpResponse, ServiceError> {
    let top_n = query_params.top_n();
    let mut conn = pool.get().await?;

    let live = async {
        let skill_rows = skills::table
            .select(Skill::as_select())
            .load::<Skill>(&mut conn)
            .await?;
        let link_rows = volunteer_skills::table
            .select(VolunteerSkill::as_select())
            .load::<VolunteerSkill>(&mut conn)
            .await?;
        Ok::<_, DieselError>(aggregate::skill_distribution(&skill_rows, &link_rows, top_n))
    }
    .await;

    Ok(HttpResponse::Ok().json(fallback::with_fallback(live, fallback::skill_distribution)?))
}

// === GET /insights/fill-rates ===
#[get("/fill-rates")]
pub async fn get_fill_rates_handler(
    pool: web::Data<DbPool>,
    _organizer: Organizer,
    query_params: web::Query<InsightQuery>,
) -> Result<HttpResponse, ServiceError> {
    let top_n = query_params.top_n();
    let mut conn = pool.get().await?;

    let live = async {
        let event_rows = load_events(&mut conn).await?;
        let registration_rows = load_registrations(&mut conn).await?;
        Ok::<_, DieselError>(aggregate::event_fill_rates(
            &event_rows,
            &registration_rows,
            top_n,
        ))
    }
    .await;

    Ok(HttpResponse::Ok().json(fallback::with_fallback(live, fallback::event_fill_rates)?))
}

// === GET /insights/satisfaction ===
#[get("/satisfaction")]
pub async fn get_satisfaction_handler(
    pool: web::Data<DbPool>,
    _organizer: Organizer,
) -> Result<HttpResponse, ServiceError> {
    let mut conn = pool.get().await?;

    let live = load_registrations(&mut conn)
        .await
        .map(|rows| aggregate::satisfaction(&rows));

    Ok(HttpResponse::Ok().json(fallback::with_fallback(live, fallback::satisfaction)?))
}

// === GET /insights/engagement ===
#[get("/engagement")]
pub async fn get_engagement_handler(
    pool: web::Data<DbPool>,
    _organizer: Organizer,
) -> Result<HttpResponse, ServiceError> {
    let mut conn = pool.get().await?;

    let live = async {
        let volunteer_total = count_volunteers(&mut conn).await?;
        let registration_rows = load_registrations(&mut conn).await?;
        Ok::<_, DieselError>(aggregate::engagement(volunteer_total, &registration_rows))
    }
    .await;

    Ok(HttpResponse::Ok().json(fallback::with_fallback(live, fallback::engagement)?))
}

// === GET /insights/top-volunteers ===
#[get("/top-volunteers")]
pub async fn get_top_volunteers_handler(
    pool: web::Data<DbPool>,
    _organizer: Organizer,
    query_params: web::Query<InsightQuery>,
) -> Result<HttpResponse, ServiceError> {
    let top_n = query_params.top_n();
    let mut conn = pool.get().await?;

    let live = load_tasks(&mut conn)
        .await
        .map(|rows| aggregate::top_volunteers(&rows, top_n));

    Ok(HttpResponse::Ok().json(fallback::with_fallback(live, fallback::top_volunteers)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth_utils::ORGANIZER_HEADER;
    use actix_web::http::StatusCode;
    use actix_web::test::{call_service, init_service, read_body_json, TestRequest};
    use actix_web::App;
    use diesel_async::pooled_connection::bb8::Pool;
    use diesel_async::pooled_connection::AsyncDieselConnectionManager;
    use uuid::Uuid;

    // Never connects: these requests are rejected before a connection is taken.
    fn idle_pool() -> DbPool {
        let manager =
            AsyncDieselConnectionManager::<AsyncPgConnection>::new("postgres://localhost/unused");
        Pool::builder().build_unchecked(manager)
    }

    #[actix_web::test]
    async fn insights_require_an_organizer() {
        let app = init_service(
            App::new()
                .app_data(web::Data::new(idle_pool()))
                .service(web::scope("/insights").service(get_overview_handler)),
        )
        .await;

        let req = TestRequest::get().uri("/insights/overview").to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = read_body_json(resp).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["statusCode"], 401);
    }

    #[actix_web::test]
    async fn out_of_range_year_is_a_bad_request() {
        let app = init_service(
            App::new()
                .app_data(web::Data::new(idle_pool()))
                .service(web::scope("/insights").service(get_tasks_by_month_handler)),
        )
        .await;

        let req = TestRequest::get()
            .uri("/insights/tasks-by-month?year=1200")
            .insert_header((ORGANIZER_HEADER, Uuid::new_v4().to_string()))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = read_body_json(resp).await;
        assert_eq!(body["message"], "Bad Request: Invalid year: 1200");
    }

    fn query(year: Option<i32>, limit: Option<usize>) -> InsightQuery {
        InsightQuery { year, limit }
    }

    #[test]
    fn year_defaults_to_current_and_is_bounded() {
        let current = requested_year(&query(None, None)).unwrap();
        assert_eq!(current, Utc::now().year());
        assert!(requested_year(&query(Some(1200), None)).is_err());
        assert_eq!(requested_year(&query(Some(2024), None)).unwrap(), 2024);
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(query(None, None).top_n(), 5);
        assert_eq!(query(None, Some(0)).top_n(), 1);
        assert_eq!(query(None, Some(500)).top_n(), 50);
    }
}
