use crate::auth_utils::Organizer;
use crate::db::DbPool;
use crate::error_handler::ServiceError;
use crate::handlers::event_handlers::find_event;
use crate::models::{
    parse_task_status, AssignTaskPayload, CreateTaskPayload, PaginatedResponse,
    PaginationParams, Task, TaskStatus, UpdateTaskChangeset, UpdateTaskPayload,
};
use crate::schema::tasks::{self, dsl::*};
use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Deserialize, Debug)]
pub struct TaskQueryParams {
    pub event_id: Option<i64>,
    pub volunteer_id: Option<Uuid>,
    pub status: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

async fn apply_task_changes(
    conn: &mut AsyncPgConnection,
    task_to_update_id: Uuid,
    changes: &UpdateTaskChangeset,
) -> Result<Task, ServiceError> {
    diesel::update(tasks.filter(task_id.eq(task_to_update_id)))
        .set(changes)
        .get_result::<Task>(conn)
        .await
        .map_err(|e| {
            ServiceError::not_found_or(e, format!("Task with id {} not found", task_to_update_id))
        })
}

#[post("")]
pub async fn create_task_handler(
    pool: web::Data<DbPool>,
    organizer: Organizer,
    payload: web::Json<CreateTaskPayload>,
) -> Result<HttpResponse, ServiceError> {
    let payload = payload.into_inner();
    payload.validate()?;

    let mut conn = pool.get().await?;
    find_event(&mut conn, payload.event_id).await?;

    let task = diesel::insert_into(tasks::table)
        .values(&payload.into_new_task())
        .get_result::<Task>(&mut conn)
        .await
        .map_err(ServiceError::from)?;

    log::info!(
        "Organizer {} created task {} for event {}",
        organizer.id,
        task.task_id,
        task.event_id
    );
    Ok(HttpResponse::Created().json(task))
}

#[get("")]
pub async fn list_tasks_handler(
    pool: web::Data<DbPool>,
    _organizer: Organizer,
    query: web::Query<TaskQueryParams>,
) -> Result<HttpResponse, ServiceError> {
    let pagination = PaginationParams::sanitized(query.page, query.per_page);
    // Both status vocabularies match the same filter.
    let status_filter = match &query.status {
        Some(raw) => Some(parse_task_status(raw)?),
        None => None,
    };

    let mut conn = pool.get().await?;

    let mut count_query = tasks.into_boxed();
    let mut query_builder = tasks.into_boxed();

    if let Some(event_filter) = query.event_id {
        count_query = count_query.filter(event_id.eq(event_filter));
        query_builder = query_builder.filter(event_id.eq(event_filter));
    }
    if let Some(volunteer_uuid) = query.volunteer_id {
        count_query = count_query.filter(volunteer_id.eq(volunteer_uuid));
        query_builder = query_builder.filter(volunteer_id.eq(volunteer_uuid));
    }
    if let Some(wanted) = status_filter {
        count_query = count_query.filter(status.eq_any(wanted.spellings().to_vec()));
        query_builder = query_builder.filter(status.eq_any(wanted.spellings().to_vec()));
    }

    let total_items = count_query
        .count()
        .get_result::<i64>(&mut conn)
        .await
        .map_err(ServiceError::from)?;

    let task_list = query_builder
        .order(tasks::created_at.desc())
        .limit(pagination.per_page)
        .offset(pagination.offset())
        .select(Task::as_select())
        .load::<Task>(&mut conn)
        .await
        .map_err(ServiceError::from)?;

    Ok(HttpResponse::Ok().json(PaginatedResponse::new(task_list, total_items, &pagination)))
}

#[get("/{task_id_path}")]
pub async fn get_task_handler(
    pool: web::Data<DbPool>,
    _organizer: Organizer,
    task_id_path: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    let task_to_find_id = task_id_path.into_inner();

    let mut conn = pool.get().await?;

    let task_option = tasks
        .filter(task_id.eq(task_to_find_id))
        .select(Task::as_select())
        .first::<Task>(&mut conn)
        .await
        .optional()
        .map_err(ServiceError::from)?;

    match task_option {
        Some(task) => Ok(HttpResponse::Ok().json(task)),
        None => Err(ServiceError::NotFound(format!(
            "Task with id {} not found",
            task_to_find_id
        ))),
    }
}

#[put("/{task_id_path}")]
pub async fn update_task_handler(
    pool: web::Data<DbPool>,
    _organizer: Organizer,
    task_id_path: web::Path<Uuid>,
    payload: web::Json<UpdateTaskPayload>,
) -> Result<HttpResponse, ServiceError> {
    let task_to_update_id = task_id_path.into_inner();
    let payload = payload.into_inner();
    payload.validate()?;

    let task_changes = UpdateTaskChangeset {
        description: payload.description.map(|d| d.trim().to_string()),
        status: payload.status,
        feedback: payload.feedback,
        updated_at: Some(Utc::now()),
        ..Default::default()
    };

    let mut conn = pool.get().await?;
    let updated_task = apply_task_changes(&mut conn, task_to_update_id, &task_changes).await?;

    Ok(HttpResponse::Ok().json(updated_task))
}

#[put("/{task_id_path}/assign")]
pub async fn assign_task_handler(
    pool: web::Data<DbPool>,
    organizer: Organizer,
    task_id_path: web::Path<Uuid>,
    payload: web::Json<AssignTaskPayload>,
) -> Result<HttpResponse, ServiceError> {
    let task_to_assign_id = task_id_path.into_inner();
    let payload = payload.into_inner();

    let task_changes = UpdateTaskChangeset {
        volunteer_id: Some(Some(payload.volunteer_id)),
        volunteer_email: Some(payload.volunteer_email),
        status: Some(TaskStatus::Assigned.as_str().to_string()),
        updated_at: Some(Utc::now()),
        ..Default::default()
    };

    let mut conn = pool.get().await?;
    let updated_task = apply_task_changes(&mut conn, task_to_assign_id, &task_changes).await?;

    log::info!(
        "Organizer {} assigned task {} to volunteer {}",
        organizer.id,
        task_to_assign_id,
        payload.volunteer_id
    );
    Ok(HttpResponse::Ok().json(updated_task))
}

#[put("/{task_id_path}/unassign")]
pub async fn unassign_task_handler(
    pool: web::Data<DbPool>,
    organizer: Organizer,
    task_id_path: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    let task_to_unassign_id = task_id_path.into_inner();

    let task_changes = UpdateTaskChangeset {
        volunteer_id: Some(None),
        volunteer_email: Some(None),
        status: Some(TaskStatus::Unassigned.as_str().to_string()),
        updated_at: Some(Utc::now()),
        ..Default::default()
    };

    let mut conn = pool.get().await?;
    let updated_task = apply_task_changes(&mut conn, task_to_unassign_id, &task_changes).await?;

    log::info!("Organizer {} unassigned task {}", organizer.id, task_to_unassign_id);
    Ok(HttpResponse::Ok().json(updated_task))
}

#[delete("/{task_id_path}")]
pub async fn delete_task_handler(
    pool: web::Data<DbPool>,
    _organizer: Organizer,
    task_id_path: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    let task_to_delete_id = task_id_path.into_inner();

    let mut conn = pool.get().await?;

    let num_deleted = diesel::delete(tasks.filter(task_id.eq(task_to_delete_id)))
        .execute(&mut conn)
        .await
        .map_err(ServiceError::from)?;

    if num_deleted > 0 {
        Ok(HttpResponse::Ok().json(json!({
            "status": "success",
            "message": format!("Task with id {} deleted successfully", task_to_delete_id)
        })))
    } else {
        Err(ServiceError::NotFound(format!(
            "Task with id {} not found",
            task_to_delete_id
        )))
    }
}
