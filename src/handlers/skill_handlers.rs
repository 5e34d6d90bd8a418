use crate::auth_utils::Organizer;
use crate::db::DbPool;
use crate::error_handler::ServiceError;
use crate::models::{NewSkill, Skill};
use crate::schema::skills::{self, dsl::*};
use crate::schema::volunteer_skills;
use actix_web::{delete, get, post, web, HttpResponse};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde_json::json;

#[get("")]
pub async fn list_skills_handler(
    pool: web::Data<DbPool>,
    _organizer: Organizer,
) -> Result<HttpResponse, ServiceError> {
    let mut conn = pool.get().await?;

    let skill_list = skills
        .order(skill.asc())
        .select(Skill::as_select())
        .load::<Skill>(&mut conn)
        .await
        .map_err(ServiceError::from)?;

    Ok(HttpResponse::Ok().json(skill_list))
}

#[post("")]
pub async fn create_skill_handler(
    pool: web::Data<DbPool>,
    organizer: Organizer,
    payload: web::Json<NewSkill>,
) -> Result<HttpResponse, ServiceError> {
    let mut new_skill = payload.into_inner();
    new_skill.skill = new_skill.skill.trim().to_string();
    if new_skill.skill.is_empty() {
        return Err(ServiceError::BadRequest("skill cannot be empty".to_string()));
    }

    let mut conn = pool.get().await?;

    let created = diesel::insert_into(skills::table)
        .values(&new_skill)
        .get_result::<Skill>(&mut conn)
        .await
        .map_err(ServiceError::from)?;

    log::info!("Organizer {} added skill {:?}", organizer.id, created.skill);
    Ok(HttpResponse::Created().json(created))
}

#[delete("/{skill_id_path}")]
pub async fn delete_skill_handler(
    pool: web::Data<DbPool>,
    _organizer: Organizer,
    skill_id_path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let skill_to_delete_id = skill_id_path.into_inner();

    let mut conn = pool.get().await?;

    let num_deleted = conn
        .transaction::<_, ServiceError, _>(|conn| {
            async move {
                diesel::delete(
                    volunteer_skills::table
                        .filter(volunteer_skills::skill_id.eq(skill_to_delete_id)),
                )
                .execute(conn)
                .await?;

                let removed = diesel::delete(skills.filter(skill_id.eq(skill_to_delete_id)))
                    .execute(conn)
                    .await?;
                Ok(removed)
            }
            .scope_boxed()
        })
        .await?;

    if num_deleted > 0 {
        Ok(HttpResponse::Ok().json(json!({
            "status": "success",
            "message": format!("Skill with id {} deleted successfully", skill_to_delete_id)
        })))
    } else {
        Err(ServiceError::NotFound(format!(
            "Skill with id {} not found",
            skill_to_delete_id
        )))
    }
}
