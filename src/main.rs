mod auth_utils;
mod chat_feed;
mod config;
mod db;
mod error_handler;
mod gateways;
mod handlers;
mod insights;
mod models;
pub mod schema;

use actix_cors::Cors;
use actix_web::{
    http::header::{self, HeaderName},
    middleware::Logger,
    web, App, HttpResponse, HttpServer,
};
use chat_feed::ChatFeed;
use config::AppConfig;
use db::DbPool;
use gateways::{email::gateway_from_config, storage::ObjectStorage};
use std::io;

// Event images are uploaded as raw request bodies.
const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

async fn health_check_handler(
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, error_handler::ServiceError> {
    match pool.get().await {
        Ok(_conn) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "status": "healthy",
            "message": "Backend is running and DB pool accessible"
        }))),
        Err(e) => {
            log::error!("Failed to get connection from pool: {:?}", e);
            Err(error_handler::ServiceError::InternalServerError(
                "Failed to check DB pool".to_string(),
            ))
        }
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    if cfg!(debug_assertions) {
        match dotenvy::dotenv() {
            Ok(path) => log::info!(".env file loaded from path: {}", path.display()),
            Err(e) => log::warn!(
                "Could not load .env file: {}, using environment variables.",
                e
            ),
        }
    }

    let app_config = AppConfig::from_env().map_err(|e| {
        log::error!("{}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;

    let pool = db::create_pool(&app_config.database_url)
        .await
        .map_err(|e| {
            log::error!("Failed to create database connection pool: {}", e);
            io::Error::other(e.to_string())
        })?;

    log::info!("🚀 Volunteer Hub Backend Service starting...");

    let email_gateway = web::Data::from(gateway_from_config(&app_config.email));
    let storage = web::Data::new(ObjectStorage::from_config(&app_config.storage));
    let organizer_config = web::Data::new(app_config.organizer.clone());
    let chat_feed = web::Data::new(ChatFeed::new());

    let frontend_url_prod = app_config.frontend_url_prod.clone();
    let frontend_url_dev = app_config.frontend_url_dev.clone();
    let bind_address = format!("{}:{}", app_config.host, app_config.port);

    log::info!("Server will start at http://{}", bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_url_prod)
            .allowed_origin(&frontend_url_dev)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                header::AUTHORIZATION,
                header::ACCEPT,
                header::CONTENT_TYPE,
                HeaderName::from_static("x-organizer-id"),
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(web::Data::new(pool.clone()))
            .app_data(email_gateway.clone())
            .app_data(storage.clone())
            .app_data(organizer_config.clone())
            .app_data(chat_feed.clone())
            .app_data(web::PayloadConfig::new(MAX_UPLOAD_BYTES))
            .service(web::resource("/health").route(web::get().to(health_check_handler)))
            .service(
                web::scope("/events")
                    .service(handlers::event_handlers::create_event_handler)
                    .service(handlers::event_handlers::list_events_handler)
                    .service(handlers::event_handlers::get_event_handler)
                    .service(handlers::event_handlers::update_event_handler)
                    .service(handlers::event_handlers::publish_event_handler)
                    .service(handlers::event_handlers::archive_event_handler)
                    .service(handlers::event_handlers::delete_event_handler)
                    .service(handlers::event_handlers::upload_event_image_handler)
                    .service(handlers::registration_handlers::list_event_registrations_handler)
                    .service(handlers::registration_handlers::create_registration_handler)
                    .service(handlers::chat_handlers::list_chat_messages_handler)
                    .service(handlers::chat_handlers::post_chat_message_handler)
                    .service(handlers::chat_handlers::chat_ws_handler),
            )
            .service(
                web::scope("/tasks")
                    .service(handlers::task_handlers::create_task_handler)
                    .service(handlers::task_handlers::list_tasks_handler)
                    .service(handlers::task_handlers::get_task_handler)
                    .service(handlers::task_handlers::update_task_handler)
                    .service(handlers::task_handlers::assign_task_handler)
                    .service(handlers::task_handlers::unassign_task_handler)
                    .service(handlers::task_handlers::delete_task_handler),
            )
            .service(
                web::scope("/volunteers")
                    .service(handlers::volunteer_handlers::list_volunteers_handler)
                    .service(handlers::volunteer_handlers::get_volunteer_handler)
                    .service(handlers::volunteer_handlers::list_volunteer_events_handler),
            )
            .service(
                web::scope("/registrations")
                    .service(handlers::registration_handlers::update_registration_handler)
                    .service(handlers::registration_handlers::delete_registration_handler),
            )
            .service(
                web::scope("/skills")
                    .service(handlers::skill_handlers::list_skills_handler)
                    .service(handlers::skill_handlers::create_skill_handler)
                    .service(handlers::skill_handlers::delete_skill_handler),
            )
            .service(
                web::scope("/emails")
                    .service(handlers::email_handlers::send_event_emails_handler),
            )
            .service(
                web::scope("/insights")
                    .service(handlers::insights_handlers::get_overview_handler)
                    .service(handlers::insights_handlers::get_events_by_category_handler)
                    .service(handlers::insights_handlers::get_tasks_by_month_handler)
                    .service(handlers::insights_handlers::get_registrations_by_month_handler)
                    .service(handlers::insights_handlers::get_task_status_handler)
                    .service(handlers::insights_handlers::get_skill_distribution_handler)
                    .service(handlers::insights_handlers::get_fill_rates_handler)
                    .service(handlers::insights_handlers::get_satisfaction_handler)
                    .service(handlers::insights_handlers::get_engagement_handler)
                    .service(handlers::insights_handlers::get_top_volunteers_handler),
            )
    })
    .bind(bind_address)?
    .run()
    .await
}
