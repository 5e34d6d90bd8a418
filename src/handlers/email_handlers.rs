use crate::auth_utils::Organizer;
use crate::db::DbPool;
use crate::error_handler::ServiceError;
use crate::gateways::email::{send_batch, DeliveryOutcome, DeliveryStatus, EmailGateway};
use crate::handlers::event_handlers::find_event;
use crate::models::{NewEmailLog, SendEmailPayload, UpdateEventChangeset};
use crate::schema::{email_logs, events};
use actix_web::{post, web, HttpResponse};
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

/// One log row per attempted delivery; skipped recipients have no address to log.
fn delivery_logs(event_to_log_id: i64, results: &[DeliveryOutcome]) -> Vec<NewEmailLog> {
    results
        .iter()
        .filter(|r| r.status != DeliveryStatus::Skipped)
        .filter_map(|r| {
            r.email.as_ref().map(|address| NewEmailLog {
                event_id: event_to_log_id,
                volunteer_id: r.volunteer_id,
                email: address.clone(),
                status: r.status.as_str().to_string(),
                error: r.error.clone(),
            })
        })
        .collect()
}

// === POST /emails/send ===
#[post("/send")]
pub async fn send_event_emails_handler(
    pool: web::Data<DbPool>,
    gateway: web::Data<dyn EmailGateway>,
    organizer: Organizer,
    payload: web::Json<SendEmailPayload>,
) -> Result<HttpResponse, ServiceError> {
    let payload = payload.into_inner();
    payload.validate()?;

    let mut conn = pool.get().await?;
    find_event(&mut conn, payload.event_id).await?;

    log::info!(
        "Organizer {} sending {:?} to {} volunteers of event {}",
        organizer.id,
        payload.subject,
        payload.volunteers.len(),
        payload.event_id
    );

    let report = send_batch(
        gateway.get_ref(),
        &payload.volunteers,
        &payload.subject,
        &payload.html,
    )
    .await;

    let logs = delivery_logs(payload.event_id, &report.results);
    if !logs.is_empty() {
        diesel::insert_into(email_logs::table)
            .values(&logs)
            .execute(&mut conn)
            .await
            .map_err(ServiceError::from)?;
    }

    if report.success_count > 0 {
        let changes = UpdateEventChangeset {
            email_sent: Some(true),
            updated_at: Some(Utc::now()),
            ..Default::default()
        };
        diesel::update(events::table.filter(events::id.eq(payload.event_id)))
            .set(&changes)
            .execute(&mut conn)
            .await
            .map_err(ServiceError::from)?;
    }

    log::info!(
        "E-mails for event {}: {} sent, {} failed",
        payload.event_id,
        report.success_count,
        report.failure_count
    );
    Ok(HttpResponse::Ok().json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn skipped_recipients_are_not_logged() {
        let volunteer = Uuid::new_v4();
        let results = vec![
            DeliveryOutcome {
                volunteer_id: Some(volunteer),
                email: Some("a@example.org".to_string()),
                status: DeliveryStatus::Sent,
                error: None,
            },
            DeliveryOutcome {
                volunteer_id: None,
                email: Some("b@example.org".to_string()),
                status: DeliveryStatus::Failed,
                error: Some("rejected".to_string()),
            },
            DeliveryOutcome {
                volunteer_id: None,
                email: None,
                status: DeliveryStatus::Skipped,
                error: Some("missing email address".to_string()),
            },
        ];

        let logs = delivery_logs(4, &results);
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].status, "sent");
        assert_eq!(logs[0].volunteer_id, Some(volunteer));
        assert_eq!(logs[1].status, "failed");
        assert_eq!(logs[1].error.as_deref(), Some("rejected"));
        assert!(logs.iter().all(|l| l.event_id == 4));
    }
}
