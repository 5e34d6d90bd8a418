use crate::auth_utils::Organizer;
use crate::chat_feed::ChatFeed;
use crate::db::DbPool;
use crate::error_handler::ServiceError;
use crate::handlers::event_handlers::find_event;
use crate::models::{ChatMessage, CreateChatMessagePayload, NewChatMessage};
use crate::schema::chat_messages::{self, dsl::*};
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use actix_ws::{Message, ProtocolError};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

const MAX_MESSAGE_CHARS: usize = 2000;
const HISTORY_LIMIT: i64 = 200;

/// Messages posted from the dashboard are sent as the organizer unless the
/// payload names a volunteer.
fn build_message(
    event_to_post_id: i64,
    payload: CreateChatMessagePayload,
    organizer: &Organizer,
) -> Result<NewChatMessage, ServiceError> {
    let text = payload.message.trim();
    if text.is_empty() {
        return Err(ServiceError::BadRequest("message cannot be empty".to_string()));
    }
    if text.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ServiceError::BadRequest(format!(
            "message cannot exceed {} characters",
            MAX_MESSAGE_CHARS
        )));
    }

    let named_volunteer = payload
        .volunteer_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    let message_row = match named_volunteer {
        Some(name) => NewChatMessage {
            event_id: event_to_post_id,
            volunteer_id: payload.volunteer_id,
            volunteer_name: name,
            volunteer_email: payload.volunteer_email,
            message: text.to_string(),
        },
        None => NewChatMessage {
            event_id: event_to_post_id,
            volunteer_id: Some(organizer.id),
            volunteer_name: organizer.name.clone(),
            volunteer_email: organizer.email.clone(),
            message: text.to_string(),
        },
    };
    Ok(message_row)
}

#[get("/{event_id_path}/chat")]
pub async fn list_chat_messages_handler(
    pool: web::Data<DbPool>,
    _organizer: Organizer,
    event_id_path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let event_to_read_id = event_id_path.into_inner();

    let mut conn = pool.get().await?;

    // Latest messages, returned oldest first.
    let mut history = chat_messages
        .filter(event_id.eq(event_to_read_id))
        .order(created_at.desc())
        .limit(HISTORY_LIMIT)
        .select(ChatMessage::as_select())
        .load::<ChatMessage>(&mut conn)
        .await
        .map_err(ServiceError::from)?;
    history.reverse();

    Ok(HttpResponse::Ok().json(history))
}

#[post("/{event_id_path}/chat")]
pub async fn post_chat_message_handler(
    pool: web::Data<DbPool>,
    feed: web::Data<ChatFeed>,
    organizer: Organizer,
    event_id_path: web::Path<i64>,
    payload: web::Json<CreateChatMessagePayload>,
) -> Result<HttpResponse, ServiceError> {
    let event_to_post_id = event_id_path.into_inner();
    let new_message = build_message(event_to_post_id, payload.into_inner(), &organizer)?;

    let mut conn = pool.get().await?;
    find_event(&mut conn, event_to_post_id).await?;

    let stored = diesel::insert_into(chat_messages::table)
        .values(&new_message)
        .get_result::<ChatMessage>(&mut conn)
        .await
        .map_err(ServiceError::from)?;

    let delivered = feed.publish(&stored);
    log::debug!(
        "Chat message {} for event {} pushed to {} subscribers",
        stored.id,
        event_to_post_id,
        delivered
    );

    Ok(HttpResponse::Created().json(stored))
}

#[derive(Debug, PartialEq)]
enum ClientFrame {
    Pong(web::Bytes),
    Ignore,
    Close,
}

/// An ended stream or a protocol error closes the socket like a Close frame.
fn classify_frame(frame: Option<Result<Message, ProtocolError>>) -> ClientFrame {
    match frame {
        Some(Ok(Message::Ping(bytes))) => ClientFrame::Pong(bytes),
        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => ClientFrame::Close,
        Some(Ok(_)) => ClientFrame::Ignore,
    }
}

/// Live feed of new messages for one event. Messages are posted over HTTP;
/// text frames from the client are ignored.
#[get("/{event_id_path}/chat/ws")]
pub async fn chat_ws_handler(
    req: HttpRequest,
    body: web::Payload,
    _organizer: Organizer,
    feed: web::Data<ChatFeed>,
    event_id_path: web::Path<i64>,
) -> Result<HttpResponse, actix_web::Error> {
    let event_to_watch_id = event_id_path.into_inner();
    let (response, mut ws_session, mut msg_stream) = actix_ws::handle(&req, body)?;

    let mut rx = feed.subscribe(event_to_watch_id);
    log::info!(
        "Chat feed for event {} now has {} subscribers",
        event_to_watch_id,
        feed.subscriber_count(event_to_watch_id)
    );
    let feed = feed.into_inner();

    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                Some(msg) = rx.recv() => {
                    if ws_session.text(msg).await.is_err() {
                        break;
                    }
                }
                frame = msg_stream.recv() => {
                    match classify_frame(frame) {
                        ClientFrame::Pong(bytes) => {
                            if ws_session.pong(&bytes).await.is_err() {
                                break;
                            }
                        }
                        ClientFrame::Ignore => {}
                        ClientFrame::Close => break,
                    }
                }
                else => break,
            }
        }

        drop(rx);
        feed.prune(event_to_watch_id);
        log::debug!("Chat subscriber for event {} disconnected", event_to_watch_id);
    });

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn organizer() -> Organizer {
        Organizer {
            id: Uuid::new_v4(),
            name: "Dana".to_string(),
            email: Some("dana@example.org".to_string()),
        }
    }

    fn payload(text: &str, name: Option<&str>) -> CreateChatMessagePayload {
        CreateChatMessagePayload {
            message: text.to_string(),
            volunteer_id: None,
            volunteer_name: name.map(str::to_string),
            volunteer_email: None,
        }
    }

    #[test]
    fn dashboard_messages_are_sent_as_the_organizer() {
        let organizer = organizer();
        let row = build_message(3, payload("  Doors open at 9  ", None), &organizer).unwrap();
        assert_eq!(row.volunteer_id, Some(organizer.id));
        assert_eq!(row.volunteer_name, "Dana");
        assert_eq!(row.message, "Doors open at 9");
    }

    #[test]
    fn named_volunteer_is_kept() {
        let row = build_message(3, payload("On my way", Some("Lee")), &organizer()).unwrap();
        assert_eq!(row.volunteer_name, "Lee");
        assert_eq!(row.volunteer_id, None);
    }

    #[test]
    fn blank_or_oversized_messages_are_rejected() {
        assert!(build_message(3, payload("   ", None), &organizer()).is_err());
        let long = "x".repeat(MAX_MESSAGE_CHARS + 1);
        assert!(build_message(3, payload(&long, None), &organizer()).is_err());
    }

    #[test]
    fn dropped_or_broken_streams_close_the_socket() {
        assert_eq!(classify_frame(None), ClientFrame::Close);
        assert_eq!(classify_frame(Some(Err(ProtocolError::Overflow))), ClientFrame::Close);
        assert_eq!(classify_frame(Some(Ok(Message::Close(None)))), ClientFrame::Close);
    }

    #[test]
    fn pings_are_answered_and_text_is_ignored() {
        let ping = web::Bytes::from_static(b"hb");
        assert_eq!(
            classify_frame(Some(Ok(Message::Ping(ping.clone())))),
            ClientFrame::Pong(ping)
        );
        assert_eq!(
            classify_frame(Some(Ok(Message::Text("hello".into())))),
            ClientFrame::Ignore
        );
    }
}
