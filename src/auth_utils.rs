use actix_web::http::header::HeaderValue;
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures_util::future::{err, ok, Ready};
use serde::Serialize;
use uuid::Uuid;

use crate::config::OrganizerConfig;
use crate::error_handler::ServiceError;

pub const ORGANIZER_HEADER: &str = "X-Organizer-Id";

/// The dashboard operator making the request.
///
/// Taken from the `X-Organizer-Id` header, or from the configured organizer
/// when the header is absent. Name and e-mail always come from configuration.
#[derive(Debug, Clone, Serialize)]
pub struct Organizer {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
}

fn resolve(
    header: Option<&HeaderValue>,
    config: Option<&OrganizerConfig>,
) -> Result<Organizer, ServiceError> {
    let name = config
        .map(|c| c.name.clone())
        .unwrap_or_else(|| "Event Organizer".to_string());
    let email = config.and_then(|c| c.email.clone());

    let id = match header {
        Some(value) => {
            let raw = value.to_str().map_err(|_| {
                log::warn!("{} header is not valid UTF-8.", ORGANIZER_HEADER);
                ServiceError::BadRequest(
                    "X-Organizer-Id header contains invalid characters.".into(),
                )
            })?;
            if raw.trim().is_empty() {
                log::warn!("{} header is present but empty.", ORGANIZER_HEADER);
                return Err(ServiceError::BadRequest(
                    "X-Organizer-Id header cannot be empty.".into(),
                ));
            }
            Uuid::parse_str(raw.trim()).map_err(|parse_err| {
                log::warn!("Failed to parse {} '{}': {}", ORGANIZER_HEADER, raw, parse_err);
                ServiceError::BadRequest(
                    "Invalid X-Organizer-Id header format (not a valid UUID).".into(),
                )
            })?
        }
        None => match config.and_then(|c| c.id) {
            Some(id) => id,
            None => {
                log::warn!("No {} header and no ORGANIZER_ID configured.", ORGANIZER_HEADER);
                return Err(ServiceError::Unauthorized(
                    "Missing X-Organizer-Id header. Authentication required.".into(),
                ));
            }
        },
    };

    Ok(Organizer { id, name, email })
}

impl FromRequest for Organizer {
    type Error = ServiceError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let config = req.app_data::<web::Data<OrganizerConfig>>();
        match resolve(
            req.headers().get(ORGANIZER_HEADER),
            config.map(|c| c.get_ref()),
        ) {
            Ok(organizer) => {
                log::debug!("Request made by organizer {}", organizer.id);
                ok(organizer)
            }
            Err(e) => err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::ResponseError;

    fn config(id: Option<Uuid>) -> OrganizerConfig {
        OrganizerConfig {
            id,
            name: "Dana".to_string(),
            email: Some("dana@example.org".to_string()),
        }
    }

    #[test]
    fn header_takes_precedence_over_config() {
        let from_header = Uuid::new_v4();
        let value = HeaderValue::from_str(&from_header.to_string()).unwrap();
        let organizer = resolve(Some(&value), Some(&config(Some(Uuid::new_v4())))).unwrap();
        assert_eq!(organizer.id, from_header);
        assert_eq!(organizer.name, "Dana");
    }

    #[test]
    fn configured_organizer_is_the_default() {
        let configured = Uuid::new_v4();
        let organizer = resolve(None, Some(&config(Some(configured)))).unwrap();
        assert_eq!(organizer.id, configured);
    }

    #[test]
    fn missing_identity_is_unauthorized() {
        let error = resolve(None, Some(&config(None))).unwrap_err();
        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn malformed_header_is_bad_request() {
        let value = HeaderValue::from_static("not-a-uuid");
        let error = resolve(Some(&value), None).unwrap_err();
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn extractor_reads_header_and_app_config() {
        let from_header = Uuid::new_v4();
        let req = actix_web::test::TestRequest::default()
            .insert_header((ORGANIZER_HEADER, from_header.to_string()))
            .app_data(web::Data::new(config(None)))
            .to_http_request();

        let organizer = Organizer::extract(&req).await.unwrap();
        assert_eq!(organizer.id, from_header);
        assert_eq!(organizer.email.as_deref(), Some("dana@example.org"));
    }
}
