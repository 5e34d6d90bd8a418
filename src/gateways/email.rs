use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::EmailConfig;
use crate::models::EmailRecipient;

const NAME_PLACEHOLDER: &str = "{{name}}";

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("request to email provider failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("email provider responded with {status}: {message}")]
    Rejected { status: u16, message: String },
}

/// Sends a single transactional email.
pub trait EmailGateway: Send + Sync {
    fn send<'a>(&'a self, email: &'a OutgoingEmail) -> BoxFuture<'a, Result<(), EmailError>>;
}

/// Gateway for providers speaking the `{from, to, subject, html}` JSON API
/// with bearer authentication.
#[derive(Debug, Clone)]
pub struct HttpEmailGateway {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

#[derive(Serialize)]
struct ProviderRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    message: String,
}

impl HttpEmailGateway {
    pub fn new(api_url: String, api_key: String, from: String) -> Self {
        HttpEmailGateway {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            from,
        }
    }

    async fn post(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&ProviderRequest {
                from: &self.from,
                to: [email.to.as_str()],
                subject: &email.subject,
                html: &email.html,
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            log::debug!("Mail provider accepted message to {}", email.to);
            return Ok(());
        }
        let message = match response.json::<ProviderError>().await {
            Ok(body) => body.message,
            Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
        };
        Err(EmailError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

impl EmailGateway for HttpEmailGateway {
    fn send<'a>(&'a self, email: &'a OutgoingEmail) -> BoxFuture<'a, Result<(), EmailError>> {
        Box::pin(self.post(email))
    }
}

/// Used when no provider key is configured: messages are logged, not sent.
#[derive(Debug, Clone, Default)]
pub struct LogOnlyEmailGateway;

impl EmailGateway for LogOnlyEmailGateway {
    fn send<'a>(&'a self, email: &'a OutgoingEmail) -> BoxFuture<'a, Result<(), EmailError>> {
        log::info!(
            "Would send e-mail to {} with subject {:?}",
            email.to,
            email.subject
        );
        Box::pin(async { Ok(()) })
    }
}

pub fn gateway_from_config(config: &EmailConfig) -> Arc<dyn EmailGateway> {
    match &config.api_key {
        Some(key) => Arc::new(HttpEmailGateway::new(
            config.api_url.clone(),
            key.clone(),
            config.from.clone(),
        )),
        None => {
            log::warn!("EMAIL_API_KEY is not set, e-mails will only be logged");
            Arc::new(LogOnlyEmailGateway)
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Failed,
    Skipped,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
            DeliveryStatus::Skipped => "skipped",
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct DeliveryOutcome {
    pub volunteer_id: Option<Uuid>,
    pub email: Option<String>,
    pub status: DeliveryStatus,
    pub error: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
pub struct DispatchReport {
    pub success_count: usize,
    pub failure_count: usize,
    pub results: Vec<DeliveryOutcome>,
}

impl DispatchReport {
    fn from_outcomes(results: Vec<DeliveryOutcome>) -> Self {
        let success_count = results
            .iter()
            .filter(|r| r.status == DeliveryStatus::Sent)
            .count();
        DispatchReport {
            success_count,
            failure_count: results.len() - success_count,
            results,
        }
    }
}

fn personalize(html: &str, name: Option<&str>) -> String {
    let name = name.map(str::trim).filter(|n| !n.is_empty()).unwrap_or("Volunteer");
    html.replace(NAME_PLACEHOLDER, name)
}

/// Sends one message per recipient, in order. A failed delivery never aborts
/// the batch; recipients without an address are skipped and counted as failed.
pub async fn send_batch(
    gateway: &dyn EmailGateway,
    recipients: &[EmailRecipient],
    subject: &str,
    html: &str,
) -> DispatchReport {
    let mut results = Vec::with_capacity(recipients.len());

    for recipient in recipients {
        let address = recipient
            .email
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty());

        let Some(address) = address else {
            log::warn!("Skipping volunteer {:?}: no email address", recipient.id);
            results.push(DeliveryOutcome {
                volunteer_id: recipient.id,
                email: None,
                status: DeliveryStatus::Skipped,
                error: Some("missing email address".to_string()),
            });
            continue;
        };

        let email = OutgoingEmail {
            to: address.to_string(),
            subject: subject.to_string(),
            html: personalize(html, recipient.name.as_deref()),
        };

        let result = gateway.send(&email).await;
        let outcome = match result {
            Ok(()) => DeliveryOutcome {
                volunteer_id: recipient.id,
                email: Some(email.to),
                status: DeliveryStatus::Sent,
                error: None,
            },
            Err(err) => {
                log::warn!("Could not send e-mail to {}: {}", email.to, err);
                DeliveryOutcome {
                    volunteer_id: recipient.id,
                    email: Some(email.to),
                    status: DeliveryStatus::Failed,
                    error: Some(err.to_string()),
                }
            }
        };
        results.push(outcome);
    }

    DispatchReport::from_outcomes(results)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every message; addresses listed in `reject` fail.
    #[derive(Default)]
    pub(crate) struct RecordingGateway {
        pub sent: Mutex<Vec<OutgoingEmail>>,
        pub reject: Vec<String>,
    }

    impl EmailGateway for RecordingGateway {
        fn send<'a>(&'a self, email: &'a OutgoingEmail) -> BoxFuture<'a, Result<(), EmailError>> {
            Box::pin(async move {
                if self.reject.contains(&email.to) {
                    return Err(EmailError::Rejected {
                        status: 422,
                        message: "invalid recipient".to_string(),
                    });
                }
                self.sent.lock().unwrap().push(email.clone());
                Ok(())
            })
        }
    }

    fn recipient(email: Option<&str>, name: Option<&str>) -> EmailRecipient {
        EmailRecipient {
            id: Some(Uuid::new_v4()),
            email: email.map(str::to_string),
            name: name.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn counts_successes_and_failures() {
        let gateway = RecordingGateway {
            reject: vec!["bad@example.org".to_string()],
            ..Default::default()
        };
        let recipients = vec![
            recipient(Some("ana@example.org"), Some("Ana")),
            recipient(Some("bad@example.org"), None),
            recipient(Some("  "), Some("Blank")),
            recipient(None, Some("Nobody")),
        ];

        let report = send_batch(&gateway, &recipients, "Reminder", "<p>Hi {{name}}</p>").await;

        assert_eq!(report.success_count, 1);
        assert_eq!(report.failure_count, 3);
        assert_eq!(report.results[1].status, DeliveryStatus::Failed);
        assert_eq!(report.results[2].status, DeliveryStatus::Skipped);
        assert_eq!(report.results[3].status, DeliveryStatus::Skipped);

        let sent = gateway.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].html, "<p>Hi Ana</p>");
    }

    #[test]
    fn personalization_falls_back_to_generic_name() {
        assert_eq!(personalize("Dear {{name}},", None), "Dear Volunteer,");
        assert_eq!(personalize("Dear {{name}},", Some(" Kim ")), "Dear Kim,");
    }

    #[tokio::test]
    async fn log_only_gateway_always_succeeds() {
        let email = OutgoingEmail {
            to: "x@example.org".to_string(),
            subject: "s".to_string(),
            html: "h".to_string(),
        };
        assert!(LogOnlyEmailGateway.send(&email).await.is_ok());
    }
}
