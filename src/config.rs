use std::env;
use std::str::FromStr;
use uuid::Uuid;

/// Identity used when the dashboard posts into an event chat.
#[derive(Debug, Clone)]
pub struct OrganizerConfig {
    pub id: Option<Uuid>,
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub bucket: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub frontend_url_prod: String,
    pub frontend_url_dev: String,
    pub email: EmailConfig,
    pub storage: StorageConfig,
    pub organizer: OrganizerConfig,
}

#[derive(Debug, thiserror::Error)]
#[error("Configuration error: {0}")]
pub struct ConfigError(pub String);

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn or_default(key: &str, default: &str) -> String {
    optional(key).unwrap_or_else(|| default.to_string())
}

fn parsed<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match optional(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError(format!("{} has an invalid value: {}", key, raw))),
        None => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = optional("DATABASE_URL").ok_or_else(|| {
            ConfigError("DATABASE_URL must be set in environment variables or .env file".into())
        })?;

        let organizer_id = match optional("ORGANIZER_ID") {
            Some(raw) => Some(
                Uuid::parse_str(&raw)
                    .map_err(|_| ConfigError(format!("ORGANIZER_ID is not a UUID: {}", raw)))?,
            ),
            None => None,
        };

        Ok(AppConfig {
            database_url,
            host: or_default("HOST", "0.0.0.0"),
            port: parsed("PORT", 8080u16)?,
            frontend_url_prod: or_default("FRONTEND_URL_PROD", "https://volunteer-hub.vercel.app"),
            frontend_url_dev: or_default("FRONTEND_URL_DEV", "http://localhost:3000"),
            email: EmailConfig {
                api_url: or_default("EMAIL_API_URL", "https://api.resend.com/emails"),
                api_key: optional("EMAIL_API_KEY"),
                from: or_default("EMAIL_FROM", "Volunteer Hub <noreply@volunteerhub.org>"),
            },
            storage: StorageConfig {
                base_url: optional("STORAGE_URL"),
                api_key: optional("STORAGE_API_KEY"),
                bucket: or_default("STORAGE_BUCKET", "event-images"),
            },
            organizer: OrganizerConfig {
                id: organizer_id,
                name: or_default("ORGANIZER_NAME", "Event Organizer"),
                email: optional("ORGANIZER_EMAIL"),
            },
        })
    }
}
