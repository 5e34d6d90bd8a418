use crate::error_handler::ServiceError;
use crate::schema::{
    chat_messages, email_logs, events, skills, tasks, volunteer_event, volunteer_skills,
    volunteers,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

// Distinguishes an absent JSON field (None) from an explicit null (Some(None)).
fn deserialize_opt_opt<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// --- Enumerations stored as text ---

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Education,
    Environment,
    Health,
    Community,
    Animals,
    Arts,
    Sports,
    Other,
}

impl EventCategory {
    pub const ALL: [EventCategory; 8] = [
        EventCategory::Education,
        EventCategory::Environment,
        EventCategory::Health,
        EventCategory::Community,
        EventCategory::Animals,
        EventCategory::Arts,
        EventCategory::Sports,
        EventCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Education => "education",
            EventCategory::Environment => "environment",
            EventCategory::Health => "health",
            EventCategory::Community => "community",
            EventCategory::Animals => "animals",
            EventCategory::Arts => "arts",
            EventCategory::Sports => "sports",
            EventCategory::Other => "other",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(raw))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    Virtual,
    Physical,
}

impl LocationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationType::Virtual => "virtual",
            LocationType::Physical => "physical",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "virtual" => Some(LocationType::Virtual),
            "physical" => Some(LocationType::Physical),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Draft,
    Published,
    Archived,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "draft",
            EventStatus::Published => "published",
            EventStatus::Archived => "archived",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(EventStatus::Draft),
            "published" => Some(EventStatus::Published),
            "archived" => Some(EventStatus::Archived),
            _ => None,
        }
    }
}

/// Canonical task status.
///
/// Task rows are written with two different vocabularies
/// (`unassigned/assigned/inprogress/complete` and `unassigned/to do/doing/done`).
/// Both are stored verbatim and only folded together here for reporting.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Unassigned,
    Assigned,
    InProgress,
    Complete,
    Unknown,
}

impl TaskStatus {
    pub fn parse(raw: &str) -> TaskStatus {
        match raw.trim().to_ascii_lowercase().as_str() {
            "unassigned" => TaskStatus::Unassigned,
            "assigned" | "to do" | "todo" | "to-do" => TaskStatus::Assigned,
            "inprogress" | "in progress" | "in_progress" | "doing" => TaskStatus::InProgress,
            "complete" | "completed" | "done" => TaskStatus::Complete,
            _ => TaskStatus::Unknown,
        }
    }

    /// Every stored spelling that folds into this status.
    pub fn spellings(&self) -> &'static [&'static str] {
        match self {
            TaskStatus::Unassigned => &["unassigned"],
            TaskStatus::Assigned => &["assigned", "to do", "todo", "to-do"],
            TaskStatus::InProgress => &["inprogress", "in progress", "in_progress", "doing"],
            TaskStatus::Complete => &["complete", "completed", "done"],
            TaskStatus::Unknown => &[],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Unassigned => "unassigned",
            TaskStatus::Assigned => "assigned",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Complete => "complete",
            TaskStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const REGISTRATION_REGISTERED: &str = "registered";
pub const REGISTRATION_NOT_REGISTERED: &str = "not registered";

// --- Event Model ---
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub location_type: String,
    pub category: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub max_volunteers: i32,
    pub status: String,
    pub email_sent: bool,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = events)]
pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub location_type: String,
    pub category: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub max_volunteers: i32,
    pub status: String,
}

#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = events)]
pub struct UpdateEventChangeset {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub location: Option<Option<String>>,
    pub location_type: Option<String>,
    pub category: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub registration_deadline: Option<Option<DateTime<Utc>>>,
    pub max_volunteers: Option<i32>,
    pub status: Option<String>,
    pub email_sent: Option<bool>,
    pub image_url: Option<Option<String>>,
    pub updated_at: Option<DateTime<Utc>>,
}

// --- Task Model ---
#[derive(
    Queryable,
    Selectable,
    Identifiable,
    Associations,
    Serialize,
    Deserialize,
    Debug,
    Clone,
    PartialEq,
)]
#[diesel(table_name = tasks)]
#[diesel(primary_key(task_id))]
#[diesel(belongs_to(Event, foreign_key = event_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Task {
    pub task_id: Uuid,
    pub event_id: i64,
    pub volunteer_id: Option<Uuid>,
    pub volunteer_email: Option<String>,
    pub description: String,
    pub status: String,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn canonical_status(&self) -> TaskStatus {
        TaskStatus::parse(&self.status)
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = tasks)]
pub struct NewTask {
    pub event_id: i64,
    pub volunteer_id: Option<Uuid>,
    pub volunteer_email: Option<String>,
    pub description: String,
    pub status: String,
}

#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = tasks)]
pub struct UpdateTaskChangeset {
    pub volunteer_id: Option<Option<Uuid>>,
    pub volunteer_email: Option<Option<String>>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub feedback: Option<Option<String>>,
    pub updated_at: Option<DateTime<Utc>>,
}

// --- Volunteer Model ---
// Rows from `volunteers_non_auth` share this shape and are loaded positionally.
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = volunteers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Volunteer {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub availability: Option<String>,
    pub onboarding_step: i32,
    pub onboarding_completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone)]
pub struct VolunteerApiResponse {
    #[serde(flatten)]
    pub volunteer: Volunteer,
    pub skills: Vec<Skill>,
}

/// Which of the two volunteer tables a request reads from.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VolunteerSource {
    #[default]
    Auth,
    NonAuth,
}

// --- Registration (volunteer_event) Model ---
#[derive(
    Queryable,
    Selectable,
    Identifiable,
    Associations,
    Serialize,
    Deserialize,
    Debug,
    Clone,
    PartialEq,
)]
#[diesel(table_name = volunteer_event)]
#[diesel(belongs_to(Event, foreign_key = event_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Registration {
    pub id: i64,
    pub volunteer_id: Uuid,
    pub event_id: i64,
    pub status: String,
    pub feedback: Option<String>,
    pub star_rating: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl Registration {
    pub fn is_registered(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case(REGISTRATION_REGISTERED)
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = volunteer_event)]
pub struct NewRegistration {
    pub volunteer_id: Uuid,
    pub event_id: i64,
    pub status: String,
}

#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = volunteer_event)]
pub struct UpdateRegistrationChangeset {
    pub status: Option<String>,
    pub feedback: Option<Option<String>>,
    pub star_rating: Option<Option<i32>>,
}

// --- Skill Model ---
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = skills)]
#[diesel(primary_key(skill_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Skill {
    pub skill_id: i64,
    pub skill: String,
    pub icon: Option<String>,
}

#[derive(Insertable, Deserialize, Debug)]
#[diesel(table_name = skills)]
pub struct NewSkill {
    pub skill: String,
    pub icon: Option<String>,
}

#[derive(Queryable, Selectable, Serialize, Debug, Clone, PartialEq)]
#[diesel(table_name = volunteer_skills)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct VolunteerSkill {
    pub volunteer_id: Uuid,
    pub skill_id: i64,
}

// --- Chat Model ---
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = chat_messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ChatMessage {
    pub id: Uuid,
    pub event_id: i64,
    pub volunteer_id: Option<Uuid>,
    pub volunteer_name: String,
    pub volunteer_email: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = chat_messages)]
pub struct NewChatMessage {
    pub event_id: i64,
    pub volunteer_id: Option<Uuid>,
    pub volunteer_name: String,
    pub volunteer_email: Option<String>,
    pub message: String,
}

// --- Email delivery log ---
#[derive(Insertable, Debug)]
#[diesel(table_name = email_logs)]
pub struct NewEmailLog {
    pub event_id: i64,
    pub volunteer_id: Option<Uuid>,
    pub email: String,
    pub status: String,
    pub error: Option<String>,
}

// --- PAYLOAD DTOs ---

#[derive(Deserialize, Debug)]
pub struct CreateEventPayload {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub location_type: String,
    pub category: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub max_volunteers: i32,
    pub status: Option<String>,
}

impl CreateEventPayload {
    pub fn validate(&self) -> Result<(), ServiceError> {
        require_text("title", &self.title)?;
        parse_location_type(&self.location_type)?;
        parse_category(&self.category)?;
        if let Some(status) = &self.status {
            parse_event_status(status)?;
        }
        validate_event_schedule(
            self.start_date,
            self.end_date,
            self.registration_deadline,
            self.max_volunteers,
        )
    }

    pub fn into_new_event(self) -> NewEvent {
        NewEvent {
            title: self.title.trim().to_string(),
            description: self.description,
            location: self.location,
            location_type: canonical_location_type(&self.location_type),
            category: self.category.trim().to_ascii_lowercase(),
            start_date: self.start_date,
            end_date: self.end_date,
            registration_deadline: self.registration_deadline,
            max_volunteers: self.max_volunteers,
            status: self
                .status
                .map(|s| s.trim().to_ascii_lowercase())
                .unwrap_or_else(|| EventStatus::Draft.as_str().to_string()),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct UpdateEventPayload {
    pub title: Option<String>,
    #[serde(deserialize_with = "deserialize_opt_opt", default)]
    pub description: Option<Option<String>>,
    #[serde(deserialize_with = "deserialize_opt_opt", default)]
    pub location: Option<Option<String>>,
    pub location_type: Option<String>,
    pub category: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "deserialize_opt_opt", default)]
    pub registration_deadline: Option<Option<DateTime<Utc>>>,
    pub max_volunteers: Option<i32>,
    pub status: Option<String>,
}

impl UpdateEventPayload {
    /// Validates the payload merged over the stored event.
    pub fn validate_against(&self, current: &Event) -> Result<(), ServiceError> {
        if let Some(title) = &self.title {
            require_text("title", title)?;
        }
        if let Some(location_type) = &self.location_type {
            parse_location_type(location_type)?;
        }
        if let Some(category) = &self.category {
            parse_category(category)?;
        }
        if let Some(status) = &self.status {
            parse_event_status(status)?;
        }
        validate_event_schedule(
            self.start_date.unwrap_or(current.start_date),
            self.end_date.unwrap_or(current.end_date),
            self.registration_deadline
                .unwrap_or(current.registration_deadline),
            self.max_volunteers.unwrap_or(current.max_volunteers),
        )
    }

    pub fn into_changeset(self) -> UpdateEventChangeset {
        UpdateEventChangeset {
            title: self.title.map(|t| t.trim().to_string()),
            description: self.description,
            location: self.location,
            location_type: self.location_type.as_deref().map(canonical_location_type),
            category: self.category.map(|s| s.trim().to_ascii_lowercase()),
            start_date: self.start_date,
            end_date: self.end_date,
            registration_deadline: self.registration_deadline,
            max_volunteers: self.max_volunteers,
            status: self.status.map(|s| s.trim().to_ascii_lowercase()),
            updated_at: Some(Utc::now()),
            ..Default::default()
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct CreateTaskPayload {
    pub event_id: i64,
    pub description: String,
    pub volunteer_id: Option<Uuid>,
    pub volunteer_email: Option<String>,
    pub status: Option<String>,
}

impl CreateTaskPayload {
    pub fn validate(&self) -> Result<(), ServiceError> {
        require_text("description", &self.description)?;
        if let Some(status) = &self.status {
            parse_task_status(status)?;
        }
        Ok(())
    }

    pub fn into_new_task(self) -> NewTask {
        // A task created for a volunteer starts out assigned.
        let default_status = match self.volunteer_id {
            Some(_) => TaskStatus::Assigned,
            None => TaskStatus::Unassigned,
        };
        NewTask {
            event_id: self.event_id,
            volunteer_id: self.volunteer_id,
            volunteer_email: self.volunteer_email,
            description: self.description.trim().to_string(),
            status: self
                .status
                .unwrap_or_else(|| default_status.as_str().to_string()),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct UpdateTaskPayload {
    pub description: Option<String>,
    pub status: Option<String>,
    #[serde(deserialize_with = "deserialize_opt_opt", default)]
    pub feedback: Option<Option<String>>,
}

impl UpdateTaskPayload {
    pub fn validate(&self) -> Result<(), ServiceError> {
        if let Some(description) = &self.description {
            require_text("description", description)?;
        }
        if let Some(status) = &self.status {
            parse_task_status(status)?;
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug)]
pub struct AssignTaskPayload {
    pub volunteer_id: Uuid,
    pub volunteer_email: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct CreateRegistrationPayload {
    pub volunteer_id: Uuid,
}

#[derive(Deserialize, Debug, Default)]
pub struct UpdateRegistrationPayload {
    pub status: Option<String>,
    #[serde(deserialize_with = "deserialize_opt_opt", default)]
    pub feedback: Option<Option<String>>,
    #[serde(deserialize_with = "deserialize_opt_opt", default)]
    pub star_rating: Option<Option<i32>>,
}

impl UpdateRegistrationPayload {
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.status.is_none() && self.feedback.is_none() && self.star_rating.is_none() {
            return Err(ServiceError::BadRequest(
                "Nothing to update: provide status, feedback or star_rating".to_string(),
            ));
        }
        if let Some(status) = &self.status {
            let normalized = status.trim().to_ascii_lowercase();
            if normalized != REGISTRATION_REGISTERED && normalized != REGISTRATION_NOT_REGISTERED
            {
                return Err(ServiceError::BadRequest(format!(
                    "Invalid registration status: {}. Supported: registered, not registered",
                    status
                )));
            }
        }
        if let Some(Some(rating)) = self.star_rating {
            if !(1..=5).contains(&rating) {
                return Err(ServiceError::BadRequest(
                    "star_rating must be between 1 and 5".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// True when the update moves the registration to "registered".
    pub fn sets_registered(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.trim().eq_ignore_ascii_case(REGISTRATION_REGISTERED))
    }

    pub fn into_changeset(self) -> UpdateRegistrationChangeset {
        UpdateRegistrationChangeset {
            status: self.status.map(|s| s.trim().to_ascii_lowercase()),
            feedback: self.feedback,
            star_rating: self.star_rating,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct CreateChatMessagePayload {
    pub message: String,
    pub volunteer_id: Option<Uuid>,
    pub volunteer_name: Option<String>,
    pub volunteer_email: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct EmailRecipient {
    pub id: Option<Uuid>,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct SendEmailPayload {
    pub volunteers: Vec<EmailRecipient>,
    pub subject: String,
    pub html: String,
    pub event_id: i64,
}

impl SendEmailPayload {
    pub fn validate(&self) -> Result<(), ServiceError> {
        require_text("subject", &self.subject)?;
        require_text("html", &self.html)?;
        if self.volunteers.is_empty() {
            return Err(ServiceError::BadRequest(
                "volunteers cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// --- Validation helpers ---

fn require_text(field: &str, value: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::BadRequest(format!("{} cannot be empty", field)));
    }
    Ok(())
}

fn parse_category(raw: &str) -> Result<EventCategory, ServiceError> {
    EventCategory::parse(raw)
        .ok_or_else(|| ServiceError::BadRequest(format!("Invalid event category: {}", raw)))
}

fn canonical_location_type(raw: &str) -> String {
    LocationType::parse(raw).map_or_else(
        || raw.trim().to_ascii_lowercase(),
        |location_type| location_type.as_str().to_string(),
    )
}

fn parse_location_type(raw: &str) -> Result<LocationType, ServiceError> {
    LocationType::parse(raw).ok_or_else(|| {
        ServiceError::BadRequest(format!(
            "Invalid location_type: {}. Supported: virtual, physical",
            raw
        ))
    })
}

pub fn parse_event_status(raw: &str) -> Result<EventStatus, ServiceError> {
    EventStatus::parse(raw).ok_or_else(|| {
        ServiceError::BadRequest(format!(
            "Invalid event status: {}. Supported: draft, published, archived",
            raw
        ))
    })
}

pub fn parse_task_status(raw: &str) -> Result<TaskStatus, ServiceError> {
    match TaskStatus::parse(raw) {
        TaskStatus::Unknown => Err(ServiceError::BadRequest(format!(
            "Invalid task status: {}",
            raw
        ))),
        known => Ok(known),
    }
}

fn validate_event_schedule(
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    registration_deadline: Option<DateTime<Utc>>,
    max_volunteers: i32,
) -> Result<(), ServiceError> {
    if start_date > end_date {
        return Err(ServiceError::BadRequest(
            "start_date cannot be after end_date".to_string(),
        ));
    }
    if let Some(deadline) = registration_deadline {
        if deadline > start_date {
            return Err(ServiceError::BadRequest(
                "registration_deadline cannot be after start_date".to_string(),
            ));
        }
    }
    if max_volunteers < 0 {
        return Err(ServiceError::BadRequest(
            "max_volunteers cannot be negative".to_string(),
        ));
    }
    Ok(())
}

// --- Pagination DTOs ---
#[derive(Deserialize, Debug)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

impl PaginationParams {
    pub fn sanitized(page: Option<i64>, per_page: Option<i64>) -> Self {
        PaginationParams {
            page: page.unwrap_or_else(default_page).max(1),
            per_page: per_page.unwrap_or_else(default_per_page).clamp(1, 100),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }
}

fn default_page() -> i64 {
    1
}
fn default_per_page() -> i64 {
    10
}

#[derive(Serialize, Debug)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total_items: i64,
    pub total_pages: i64,
    pub page: i64,
    pub per_page: i64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total_items: i64, params: &PaginationParams) -> Self {
        PaginatedResponse {
            items,
            total_items,
            total_pages: (total_items + params.per_page - 1) / params.per_page,
            page: params.page,
            per_page: params.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, 9, 0, 0).unwrap()
    }

    fn event_payload() -> CreateEventPayload {
        CreateEventPayload {
            title: "Beach cleanup".to_string(),
            description: None,
            location: Some("North shore".to_string()),
            location_type: "Physical".to_string(),
            category: "environment".to_string(),
            start_date: at(10),
            end_date: at(11),
            registration_deadline: Some(at(8)),
            max_volunteers: 20,
            status: None,
        }
    }

    #[test]
    fn task_status_folds_both_vocabularies() {
        assert_eq!(TaskStatus::parse("to do"), TaskStatus::Assigned);
        assert_eq!(TaskStatus::parse("assigned"), TaskStatus::Assigned);
        assert_eq!(TaskStatus::parse("inprogress"), TaskStatus::InProgress);
        assert_eq!(TaskStatus::parse("Doing"), TaskStatus::InProgress);
        assert_eq!(TaskStatus::parse("done"), TaskStatus::Complete);
        assert_eq!(TaskStatus::parse("complete"), TaskStatus::Complete);
        assert_eq!(TaskStatus::parse(" unassigned "), TaskStatus::Unassigned);
        assert_eq!(TaskStatus::parse("blocked"), TaskStatus::Unknown);
    }

    #[test]
    fn spellings_parse_back_to_their_status() {
        for status in [
            TaskStatus::Unassigned,
            TaskStatus::Assigned,
            TaskStatus::InProgress,
            TaskStatus::Complete,
        ] {
            for spelling in status.spellings() {
                assert_eq!(TaskStatus::parse(spelling), status);
            }
        }
    }

    #[test]
    fn unknown_task_status_is_rejected_on_write() {
        assert!(parse_task_status("blocked").is_err());
        assert_eq!(parse_task_status("doing").unwrap(), TaskStatus::InProgress);
    }

    #[test]
    fn valid_event_payload_normalizes_fields() {
        let payload = event_payload();
        assert!(payload.validate().is_ok());
        let new_event = payload.into_new_event();
        assert_eq!(new_event.location_type, "physical");
        assert_eq!(new_event.status, "draft");
    }

    #[test]
    fn event_payload_rejects_inverted_schedule() {
        let mut payload = event_payload();
        payload.end_date = at(9);
        assert!(matches!(payload.validate(), Err(ServiceError::BadRequest(_))));

        let mut payload = event_payload();
        payload.registration_deadline = Some(at(12));
        assert!(payload.validate().is_err());
    }

    #[test]
    fn event_payload_rejects_unknown_category_and_negative_capacity() {
        let mut payload = event_payload();
        payload.category = "parties".to_string();
        assert!(payload.validate().is_err());

        let mut payload = event_payload();
        payload.max_volunteers = -1;
        assert!(payload.validate().is_err());

        let mut payload = event_payload();
        payload.title = "   ".to_string();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn update_payload_distinguishes_null_from_absent() {
        let absent: UpdateRegistrationPayload = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(absent.feedback, None);

        let cleared: UpdateRegistrationPayload =
            serde_json::from_str(r#"{"feedback": null}"#).unwrap();
        assert_eq!(cleared.feedback, Some(None));
    }

    #[test]
    fn empty_registration_update_is_rejected() {
        let payload: UpdateRegistrationPayload = serde_json::from_str(r#"{}"#).unwrap();
        assert!(matches!(payload.validate(), Err(ServiceError::BadRequest(_))));

        let payload: UpdateRegistrationPayload =
            serde_json::from_str(r#"{"feedback": null}"#).unwrap();
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn only_registered_status_counts_as_registering() {
        let payload: UpdateRegistrationPayload =
            serde_json::from_str(r#"{"status": " Registered "}"#).unwrap();
        assert!(payload.sets_registered());

        let payload: UpdateRegistrationPayload =
            serde_json::from_str(r#"{"status": "not registered"}"#).unwrap();
        assert!(!payload.sets_registered());

        let payload: UpdateRegistrationPayload =
            serde_json::from_str(r#"{"star_rating": 5}"#).unwrap();
        assert!(!payload.sets_registered());
    }

    #[test]
    fn star_rating_must_be_between_one_and_five() {
        let payload: UpdateRegistrationPayload =
            serde_json::from_str(r#"{"star_rating": 6}"#).unwrap();
        assert!(payload.validate().is_err());

        let payload: UpdateRegistrationPayload =
            serde_json::from_str(r#"{"star_rating": 4, "status": "Registered"}"#).unwrap();
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn task_created_for_volunteer_defaults_to_assigned() {
        let payload = CreateTaskPayload {
            event_id: 3,
            description: "Hand out water".to_string(),
            volunteer_id: Some(Uuid::new_v4()),
            volunteer_email: None,
            status: None,
        };
        assert_eq!(payload.into_new_task().status, "assigned");
    }

    #[test]
    fn pagination_is_clamped() {
        let params = PaginationParams::sanitized(Some(0), Some(1000));
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 100);
        let response = PaginatedResponse::new(vec![1, 2], 201, &params);
        assert_eq!(response.total_pages, 3);
    }
}
