//! Chart-ready reporting shapes for the dashboard's insights views.
//!
//! Rows are fetched by the handlers and reduced here; when the backing table
//! is missing, [`fallback`] supplies a fixed dataset instead.

pub mod aggregate;
pub mod fallback;

use crate::models::TaskStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub const DEFAULT_TOP_N: usize = 5;
const MAX_TOP_N: usize = 50;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Overview {
    pub total_events: usize,
    pub published_events: usize,
    pub total_volunteers: i64,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub total_registrations: usize,
    pub task_completion_rate: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MonthlyTaskCount {
    pub month: &'static str,
    pub total: usize,
    pub completed: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MonthlyCount {
    pub month: &'static str,
    pub count: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct StatusCount {
    pub status: TaskStatus,
    pub count: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SkillCount {
    pub skill: String,
    pub count: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct EventFillRate {
    pub event_id: i64,
    pub title: String,
    pub registered: usize,
    pub max_volunteers: i32,
    pub fill_rate: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RatingBucket {
    pub stars: i32,
    pub count: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Satisfaction {
    pub rated_count: usize,
    pub average_rating: f64,
    pub satisfied_rate: f64,
    pub distribution: Vec<RatingBucket>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Engagement {
    pub total_volunteers: i64,
    pub active_volunteers: usize,
    pub engagement_rate: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TopVolunteer {
    pub volunteer_id: Option<Uuid>,
    pub volunteer_email: Option<String>,
    pub completed_tasks: usize,
}

/// Where an insight's data came from.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Live,
    Fallback,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Sourced<T> {
    pub source: DataSource,
    pub data: T,
}

#[derive(Deserialize, Debug)]
pub struct InsightQuery {
    pub year: Option<i32>,
    pub limit: Option<usize>,
}

impl InsightQuery {
    pub fn top_n(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_TOP_N).clamp(1, MAX_TOP_N)
    }
}
