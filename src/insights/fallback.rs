//! Fixed datasets served when the backing tables do not exist, so the
//! dashboard stays populated on an unprovisioned database.

use std::fmt::Display;

use super::{
    CategoryCount, DataSource, Engagement, EventFillRate, MonthlyCount, MonthlyTaskCount,
    Overview, RatingBucket, Satisfaction, SkillCount, Sourced, StatusCount, TopVolunteer, MONTHS,
};
use crate::models::TaskStatus;

/// True for the "table not found" class of database errors.
pub fn is_missing_table(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    (message.contains("does not exist")
        && (message.contains("relation") || message.contains("table")))
        || message.contains("could not find the table")
}

/// Wraps a live result, or substitutes `fallback` when the error says the
/// table is missing. Any other error is returned unchanged.
pub fn with_fallback<T, E: Display>(
    result: Result<T, E>,
    fallback: impl FnOnce() -> T,
) -> Result<Sourced<T>, E> {
    match result {
        Ok(data) => Ok(Sourced {
            source: DataSource::Live,
            data,
        }),
        Err(err) if is_missing_table(&err.to_string()) => {
            log::warn!("Serving fallback insight data: {}", err);
            Ok(Sourced {
                source: DataSource::Fallback,
                data: fallback(),
            })
        }
        Err(err) => Err(err),
    }
}

pub fn overview() -> Overview {
    Overview {
        total_events: 24,
        published_events: 18,
        total_volunteers: 156,
        total_tasks: 89,
        completed_tasks: 67,
        total_registrations: 342,
        task_completion_rate: 75.3,
    }
}

pub fn events_by_category() -> Vec<CategoryCount> {
    [
        ("environment", 8),
        ("education", 6),
        ("community", 5),
        ("health", 3),
        ("animals", 2),
    ]
    .into_iter()
    .map(|(category, count)| CategoryCount {
        category: category.to_string(),
        count,
    })
    .collect()
}

pub fn tasks_by_month() -> Vec<MonthlyTaskCount> {
    const TOTALS: [(usize, usize); 12] = [
        (4, 3),
        (6, 5),
        (9, 7),
        (7, 6),
        (11, 9),
        (8, 6),
        (5, 4),
        (6, 5),
        (10, 8),
        (9, 7),
        (8, 5),
        (6, 2),
    ];
    MONTHS
        .iter()
        .zip(TOTALS)
        .map(|(&month, (total, completed))| MonthlyTaskCount {
            month,
            total,
            completed,
        })
        .collect()
}

pub fn registrations_by_month() -> Vec<MonthlyCount> {
    const COUNTS: [usize; 12] = [12, 18, 25, 31, 40, 36, 22, 27, 38, 35, 30, 28];
    MONTHS
        .iter()
        .zip(COUNTS)
        .map(|(&month, count)| MonthlyCount { month, count })
        .collect()
}

pub fn task_status_breakdown() -> Vec<StatusCount> {
    vec![
        StatusCount {
            status: TaskStatus::Unassigned,
            count: 8,
        },
        StatusCount {
            status: TaskStatus::Assigned,
            count: 6,
        },
        StatusCount {
            status: TaskStatus::InProgress,
            count: 8,
        },
        StatusCount {
            status: TaskStatus::Complete,
            count: 67,
        },
    ]
}

pub fn skill_distribution() -> Vec<SkillCount> {
    [
        ("First Aid", 42),
        ("Teaching", 35),
        ("Event Planning", 28),
        ("Cooking", 21),
        ("Photography", 14),
    ]
    .into_iter()
    .map(|(skill, count)| SkillCount {
        skill: skill.to_string(),
        count,
    })
    .collect()
}

pub fn event_fill_rates() -> Vec<EventFillRate> {
    [
        (1, "Community Garden Planting", 25, 25),
        (2, "Beach Cleanup Day", 38, 40),
        (3, "Food Bank Sorting", 17, 20),
        (4, "Animal Shelter Open House", 12, 15),
        (5, "Reading Buddies", 9, 20),
    ]
    .into_iter()
    .map(|(event_id, title, registered, max_volunteers)| EventFillRate {
        event_id,
        title: title.to_string(),
        registered,
        max_volunteers,
        fill_rate: super::aggregate::percentage(registered, max_volunteers as usize),
    })
    .collect()
}

pub fn satisfaction() -> Satisfaction {
    Satisfaction {
        rated_count: 120,
        average_rating: 4.3,
        satisfied_rate: 85.0,
        distribution: [(1, 3), (2, 5), (3, 10), (4, 37), (5, 65)]
            .into_iter()
            .map(|(stars, count)| RatingBucket { stars, count })
            .collect(),
    }
}

pub fn engagement() -> Engagement {
    Engagement {
        total_volunteers: 156,
        active_volunteers: 112,
        engagement_rate: 71.8,
    }
}

pub fn top_volunteers() -> Vec<TopVolunteer> {
    [
        ("maria.lopez@example.org", 14),
        ("james.chen@example.org", 11),
        ("aisha.khan@example.org", 9),
        ("tom.becker@example.org", 7),
        ("sara.nilsson@example.org", 6),
    ]
    .into_iter()
    .map(|(email, completed_tasks)| TopVolunteer {
        volunteer_id: None,
        volunteer_email: Some(email.to_string()),
        completed_tasks,
    })
    .collect()
}
