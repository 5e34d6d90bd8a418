use chrono::Datelike;
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

use super::{
    CategoryCount, Engagement, EventFillRate, MonthlyCount, MonthlyTaskCount, Overview,
    RatingBucket, Satisfaction, SkillCount, StatusCount, TopVolunteer, MONTHS,
};
use crate::models::{Event, EventStatus, Registration, Skill, Task, TaskStatus, VolunteerSkill};

/// `part / whole` as a percentage rounded to one decimal; 0 when `whole` is 0.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round1(part as f64 * 100.0 / whole as f64)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// Count descending, then key ascending so ties are stable across calls.
fn sort_counts_desc<T>(items: &mut [T], count: impl Fn(&T) -> usize, key: impl Fn(&T) -> &str) {
    items.sort_by(|a, b| count(b).cmp(&count(a)).then_with(|| key(a).cmp(key(b))));
}

fn registered(registrations: &[Registration]) -> impl Iterator<Item = &Registration> {
    registrations.iter().filter(|r| r.is_registered())
}

pub fn overview(
    events: &[Event],
    tasks: &[Task],
    total_volunteers: i64,
    registrations: &[Registration],
) -> Overview {
    let published_events = events
        .iter()
        .filter(|e| EventStatus::parse(&e.status) == Some(EventStatus::Published))
        .count();
    let completed_tasks = tasks
        .iter()
        .filter(|t| t.canonical_status() == TaskStatus::Complete)
        .count();

    Overview {
        total_events: events.len(),
        published_events,
        total_volunteers,
        total_tasks: tasks.len(),
        completed_tasks,
        total_registrations: registered(registrations).count(),
        task_completion_rate: percentage(completed_tasks, tasks.len()),
    }
}

pub fn events_by_category(events: &[Event]) -> Vec<CategoryCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for event in events {
        *counts
            .entry(event.category.trim().to_ascii_lowercase())
            .or_default() += 1;
    }
    let mut result: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(category, count)| CategoryCount { category, count })
        .collect();
    sort_counts_desc(&mut result, |c| c.count, |c| c.category.as_str());
    result
}

/// Twelve buckets in calendar order for `year`.
pub fn tasks_by_month(tasks: &[Task], year: i32) -> Vec<MonthlyTaskCount> {
    let mut buckets: Vec<MonthlyTaskCount> = MONTHS
        .iter()
        .map(|&month| MonthlyTaskCount {
            month,
            total: 0,
            completed: 0,
        })
        .collect();

    for task in tasks.iter().filter(|t| t.created_at.year() == year) {
        let bucket = &mut buckets[task.created_at.month0() as usize];
        bucket.total += 1;
        if task.canonical_status() == TaskStatus::Complete {
            bucket.completed += 1;
        }
    }
    buckets
}

pub fn registrations_by_month(registrations: &[Registration], year: i32) -> Vec<MonthlyCount> {
    let mut counts = [0usize; 12];
    for registration in registered(registrations).filter(|r| r.created_at.year() == year) {
        counts[registration.created_at.month0() as usize] += 1;
    }
    MONTHS
        .iter()
        .zip(counts)
        .map(|(&month, count)| MonthlyCount { month, count })
        .collect()
}

/// Counts per canonical status, in status order, omitting empty statuses.
pub fn task_status_breakdown(tasks: &[Task]) -> Vec<StatusCount> {
    let mut counts: BTreeMap<TaskStatus, usize> = BTreeMap::new();
    for task in tasks {
        *counts.entry(task.canonical_status()).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(status, count)| StatusCount { status, count })
        .collect()
}

pub fn skill_distribution(
    skills: &[Skill],
    volunteer_skills: &[VolunteerSkill],
    top_n: usize,
) -> Vec<SkillCount> {
    let mut per_skill: HashMap<i64, usize> = HashMap::new();
    for link in volunteer_skills {
        *per_skill.entry(link.skill_id).or_default() += 1;
    }
    let mut result: Vec<SkillCount> = skills
        .iter()
        .map(|s| SkillCount {
            skill: s.skill.clone(),
            count: per_skill.get(&s.skill_id).copied().unwrap_or(0),
        })
        .collect();
    sort_counts_desc(&mut result, |s| s.count, |s| s.skill.as_str());
    result.truncate(top_n);
    result
}

pub fn event_fill_rates(
    events: &[Event],
    registrations: &[Registration],
    top_n: usize,
) -> Vec<EventFillRate> {
    let mut per_event: HashMap<i64, usize> = HashMap::new();
    for registration in registered(registrations) {
        *per_event.entry(registration.event_id).or_default() += 1;
    }

    let mut result: Vec<EventFillRate> = events
        .iter()
        .map(|event| {
            let registered = per_event.get(&event.id).copied().unwrap_or(0);
            let capacity = usize::try_from(event.max_volunteers).unwrap_or(0);
            EventFillRate {
                event_id: event.id,
                title: event.title.clone(),
                registered,
                max_volunteers: event.max_volunteers,
                fill_rate: percentage(registered, capacity),
            }
        })
        .collect();

    result.sort_by(|a, b| {
        b.fill_rate
            .total_cmp(&a.fill_rate)
            .then_with(|| a.title.cmp(&b.title))
    });
    result.truncate(top_n);
    result
}

pub fn satisfaction(registrations: &[Registration]) -> Satisfaction {
    let ratings: Vec<i32> = registrations
        .iter()
        .filter_map(|r| r.star_rating)
        .filter(|rating| (1..=5).contains(rating))
        .collect();

    let distribution = (1..=5)
        .map(|stars| RatingBucket {
            stars,
            count: ratings.iter().filter(|&&r| r == stars).count(),
        })
        .collect();

    let average_rating = if ratings.is_empty() {
        0.0
    } else {
        let sum: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
        round1(sum as f64 / ratings.len() as f64)
    };
    let satisfied = ratings.iter().filter(|&&r| r >= 4).count();

    Satisfaction {
        rated_count: ratings.len(),
        average_rating,
        satisfied_rate: percentage(satisfied, ratings.len()),
        distribution,
    }
}

pub fn engagement(total_volunteers: i64, registrations: &[Registration]) -> Engagement {
    let active: HashSet<Uuid> = registered(registrations).map(|r| r.volunteer_id).collect();
    let total = usize::try_from(total_volunteers).unwrap_or(0);

    Engagement {
        total_volunteers,
        active_volunteers: active.len(),
        engagement_rate: percentage(active.len(), total),
    }
}

/// Volunteers ranked by completed tasks. Tasks are attributed by volunteer id,
/// or by e-mail when no id was recorded.
pub fn top_volunteers(tasks: &[Task], top_n: usize) -> Vec<TopVolunteer> {
    let mut per_volunteer: HashMap<String, TopVolunteer> = HashMap::new();

    for task in tasks
        .iter()
        .filter(|t| t.canonical_status() == TaskStatus::Complete)
    {
        let email = task
            .volunteer_email
            .as_deref()
            .map(|e| e.trim().to_ascii_lowercase())
            .filter(|e| !e.is_empty());
        let key = match (task.volunteer_id, &email) {
            (Some(id), _) => id.to_string(),
            (None, Some(email)) => email.clone(),
            (None, None) => continue,
        };
        let entry = per_volunteer.entry(key).or_insert_with(|| TopVolunteer {
            volunteer_id: task.volunteer_id,
            volunteer_email: email.clone(),
            completed_tasks: 0,
        });
        if entry.volunteer_email.is_none() {
            entry.volunteer_email = email;
        }
        entry.completed_tasks += 1;
    }

    let mut ranked: Vec<(String, TopVolunteer)> = per_volunteer.into_iter().collect();
    ranked.sort_by(|(ka, a), (kb, b)| {
        b.completed_tasks
            .cmp(&a.completed_tasks)
            .then_with(|| ka.cmp(kb))
    });
    ranked.into_iter().take(top_n).map(|(_, v)| v).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    fn event(id: i64, title: &str, category: &str, status: &str, max: i32) -> Event {
        Event {
            id,
            title: title.to_string(),
            description: None,
            location: None,
            location_type: "physical".to_string(),
            category: category.to_string(),
            start_date: at(2025, 5, 1),
            end_date: at(2025, 5, 2),
            registration_deadline: None,
            max_volunteers: max,
            status: status.to_string(),
            email_sent: false,
            image_url: None,
            created_at: at(2025, 1, 1),
            updated_at: at(2025, 1, 1),
        }
    }

    fn task(
        status: &str,
        created: DateTime<Utc>,
        volunteer: Option<Uuid>,
        email: Option<&str>,
    ) -> Task {
        Task {
            task_id: Uuid::new_v4(),
            event_id: 1,
            volunteer_id: volunteer,
            volunteer_email: email.map(str::to_string),
            description: "Set up tables".to_string(),
            status: status.to_string(),
            feedback: None,
            created_at: created,
            updated_at: created,
        }
    }

    fn registration(
        event_id: i64,
        volunteer: Uuid,
        status: &str,
        rating: Option<i32>,
    ) -> Registration {
        Registration {
            id: 0,
            volunteer_id: volunteer,
            event_id,
            status: status.to_string(),
            feedback: None,
            star_rating: rating,
            created_at: at(2025, 3, 15),
        }
    }

    fn skill(id: i64, name: &str) -> Skill {
        Skill {
            skill_id: id,
            skill: name.to_string(),
            icon: None,
        }
    }

    fn link(skill_id: i64) -> VolunteerSkill {
        VolunteerSkill {
            volunteer_id: Uuid::new_v4(),
            skill_id,
        }
    }

    #[test]
    fn percentage_guards_zero_denominator() {
        assert_eq!(percentage(3, 0), 0.0);
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(2, 3), 66.7);
    }

    #[test]
    fn overview_totals_and_completion_rate() {
        let events = vec![
            event(1, "A", "health", "published", 10),
            event(2, "B", "arts", "draft", 10),
            event(3, "C", "arts", "Published", 10),
        ];
        let tasks = vec![
            task("done", at(2025, 1, 3), None, None),
            task("complete", at(2025, 1, 3), None, None),
            task("doing", at(2025, 1, 3), None, None),
            task("unassigned", at(2025, 1, 3), None, None),
        ];
        let v = Uuid::new_v4();
        let registrations = vec![
            registration(1, v, "registered", None),
            registration(1, Uuid::new_v4(), "not registered", None),
        ];

        let result = overview(&events, &tasks, 12, &registrations);
        assert_eq!(
            result,
            Overview {
                total_events: 3,
                published_events: 2,
                total_volunteers: 12,
                total_tasks: 4,
                completed_tasks: 2,
                total_registrations: 1,
                task_completion_rate: 50.0,
            }
        );
    }

    #[test]
    fn overview_of_nothing_is_all_zero() {
        let result = overview(&[], &[], 0, &[]);
        assert_eq!(result.task_completion_rate, 0.0);
        assert_eq!(result.total_events, 0);
    }

    #[test]
    fn categories_sorted_by_count_then_name() {
        let events = vec![
            event(1, "A", "arts", "draft", 1),
            event(2, "B", "Health", "draft", 1),
            event(3, "C", "health", "draft", 1),
            event(4, "D", "animals", "draft", 1),
        ];
        let result = events_by_category(&events);
        assert_eq!(
            result,
            vec![
                CategoryCount {
                    category: "health".into(),
                    count: 2,
                },
                CategoryCount {
                    category: "animals".into(),
                    count: 1,
                },
                CategoryCount {
                    category: "arts".into(),
                    count: 1,
                },
            ]
        );
    }

    #[test]
    fn tasks_grouped_into_calendar_months_of_requested_year() {
        let tasks = vec![
            task("done", at(2025, 1, 5), None, None),
            task("to do", at(2025, 1, 20), None, None),
            task("complete", at(2025, 12, 1), None, None),
            task("done", at(2024, 1, 5), None, None),
        ];
        let result = tasks_by_month(&tasks, 2025);
        assert_eq!(result.len(), 12);
        assert_eq!(
            result[0],
            MonthlyTaskCount {
                month: "Jan",
                total: 2,
                completed: 1,
            }
        );
        assert_eq!(
            result[1],
            MonthlyTaskCount {
                month: "Feb",
                total: 0,
                completed: 0,
            }
        );
        assert_eq!(
            result[11],
            MonthlyTaskCount {
                month: "Dec",
                total: 1,
                completed: 1,
            }
        );
    }

    #[test]
    fn registrations_by_month_counts_only_registered() {
        let registrations = vec![
            registration(1, Uuid::new_v4(), "registered", None),
            registration(1, Uuid::new_v4(), "registered", None),
            registration(1, Uuid::new_v4(), "not registered", None),
        ];
        let result = registrations_by_month(&registrations, 2025);
        assert_eq!(
            result[2],
            MonthlyCount {
                month: "Mar",
                count: 2,
            }
        );
        assert_eq!(result.iter().map(|m| m.count).sum::<usize>(), 2);
        assert!(registrations_by_month(&registrations, 2024)
            .iter()
            .all(|m| m.count == 0));
    }

    #[test]
    fn status_breakdown_folds_vocabularies() {
        let tasks = vec![
            task("to do", at(2025, 1, 1), None, None),
            task("assigned", at(2025, 1, 1), None, None),
            task("doing", at(2025, 1, 1), None, None),
            task("done", at(2025, 1, 1), None, None),
            task("archived?", at(2025, 1, 1), None, None),
        ];
        let result = task_status_breakdown(&tasks);
        assert_eq!(
            result,
            vec![
                StatusCount {
                    status: TaskStatus::Assigned,
                    count: 2,
                },
                StatusCount {
                    status: TaskStatus::InProgress,
                    count: 1,
                },
                StatusCount {
                    status: TaskStatus::Complete,
                    count: 1,
                },
                StatusCount {
                    status: TaskStatus::Unknown,
                    count: 1,
                },
            ]
        );
    }

    #[test]
    fn skill_distribution_top_n() {
        let skills = vec![
            skill(1, "First Aid"),
            skill(2, "Cooking"),
            skill(3, "Driving"),
            skill(4, "Teaching"),
        ];
        let links = vec![link(2), link(2), link(3), link(1), link(1), link(1), link(99)];
        let result = skill_distribution(&skills, &links, 3);
        assert_eq!(
            result,
            vec![
                SkillCount {
                    skill: "First Aid".into(),
                    count: 3,
                },
                SkillCount {
                    skill: "Cooking".into(),
                    count: 2,
                },
                SkillCount {
                    skill: "Driving".into(),
                    count: 1,
                },
            ]
        );
    }

    #[test]
    fn fill_rates_guard_zero_capacity() {
        let events = vec![
            event(1, "Open", "health", "published", 0),
            event(2, "Half", "health", "published", 4),
            event(3, "Full", "health", "published", 1),
        ];
        let registrations = vec![
            registration(1, Uuid::new_v4(), "registered", None),
            registration(2, Uuid::new_v4(), "registered", None),
            registration(2, Uuid::new_v4(), "registered", None),
            registration(3, Uuid::new_v4(), "registered", None),
        ];
        let result = event_fill_rates(&events, &registrations, 10);
        assert_eq!(result[0].title, "Full");
        assert_eq!(result[0].fill_rate, 100.0);
        assert_eq!(result[1].fill_rate, 50.0);
        assert_eq!(result[2].title, "Open");
        assert_eq!(result[2].registered, 1);
        assert_eq!(result[2].fill_rate, 0.0);
        assert_eq!(event_fill_rates(&events, &registrations, 1).len(), 1);
    }

    #[test]
    fn satisfaction_from_star_ratings() {
        let v = Uuid::new_v4();
        let registrations = vec![
            registration(1, v, "registered", Some(5)),
            registration(1, v, "registered", Some(4)),
            registration(1, v, "registered", Some(2)),
            registration(1, v, "registered", None),
            registration(1, v, "registered", Some(9)),
        ];
        let result = satisfaction(&registrations);
        assert_eq!(result.rated_count, 3);
        assert_eq!(result.average_rating, 3.7);
        assert_eq!(result.satisfied_rate, 66.7);
        assert_eq!(result.distribution[1], RatingBucket { stars: 2, count: 1 });
        assert_eq!(result.distribution[4], RatingBucket { stars: 5, count: 1 });
    }

    #[test]
    fn satisfaction_without_ratings_is_zero() {
        let result = satisfaction(&[]);
        assert_eq!(result.rated_count, 0);
        assert_eq!(result.average_rating, 0.0);
        assert_eq!(result.satisfied_rate, 0.0);
        assert_eq!(result.distribution.len(), 5);
    }

    #[test]
    fn engagement_counts_distinct_active_volunteers() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let registrations = vec![
            registration(1, a, "registered", None),
            registration(2, a, "registered", None),
            registration(2, b, "not registered", None),
        ];
        let result = engagement(4, &registrations);
        assert_eq!(result.active_volunteers, 1);
        assert_eq!(result.engagement_rate, 25.0);
        assert_eq!(engagement(0, &registrations).engagement_rate, 0.0);
    }

    #[test]
    fn top_volunteers_by_completed_tasks() {
        let a = Uuid::new_v4();
        let tasks = vec![
            task("done", at(2025, 1, 1), Some(a), None),
            task("complete", at(2025, 1, 1), Some(a), Some("a@example.org")),
            task("done", at(2025, 1, 1), None, Some("B@example.org")),
            task("doing", at(2025, 1, 1), None, Some("b@example.org")),
            task("done", at(2025, 1, 1), None, None),
        ];
        let result = top_volunteers(&tasks, 5);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].volunteer_id, Some(a));
        assert_eq!(result[0].completed_tasks, 2);
        assert_eq!(result[0].volunteer_email.as_deref(), Some("a@example.org"));
        assert_eq!(result[1].volunteer_email.as_deref(), Some("b@example.org"));
        assert_eq!(top_volunteers(&tasks, 1).len(), 1);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let events = vec![
            event(1, "A", "arts", "published", 3),
            event(2, "B", "sports", "published", 3),
            event(3, "C", "sports", "draft", 0),
        ];
        let registrations = vec![
            registration(1, Uuid::new_v4(), "registered", Some(4)),
            registration(2, Uuid::new_v4(), "registered", Some(5)),
        ];
        assert_eq!(events_by_category(&events), events_by_category(&events));
        assert_eq!(
            event_fill_rates(&events, &registrations, 5),
            event_fill_rates(&events, &registrations, 5)
        );
        assert_eq!(satisfaction(&registrations), satisfaction(&registrations));
    }
}
