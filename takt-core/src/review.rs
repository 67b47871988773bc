use std::collections::BTreeMap;

use chrono::NaiveDate;
use itertools::Itertools;
use redmine::TimeEntry;

/// Hours logged against one project within a day.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectHours {
    pub name: String,
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub entries: Vec<TimeEntry>,
    pub total_hours: f64,
    /// Per-project totals, largest first.
    pub projects: Vec<ProjectHours>,
}

/// Today's log next to the most recent earlier day that has one, for the
/// "what did I log today / last time" review.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyReview {
    pub today: DaySummary,
    pub last_logged: Option<DaySummary>,
}

/// Buckets fetched entries by `spent_on`. Days without entries never get a
/// summary, so `last_logged` skips weekends and gaps naturally.
pub fn daily_review(entries: Vec<TimeEntry>, today: NaiveDate) -> DailyReview {
    let mut by_day: BTreeMap<NaiveDate, Vec<TimeEntry>> = BTreeMap::new();
    for entry in entries {
        by_day.entry(entry.spent_on).or_default().push(entry);
    }

    let todays = by_day.remove(&today).unwrap_or_default();
    let previous_day = by_day.range(..today).next_back().map(|(date, _)| *date);
    let last_logged = previous_day
        .and_then(|date| by_day.remove(&date).map(|entries| summarize(date, entries)));

    DailyReview {
        today: summarize(today, todays),
        last_logged,
    }
}

fn summarize(date: NaiveDate, entries: Vec<TimeEntry>) -> DaySummary {
    let total_hours = entries.iter().map(|e| e.hours).sum();
    let mut projects: Vec<ProjectHours> = entries
        .iter()
        .map(|e| (e.project.name.clone(), e.hours))
        .into_group_map()
        .into_iter()
        .map(|(name, hours)| ProjectHours {
            name,
            hours: hours.into_iter().sum(),
        })
        .collect();
    projects.sort_by(|a, b| {
        b.hours
            .partial_cmp(&a.hours)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });

    DaySummary {
        date,
        entries,
        total_hours,
        projects,
    }
}
