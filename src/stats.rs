//! Figures shown on the dashboard, derived from scratch from the job list on
//! every call.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;

use crate::models::{Job, Stage};

pub const TOP_SOURCES: usize = 5;
pub const TOP_RESUMES: usize = 4;
pub const RECENT_JOBS: usize = 5;

const UNSPECIFIED: &str = "Unspecified";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    pub todo: usize,
    pub applied: usize,
    pub interview: usize,
    pub done: usize,
}

impl StatusCounts {
    /// Jobs with a status outside the pipeline only count towards `total`.
    pub fn from_jobs(jobs: &[Job]) -> Self {
        let mut counts = Self {
            total: jobs.len(),
            ..Self::default()
        };
        for stage in jobs.iter().filter_map(|j| j.status.stage()) {
            match stage {
                Stage::Todo => counts.todo += 1,
                Stage::Applied => counts.applied += 1,
                Stage::Interview => counts.interview += 1,
                Stage::Done => counts.done += 1,
            }
        }
        counts
    }

    pub fn get(&self, stage: Stage) -> usize {
        match stage {
            Stage::Todo => self.todo,
            Stage::Applied => self.applied,
            Stage::Interview => self.interview,
            Stage::Done => self.done,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub date: NaiveDate,
    pub day: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub counts: StatusCounts,
    pub top_sources: Vec<(String, usize)>,
    pub top_resumes: Vec<(String, usize)>,
    pub last_seven_days: Vec<DayCount>,
    pub this_week: Vec<DayCount>,
    /// interview / applied, as a whole percentage.
    pub interview_rate: u32,
    /// done / total, as a whole percentage.
    pub completion_rate: u32,
    pub recent: Vec<Job>,
}

impl Stats {
    pub fn compute(jobs: &[Job], today: NaiveDate) -> Self {
        let counts = StatusCounts::from_jobs(jobs);
        let mut top_sources = tally(jobs, |j| j.source.as_deref());
        top_sources.truncate(TOP_SOURCES);
        let mut top_resumes = tally(jobs, |j| j.resume_used.as_deref());
        top_resumes.truncate(TOP_RESUMES);

        Self {
            interview_rate: percent(counts.interview, counts.applied),
            completion_rate: percent(counts.done, counts.total),
            counts,
            top_sources,
            top_resumes,
            last_seven_days: last_seven_days(jobs, today),
            this_week: current_week(jobs, today),
            recent: recent(jobs, RECENT_JOBS).into_iter().cloned().collect(),
        }
    }
}

/// Frequency of each label, most frequent first. Equal counts keep the order in
/// which the labels first appear.
pub fn tally<F>(jobs: &[Job], key: F) -> Vec<(String, usize)>
where
    F: Fn(&Job) -> Option<&str>,
{
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();
    for job in jobs {
        let label = key(job).unwrap_or(UNSPECIFIED);
        match index.get(label) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(label, counts.len());
                counts.push((label.to_string(), 1));
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// `round(part / whole * 100)`, or 0 when `whole` is 0.
pub fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part as f64 / whole as f64 * 100.0).round() as u32
}

/// Jobs whose stored `createdAt` text starts with the date's `YYYY-MM-DD`.
/// The store stamps in UTC, so a job created shortly after local midnight can
/// land on the previous (or next) UTC day.
pub fn created_on(jobs: &[Job], date: NaiveDate) -> usize {
    let prefix = date.format("%Y-%m-%d").to_string();
    jobs.iter()
        .filter(|j| {
            j.created_at
                .as_ref()
                .is_some_and(|m| m.as_str().starts_with(&prefix))
        })
        .count()
}

fn day_count(jobs: &[Job], date: NaiveDate) -> DayCount {
    DayCount {
        date,
        day: date.format("%a").to_string(),
        count: created_on(jobs, date),
    }
}

/// The seven days ending with `today`, oldest first.
pub fn last_seven_days(jobs: &[Job], today: NaiveDate) -> Vec<DayCount> {
    (0..7)
        .rev()
        .map(|back| day_count(jobs, today - Duration::days(back)))
        .collect()
}

/// Sunday through Saturday of the week containing `today`.
pub fn current_week(jobs: &[Job], today: NaiveDate) -> Vec<DayCount> {
    let start = today - Duration::days(today.weekday().num_days_from_sunday() as i64);
    (0..7)
        .map(|offset| day_count(jobs, start + Duration::days(offset)))
        .collect()
}

/// Newest first; jobs without a creation time sort last.
pub fn recent(jobs: &[Job], limit: usize) -> Vec<&Job> {
    let mut sorted: Vec<&Job> = jobs.iter().collect();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    sorted.truncate(limit);
    sorted
}
