//! Tracker statistics: throughput, WIP, bugs, scope trend.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::model::Issue;
use crate::range::DateRange;

/// Tracker-side metrics for one team (or one filter set).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JiraMetrics {
    /// Issues resolved inside the window.
    pub throughput: u64,
    /// Issues not in a Done status category at snapshot time.
    pub wip: u64,
    /// Bugs created inside the window.
    pub bugs_created: u64,
    /// Bugs resolved inside the window.
    pub bugs_resolved: u64,
    /// Median issue cycle time in days, over resolved issues.
    pub cycle_time_median_days: Option<f64>,
    /// Week-by-week created-vs-resolved balance.
    pub scope_trend: Vec<ScopeWeek>,
}

/// One week of the scope trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeWeek {
    /// Monday of the week.
    pub week_start: NaiveDate,
    /// Issues created that week.
    pub created: u64,
    /// Issues resolved that week.
    pub resolved: u64,
    /// Sign of `created - resolved`: 1 growing, -1 shrinking, 0 flat.
    pub trend: i8,
}

/// The per-team filter results the metrics are computed from.
#[derive(Debug, Default)]
pub struct TeamIssues {
    /// Result of the `wip` filter.
    pub wip: Vec<Issue>,
    /// Result of the `bugs` filter.
    pub bugs: Vec<Issue>,
    /// Result of the `completed` filter.
    pub completed: Vec<Issue>,
}

impl TeamIssues {
    /// All issues across filters, deduplicated by key.
    fn deduped(&self) -> Vec<&Issue> {
        let mut seen = std::collections::BTreeSet::new();
        self.wip
            .iter()
            .chain(&self.bugs)
            .chain(&self.completed)
            .filter(|issue| seen.insert(issue.key.as_str()))
            .collect()
    }
}

/// Compute tracker metrics over a team's filter results.
pub fn compute(issues: &TeamIssues, window: &DateRange) -> JiraMetrics {
    let throughput = issues
        .completed
        .iter()
        .filter(|i| i.resolved.is_some_and(|r| window.contains(r)))
        .count() as u64;

    let wip = issues.wip.iter().filter(|i| i.is_open()).count() as u64;

    let is_bug = |issue: &&Issue| issue.issue_type.eq_ignore_ascii_case("bug");
    let bugs_created = issues
        .bugs
        .iter()
        .filter(is_bug)
        .filter(|i| window.contains(i.created))
        .count() as u64;
    let bugs_resolved = issues
        .bugs
        .iter()
        .filter(is_bug)
        .filter(|i| i.resolved.is_some_and(|r| window.contains(r)))
        .count() as u64;

    let cycle_times: Vec<f64> = issues
        .completed
        .iter()
        .filter_map(Issue::cycle_time_days)
        .collect();

    JiraMetrics {
        throughput,
        wip,
        bugs_created,
        bugs_resolved,
        cycle_time_median_days: super::median(&cycle_times),
        scope_trend: scope_trend(&issues.deduped(), window),
    }
}

/// Created-vs-resolved balance per calendar week of the window.
fn scope_trend(issues: &[&Issue], window: &DateRange) -> Vec<ScopeWeek> {
    let first_week = monday_of(window.start().date_naive());
    let last_week = monday_of(window.end().date_naive());

    let mut created: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    let mut resolved: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for issue in issues {
        if window.contains(issue.created) {
            *created.entry(monday_of(issue.created.date_naive())).or_default() += 1;
        }
        if let Some(at) = issue.resolved
            && window.contains(at)
        {
            *resolved.entry(monday_of(at.date_naive())).or_default() += 1;
        }
    }

    let mut weeks = Vec::new();
    let mut week = first_week;
    while week <= last_week {
        let c = created.get(&week).copied().unwrap_or(0);
        let r = resolved.get(&week).copied().unwrap_or(0);
        weeks.push(ScopeWeek {
            week_start: week,
            created: c,
            resolved: r,
            trend: match c.cmp(&r) {
                std::cmp::Ordering::Greater => 1,
                std::cmp::Ordering::Less => -1,
                std::cmp::Ordering::Equal => 0,
            },
        });
        week += Duration::days(7);
    }
    weeks
}

fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}
