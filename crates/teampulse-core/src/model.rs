//! Domain records produced by the collectors.
//!
//! Everything here is created during a single collection run and consumed by
//! the metrics engine; only the snapshot survives the run. Field shapes
//! mirror what the upstream APIs return, trimmed to what the engine needs.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ──────────────────────────────────────────────
// Source-control records
// ──────────────────────────────────────────────

/// A pull request with its nested reviews and commits.
///
/// `merged_at` implies the PR is terminal; `closed_at` without `merged_at`
/// means it was rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    /// Host-side PR number.
    pub id: u64,
    /// `owner/name` of the repository.
    pub repo: String,
    /// Author login on the source-control host.
    pub author_login: String,
    /// PR title.
    pub title: String,
    /// Head branch name.
    pub branch: String,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Merge instant, when merged.
    pub merged_at: Option<DateTime<Utc>>,
    /// Close instant, when closed without merging.
    pub closed_at: Option<DateTime<Utc>>,
    /// Lines added.
    pub additions: u64,
    /// Lines deleted.
    pub deletions: u64,
    /// Reviews in submission order.
    pub reviews: Vec<Review>,
    /// Commits in upstream order.
    pub commits: Vec<Commit>,
    /// Issue keys extracted from title and branch (see the mapper).
    pub issue_keys: BTreeSet<String>,
}

impl PullRequest {
    /// Total changed lines, the size-bucket input.
    pub const fn change_size(&self) -> u64 {
        self.additions + self.deletions
    }

    /// PR cycle time in hours (creation to merge), when merged.
    pub fn cycle_time_hours(&self) -> Option<f64> {
        self.merged_at
            .map(|m| (m - self.created_at).num_seconds() as f64 / 3600.0)
    }

    /// Hours from creation to the first review, when reviewed at all.
    pub fn time_to_first_review_hours(&self) -> Option<f64> {
        self.reviews
            .iter()
            .map(|r| r.created_at)
            .min()
            .map(|first| (first - self.created_at).num_seconds() as f64 / 3600.0)
    }
}

/// A review attached to a pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    /// PR the review belongs to.
    pub pr_id: u64,
    /// Reviewer login.
    pub author_login: String,
    /// Submission instant.
    pub created_at: DateTime<Utc>,
    /// Review verdict.
    pub state: ReviewState,
}

/// Review verdict as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState {
    /// Reviewer approved the change.
    Approved,
    /// Reviewer requested changes.
    ChangesRequested,
    /// Reviewer commented without a verdict.
    Commented,
    /// Review was dismissed.
    Dismissed,
}

/// A commit inside a pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    /// Commit hash.
    pub sha: String,
    /// Author login, when the host could resolve one.
    pub author_login: String,
    /// Authoring instant.
    pub authored_at: DateTime<Utc>,
    /// Lines added.
    pub additions: u64,
    /// Lines deleted.
    pub deletions: u64,
}

/// A release tag on the source-control host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagRelease {
    /// Release name as published.
    pub name: String,
    /// Publication instant.
    pub published_at: DateTime<Utc>,
    /// Environment when the name matches a recognized pattern.
    pub environment: Option<ReleaseEnvironment>,
}

/// A repository discovered for a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Owning organization or user.
    pub owner: String,
    /// Repository name.
    pub name: String,
    /// Team the repository was discovered for.
    pub team: String,
}

impl Repository {
    /// `owner/name` form used in PR records and log fields.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

// ──────────────────────────────────────────────
// Tracker records
// ──────────────────────────────────────────────

/// An issue from the tracker.
///
/// Status-transition durations are only available when the changelog was
/// fetched; without history they are zero, never an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// Issue key, e.g. `PROJ-123`.
    pub key: String,
    /// Summary line.
    pub summary: String,
    /// Long-form description, when present.
    pub description: Option<String>,
    /// Project key, e.g. `PROJ`.
    pub project: String,
    /// Issue type name as configured on the tracker.
    pub issue_type: String,
    /// Priority name.
    pub priority: Option<String>,
    /// Status name.
    pub status: String,
    /// Status category (`To Do`, `In Progress`, `Done`).
    pub status_category: String,
    /// Assignee tracker login.
    pub assignee: Option<String>,
    /// Reporter tracker login.
    pub reporter: Option<String>,
    /// Creation instant.
    pub created: DateTime<Utc>,
    /// Resolution instant, when resolved.
    pub resolved: Option<DateTime<Utc>>,
    /// Labels.
    pub labels: Vec<String>,
    /// Names of fix versions the issue is attached to.
    pub fix_versions: BTreeSet<String>,
    /// Hours spent in the To Do status category. Zero without history.
    pub time_in_todo_hours: f64,
    /// Hours spent in progress. Zero without history.
    pub time_in_progress_hours: f64,
    /// Hours spent in review. Zero without history.
    pub time_in_review_hours: f64,
}

impl Issue {
    /// Days from creation to resolution, when both are known.
    pub fn cycle_time_days(&self) -> Option<f64> {
        self.resolved
            .map(|r| (r - self.created).num_seconds() as f64 / 86_400.0)
    }

    /// Hours from creation to resolution, the incident MTTR input.
    pub fn resolution_time_hours(&self) -> Option<f64> {
        self.resolved
            .map(|r| (r - self.created).num_seconds() as f64 / 3600.0)
    }

    /// Whether the issue counts as work in progress.
    pub fn is_open(&self) -> bool {
        !self.status_category.eq_ignore_ascii_case("done")
    }
}

/// A named release object on the tracker, a.k.a. fix version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixVersion {
    /// Project the version belongs to.
    pub project: String,
    /// Version name as configured.
    pub name: String,
    /// Release date.
    pub release_date: DateTime<Utc>,
    /// Whether the version is marked released.
    pub released: bool,
    /// Environment derived from the name pattern.
    pub environment: ReleaseEnvironment,
    /// Keys of issues attached to the version.
    pub issues: BTreeSet<String>,
}

/// Deployment environment derived from a release name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseEnvironment {
    /// Customer-facing deployment.
    Production,
    /// Pre-production deployment.
    Staging,
}

// ──────────────────────────────────────────────
// Release name patterns
// ──────────────────────────────────────────────

/// Outcome of matching a release name against the recognized patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseName {
    /// Environment implied by the name.
    pub environment: ReleaseEnvironment,
    /// Date embedded in the name.
    pub date: NaiveDate,
}

/// Match a release name against the recognized patterns (case-insensitive).
///
/// Dash form: `"<Prefix> - D/MMM/YYYY"` with prefix `Live`/`Website`
/// (production) or `Beta`/`Preview` (staging); the separator is exactly
/// `" - "`. Underscored form: `"<Project>_<Product>_YYYY_MM_DD"`, always
/// production. Anything else is unrecognized.
pub fn parse_release_name(name: &str) -> Option<ReleaseName> {
    if let Some((prefix, date_part)) = name.split_once(" - ") {
        let environment = match prefix.to_ascii_lowercase().as_str() {
            "live" | "website" => ReleaseEnvironment::Production,
            "beta" | "preview" => ReleaseEnvironment::Staging,
            _ => return None,
        };
        let date = parse_slash_date(date_part)?;
        return Some(ReleaseName { environment, date });
    }
    parse_underscored(name).map(|date| ReleaseName {
        environment: ReleaseEnvironment::Production,
        date,
    })
}

/// Parse `D/MMM/YYYY`, e.g. `6/Oct/2025`. Day is not zero-padded.
fn parse_slash_date(s: &str) -> Option<NaiveDate> {
    let mut parts = s.trim().split('/');
    let day: u32 = parts.next()?.parse().ok()?;
    let month = month_abbrev(parts.next()?)?;
    let year: i32 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse the trailing `YYYY_MM_DD` of an underscored release name.
///
/// The name needs at least project and product segments before the date.
fn parse_underscored(s: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = s.split('_').collect();
    if parts.len() < 5 {
        return None;
    }
    let &[year, month, day] = &parts[parts.len() - 3..] else {
        return None;
    };
    if year.len() != 4 {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

fn month_abbrev(s: &str) -> Option<u32> {
    let m = match s.to_ascii_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(m)
}
