//! Source-control statistics: PRs, reviews, contributors.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{average, median};
use crate::model::{PullRequest, ReleaseEnvironment, TagRelease};

/// Everything computed from one record set's PRs and release tags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GithubMetrics {
    /// Pull-request statistics.
    pub prs: PrStats,
    /// Review statistics.
    pub reviews: ReviewStats,
    /// Commit/contributor statistics.
    pub commits: CommitStats,
    /// Release tags classified production, in window.
    pub production_releases: u64,
    /// Release tags classified staging, in window.
    pub staging_releases: u64,
}

/// Pull-request statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrStats {
    /// PRs created in the window.
    pub pr_count: u64,
    /// Of those, merged.
    pub merged_count: u64,
    /// `merged / pr_count`; zero when there are no PRs.
    pub merge_rate: f64,
    /// Median hours from creation to merge, over merged PRs.
    pub cycle_time_median_hours: Option<f64>,
    /// Mean hours from creation to merge, over merged PRs.
    pub cycle_time_avg_hours: Option<f64>,
    /// Median hours from creation to first review, over reviewed PRs.
    pub time_to_first_review_median_hours: Option<f64>,
    /// PRs bucketed by total changed lines.
    pub size_distribution: SizeDistribution,
}

/// PR size buckets by `additions + deletions`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeDistribution {
    /// Fewer than 10 changed lines.
    pub xs: u64,
    /// 10 to 99.
    pub s: u64,
    /// 100 to 499.
    pub m: u64,
    /// 500 to 999.
    pub l: u64,
    /// 1000 and up.
    pub xl: u64,
}

impl SizeDistribution {
    fn record(&mut self, changed: u64) {
        match changed {
            0..10 => self.xs += 1,
            10..100 => self.s += 1,
            100..500 => self.m += 1,
            500..1000 => self.l += 1,
            _ => self.xl += 1,
        }
    }
}

/// Review statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewStats {
    /// Total reviews across all PRs.
    pub review_count: u64,
    /// Distinct reviewer logins.
    pub unique_reviewers: u64,
    /// `review_count / pr_count`; zero without PRs.
    pub avg_reviews_per_pr: f64,
    /// Reviewers ranked by review count, descending.
    pub leaderboard: Vec<ReviewerCount>,
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerCount {
    /// Reviewer login.
    pub login: String,
    /// Reviews given.
    pub count: u64,
}

/// Commit/contributor statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitStats {
    /// Total commits across all PRs.
    pub commit_count: u64,
    /// Distinct author logins.
    pub unique_authors: u64,
    /// Per-author rollup.
    pub per_author: BTreeMap<String, AuthorActivity>,
    /// Commits per calendar day.
    pub daily: BTreeMap<NaiveDate, u64>,
}

/// One author's commit rollup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorActivity {
    /// Commit count.
    pub commits: u64,
    /// Lines added, summed.
    pub additions: u64,
    /// Lines deleted, summed.
    pub deletions: u64,
}

/// Compute source-control metrics over a set of PRs and release tags.
///
/// The PR set is deduplicated by `(repo, id)` first, so a team-level call
/// over members' overlapping PR lists counts each PR once.
pub fn compute(prs: &[PullRequest], releases: &[TagRelease]) -> GithubMetrics {
    let deduped = dedup_prs(prs);

    let pr_count = deduped.len() as u64;
    let merged: Vec<&&PullRequest> = deduped.iter().filter(|p| p.merged_at.is_some()).collect();
    let merged_count = merged.len() as u64;

    let cycle_times: Vec<f64> = merged.iter().filter_map(|p| p.cycle_time_hours()).collect();
    let first_reviews: Vec<f64> = deduped
        .iter()
        .filter_map(|p| p.time_to_first_review_hours())
        .collect();

    let mut size_distribution = SizeDistribution::default();
    for pr in &deduped {
        size_distribution.record(pr.change_size());
    }

    let prs_stats = PrStats {
        pr_count,
        merged_count,
        merge_rate: if pr_count == 0 {
            0.0
        } else {
            merged_count as f64 / pr_count as f64
        },
        cycle_time_median_hours: median(&cycle_times),
        cycle_time_avg_hours: average(&cycle_times),
        time_to_first_review_median_hours: median(&first_reviews),
        size_distribution,
    };

    let mut review_counts: BTreeMap<String, u64> = BTreeMap::new();
    let mut review_total = 0u64;
    for pr in &deduped {
        for review in &pr.reviews {
            review_total += 1;
            if !review.author_login.is_empty() {
                *review_counts.entry(review.author_login.clone()).or_default() += 1;
            }
        }
    }
    let mut leaderboard: Vec<ReviewerCount> = review_counts
        .iter()
        .map(|(login, count)| ReviewerCount {
            login: login.clone(),
            count: *count,
        })
        .collect();
    leaderboard.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.login.cmp(&b.login)));

    let reviews = ReviewStats {
        review_count: review_total,
        unique_reviewers: review_counts.len() as u64,
        avg_reviews_per_pr: if pr_count == 0 {
            0.0
        } else {
            review_total as f64 / pr_count as f64
        },
        leaderboard,
    };

    let mut per_author: BTreeMap<String, AuthorActivity> = BTreeMap::new();
    let mut daily: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    let mut commit_count = 0u64;
    for pr in &deduped {
        for commit in &pr.commits {
            commit_count += 1;
            *daily.entry(commit.authored_at.date_naive()).or_default() += 1;
            if commit.author_login.is_empty() {
                continue;
            }
            let entry = per_author.entry(commit.author_login.clone()).or_default();
            entry.commits += 1;
            entry.additions += commit.additions;
            entry.deletions += commit.deletions;
        }
    }

    let commits = CommitStats {
        commit_count,
        unique_authors: per_author.len() as u64,
        per_author,
        daily,
    };

    let production_releases = releases
        .iter()
        .filter(|r| r.environment == Some(ReleaseEnvironment::Production))
        .count() as u64;
    let staging_releases = releases
        .iter()
        .filter(|r| r.environment == Some(ReleaseEnvironment::Staging))
        .count() as u64;

    GithubMetrics {
        prs: prs_stats,
        reviews,
        commits,
        production_releases,
        staging_releases,
    }
}

/// Deduplicate PRs by `(repo, id)`, keeping first occurrence order.
fn dedup_prs(prs: &[PullRequest]) -> Vec<&PullRequest> {
    let mut seen: BTreeSet<(&str, u64)> = BTreeSet::new();
    prs.iter()
        .filter(|pr| seen.insert((pr.repo.as_str(), pr.id)))
        .collect()
}
