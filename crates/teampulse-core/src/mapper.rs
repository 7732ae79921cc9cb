//! Pull-request to deployment mapping.
//!
//! Lead time for changes needs every merged PR joined to its first
//! production deployment. The join runs in two steps:
//!
//! 1. **Tracker-based** (preferred): issue keys extracted from the PR title
//!    and branch are looked up in the issue→fix-version index; the earliest
//!    production version released at or after the merge wins.
//! 2. **Time-based fallback**: the earliest production version of the
//!    *current team* released after the merge. Versions carrying zero
//!    team-assigned issues are removed from the candidate set before this
//!    step, so a PR is never attributed to another team's release train.
//!
//! PRs that map to nothing are excluded from lead-time aggregation but
//! counted in the `mapped_fraction` diagnostic.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::{FixVersion, PullRequest, ReleaseEnvironment};

static ISSUE_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z]+-\d+").expect("issue key pattern compiles"));

/// Extract issue keys from a PR's title and branch name (set union).
///
/// A PR may carry zero, one, or many keys.
pub fn extract_issue_keys(title: &str, branch: &str) -> BTreeSet<String> {
    let mut keys = BTreeSet::new();
    for text in [title, branch] {
        for m in ISSUE_KEY_RE.find_iter(text) {
            keys.insert(m.as_str().to_string());
        }
    }
    keys
}

/// Fill `issue_keys` on freshly collected PRs.
pub fn annotate_issue_keys(prs: &mut [PullRequest]) {
    for pr in prs {
        pr.issue_keys = extract_issue_keys(&pr.title, &pr.branch);
    }
}

/// The deployment a PR was attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedDeployment {
    /// Fix-version name.
    pub version: String,
    /// When the version was released.
    pub deployed_at: DateTime<Utc>,
}

/// Per-collection join index from one team's fix versions.
///
/// Ephemeral: built after the tracker collector finishes, consumed by the
/// lead-time computation, then dropped with the run.
#[derive(Debug)]
pub struct MappingIndex {
    versions: Vec<FixVersion>,
    /// issue key → indices into `versions`.
    by_issue: HashMap<String, Vec<usize>>,
}

impl MappingIndex {
    /// Build the index from a team's fix versions (all environments).
    pub fn build(versions: Vec<FixVersion>) -> Self {
        let mut by_issue: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, version) in versions.iter().enumerate() {
            for key in &version.issues {
                by_issue.entry(key.clone()).or_default().push(idx);
            }
        }
        Self { versions, by_issue }
    }

    /// Give the versions back once mapping is done (the deployment counts
    /// downstream are computed over the same set).
    pub fn into_versions(self) -> Vec<FixVersion> {
        self.versions
    }

    /// Count of team-assigned issues on a version, for diagnostics.
    pub fn team_issue_count(&self, version_name: &str) -> usize {
        self.versions
            .iter()
            .find(|v| v.name == version_name)
            .map_or(0, |v| v.issues.len())
    }

    /// Map one PR to its first production deployment.
    ///
    /// Returns `None` for unmerged PRs and for merged PRs no step could
    /// attribute.
    pub fn map_pr(&self, pr: &PullRequest) -> Option<MappedDeployment> {
        let merged_at = pr.merged_at?;

        if let Some(found) = self.map_by_issue_keys(pr, merged_at) {
            return Some(found);
        }
        self.map_by_time(merged_at)
    }

    /// Tracker-based step: every extracted key's production versions
    /// released at or after the merge, earliest release date wins. Ties
    /// across keys resolve to the earliest as well.
    fn map_by_issue_keys(
        &self,
        pr: &PullRequest,
        merged_at: DateTime<Utc>,
    ) -> Option<MappedDeployment> {
        pr.issue_keys
            .iter()
            .filter_map(|key| self.by_issue.get(key))
            .flatten()
            .map(|&idx| &self.versions[idx])
            .filter(|v| {
                v.environment == ReleaseEnvironment::Production && v.release_date >= merged_at
            })
            .min_by(|a, b| {
                a.release_date
                    .cmp(&b.release_date)
                    .then_with(|| a.name.cmp(&b.name))
            })
            .map(|v| MappedDeployment {
                version: v.name.clone(),
                deployed_at: v.release_date,
            })
    }

    /// Time-based fallback: earliest team production version strictly
    /// after the merge. Versions with no team-assigned issues were cut
    /// from the candidate set before this runs.
    fn map_by_time(&self, merged_at: DateTime<Utc>) -> Option<MappedDeployment> {
        self.versions
            .iter()
            .filter(|v| {
                v.environment == ReleaseEnvironment::Production
                    && !v.issues.is_empty()
                    && v.release_date > merged_at
            })
            .min_by(|a, b| {
                a.release_date
                    .cmp(&b.release_date)
                    .then_with(|| a.name.cmp(&b.name))
            })
            .map(|v| MappedDeployment {
                version: v.name.clone(),
                deployed_at: v.release_date,
            })
    }
}

/// Lead-time inputs plus the mapping diagnostic.
#[derive(Debug, Default)]
pub struct MappingOutcome {
    /// Hours from merge to deployment, one entry per mapped PR.
    pub lead_times_hours: Vec<f64>,
    /// Merged PRs considered.
    pub merged_total: usize,
    /// Merged PRs that mapped to a deployment.
    pub mapped_total: usize,
}

impl MappingOutcome {
    /// Share of merged PRs that mapped, or `None` with no merged PRs.
    pub fn mapped_fraction(&self) -> Option<f64> {
        if self.merged_total == 0 {
            None
        } else {
            Some(self.mapped_total as f64 / self.merged_total as f64)
        }
    }
}

/// Map every merged PR and collect lead-time samples.
pub fn map_merged_prs(prs: &[PullRequest], index: &MappingIndex) -> MappingOutcome {
    let mut outcome = MappingOutcome::default();
    for pr in prs {
        let Some(merged_at) = pr.merged_at else {
            continue;
        };
        outcome.merged_total += 1;
        if let Some(mapped) = index.map_pr(pr) {
            outcome.mapped_total += 1;
            let hours = (mapped.deployed_at - merged_at).num_seconds() as f64 / 3600.0;
            outcome.lead_times_hours.push(hours.max(0.0));
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn version(
        name: &str,
        env: ReleaseEnvironment,
        released: DateTime<Utc>,
        issues: &[&str],
    ) -> FixVersion {
        FixVersion {
            project: "PLAT".into(),
            name: name.into(),
            release_date: released,
            released: true,
            environment: env,
            issues: issues.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    fn merged_pr(id: u64, title: &str, branch: &str, merged: DateTime<Utc>) -> PullRequest {
        let mut pr = PullRequest {
            id,
            repo: "acme/api".into(),
            author_login: "alice".into(),
            title: title.into(),
            branch: branch.into(),
            created_at: merged - chrono::Duration::days(2),
            merged_at: Some(merged),
            closed_at: Some(merged),
            additions: 10,
            deletions: 5,
            reviews: Vec::new(),
            commits: Vec::new(),
            issue_keys: BTreeSet::new(),
        };
        pr.issue_keys = extract_issue_keys(&pr.title, &pr.branch);
        pr
    }

    #[test]
    fn extracts_keys_from_title_and_branch() {
        let keys = extract_issue_keys("PLAT-12 fix checkout", "feature/PAY-9-retry");
        assert_eq!(
            keys,
            BTreeSet::from(["PLAT-12".to_string(), "PAY-9".to_string()])
        );
    }

    #[test]
    fn extraction_is_a_set_union() {
        let keys = extract_issue_keys("PLAT-12 and PLAT-12 again", "PLAT-12-branch");
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn no_keys_is_fine() {
        assert!(extract_issue_keys("fix typo", "chore/typo").is_empty());
    }

    #[test]
    fn lowercase_keys_do_not_match() {
        assert!(extract_issue_keys("plat-12 fix", "fix/plat-12").is_empty());
    }

    #[test]
    fn jira_step_picks_earliest_production_at_or_after_merge() {
        let index = MappingIndex::build(vec![
            version("Live - 6/Oct/2025", ReleaseEnvironment::Production, at(2025, 10, 6), &["PLAT-1"]),
            version("Live - 20/Oct/2025", ReleaseEnvironment::Production, at(2025, 10, 20), &["PLAT-1"]),
            version("Beta - 7/Oct/2025", ReleaseEnvironment::Staging, at(2025, 10, 7), &["PLAT-1"]),
        ]);
        let pr = merged_pr(1, "PLAT-1 ship it", "plat-1", at(2025, 10, 2));
        let mapped = index.map_pr(&pr).unwrap();
        assert_eq!(mapped.version, "Live - 6/Oct/2025");
    }

    #[test]
    fn multiple_keys_resolve_to_earliest_release() {
        let index = MappingIndex::build(vec![
            version("Live - 6/Oct/2025", ReleaseEnvironment::Production, at(2025, 10, 6), &["PLAT-1"]),
            version("Live - 20/Oct/2025", ReleaseEnvironment::Production, at(2025, 10, 20), &["PAY-2"]),
        ]);
        let pr = merged_pr(1, "PLAT-1 PAY-2 combined", "mixed", at(2025, 10, 2));
        assert_eq!(index.map_pr(&pr).unwrap().version, "Live - 6/Oct/2025");
    }

    #[test]
    fn staging_versions_never_win() {
        let index = MappingIndex::build(vec![version(
            "Beta - 7/Oct/2025",
            ReleaseEnvironment::Staging,
            at(2025, 10, 7),
            &["PLAT-1"],
        )]);
        let pr = merged_pr(1, "PLAT-1 fix", "plat-1", at(2025, 10, 2));
        assert!(index.map_pr(&pr).is_none());
    }

    #[test]
    fn fallback_requires_team_issues_on_version() {
        // The competing team's 25 versions carry no issues assigned to this
        // team, so the fallback only ever considers the team's own versions.
        let mut versions = vec![version(
            "Live - 20/Oct/2025",
            ReleaseEnvironment::Production,
            at(2025, 10, 20),
            &["PLAT-9"],
        )];
        for day in 1..=25 {
            versions.push(version(
                &format!("Acme_Other_2025_10_{day:02}"),
                ReleaseEnvironment::Production,
                at(2025, 10, day),
                &[],
            ));
        }
        let index = MappingIndex::build(versions);

        // No issue keys: jira step yields nothing, time fallback runs
        let pr = merged_pr(1, "refactor pipeline", "chore/refactor", at(2025, 10, 2));
        let mapped = index.map_pr(&pr).unwrap();
        assert_eq!(mapped.version, "Live - 20/Oct/2025");
    }

    #[test]
    fn fallback_is_strictly_after_merge() {
        let index = MappingIndex::build(vec![version(
            "Live - 6/Oct/2025",
            ReleaseEnvironment::Production,
            at(2025, 10, 6),
            &["PLAT-1"],
        )]);
        // Merged at the exact release instant: tier-2 would accept (>=)
        // but the fallback requires strictly-later
        let pr = merged_pr(1, "no keys here", "chore/x", at(2025, 10, 6));
        assert!(index.map_pr(&pr).is_none());
    }

    #[test]
    fn unmerged_prs_never_map() {
        let index = MappingIndex::build(vec![version(
            "Live - 6/Oct/2025",
            ReleaseEnvironment::Production,
            at(2025, 10, 6),
            &["PLAT-1"],
        )]);
        let mut pr = merged_pr(1, "PLAT-1 fix", "plat-1", at(2025, 10, 2));
        pr.merged_at = None;
        assert!(index.map_pr(&pr).is_none());
    }

    #[test]
    fn mapping_is_stable_under_release_reordering() {
        let a = version("Live - 6/Oct/2025", ReleaseEnvironment::Production, at(2025, 10, 6), &["PLAT-1"]);
        let b = version("Live - 20/Oct/2025", ReleaseEnvironment::Production, at(2025, 10, 20), &["PLAT-1"]);
        let c = version("Live - 1/Nov/2025", ReleaseEnvironment::Production, at(2025, 11, 1), &["PLAT-1"]);

        let pr = merged_pr(1, "PLAT-1 fix", "plat-1", at(2025, 10, 2));

        let forward = MappingIndex::build(vec![a.clone(), b.clone(), c.clone()]);
        let backward = MappingIndex::build(vec![c, b, a]);
        assert_eq!(forward.map_pr(&pr), backward.map_pr(&pr));
    }

    #[test]
    fn team_issue_count_reflects_assignments() {
        let index = MappingIndex::build(vec![
            version("Live - 6/Oct/2025", ReleaseEnvironment::Production, at(2025, 10, 6), &["PLAT-1", "PLAT-2"]),
            version("Acme_Other_2025_10_07", ReleaseEnvironment::Production, at(2025, 10, 7), &[]),
        ]);
        assert_eq!(index.team_issue_count("Live - 6/Oct/2025"), 2);
        assert_eq!(index.team_issue_count("Acme_Other_2025_10_07"), 0);
        assert_eq!(index.team_issue_count("nope"), 0);
    }

    #[test]
    fn outcome_counts_mapped_fraction() {
        let index = MappingIndex::build(vec![version(
            "Live - 20/Oct/2025",
            ReleaseEnvironment::Production,
            at(2025, 10, 20),
            &["PLAT-1"],
        )]);
        let prs = vec![
            merged_pr(1, "PLAT-1 mapped", "plat-1", at(2025, 10, 2)),
            merged_pr(2, "no keys, fallback hits", "chore", at(2025, 10, 3)),
            merged_pr(3, "merged after everything", "late", at(2025, 10, 25)),
        ];
        let outcome = map_merged_prs(&prs, &index);
        assert_eq!(outcome.merged_total, 3);
        assert_eq!(outcome.mapped_total, 2);
        assert!((outcome.mapped_fraction().unwrap() - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(outcome.lead_times_hours.len(), 2);
    }

    #[test]
    fn empty_outcome_has_no_fraction() {
        assert!(MappingOutcome::default().mapped_fraction().is_none());
    }
}
