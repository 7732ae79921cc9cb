//! The four DORA indicators and their classification.
//!
//! Deployments are the team's production fix versions inside the window.
//! Lead time joins merged PRs to those deployments through the mapper;
//! change failure rate correlates incidents to deployments by tag reference
//! or a 24-hour time window; MTTR is the incident resolution median.
//!
//! Indicators that cannot be computed (no mapped PR, no incidents filter)
//! are reported unavailable — distinct from zero — and excluded from the
//! overall roll-up.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::{median, percentile};
use crate::mapper::MappingOutcome;
use crate::model::{FixVersion, Issue, ReleaseEnvironment};
use crate::range::DateRange;

/// DORA performance band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoraLevel {
    /// Top band.
    Elite,
    /// Second band.
    High,
    /// Third band.
    Medium,
    /// Bottom band.
    Low,
}

impl DoraLevel {
    /// Rank for comparisons; higher is better.
    pub const fn rank(self) -> u8 {
        match self {
            Self::Elite => 3,
            Self::High => 2,
            Self::Medium => 1,
            Self::Low => 0,
        }
    }
}

impl std::fmt::Display for DoraLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Elite => "elite",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        };
        write!(f, "{s}")
    }
}

/// Average weeks per month, for the one-per-month frequency boundary.
const WEEKS_PER_MONTH: f64 = 52.0 / 12.0;

/// Incidents created this long after a deployment correlate to it.
const CFR_CORRELATION_WINDOW: Duration = Duration::hours(24);

/// Deployment frequency over the window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentFrequency {
    /// Production deployments in the window.
    pub total_deployments: u64,
    /// Deployments per week.
    pub per_week: f64,
    /// Band.
    pub level: DoraLevel,
}

/// Lead time for changes over the window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadTime {
    /// Median hours from merge to deployment.
    pub median_hours: f64,
    /// 95th percentile hours.
    pub p95_hours: f64,
    /// Share of merged PRs that mapped to a deployment.
    pub mapped_fraction: Option<f64>,
    /// Band, classified on the median.
    pub level: DoraLevel,
}

/// Change failure rate over the window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeFailureRate {
    /// Deployments with a correlated incident.
    pub failed_deployments: u64,
    /// All production deployments in the window.
    pub total_deployments: u64,
    /// `failed / total`.
    pub rate: f64,
    /// Band.
    pub level: DoraLevel,
}

/// Mean time to restore over the window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mttr {
    /// Resolved incidents considered.
    pub incident_count: u64,
    /// Median resolution hours.
    pub median_hours: f64,
    /// 95th percentile resolution hours.
    pub p95_hours: f64,
    /// Band, classified on the median.
    pub level: DoraLevel,
}

/// The four indicators plus the roll-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoraMetrics {
    /// Deployment frequency. Always computable (possibly zero).
    pub deployment_frequency: DeploymentFrequency,
    /// Lead time; unavailable when no PR mapped to any deployment.
    pub lead_time: Option<LeadTime>,
    /// CFR; unavailable without an incidents filter or deployments.
    pub change_failure_rate: Option<ChangeFailureRate>,
    /// MTTR; unavailable without incidents.
    pub mttr: Option<Mttr>,
    /// Aggregate band over the available indicators.
    pub overall: DoraLevel,
}

/// Compute all four indicators.
///
/// `incidents` is `None` when no incidents filter is configured — CFR and
/// MTTR are then unavailable rather than zero.
pub fn compute(
    versions: &[FixVersion],
    mapping: &MappingOutcome,
    incidents: Option<&[Issue]>,
    window: &DateRange,
) -> DoraMetrics {
    let deployments: Vec<&FixVersion> = versions
        .iter()
        .filter(|v| {
            v.environment == ReleaseEnvironment::Production && window.contains(v.release_date)
        })
        .collect();

    let deployment_frequency = frequency(deployments.len() as u64, window);
    let lead_time = lead_time(mapping);
    let change_failure_rate = incidents.and_then(|inc| cfr(&deployments, inc));
    let mttr = incidents.and_then(mttr);

    let overall = overall_level(&[
        Some(deployment_frequency.level),
        lead_time.as_ref().map(|l| l.level),
        change_failure_rate.as_ref().map(|c| c.level),
        mttr.as_ref().map(|m| m.level),
    ]);

    DoraMetrics {
        deployment_frequency,
        lead_time,
        change_failure_rate,
        mttr,
        overall,
    }
}

fn frequency(total: u64, window: &DateRange) -> DeploymentFrequency {
    let per_week = total as f64 / window.weeks();
    DeploymentFrequency {
        total_deployments: total,
        per_week,
        level: classify_deployment_frequency(per_week),
    }
}

fn lead_time(mapping: &MappingOutcome) -> Option<LeadTime> {
    let median_hours = median(&mapping.lead_times_hours)?;
    let p95_hours = percentile(&mapping.lead_times_hours, 95.0)?;
    Some(LeadTime {
        median_hours,
        p95_hours,
        mapped_fraction: mapping.mapped_fraction(),
        level: classify_lead_time(median_hours),
    })
}

fn cfr(deployments: &[&FixVersion], incidents: &[Issue]) -> Option<ChangeFailureRate> {
    if deployments.is_empty() {
        return None;
    }
    let failed = deployments
        .iter()
        .filter(|v| incidents.iter().any(|i| correlated(i, v)))
        .count() as u64;
    let total = deployments.len() as u64;
    let rate = failed as f64 / total as f64;
    Some(ChangeFailureRate {
        failed_deployments: failed,
        total_deployments: total,
        rate,
        level: classify_change_failure_rate(rate),
    })
}

fn mttr(incidents: &[Issue]) -> Option<Mttr> {
    let hours: Vec<f64> = incidents
        .iter()
        .filter_map(Issue::resolution_time_hours)
        .collect();
    let median_hours = median(&hours)?;
    let p95_hours = percentile(&hours, 95.0)?;
    Some(Mttr {
        incident_count: hours.len() as u64,
        median_hours,
        p95_hours,
        level: classify_mttr(median_hours),
    })
}

/// Whether an incident belongs to a deployment: it names the deployment in
/// its labels, summary, or description, or it was created within 24 hours
/// after the release.
pub fn correlated(incident: &Issue, version: &FixVersion) -> bool {
    if references_tag(incident, &version.name) {
        return true;
    }
    let delta = incident.created - version.release_date;
    delta > Duration::zero() && delta <= CFR_CORRELATION_WINDOW
}

fn references_tag(incident: &Issue, tag: &str) -> bool {
    let needle = tag.to_ascii_lowercase();
    incident
        .labels
        .iter()
        .map(String::as_str)
        .chain([incident.summary.as_str()])
        .chain(incident.description.as_deref())
        .any(|haystack| haystack.to_ascii_lowercase().contains(&needle))
}

/// Classify deployments per week.
pub fn classify_deployment_frequency(per_week: f64) -> DoraLevel {
    if per_week >= 7.0 {
        DoraLevel::Elite
    } else if per_week >= 1.0 {
        DoraLevel::High
    } else if per_week >= 1.0 / WEEKS_PER_MONTH {
        DoraLevel::Medium
    } else {
        DoraLevel::Low
    }
}

/// Classify median merge-to-deploy hours.
pub fn classify_lead_time(median_hours: f64) -> DoraLevel {
    if median_hours < 24.0 {
        DoraLevel::Elite
    } else if median_hours < 168.0 {
        DoraLevel::High
    } else if median_hours < 720.0 {
        DoraLevel::Medium
    } else {
        DoraLevel::Low
    }
}

/// Classify the failed-deployment share.
pub fn classify_change_failure_rate(rate: f64) -> DoraLevel {
    if rate < 0.15 {
        DoraLevel::Elite
    } else if rate < 0.20 {
        DoraLevel::High
    } else if rate < 0.30 {
        DoraLevel::Medium
    } else {
        DoraLevel::Low
    }
}

/// Classify median incident resolution hours.
pub fn classify_mttr(median_hours: f64) -> DoraLevel {
    if median_hours < 1.0 {
        DoraLevel::Elite
    } else if median_hours < 24.0 {
        DoraLevel::High
    } else if median_hours < 168.0 {
        DoraLevel::Medium
    } else {
        DoraLevel::Low
    }
}

/// Roll four (possibly unavailable) bands into one.
///
/// Elite needs three Elites; High needs two Elites or three of
/// Elite/High; two Lows pull the aggregate to Low; anything else is
/// Medium. Unavailable indicators count toward neither side.
pub fn overall_level(levels: &[Option<DoraLevel>]) -> DoraLevel {
    let available: Vec<DoraLevel> = levels.iter().flatten().copied().collect();
    let elites = available.iter().filter(|l| **l == DoraLevel::Elite).count();
    let highs = available.iter().filter(|l| **l == DoraLevel::High).count();
    let lows = available.iter().filter(|l| **l == DoraLevel::Low).count();

    if elites >= 3 {
        DoraLevel::Elite
    } else if elites >= 2 || elites + highs >= 3 {
        DoraLevel::High
    } else if lows >= 2 {
        DoraLevel::Low
    } else {
        DoraLevel::Medium
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use proptest::prelude::*;

    fn at(m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, m, d, 12, 0, 0).unwrap()
    }

    fn version(name: &str, env: ReleaseEnvironment, released: DateTime<Utc>) -> FixVersion {
        FixVersion {
            project: "PLAT".into(),
            name: name.into(),
            release_date: released,
            released: true,
            environment: env,
            issues: ["PLAT-1".to_string()].into(),
        }
    }

    fn incident(key: &str, created: DateTime<Utc>, resolved_hours: Option<i64>) -> Issue {
        Issue {
            key: key.into(),
            summary: "checkout down".into(),
            description: None,
            project: "PLAT".into(),
            issue_type: "Incident".into(),
            priority: Some("Highest".into()),
            status: "Done".into(),
            status_category: "Done".into(),
            assignee: Some("alice.t".into()),
            reporter: None,
            created,
            resolved: resolved_hours.map(|h| created + Duration::hours(h)),
            labels: Vec::new(),
            fix_versions: Default::default(),
            time_in_todo_hours: 0.0,
            time_in_progress_hours: 0.0,
            time_in_review_hours: 0.0,
        }
    }

    fn thirty_day_window() -> DateRange {
        DateRange::parse("30d", at(11, 2)).unwrap()
    }

    #[test]
    fn deployment_frequency_counts_production_only() {
        // S2: Live 6/Oct + Live 20/Oct + Live 1/Nov in window, Beta excluded
        let versions = vec![
            version("Live - 6/Oct/2025", ReleaseEnvironment::Production, at(10, 6)),
            version("Beta - 7/Oct/2025", ReleaseEnvironment::Staging, at(10, 7)),
            version("Live - 20/Oct/2025", ReleaseEnvironment::Production, at(10, 20)),
            version("Live - 1/Nov/2025", ReleaseEnvironment::Production, at(11, 1)),
        ];
        let metrics = compute(
            &versions,
            &MappingOutcome::default(),
            None,
            &thirty_day_window(),
        );
        assert_eq!(metrics.deployment_frequency.total_deployments, 3);
        // ~0.7/week lands in the one-per-month band
        assert_eq!(metrics.deployment_frequency.level, DoraLevel::Medium);
        // No incidents filter: CFR and MTTR are unavailable, not zero
        assert!(metrics.change_failure_rate.is_none());
        assert!(metrics.mttr.is_none());
    }

    #[test]
    fn lead_time_unavailable_when_nothing_mapped() {
        let metrics = compute(&[], &MappingOutcome::default(), None, &thirty_day_window());
        assert!(metrics.lead_time.is_none());
    }

    #[test]
    fn lead_time_median_over_mapped_prs() {
        let mapping = MappingOutcome {
            lead_times_hours: vec![10.0, 20.0, 90.0],
            merged_total: 4,
            mapped_total: 3,
        };
        let metrics = compute(&[], &mapping, None, &thirty_day_window());
        let lead = metrics.lead_time.unwrap();
        assert!((lead.median_hours - 20.0).abs() < 1e-9);
        assert_eq!(lead.level, DoraLevel::Elite);
        assert!((lead.mapped_fraction.unwrap() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn cfr_correlates_by_time_window() {
        let versions = vec![version(
            "Live - 6/Oct/2025",
            ReleaseEnvironment::Production,
            at(10, 6),
        )];
        // 6 hours after the release
        let incidents = vec![incident("OPS-1", at(10, 6) + Duration::hours(6), Some(2))];
        let metrics = compute(
            &versions,
            &MappingOutcome::default(),
            Some(&incidents),
            &thirty_day_window(),
        );
        let cfr = metrics.change_failure_rate.unwrap();
        assert_eq!(cfr.failed_deployments, 1);
        assert_eq!(cfr.total_deployments, 1);
        assert_eq!(cfr.level, DoraLevel::Low);
    }

    #[test]
    fn cfr_time_correlation_is_bounded_at_24h() {
        let v = version("Live - 6/Oct/2025", ReleaseEnvironment::Production, at(10, 6));
        let before = incident("OPS-1", at(10, 6) - Duration::hours(1), None);
        let at_25h = incident("OPS-2", at(10, 6) + Duration::hours(25), None);
        let at_23h = incident("OPS-3", at(10, 6) + Duration::hours(23), None);
        assert!(!correlated(&before, &v));
        assert!(!correlated(&at_25h, &v));
        assert!(correlated(&at_23h, &v));
    }

    #[test]
    fn cfr_correlates_by_tag_reference() {
        let v = version("Live - 6/Oct/2025", ReleaseEnvironment::Production, at(10, 6));
        let mut tagged = incident("OPS-1", at(10, 20), None);
        tagged.summary = "Regression introduced by Live - 6/Oct/2025".into();
        assert!(correlated(&tagged, &v));

        let mut labeled = incident("OPS-2", at(10, 20), None);
        labeled.labels = vec!["live - 6/oct/2025".into()];
        assert!(correlated(&labeled, &v));
    }

    #[test]
    fn mttr_unavailable_without_resolved_incidents() {
        let incidents = vec![incident("OPS-1", at(10, 6), None)];
        let metrics = compute(
            &[],
            &MappingOutcome::default(),
            Some(&incidents),
            &thirty_day_window(),
        );
        assert!(metrics.mttr.is_none());
    }

    #[test]
    fn mttr_median_and_band() {
        let incidents = vec![
            incident("OPS-1", at(10, 6), Some(2)),
            incident("OPS-2", at(10, 8), Some(12)),
            incident("OPS-3", at(10, 9), Some(300)),
        ];
        let metrics = compute(
            &[],
            &MappingOutcome::default(),
            Some(&incidents),
            &thirty_day_window(),
        );
        let mttr = metrics.mttr.unwrap();
        assert_eq!(mttr.incident_count, 3);
        assert!((mttr.median_hours - 12.0).abs() < 1e-9);
        assert_eq!(mttr.level, DoraLevel::High);
    }

    #[test]
    fn overall_rollup_rules() {
        use DoraLevel::{Elite, High, Low, Medium};
        let lvl = |slice: &[DoraLevel]| {
            overall_level(&slice.iter().map(|l| Some(*l)).collect::<Vec<_>>())
        };
        assert_eq!(lvl(&[Elite, Elite, Elite, Low]), Elite);
        assert_eq!(lvl(&[Elite, Elite, Low, Low]), High);
        assert_eq!(lvl(&[Elite, High, High, Low]), High);
        assert_eq!(lvl(&[Medium, Low, Low, Medium]), Low);
        assert_eq!(lvl(&[Medium, Medium, High, Low]), Medium);
    }

    #[test]
    fn unavailable_indicators_do_not_count() {
        use DoraLevel::{Elite, Low};
        // Two Elites of two available: High, not dragged down by the missing pair
        assert_eq!(
            overall_level(&[Some(Elite), Some(Elite), None, None]),
            DoraLevel::High
        );
        // A single Low with everything else missing is Medium
        assert_eq!(overall_level(&[Some(Low), None, None, None]), DoraLevel::Medium);
    }

    proptest! {
        #[test]
        fn classification_is_monotone_in_lead_time(a in 0.0f64..5000.0, b in 0.0f64..5000.0) {
            let (better, worse) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(
                classify_lead_time(better).rank() >= classify_lead_time(worse).rank()
            );
        }

        #[test]
        fn classification_is_monotone_in_frequency(a in 0.0f64..50.0, b in 0.0f64..50.0) {
            let (worse, better) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(
                classify_deployment_frequency(better).rank()
                    >= classify_deployment_frequency(worse).rank()
            );
        }

        #[test]
        fn classification_is_monotone_in_cfr(a in 0.0f64..1.0, b in 0.0f64..1.0) {
            let (better, worse) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(
                classify_change_failure_rate(better).rank()
                    >= classify_change_failure_rate(worse).rank()
            );
        }

        #[test]
        fn classification_is_monotone_in_mttr(a in 0.0f64..5000.0, b in 0.0f64..5000.0) {
            let (better, worse) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(classify_mttr(better).rank() >= classify_mttr(worse).rank());
        }

        #[test]
        fn time_correlation_window_invariant(offset_hours in -100i64..100) {
            let v = version("Live - 6/Oct/2025", ReleaseEnvironment::Production, at(10, 6));
            let inc = incident("OPS-9", at(10, 6) + Duration::hours(offset_hours), None);
            let expected = offset_hours > 0 && offset_hours <= 24;
            // The fixed summary never mentions the tag, so only the time rule applies
            prop_assert_eq!(correlated(&inc, &v), expected);
        }
    }
}
