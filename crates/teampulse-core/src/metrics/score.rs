//! Composite performance score.
//!
//! Ten inputs, min-max normalized across the peer set (team members for
//! person scores, teams for the comparison view). Lower-is-better inputs
//! are inverted after normalization; volume inputs are divided by team
//! size before it, so a ten-person team is not "better" than a four-person
//! team by headcount alone. The final score is Σ weight · 100 · normalized.

use serde::{Deserialize, Serialize};

use crate::config::PerformanceWeights;

/// One peer's raw score inputs, in canonical order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreInputs {
    /// PRs opened (volume).
    pub prs: f64,
    /// Reviews given (volume).
    pub reviews: f64,
    /// Commits authored (volume).
    pub commits: f64,
    /// Median PR cycle time in hours (lower is better).
    pub cycle_time_hours: f64,
    /// Merge rate in `[0, 1]`.
    pub merge_rate: f64,
    /// Tracker issues completed (volume).
    pub jira_completed: f64,
    /// Deployments per week.
    pub deployments_per_week: f64,
    /// Median lead time in hours (lower is better).
    pub lead_time_hours: f64,
    /// Change failure rate in `[0, 1]` (lower is better).
    pub change_failure_rate: f64,
    /// Median time to restore in hours (lower is better).
    pub mttr_hours: f64,
}

/// Which inputs are inverted after normalization, in canonical order.
const INVERTED: [bool; 10] = [
    false, // prs
    false, // reviews
    false, // commits
    true,  // cycle_time
    false, // merge_rate
    false, // jira_completed
    false, // deployment_frequency
    true,  // lead_time
    true,  // change_failure_rate
    true,  // mttr
];

impl ScoreInputs {
    /// The inputs in canonical order.
    pub const fn as_array(&self) -> [f64; 10] {
        [
            self.prs,
            self.reviews,
            self.commits,
            self.cycle_time_hours,
            self.merge_rate,
            self.jira_completed,
            self.deployments_per_week,
            self.lead_time_hours,
            self.change_failure_rate,
            self.mttr_hours,
        ]
    }

    /// Divide the volume inputs by the team size.
    ///
    /// Person-level scoring passes `1.0` (no-op); team comparison passes
    /// each team's member count.
    pub fn per_member(&self, team_size: f64) -> Self {
        let size = team_size.max(1.0);
        Self {
            prs: self.prs / size,
            reviews: self.reviews / size,
            commits: self.commits / size,
            jira_completed: self.jira_completed / size,
            ..*self
        }
    }
}

/// Min-max normalize a peer column into `[0, 1]`.
///
/// When every peer shares one value there is no spread to rank on; each
/// gets 0.5 so the input contributes a flat 50.
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let Some(min) = values.iter().copied().reduce(f64::min) else {
        return Vec::new();
    };
    let max = values.iter().copied().fold(min, f64::max);
    let spread = max - min;
    if spread.abs() < f64::EPSILON {
        return vec![0.5; values.len()];
    }
    values.iter().map(|v| (v - min) / spread).collect()
}

/// Score every peer against the peer set.
///
/// Inputs must already be size-scaled via [`ScoreInputs::per_member`].
/// Returns one score per peer, in input order, each in `[0, 100]` for
/// weights summing to one.
pub fn compute_scores(peers: &[ScoreInputs], weights: &PerformanceWeights) -> Vec<f64> {
    if peers.is_empty() {
        return Vec::new();
    }
    let weight_values = weights.as_array();
    let mut scores = vec![0.0; peers.len()];

    for input_idx in 0..10 {
        let column: Vec<f64> = peers.iter().map(|p| p.as_array()[input_idx]).collect();
        let normalized = min_max_normalize(&column);
        for (peer_idx, value) in normalized.iter().enumerate() {
            let oriented = if INVERTED[input_idx] {
                1.0 - value
            } else {
                *value
            };
            scores[peer_idx] += weight_values[input_idx] * 100.0 * oriented;
        }
    }

    scores
}
