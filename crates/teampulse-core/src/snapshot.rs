//! Snapshot records and the range-keyed store.
//!
//! A snapshot is the sealed artifact of one collection run: every
//! precomputed metric for every team and person, keyed by
//! `(range_label, environment)`. The dashboard only ever reads snapshots;
//! nothing mutates one after it is written.
//!
//! Writes are atomic (temp file + rename in the same directory) and gated
//! by a validation check: a run that collected zero source-control records
//! across all configured teams must not clobber a prior good snapshot.

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{SnapshotError, SnapshotResult};
use crate::metrics::dora::{DoraLevel, DoraMetrics};
use crate::metrics::github::GithubMetrics;
use crate::metrics::jira::JiraMetrics;
use crate::scheduler::TaskFailure;

/// The window a snapshot was collected over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeInfo {
    /// Canonical range label.
    pub label: String,
    /// Effective window start (offset already applied).
    pub start: DateTime<Utc>,
    /// Effective window end.
    pub end: DateTime<Utc>,
    /// Window length in days.
    pub days: i64,
    /// Environment offset that produced the effective window.
    pub time_offset_days: u32,
}

/// Everything computed for one team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMetrics {
    /// Source-control metrics.
    pub github: GithubMetrics,
    /// Tracker metrics.
    pub jira: JiraMetrics,
    /// The DORA four plus roll-up.
    pub dora: DoraMetrics,
    /// Composite score against the other teams.
    pub performance_score: f64,
    /// Member count.
    pub size: usize,
    /// The window the metrics cover.
    pub date_range_info: RangeInfo,
    /// Degradation markers accumulated during collection.
    pub degraded: Vec<String>,
}

impl TeamMetrics {
    /// Raw source-control records backing this team's metrics.
    pub const fn source_records(&self) -> u64 {
        self.github.prs.pr_count
            + self.github.commits.commit_count
            + self.github.production_releases
            + self.github.staging_releases
    }
}

/// Everything computed for one person.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonMetrics {
    /// Display name from configuration.
    pub display_name: String,
    /// Team the person belongs to.
    pub team: String,
    /// Source-control metrics over the person's own activity.
    pub github: GithubMetrics,
    /// Reviews given (from the host's reviewer search).
    pub reviews_given: u64,
    /// Tracker issues the person resolved in the window.
    pub jira_completed: u64,
    /// Composite score against their teammates.
    pub performance_score: f64,
    /// Degradation markers, e.g. `fallback:30d`.
    pub degraded: Vec<String>,
}

/// One row of the cross-team comparison table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamSummary {
    /// Composite score against the other teams.
    pub performance_score: f64,
    /// DORA roll-up band.
    pub overall_level: DoraLevel,
    /// PRs in window.
    pub pr_count: u64,
    /// Issues resolved in window.
    pub throughput: u64,
    /// Production deployments per week.
    pub deployments_per_week: f64,
}

/// Operator-facing diagnostics attached to the snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunDiagnostics {
    /// Every captured task failure, across all layers.
    pub errors: Vec<TaskFailure>,
    /// Count of partial results (retries exhausted mid-dataset).
    pub partial_results: u64,
    /// Run duration in seconds.
    pub elapsed_seconds: f64,
}

/// The sealed artifact of one collection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Canonical range label (key component).
    pub range_label: String,
    /// Environment name (key component).
    pub environment: String,
    /// Wall clock at write time.
    pub timestamp: DateTime<Utc>,
    /// Per-team metrics.
    pub teams: BTreeMap<String, TeamMetrics>,
    /// Per-person metrics, keyed by source-control login.
    pub persons: BTreeMap<String, PersonMetrics>,
    /// Cross-team comparison.
    pub comparison: BTreeMap<String, TeamSummary>,
    /// Collection diagnostics.
    pub diagnostics: RunDiagnostics,
}

impl Snapshot {
    /// The pre-write validation check.
    ///
    /// With at least one team configured, a run that produced zero
    /// source-control records everywhere is treated as a collection
    /// failure, not an empty quarter — the error names each team.
    pub fn validate(&self) -> Result<(), String> {
        if self.teams.is_empty() {
            return Ok(());
        }
        let total: u64 = self.teams.values().map(TeamMetrics::source_records).sum();
        if total > 0 {
            return Ok(());
        }
        let detail = self
            .teams
            .keys()
            .map(|name| format!("{name}: 0 source-control records"))
            .collect::<Vec<_>>()
            .join(", ");
        Err(detail)
    }
}

/// Listing entry for an existing snapshot file.
#[derive(Debug, Clone)]
pub struct SnapshotEntry {
    /// Range label.
    pub range_label: String,
    /// Environment.
    pub environment: String,
    /// Write timestamp.
    pub timestamp: DateTime<Utc>,
    /// File path.
    pub path: Utf8PathBuf,
}

/// Range-keyed snapshot store on the local filesystem.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: Utf8PathBuf,
}

impl SnapshotStore {
    /// Store rooted at a data directory.
    pub const fn new(dir: Utf8PathBuf) -> Self {
        Self { dir }
    }

    /// The file a `(range, env)` pair maps to. Distinct pairs never share
    /// a file.
    pub fn path_for(&self, range_label: &str, environment: &str) -> Utf8PathBuf {
        // Custom-range labels carry a ':' which is not filename-safe
        let range = range_label.replace(':', "-");
        self.dir
            .join(format!("metrics_cache_{range}_{environment}.json"))
    }

    /// Validate and atomically write a snapshot.
    ///
    /// On validation failure nothing is touched: any prior snapshot for
    /// the same key stays on disk and the error carries the per-team
    /// detail for the run summary.
    #[instrument(skip(self, snapshot), fields(range = %snapshot.range_label, env = %snapshot.environment))]
    pub fn write(&self, snapshot: &Snapshot) -> SnapshotResult<Utf8PathBuf> {
        if let Err(detail) = snapshot.validate() {
            return Err(SnapshotError::Validation(detail));
        }

        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&snapshot.range_label, &snapshot.environment);

        // Write-to-temp + rename: readers see the old file in full or the
        // new file in full, never a torn write. The temp file must live in
        // the target directory for the rename to stay atomic.
        let mut temp = tempfile::NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut temp, snapshot)?;
        temp.persist(path.as_std_path())
            .map_err(|e| SnapshotError::Io(e.error))?;

        info!(%path, teams = snapshot.teams.len(), "snapshot sealed");
        Ok(path)
    }

    /// Read the snapshot for a `(range, env)` pair.
    pub fn read(&self, range_label: &str, environment: &str) -> SnapshotResult<Snapshot> {
        let path = self.path_for(range_label, environment);
        let bytes = std::fs::read(&path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                SnapshotError::NotFound {
                    range: range_label.to_string(),
                    env: environment.to_string(),
                }
            } else {
                SnapshotError::Io(err)
            }
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Enumerate existing snapshots, newest first.
    pub fn list(&self) -> SnapshotResult<Vec<SnapshotEntry>> {
        let mut entries = Vec::new();
        let read_dir = match std::fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
            Err(err) => return Err(err.into()),
        };

        for entry in read_dir {
            let entry = entry?;
            let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) else {
                continue;
            };
            if !is_snapshot_file(&path) {
                continue;
            }
            match std::fs::read(&path)
                .map_err(SnapshotError::from)
                .and_then(|bytes| Ok(serde_json::from_slice::<Snapshot>(&bytes)?))
            {
                Ok(snapshot) => entries.push(SnapshotEntry {
                    range_label: snapshot.range_label,
                    environment: snapshot.environment,
                    timestamp: snapshot.timestamp,
                    path,
                }),
                Err(err) => {
                    debug!(%path, error = %err, "skipping unreadable snapshot");
                }
            }
        }

        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(entries)
    }
}

fn is_snapshot_file(path: &Utf8Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.starts_with("metrics_cache_") && name.ends_with(".json"))
}
