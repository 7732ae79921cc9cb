//! Configuration loading, discovery, and validation.
//!
//! This module provides configuration file discovery by:
//! 1. Walking up from the current directory to find project config
//! 2. Loading user config from XDG config directory
//! 3. Merging with sensible defaults
//!
//! # Supported formats
//!
//! The following configuration file formats are supported:
//! - TOML (`.toml`)
//! - YAML (`.yaml`, `.yml`)
//! - JSON (`.json`)
//!
//! # Config file locations (in order of precedence, highest first):
//! - `.teampulse.<ext>` in current directory or any parent
//! - `teampulse.<ext>` in current directory or any parent
//! - `~/.config/teampulse/config.<ext>` (user config)
//!
//! Loading and validation are separate steps: [`ConfigLoader::load`] merges
//! sources and deserializes; [`Config::validate`] applies the fail-fast
//! rules (credentials present, teams well-formed, tunables in range, weights
//! summing to one) and is called by the collection entry point before any
//! network traffic.

use std::collections::{BTreeMap, BTreeSet};

use camino::{Utf8Path, Utf8PathBuf};
use figment::Figment;
use figment::providers::{Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// The configuration for teampulse.
///
/// Deserialized from config files found during discovery (TOML, YAML, or
/// JSON). Collection refuses to start until [`Config::validate`] passes.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Log level for the application (e.g., "debug", "info", "warn", "error").
    pub log_level: LogLevel,
    /// Directory for JSONL log files (falls back to platform defaults if unset).
    pub log_dir: Option<Utf8PathBuf>,
    /// Source-control host credentials.
    pub source_control: SourceControlConfig,
    /// Issue-tracker environments and pagination tuning.
    pub tracker: TrackerConfig,
    /// Teams under measurement.
    pub teams: Vec<TeamConfig>,
    /// Fan-out worker counts.
    pub parallel_collection: ParallelConfig,
    /// Composite performance-score weights.
    pub performance_weights: PerformanceWeights,
    /// Run-level tunables: data dir, deadlines, timeouts, incident types.
    pub collection: CollectionConfig,
}

/// Source-control host credentials. One credential set per deployment.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct SourceControlConfig {
    /// API token.
    pub token: String,
    /// Organization whose repositories are discovered.
    pub organization: String,
    /// GraphQL endpoint override, mainly for tests.
    pub api_url: Option<String>,
}

/// Issue-tracker configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct TrackerConfig {
    /// Named environments (`prod`, `uat`, …), each with its own endpoint.
    pub environments: BTreeMap<String, TrackerEnvironment>,
    /// Adaptive pagination tuning shared by all environments.
    pub pagination: PaginationConfig,
}

/// One tracker environment.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct TrackerEnvironment {
    /// Base URL of the tracker instance.
    pub server: String,
    /// Login for basic auth.
    pub username: String,
    /// API token for basic auth.
    pub api_token: String,
    /// Days to shift the effective query window back, for environments
    /// that lag production (applies to BOTH collectors).
    pub time_offset_days: u32,
}

/// Adaptive pagination tuning for the tracker collector.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct PaginationConfig {
    /// Whether adaptive sizing is on. When off, every search uses
    /// `batch_size` with history.
    pub enabled: bool,
    /// Fixed batch size used when adaptive sizing is off.
    pub batch_size: u32,
    /// Result-count boundary above which history is dropped.
    /// `0` forces history off for every search.
    pub huge_dataset_threshold: u32,
    /// Per-batch retry bound for 502/503/504.
    pub max_retries: u32,
    /// Fixed delay between batch retries.
    pub retry_delay_seconds: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            batch_size: 500,
            huge_dataset_threshold: 5000,
            max_retries: 5,
            retry_delay_seconds: 5,
        }
    }
}

/// A team under measurement.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct TeamConfig {
    /// Unique team name; also the snapshot key for team metrics.
    pub name: String,
    /// Team members. At least one.
    pub members: Vec<Member>,
    /// Which discovered repositories belong to this team.
    pub repo_selector: RepoSelector,
    /// Named tracker filters (`wip`, `bugs`, `completed`, `incidents`, …)
    /// mapped to stored filter ids.
    pub filter_ids: BTreeMap<String, u64>,
    /// Tracker project keys the team releases under, in preference order.
    pub project_keys: Vec<String>,
}

impl TeamConfig {
    /// Stored filter id for work-in-progress queries.
    pub fn wip_filter(&self) -> Option<u64> {
        self.filter_ids.get("wip").copied()
    }

    /// Stored filter id for bug queries.
    pub fn bugs_filter(&self) -> Option<u64> {
        self.filter_ids.get("bugs").copied()
    }

    /// Stored filter id for completed-work queries.
    pub fn completed_filter(&self) -> Option<u64> {
        self.filter_ids.get("completed").copied()
    }

    /// Stored filter id for incident queries. Absent means the change
    /// failure rate and MTTR are reported unavailable.
    pub fn incidents_filter(&self) -> Option<u64> {
        self.filter_ids.get("incidents").copied()
    }

    /// Tracker logins of all members.
    pub fn tracker_logins(&self) -> BTreeSet<String> {
        self.members
            .iter()
            .map(|m| m.tracker_login.clone())
            .collect()
    }

    /// Source-control logins of all members.
    pub fn sc_logins(&self) -> BTreeSet<String> {
        self.members.iter().map(|m| m.sc_login.clone()).collect()
    }
}

/// Selects a team's repositories out of the organization listing.
///
/// A repository belongs to the team when any clause matches: an exact name,
/// a name prefix, or a repository topic. All comparisons are
/// case-insensitive.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct RepoSelector {
    /// Exact repository names.
    pub names: Vec<String>,
    /// Repository name prefixes.
    pub prefixes: Vec<String>,
    /// Repository topics.
    pub topics: Vec<String>,
}

impl RepoSelector {
    /// Whether a repository with this name and topic set belongs here.
    pub fn matches(&self, name: &str, topics: &[String]) -> bool {
        let name_lower = name.to_ascii_lowercase();
        if self
            .names
            .iter()
            .any(|n| n.eq_ignore_ascii_case(&name_lower))
        {
            return true;
        }
        if self
            .prefixes
            .iter()
            .any(|p| name_lower.starts_with(&p.to_ascii_lowercase()))
        {
            return true;
        }
        self.topics.iter().any(|wanted| {
            topics
                .iter()
                .any(|topic| topic.eq_ignore_ascii_case(wanted))
        })
    }

    /// True when no clause is configured; such a team gets no repositories.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.prefixes.is_empty() && self.topics.is_empty()
    }
}

/// One person, with their two upstream identities.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Member {
    /// Display name used in reports.
    pub name: String,
    /// Login on the source-control host.
    pub sc_login: String,
    /// Login on the issue tracker.
    pub tracker_login: String,
}

/// Fan-out worker counts per scheduler layer.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ParallelConfig {
    /// Master switch; `false` forces sequential execution everywhere.
    pub enabled: bool,
    /// Concurrent teams.
    pub team_workers: usize,
    /// Concurrent repositories within a team.
    pub repo_workers: usize,
    /// Concurrent person queries within a team.
    pub person_workers: usize,
    /// Concurrent tracker filters within a team.
    pub filter_workers: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            team_workers: 3,
            repo_workers: 5,
            person_workers: 8,
            filter_workers: 4,
        }
    }
}

impl ParallelConfig {
    /// Effective limit for a layer: the configured count, or 1 when the
    /// degradation switch is off.
    pub const fn effective(&self, workers: usize) -> usize {
        if self.enabled { workers } else { 1 }
    }
}

/// Weights of the ten composite-score inputs. Must be nonnegative and sum
/// to 1.0 within ±0.01.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PerformanceWeights {
    /// Pull requests opened (volume, divided by team size).
    pub prs: f64,
    /// Reviews given (volume).
    pub reviews: f64,
    /// Commits authored (volume).
    pub commits: f64,
    /// PR cycle time (inverted; lower is better).
    pub cycle_time: f64,
    /// Merge rate.
    pub merge_rate: f64,
    /// Tracker issues completed (volume).
    pub jira_completed: f64,
    /// Deployments per week.
    pub deployment_frequency: f64,
    /// Lead time for changes (inverted).
    pub lead_time: f64,
    /// Change failure rate (inverted).
    pub change_failure_rate: f64,
    /// Mean time to restore (inverted).
    pub mttr: f64,
}

impl Default for PerformanceWeights {
    fn default() -> Self {
        Self {
            prs: 0.15,
            reviews: 0.10,
            commits: 0.10,
            cycle_time: 0.10,
            merge_rate: 0.10,
            jira_completed: 0.15,
            deployment_frequency: 0.10,
            lead_time: 0.10,
            change_failure_rate: 0.05,
            mttr: 0.05,
        }
    }
}

impl PerformanceWeights {
    /// The weights in canonical input order.
    pub const fn as_array(&self) -> [f64; 10] {
        [
            self.prs,
            self.reviews,
            self.commits,
            self.cycle_time,
            self.merge_rate,
            self.jira_completed,
            self.deployment_frequency,
            self.lead_time,
            self.change_failure_rate,
            self.mttr,
        ]
    }

    /// Sum of all weights.
    pub fn sum(&self) -> f64 {
        self.as_array().iter().sum()
    }
}

/// Tolerance on the weight sum.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

/// Run-level collection tunables.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct CollectionConfig {
    /// Directory snapshots are written to. Defaults to the XDG data dir.
    pub data_dir: Option<Utf8PathBuf>,
    /// Deadline for a whole collection run.
    pub max_collection_minutes: u64,
    /// Per-request timeout for the tracker client.
    pub jira_timeout_seconds: u64,
    /// Per-request timeout for the source-control client.
    pub github_timeout_seconds: u64,
    /// Issue types that qualify as incidents. Priority and labels never do.
    pub incident_types: Vec<String>,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            max_collection_minutes: 30,
            jira_timeout_seconds: 60,
            github_timeout_seconds: 30,
            incident_types: vec!["Incident".to_string(), "GCS Escalation".to_string()],
        }
    }
}

/// Log level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose output for debugging and development.
    Debug,
    /// Standard operational information (default).
    #[default]
    Info,
    /// Warnings about potential issues.
    Warn,
    /// Errors that indicate failures.
    Error,
}

impl LogLevel {
    /// Returns the log level as a lowercase string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl Config {
    /// Look up a tracker environment by name.
    pub fn environment(&self, name: &str) -> Option<&TrackerEnvironment> {
        self.tracker.environments.get(name)
    }

    /// Apply the fail-fast validation rules. Returns the first violation.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.source_control.token.trim().is_empty() {
            return Err(invalid("source_control.token is empty"));
        }
        if self.source_control.organization.trim().is_empty() {
            return Err(invalid("source_control.organization is empty"));
        }
        if self.tracker.environments.is_empty() {
            return Err(invalid("tracker.environments has no entries"));
        }
        for (name, env) in &self.tracker.environments {
            if env.server.trim().is_empty() {
                return Err(invalid(&format!(
                    "tracker environment {name}: server is empty"
                )));
            }
            if env.username.trim().is_empty() || env.api_token.trim().is_empty() {
                return Err(invalid(&format!(
                    "tracker environment {name}: username/api_token incomplete"
                )));
            }
        }

        self.validate_teams()?;
        self.validate_tunables()?;

        if self.performance_weights.as_array().iter().any(|w| *w < 0.0) {
            return Err(invalid("performance_weights: weights must be nonnegative"));
        }
        let sum = self.performance_weights.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(invalid(&format!(
                "performance_weights sum to {sum:.3}, expected 1.0 \u{b1} {WEIGHT_SUM_TOLERANCE}"
            )));
        }

        Ok(())
    }

    fn validate_teams(&self) -> ConfigResult<()> {
        let mut names = BTreeSet::new();
        for team in &self.teams {
            if team.name.trim().is_empty() {
                return Err(invalid("team with empty name"));
            }
            if !names.insert(team.name.as_str()) {
                return Err(invalid(&format!("duplicate team name {:?}", team.name)));
            }
            if team.members.is_empty() {
                return Err(invalid(&format!("team {:?} has no members", team.name)));
            }
            let mut sc = BTreeSet::new();
            let mut tracker = BTreeSet::new();
            for member in &team.members {
                if member.sc_login.trim().is_empty() || member.tracker_login.trim().is_empty() {
                    return Err(invalid(&format!(
                        "team {:?}: member {:?} is missing a login",
                        team.name, member.name
                    )));
                }
                if !sc.insert(member.sc_login.as_str()) {
                    return Err(invalid(&format!(
                        "team {:?}: duplicate source-control login {:?}",
                        team.name, member.sc_login
                    )));
                }
                if !tracker.insert(member.tracker_login.as_str()) {
                    return Err(invalid(&format!(
                        "team {:?}: duplicate tracker login {:?}",
                        team.name, member.tracker_login
                    )));
                }
            }
        }
        Ok(())
    }

    fn validate_tunables(&self) -> ConfigResult<()> {
        let p = &self.parallel_collection;
        for (label, value) in [
            ("team_workers", p.team_workers),
            ("repo_workers", p.repo_workers),
            ("person_workers", p.person_workers),
            ("filter_workers", p.filter_workers),
        ] {
            if !(1..=64).contains(&value) {
                return Err(invalid(&format!(
                    "parallel_collection.{label} = {value}, expected 1-64"
                )));
            }
        }
        let pg = &self.tracker.pagination;
        if !(1..=1000).contains(&pg.batch_size) {
            return Err(invalid(&format!(
                "tracker.pagination.batch_size = {}, expected 1-1000",
                pg.batch_size
            )));
        }
        if pg.max_retries > 10 {
            return Err(invalid("tracker.pagination.max_retries exceeds 10"));
        }
        if !(1..=300).contains(&pg.retry_delay_seconds) {
            return Err(invalid(
                "tracker.pagination.retry_delay_seconds out of 1-300",
            ));
        }
        let c = &self.collection;
        if !(1..=720).contains(&c.max_collection_minutes) {
            return Err(invalid("collection.max_collection_minutes out of 1-720"));
        }
        if !(1..=3600).contains(&c.jira_timeout_seconds) {
            return Err(invalid("collection.jira_timeout_seconds out of 1-3600"));
        }
        if !(1..=3600).contains(&c.github_timeout_seconds) {
            return Err(invalid("collection.github_timeout_seconds out of 1-3600"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}

/// Supported configuration file extensions (in order of preference).
const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Application name for XDG directory lookup and config file names.
const APP_NAME: &str = "teampulse";

/// Builder for loading configuration from multiple sources.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Starting directory for project config search.
    project_search_root: Option<Utf8PathBuf>,
    /// Whether to include user config from XDG directory.
    include_user_config: bool,
    /// Stop searching when we hit a directory containing this file/dir.
    boundary_marker: Option<String>,
    /// Explicit config files to load (for testing or programmatic use).
    explicit_files: Vec<Utf8PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader with default settings.
    pub fn new() -> Self {
        Self {
            project_search_root: None,
            include_user_config: true,
            boundary_marker: Some(".git".to_string()),
            explicit_files: Vec::new(),
        }
    }

    /// Set the starting directory for project config search.
    ///
    /// The loader will walk up from this directory looking for config files.
    pub fn with_project_search<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.project_search_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set whether to include user config from `~/.config/teampulse/`.
    pub const fn with_user_config(mut self, include: bool) -> Self {
        self.include_user_config = include;
        self
    }

    /// Set a boundary marker to stop directory traversal.
    ///
    /// When walking up directories, stop if we find a directory containing
    /// this file or directory name. Default is `.git`.
    pub fn with_boundary_marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.boundary_marker = Some(marker.into());
        self
    }

    /// Disable boundary marker (search all the way to filesystem root).
    pub fn without_boundary_marker(mut self) -> Self {
        self.boundary_marker = None;
        self
    }

    /// Add an explicit config file to load.
    ///
    /// Files are loaded in order, with later files taking precedence.
    /// Explicit files are loaded after discovered files.
    pub fn with_file<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.explicit_files.push(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration, merging all discovered sources.
    ///
    /// Precedence (highest to lowest):
    /// 1. Explicit files (in order added via `with_file`)
    /// 2. Project config (closest to search root)
    /// 3. User config (`~/.config/teampulse/config.<ext>`)
    /// 4. Default values
    ///
    /// Validation is a separate step; see [`Config::validate`].
    #[tracing::instrument(skip(self), fields(search_root = ?self.project_search_root))]
    pub fn load(self) -> ConfigResult<Config> {
        tracing::debug!("loading configuration");
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Start with user config (lowest precedence of file sources)
        if self.include_user_config
            && let Some(user_config) = self.find_user_config()
        {
            figment = Self::merge_file(figment, &user_config);
        }

        // Add project config
        if let Some(ref root) = self.project_search_root
            && let Some(project_config) = self.find_project_config(root)
        {
            figment = Self::merge_file(figment, &project_config);
        }

        // Add explicit files (highest precedence)
        for file in &self.explicit_files {
            figment = Self::merge_file(figment, file);
        }

        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::Deserialize(Box::new(e)))?;
        tracing::info!(
            log_level = config.log_level.as_str(),
            teams = config.teams.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Load configuration, returning an error if no config file is found.
    pub fn load_or_error(self) -> ConfigResult<Config> {
        let has_user = self.include_user_config && self.find_user_config().is_some();
        let has_project = self
            .project_search_root
            .as_ref()
            .and_then(|root| self.find_project_config(root))
            .is_some();
        let has_explicit = !self.explicit_files.is_empty();

        if !has_user && !has_project && !has_explicit {
            return Err(ConfigError::NotFound);
        }

        self.load()
    }

    /// Find project config by walking up from the given directory.
    fn find_project_config(&self, start: &Utf8Path) -> Option<Utf8PathBuf> {
        let mut current = Some(start.to_path_buf());

        while let Some(dir) = current {
            // Check for boundary marker
            if let Some(ref marker) = self.boundary_marker {
                let marker_path = dir.join(marker);
                if marker_path.exists() && dir != start {
                    // Found boundary in a parent dir, stop searching
                    break;
                }
            }

            // Check for config files in this directory (try each extension)
            for ext in CONFIG_EXTENSIONS {
                // Try dotfile first (.teampulse.toml)
                let dotfile = dir.join(format!(".{APP_NAME}.{ext}"));
                if dotfile.is_file() {
                    return Some(dotfile);
                }

                // Then try regular name (teampulse.toml)
                let regular = dir.join(format!("{APP_NAME}.{ext}"));
                if regular.is_file() {
                    return Some(regular);
                }
            }

            current = dir.parent().map(Utf8Path::to_path_buf);
        }

        None
    }

    /// Find user config in XDG config directory.
    fn find_user_config(&self) -> Option<Utf8PathBuf> {
        let proj_dirs = directories::ProjectDirs::from("", "", APP_NAME)?;
        let config_dir = proj_dirs.config_dir();

        // Try each supported extension
        for ext in CONFIG_EXTENSIONS {
            let config_path = config_dir.join(format!("config.{ext}"));
            if config_path.is_file() {
                return Utf8PathBuf::from_path_buf(config_path).ok();
            }
        }

        None
    }

    /// Merge a config file into the figment, detecting format from extension.
    fn merge_file(figment: Figment, path: &Utf8Path) -> Figment {
        match path.extension() {
            Some("toml") => figment.merge(Toml::file_exact(path.as_str())),
            Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path.as_str())),
            Some("json") => figment.merge(Json::file_exact(path.as_str())),
            _ => figment.merge(Toml::file_exact(path.as_str())),
        }
    }
}

/// Find the project config file path without loading it.
///
/// Useful for commands that need to know where config is located.
pub fn find_project_config<P: AsRef<Utf8Path>>(start: P) -> Option<Utf8PathBuf> {
    ConfigLoader::new()
        .with_project_search(start.as_ref())
        .without_boundary_marker()
        .find_project_config(start.as_ref())
}

/// Get the project directories for XDG-compliant path resolution.
///
/// Returns `None` if the home directory cannot be determined.
fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

/// Get the user config directory path.
///
/// Returns `~/.config/teampulse/` on Linux, `~/Library/Application Support/teampulse/`
/// on macOS, and equivalent on other platforms.
pub fn user_config_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.config_dir().to_path_buf()).ok()
}

/// Get the user cache directory path.
///
/// Returns `~/.cache/teampulse/` on Linux, `~/Library/Caches/teampulse/`
/// on macOS, and equivalent on other platforms. The repository-list cache
/// lives here.
pub fn user_cache_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.cache_dir().to_path_buf()).ok()
}

/// Get the user data directory path.
///
/// Returns `~/.local/share/teampulse/` on Linux, `~/Library/Application Support/teampulse/`
/// on macOS, and equivalent on other platforms. Snapshots default to here.
pub fn user_data_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.data_dir().to_path_buf()).ok()
}

/// Get the local data directory path (machine-specific, not synced).
pub fn user_data_local_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.data_local_dir().to_path_buf()).ok()
}
