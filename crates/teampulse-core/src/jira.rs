//! Issue-tracker collector.
//!
//! REST client for the tracker with smart adaptive pagination: every search
//! counts first (`maxResults=0`), then picks a batch size and whether to
//! fetch the changelog from the total. Large result sets drop history to
//! keep the upstream from timing out; `huge_dataset_threshold = 0` forces
//! history off for every search.
//!
//! Per-batch retries cover 502/503/504 with a fixed delay. When retries
//! exhaust the collector returns whatever was fetched and flags the batch
//! as partial — callers proceed with partial data rather than failing the
//! run.

use std::collections::BTreeSet;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::config::{PaginationConfig, TrackerEnvironment};
use crate::error::{CollectError, CollectResult};
use crate::model::{FixVersion, Issue, parse_release_name};
use crate::range::DateRange;
use crate::scheduler::backoff_sleep;

/// Person queries that time out fall back to this window.
const PERSON_FALLBACK_DAYS: i64 = 30;

/// Search results below this always fit one batch, with history.
const SMALL_TOTAL: u64 = 500;
/// Boundary between 500-sized and 1000-sized batches.
const MEDIUM_TOTAL: u64 = 2000;
/// Above this, history is dropped regardless of configuration.
const HISTORY_CEILING: u64 = 5000;

/// How one search will be paginated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    /// Page size for every batch.
    pub batch_size: u32,
    /// Whether `expand=changelog` is requested.
    pub include_history: bool,
}

impl BatchPlan {
    /// Choose batch size and history from the counted total.
    ///
    /// With adaptive pagination off, the configured `batch_size` is used
    /// as-is and history follows the caller's request.
    pub fn for_total(total: u64, want_history: bool, cfg: &PaginationConfig) -> Self {
        if !cfg.enabled {
            return Self {
                batch_size: cfg.batch_size,
                include_history: want_history,
            };
        }

        let batch_size = if total <= MEDIUM_TOTAL { 500 } else { 1000 };
        // A configured threshold only ever lowers the ceiling; zero is the
        // force-off sentinel.
        let cutoff = match cfg.huge_dataset_threshold {
            0 => 0,
            t => u64::from(t).min(HISTORY_CEILING),
        };
        Self {
            batch_size,
            include_history: want_history && total <= cutoff,
        }
    }

    /// Number of batches needed for a counted total.
    pub fn batches_for(&self, total: u64) -> u64 {
        if total == 0 {
            0
        } else {
            total.div_ceil(u64::from(self.batch_size))
        }
    }
}

/// What a paginated search produced.
#[derive(Debug)]
pub struct IssueBatch {
    /// Issues in upstream order.
    pub issues: Vec<Issue>,
    /// True when retries exhausted before every batch arrived.
    pub partial: bool,
    /// Whether changelog history was fetched (transition times are zero
    /// without it).
    pub history_included: bool,
}

/// What a person query produced.
#[derive(Debug)]
pub struct PersonIssues {
    /// Issues assigned to the person.
    pub issues: Vec<Issue>,
    /// Degradation marker, e.g. `fallback:30d`, when a fallback was taken.
    pub degraded: Option<String>,
}

/// REST client for one tracker environment.
#[derive(Debug, Clone)]
pub struct JiraCollector {
    client: reqwest::Client,
    base_url: String,
    auth_header: String,
    pagination: PaginationConfig,
    cancel: CancellationToken,
}

impl JiraCollector {
    /// Build the collector for an environment.
    pub fn new(
        env: &TrackerEnvironment,
        pagination: PaginationConfig,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> CollectResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(20)
            .user_agent(concat!("teampulse/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CollectError::Transient {
                context: "client".to_string(),
                status: None,
                message: e.to_string(),
            })?;
        let credentials = format!("{}:{}", env.username, env.api_token);
        let auth_header = format!("Basic {}", STANDARD.encode(credentials));
        Ok(Self {
            client,
            base_url: env.server.trim_end_matches('/').to_string(),
            auth_header,
            pagination,
            cancel,
        })
    }

    /// Count issues matching a JQL query without fetching any.
    #[instrument(skip(self, jql))]
    pub async fn count_issues(&self, jql: &str) -> CollectResult<u64> {
        let response: SearchResponse = self
            .get_json(
                "count",
                "/rest/api/2/search",
                &[("jql", jql), ("maxResults", "0")],
            )
            .await?;
        Ok(response.total)
    }

    /// Search with adaptive pagination. Counts first, then batches.
    #[instrument(skip(self, jql), fields(history = want_history))]
    pub async fn search(&self, jql: &str, want_history: bool) -> CollectResult<IssueBatch> {
        let total = self.count_issues(jql).await?;
        let plan = BatchPlan::for_total(total, want_history, &self.pagination);
        debug!(
            total,
            batch_size = plan.batch_size,
            history = plan.include_history,
            batches = plan.batches_for(total),
            "search planned"
        );

        let mut issues = Vec::with_capacity(total.min(10_000) as usize);
        let mut partial = false;
        let mut start_at: u64 = 0;

        while start_at < total {
            let max_results = plan.batch_size.to_string();
            let start = start_at.to_string();
            let mut params = vec![
                ("jql", jql),
                ("startAt", start.as_str()),
                ("maxResults", max_results.as_str()),
            ];
            if plan.include_history {
                params.push(("expand", "changelog"));
            }

            match self
                .get_json::<SearchResponse>("search", "/rest/api/2/search", &params)
                .await
            {
                Ok(page) => {
                    let fetched = page.issues.len() as u64;
                    issues.extend(page.issues.into_iter().filter_map(IssueDto::into_model));
                    if fetched == 0 {
                        break; // upstream shrank under us
                    }
                    start_at += fetched;
                }
                Err(CollectError::Cancelled) => return Err(CollectError::Cancelled),
                Err(err) => {
                    warn!(error = %err, start_at, "batch failed after retries, keeping partial results");
                    partial = true;
                    break;
                }
            }
        }

        Ok(IssueBatch {
            issues,
            partial,
            history_included: plan.include_history,
        })
    }

    /// Run a stored filter, windowed with the anti-noise clause.
    #[instrument(skip(self, window))]
    pub async fn filter(&self, id: u64, window: &DateRange) -> CollectResult<IssueBatch> {
        let stored: FilterResponse = self
            .get_json("filter", &format!("/rest/api/2/filter/{id}"), &[])
            .await?;
        let jql = with_anti_noise(&stored.jql, window);
        self.search(&jql, true).await
    }

    /// Fetch the released fix versions of a project, restricted to the
    /// recognized name patterns, with issue sets filtered to team assignees.
    ///
    /// Skips versions not yet released or dated in the future — both
    /// conditions must hold for a version to count as a deployment.
    #[instrument(skip(self, team_members))]
    pub async fn releases(
        &self,
        project_key: &str,
        team_members: &BTreeSet<String>,
        now: DateTime<Utc>,
    ) -> CollectResult<Vec<FixVersion>> {
        let versions: Vec<VersionDto> = self
            .get_json(
                "versions",
                &format!("/rest/api/2/project/{project_key}/versions"),
                &[],
            )
            .await?;

        let mut releases = Vec::new();
        for version in versions {
            let Some(kept) = keep_version(&version, now) else {
                continue;
            };

            // Fetch the version's issues with the full field set. Asking
            // for `key` alone corrupts the response in the upstream
            // library; fetching full fields is the documented workaround.
            let jql = format!(
                "project = \"{}\" AND fixVersion = \"{}\"",
                project_key,
                version.name.replace('"', "\\\"")
            );
            let batch = self.search(&jql, false).await?;

            let issues: BTreeSet<String> = batch
                .issues
                .into_iter()
                .filter(|issue| {
                    issue
                        .assignee
                        .as_deref()
                        .is_some_and(|a| team_members.contains(a))
                })
                .map(|issue| issue.key)
                .collect();

            releases.push(FixVersion {
                project: project_key.to_string(),
                name: version.name,
                release_date: kept.release_date,
                released: true,
                environment: kept.environment,
                issues,
            });
        }

        releases.sort_by_key(|v| v.release_date);
        debug!(project = project_key, count = releases.len(), "versions collected");
        Ok(releases)
    }

    /// Run the incidents filter and keep only recognized incident types.
    ///
    /// Classification is strictly by type — priority and labels never
    /// qualify an issue as an incident.
    #[instrument(skip(self, window, incident_types))]
    pub async fn incidents(
        &self,
        filter_id: u64,
        window: &DateRange,
        incident_types: &[String],
    ) -> CollectResult<IssueBatch> {
        let mut batch = self.filter(filter_id, window).await?;
        batch
            .issues
            .retain(|issue| is_incident_type(&issue.issue_type, incident_types));
        Ok(batch)
    }

    /// Issues assigned to one person in the window.
    ///
    /// When the upstream keeps timing out on the full window, falls back to
    /// the trailing 30 days and marks the result degraded.
    #[instrument(skip(self, window))]
    pub async fn person_query(
        &self,
        login: &str,
        window: &DateRange,
    ) -> CollectResult<PersonIssues> {
        let jql = person_jql(login, window);
        match self.search(&jql, false).await {
            Ok(batch) => Ok(PersonIssues {
                issues: batch.issues,
                degraded: batch.partial.then(|| "partial".to_string()),
            }),
            Err(CollectError::Cancelled) => Err(CollectError::Cancelled),
            Err(err) if err.is_transient() => {
                warn!(login, error = %err, "person query timed out, falling back to 30d window");
                let fallback = DateRange::parse(
                    &format!("{PERSON_FALLBACK_DAYS}d"),
                    window.end(),
                )
                .map_err(|e| CollectError::Decode {
                    context: "person-fallback".to_string(),
                    message: e.to_string(),
                })?;
                let batch = self.search(&person_jql(login, &fallback), false).await?;
                Ok(PersonIssues {
                    issues: batch.issues,
                    degraded: Some(format!("fallback:{PERSON_FALLBACK_DAYS}d")),
                })
            }
            Err(err) => Err(err),
        }
    }

    /// GET a JSON endpoint with fixed-delay retries on 502/503/504 and
    /// transport errors, bounded by the configured retry count.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        context: &str,
        path: &str,
        params: &[(&str, &str)],
    ) -> CollectResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let delay = Duration::from_secs(self.pagination.retry_delay_seconds);
        let mut attempt: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Err(CollectError::Cancelled);
            }

            match self.get_once(context, &url, params).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.pagination.max_retries => {
                    warn!(
                        context,
                        attempt = attempt + 1,
                        delay_secs = delay.as_secs(),
                        error = %err,
                        "transient tracker error, retrying"
                    );
                    backoff_sleep(&self.cancel, delay).await?;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn get_once<T: serde::de::DeserializeOwned>(
        &self,
        context: &str,
        url: &str,
        params: &[(&str, &str)],
    ) -> CollectResult<T> {
        let response = self
            .client
            .get(url)
            .header("Authorization", &self.auth_header)
            .query(params)
            .send()
            .await
            .map_err(|e| CollectError::transport(context, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollectError::from_status(context, status.as_u16(), &body));
        }

        response
            .json()
            .await
            .map_err(|e| CollectError::transport(context, &e))
    }
}

/// Augment a stored filter's JQL with the anti-noise clause.
///
/// The clause keeps items touched inside the window while excluding bulk
/// admin edits to long-closed issues: resolved items only qualify through
/// `created`/`resolved`, not `updated`.
pub fn with_anti_noise(jql: &str, window: &DateRange) -> String {
    let start = window.start().format("%Y-%m-%d");
    format!(
        "({jql}) AND (created >= \"{start}\" OR resolved >= \"{start}\" \
         OR (statusCategory != Done AND updated >= \"{start}\"))"
    )
}

fn person_jql(login: &str, window: &DateRange) -> String {
    with_anti_noise(&format!("assignee = \"{login}\""), window)
}

fn is_incident_type(issue_type: &str, incident_types: &[String]) -> bool {
    incident_types
        .iter()
        .any(|t| t.eq_ignore_ascii_case(issue_type))
}

struct KeptVersion {
    release_date: DateTime<Utc>,
    environment: crate::model::ReleaseEnvironment,
}

/// Tier-one and tier-two version filtering: released, dated in the past,
/// and named by a recognized pattern.
fn keep_version(version: &VersionDto, now: DateTime<Utc>) -> Option<KeptVersion> {
    if !version.released.unwrap_or(false) {
        return None;
    }
    let release_date = version
        .release_date
        .as_deref()
        .and_then(parse_jira_datetime)?;
    if release_date > now {
        return None;
    }
    let parsed = parse_release_name(&version.name)?;
    Some(KeptVersion {
        release_date,
        environment: parsed.environment,
    })
}

/// Parse the tracker's timestamp shapes: RFC 3339, the legacy
/// `%Y-%m-%dT%H:%M:%S.%3f%z`, and bare dates.
pub fn parse_jira_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| chrono::TimeZone::from_utc_datetime(&Utc, &naive))
}

// ──────────────────────────────────────────────
// Wire types
// ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    issues: Vec<IssueDto>,
}

#[derive(Debug, Deserialize)]
struct FilterResponse {
    jql: String,
}

#[derive(Debug, Deserialize)]
struct VersionDto {
    name: String,
    released: Option<bool>,
    #[serde(rename = "releaseDate")]
    release_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IssueDto {
    key: String,
    fields: FieldsDto,
    changelog: Option<ChangelogDto>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FieldsDto {
    summary: Option<String>,
    description: Option<String>,
    project: Option<ProjectDto>,
    issuetype: Option<NamedDto>,
    priority: Option<NamedDto>,
    status: Option<StatusDto>,
    assignee: Option<UserDto>,
    reporter: Option<UserDto>,
    created: Option<String>,
    resolutiondate: Option<String>,
    labels: Vec<String>,
    #[serde(rename = "fixVersions")]
    fix_versions: Vec<NamedDto>,
}

#[derive(Debug, Deserialize)]
struct ProjectDto {
    key: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct NamedDto {
    name: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct StatusDto {
    name: String,
    #[serde(rename = "statusCategory")]
    status_category: Option<NamedDto>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct UserDto {
    name: Option<String>,
    #[serde(rename = "displayName")]
    display_name: Option<String>,
}

impl UserDto {
    fn login(self) -> Option<String> {
        self.name.or(self.display_name)
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ChangelogDto {
    histories: Vec<HistoryDto>,
}

#[derive(Debug, Deserialize)]
struct HistoryDto {
    created: String,
    #[serde(default)]
    items: Vec<HistoryItemDto>,
}

#[derive(Debug, Deserialize)]
struct HistoryItemDto {
    field: String,
    #[serde(rename = "fromString")]
    from_string: Option<String>,
}

impl IssueDto {
    fn into_model(self) -> Option<Issue> {
        let created = self
            .fields
            .created
            .as_deref()
            .and_then(parse_jira_datetime)?;
        let resolved = self
            .fields
            .resolutiondate
            .as_deref()
            .and_then(parse_jira_datetime);
        let (todo, progress, review) = self
            .changelog
            .as_ref()
            .map(|log| status_durations(created, log))
            .unwrap_or_default();

        let project = self
            .fields
            .project
            .map(|p| p.key)
            .unwrap_or_else(|| self.key.split('-').next().unwrap_or_default().to_string());

        Some(Issue {
            summary: self.fields.summary.unwrap_or_default(),
            description: self.fields.description,
            key: self.key,
            project,
            issue_type: self.fields.issuetype.map(|t| t.name).unwrap_or_default(),
            priority: self.fields.priority.map(|p| p.name),
            status: self
                .fields
                .status
                .as_ref()
                .map(|s| s.name.clone())
                .unwrap_or_default(),
            status_category: self
                .fields
                .status
                .and_then(|s| s.status_category)
                .map(|c| c.name)
                .unwrap_or_default(),
            assignee: self.fields.assignee.and_then(UserDto::login),
            reporter: self.fields.reporter.and_then(UserDto::login),
            created,
            resolved,
            labels: self.fields.labels,
            fix_versions: self
                .fields
                .fix_versions
                .into_iter()
                .map(|v| v.name)
                .collect(),
            time_in_todo_hours: todo,
            time_in_progress_hours: progress,
            time_in_review_hours: review,
        })
    }
}

/// Accumulate hours per status bucket from the changelog.
///
/// Each status transition closes an interval attributed to the status the
/// issue was leaving; the final interval runs to resolution when there is
/// one, otherwise it stays open and is not counted.
fn status_durations(
    created: DateTime<Utc>,
    log: &ChangelogDto,
) -> (f64, f64, f64) {
    let mut transitions: Vec<(DateTime<Utc>, &str)> = Vec::new();
    for history in &log.histories {
        let Some(at) = parse_jira_datetime(&history.created) else {
            continue;
        };
        for item in &history.items {
            if item.field == "status"
                && let Some(from) = item.from_string.as_deref()
            {
                transitions.push((at, from));
            }
        }
    }
    transitions.sort_by_key(|(at, _)| *at);

    let mut todo = 0.0;
    let mut progress = 0.0;
    let mut review = 0.0;
    let mut interval_start = created;

    // The interval after the final transition belongs to the terminal
    // status (usually done-category) and is attributed nowhere.
    for (at, from_status) in transitions {
        let hours = (at - interval_start).num_seconds().max(0) as f64 / 3600.0;
        match bucket_of(from_status) {
            StatusBucket::Todo => todo += hours,
            StatusBucket::Progress => progress += hours,
            StatusBucket::Review => review += hours,
        }
        interval_start = at;
    }

    (todo, progress, review)
}

enum StatusBucket {
    Todo,
    Progress,
    Review,
}

fn bucket_of(status: &str) -> StatusBucket {
    let lower = status.to_ascii_lowercase();
    if lower.contains("review") || lower.contains("qa") {
        StatusBucket::Review
    } else if lower.contains("progress") || lower.contains("develop") {
        StatusBucket::Progress
    } else {
        StatusBucket::Todo
    }
}
