//! Collection pipeline — one run, one snapshot.
//!
//! Orchestrates the whole flow: resolve the effective window for the
//! environment, load or discover the repository list, fan out per team
//! (repositories, persons, and tracker filters each under their own worker
//! bound), join the records into metrics, seal the snapshot, and publish
//! `DATA_COLLECTED`.
//!
//! Collection is tolerant by construction: a failed repository, person, or
//! filter becomes a diagnostic record, never an abort. The only hard stops
//! are startup validation, cancellation, and the snapshot validation gate.

use std::collections::BTreeMap;
use std::time::Duration;

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::{Config, Member, TeamConfig};
use crate::error::{CollectError, CollectResult, ConfigError, PipelineError, PipelineResult};
use crate::events::{Event, EventBus};
use crate::github::{GithubCollector, PersonActivity, RepoData};
use crate::jira::{IssueBatch, JiraCollector};
use crate::mapper::{self, MappingIndex};
use crate::metrics::{dora, github as github_metrics, jira as jira_metrics, score};
use crate::model::{FixVersion, Issue, PullRequest, Repository, TagRelease};
use crate::range::DateRange;
use crate::repo_cache::RepoListCache;
use crate::scheduler::{LayerOutcome, TaskFailure, run_layer};
use crate::snapshot::{
    PersonMetrics, RangeInfo, RunDiagnostics, Snapshot, SnapshotStore, TeamMetrics, TeamSummary,
};

/// What to collect.
#[derive(Debug, Clone)]
pub struct CollectionOptions {
    /// Range spec, e.g. `90d` (see the range parser).
    pub range_spec: String,
    /// Tracker environment name, e.g. `prod`.
    pub environment: String,
}

/// One team's one-line failure for the run summary.
#[derive(Debug, Clone)]
pub struct TeamFailure {
    /// Team name.
    pub team: String,
    /// One-line reason.
    pub reason: String,
}

/// What a collection run produced, for the operator-facing summary.
#[derive(Debug)]
pub struct RunSummary {
    /// Canonical range label.
    pub range_label: String,
    /// Environment collected.
    pub environment: String,
    /// Where the snapshot landed.
    pub snapshot_path: Utf8PathBuf,
    /// Teams collected.
    pub teams: usize,
    /// PRs across all teams.
    pub pr_total: u64,
    /// Commits across all teams.
    pub commit_total: u64,
    /// Tracker issues across all teams.
    pub issue_total: u64,
    /// Production deployments across all teams.
    pub deployment_total: u64,
    /// Partial results (retries exhausted mid-dataset).
    pub partial_results: u64,
    /// Per-team one-line failures.
    pub failures: Vec<TeamFailure>,
    /// Degradation markers across the run.
    pub degraded: Vec<String>,
    /// Run duration.
    pub elapsed_seconds: f64,
}

impl RunSummary {
    /// The final summary line: totals by kind, partial count, and one
    /// reason per failed team.
    pub fn summary_line(&self) -> String {
        let mut line = format!(
            "{} teams: {} PRs, {} commits, {} issues, {} deployments ({} partial)",
            self.teams,
            self.pr_total,
            self.commit_total,
            self.issue_total,
            self.deployment_total,
            self.partial_results,
        );
        for failure in &self.failures {
            line.push_str(&format!("; {}: {}", failure.team, failure.reason));
        }
        line
    }
}

/// Raw per-team haul before metrics.
#[derive(Debug, Default)]
pub struct TeamData {
    /// Team name.
    pub name: String,
    /// Per-repository records.
    pub repos: Vec<RepoData>,
    /// Per-person records.
    pub persons: Vec<PersonRecord>,
    /// Tracker filter results.
    pub issues: jira_metrics::TeamIssues,
    /// Incidents, `None` when no incidents filter is configured.
    pub incidents: Option<Vec<Issue>>,
    /// Fix versions across the team's projects.
    pub versions: Vec<FixVersion>,
    /// Captured failures from every layer under this team.
    pub failures: Vec<TaskFailure>,
    /// Partial-result count.
    pub partial_results: u64,
    /// Team-level degradation markers.
    pub degraded: Vec<String>,
}

/// One person's collected activity.
#[derive(Debug)]
pub struct PersonRecord {
    /// The member this record belongs to.
    pub member: Member,
    /// Source-control activity, when that query succeeded.
    pub activity: Option<PersonActivity>,
    /// Tracker issues assigned to the person.
    pub issues: Vec<Issue>,
    /// Degradation markers, e.g. `fallback:30d`.
    pub degraded: Vec<String>,
}

/// Run a complete collection and seal a snapshot.
///
/// Returns after the snapshot is durably on disk (the synchronous-refresh
/// contract the presentation layer relies on). The deadline from
/// `collection.max_collection_minutes` cancels the run cooperatively.
#[instrument(skip(config, bus, cancel), fields(range = %options.range_spec, env = %options.environment))]
pub async fn run_collection(
    config: &Config,
    options: &CollectionOptions,
    cancel: CancellationToken,
    bus: &EventBus,
) -> PipelineResult<RunSummary> {
    let started = std::time::Instant::now();
    config.validate()?;

    let env = config.environment(&options.environment).ok_or_else(|| {
        ConfigError::Invalid(format!(
            "unknown tracker environment {:?}",
            options.environment
        ))
    })?;

    let now = Utc::now();
    let range = DateRange::parse(&options.range_spec, now)?;
    let window = range.shifted(i64::from(env.time_offset_days));
    info!(
        label = range.label(),
        start = %window.start(),
        end = %window.end(),
        offset_days = env.time_offset_days,
        "collection window resolved"
    );

    // Deadline watchdog: past the budget, the run cancels itself.
    let run_cancel = cancel.child_token();
    let deadline = Duration::from_secs(config.collection.max_collection_minutes * 60);
    let watchdog = {
        let run_cancel = run_cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            warn!("collection deadline reached, cancelling");
            run_cancel.cancel();
        })
    };

    let github = GithubCollector::new(
        &config.source_control,
        Duration::from_secs(config.collection.github_timeout_seconds),
        config.tracker.pagination.max_retries,
        run_cancel.clone(),
    )
    .map_err(|e| PipelineError::Startup(e.to_string()))?;
    let jira = JiraCollector::new(
        env,
        config.tracker.pagination.clone(),
        Duration::from_secs(config.collection.jira_timeout_seconds),
        run_cancel.clone(),
    )
    .map_err(|e| PipelineError::Startup(e.to_string()))?;

    let mut run_failures: Vec<TaskFailure> = Vec::new();
    let repositories = resolve_repositories(config, &github, now, &mut run_failures).await?;

    // One fan-out task per team; repositories, persons, and filters nest inside.
    let team_tasks: Vec<_> = config
        .teams
        .iter()
        .map(|team| {
            let team_repos: Vec<Repository> = repositories
                .iter()
                .filter(|r| r.team == team.name)
                .cloned()
                .collect();
            let fut = collect_team(
                github.clone(),
                jira.clone(),
                team.clone(),
                team_repos,
                window.clone(),
                config.collection.incident_types.clone(),
                config.parallel_collection.clone(),
                run_cancel.clone(),
                now,
            );
            (format!("team:{}", team.name), fut)
        })
        .collect();

    let team_limit = config
        .parallel_collection
        .effective(config.parallel_collection.team_workers);
    let outcome: LayerOutcome<TeamData> =
        run_layer("teams", team_limit, &run_cancel, team_tasks).await;
    watchdog.abort();

    if cancel.is_cancelled() || run_cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }
    run_failures.extend(outcome.errors);

    let range_info = RangeInfo {
        label: range.label().to_string(),
        start: window.start(),
        end: window.end(),
        days: window.days(),
        time_offset_days: env.time_offset_days,
    };
    let mut snapshot = assemble(config, outcome.results, &window, range_info);
    snapshot.environment = options.environment.clone();
    snapshot.timestamp = Utc::now();
    snapshot.diagnostics.errors.extend(run_failures);
    snapshot.diagnostics.elapsed_seconds = started.elapsed().as_secs_f64();

    let store = SnapshotStore::new(data_dir(config));
    let snapshot_path = store.write(&snapshot)?;

    bus.publish(&Event::DataCollected {
        range: snapshot.range_label.clone(),
        env: snapshot.environment.clone(),
        timestamp: snapshot.timestamp,
    });

    let summary = build_summary(&snapshot, snapshot_path, started.elapsed().as_secs_f64());
    info!(summary = %summary.summary_line(), "collection finished");
    Ok(summary)
}

/// Publish `MANUAL_REFRESH`, run a collection, and return once the
/// snapshot is sealed — the synchronous refresh entry point for the
/// presentation layer.
pub async fn refresh(
    config: &Config,
    options: &CollectionOptions,
    cancel: CancellationToken,
    bus: &EventBus,
) -> PipelineResult<RunSummary> {
    bus.publish(&Event::ManualRefresh {
        range: options.range_spec.clone(),
        env: options.environment.clone(),
    });
    run_collection(config, options, cancel, bus).await
}

/// Where snapshots live for this configuration.
pub fn data_dir(config: &Config) -> Utf8PathBuf {
    config
        .collection
        .data_dir
        .clone()
        .or_else(crate::config::user_data_dir)
        .unwrap_or_else(|| Utf8PathBuf::from("."))
}

async fn resolve_repositories(
    config: &Config,
    github: &GithubCollector,
    now: DateTime<Utc>,
    failures: &mut Vec<TaskFailure>,
) -> PipelineResult<Vec<Repository>> {
    let team_names: Vec<String> = config.teams.iter().map(|t| t.name.clone()).collect();
    let org = &config.source_control.organization;
    let cache = RepoListCache::default_location();

    if let Some(hit) = cache.as_ref().and_then(|c| c.load(org, &team_names, now)) {
        info!(
            age_hours = hit.age_hours,
            repos = hit.repos.len(),
            "using cached repository list"
        );
        return Ok(hit.repos);
    }

    match github.discover_team_repositories(&config.teams).await {
        Ok(repos) => {
            if let Some(cache) = cache {
                cache.store(org, &team_names, &repos, now);
            }
            Ok(repos)
        }
        Err(CollectError::Cancelled) => Err(PipelineError::Cancelled),
        Err(err) => {
            // Discovery failing entirely leaves teams with no repositories;
            // the snapshot validation gate decides whether that sinks the run.
            warn!(error = %err, "repository discovery failed");
            failures.push(TaskFailure {
                task: "discover".to_string(),
                message: err.to_string(),
                transient: err.is_transient(),
            });
            Ok(Vec::new())
        }
    }
}

/// Collect one team: repositories, persons, and tracker filters, each
/// under its own worker bound.
#[allow(clippy::too_many_arguments)]
async fn collect_team(
    github: GithubCollector,
    jira: JiraCollector,
    team: TeamConfig,
    repos: Vec<Repository>,
    window: DateRange,
    incident_types: Vec<String>,
    parallel: crate::config::ParallelConfig,
    cancel: CancellationToken,
    now: DateTime<Utc>,
) -> CollectResult<TeamData> {
    let mut data = TeamData {
        name: team.name.clone(),
        ..TeamData::default()
    };

    // Repository layer
    let repo_tasks: Vec<_> = repos
        .iter()
        .map(|repo| {
            let github = github.clone();
            let window = window.clone();
            let owner = repo.owner.clone();
            let name = repo.name.clone();
            (format!("repo:{}", repo.full_name()), async move {
                Ok(github.collect_repository_data(&owner, &name, &window).await)
            })
        })
        .collect();
    let repo_outcome: LayerOutcome<RepoData> = run_layer(
        "repos",
        parallel.effective(parallel.repo_workers),
        &cancel,
        repo_tasks,
    )
    .await;
    data.failures.extend(repo_outcome.errors);
    for repo in repo_outcome.results {
        if let Some(error) = &repo.error {
            data.partial_results += 1;
            data.failures.push(TaskFailure {
                task: format!("repo:{}", repo.repo),
                message: error.clone(),
                transient: true,
            });
        }
        data.repos.push(repo);
    }

    // Person layer
    let person_tasks: Vec<_> = team
        .members
        .iter()
        .map(|member| {
            let github = github.clone();
            let jira = jira.clone();
            let window = window.clone();
            let member = member.clone();
            (format!("person:{}", member.sc_login), async move {
                collect_person(&github, &jira, member, &window).await
            })
        })
        .collect();
    let person_outcome: LayerOutcome<PersonRecord> = run_layer(
        "persons",
        parallel.effective(parallel.person_workers),
        &cancel,
        person_tasks,
    )
    .await;
    data.failures.extend(person_outcome.errors);
    data.persons = person_outcome.results;

    // Tracker filter layer. Filters, incidents, and fix versions all hit
    // the tracker, so they share the filter worker bound.
    type TrackerFuture = std::pin::Pin<Box<dyn Future<Output = CollectResult<TrackerHaul>> + Send>>;
    let mut tracker_tasks: Vec<(String, TrackerFuture)> = Vec::new();
    for (kind, filter_id) in [
        ("wip", team.wip_filter()),
        ("bugs", team.bugs_filter()),
        ("completed", team.completed_filter()),
    ] {
        let Some(id) = filter_id else { continue };
        let jira = jira.clone();
        let window = window.clone();
        tracker_tasks.push((
            format!("filter:{kind}"),
            Box::pin(async move {
                let batch = jira.filter(id, &window).await?;
                Ok(TrackerHaul::Filter(kind, batch))
            }),
        ));
    }
    if let Some(id) = team.incidents_filter() {
        let jira = jira.clone();
        let window = window.clone();
        let types = incident_types.clone();
        tracker_tasks.push((
            "filter:incidents".to_string(),
            Box::pin(async move {
                let batch = jira.incidents(id, &window, &types).await?;
                Ok(TrackerHaul::Incidents(batch))
            }),
        ));
    }
    for project_key in &team.project_keys {
        let jira = jira.clone();
        let members = team.tracker_logins();
        let key = project_key.clone();
        tracker_tasks.push((
            format!("releases:{project_key}"),
            Box::pin(async move {
                let versions = jira.releases(&key, &members, now).await?;
                Ok(TrackerHaul::Releases(versions))
            }),
        ));
    }
    let tracker_outcome: LayerOutcome<TrackerHaul> = run_layer(
        "filters",
        parallel.effective(parallel.filter_workers),
        &cancel,
        tracker_tasks,
    )
    .await;
    data.failures.extend(tracker_outcome.errors);

    let incidents_configured = team.incidents_filter().is_some();
    for haul in tracker_outcome.results {
        match haul {
            TrackerHaul::Filter(kind, batch) => {
                if batch.partial {
                    data.partial_results += 1;
                    data.degraded.push(format!("filter:{kind}:partial"));
                }
                match kind {
                    "wip" => data.issues.wip = batch.issues,
                    "bugs" => data.issues.bugs = batch.issues,
                    _ => data.issues.completed = batch.issues,
                }
            }
            TrackerHaul::Incidents(batch) => {
                if batch.partial {
                    data.partial_results += 1;
                    data.degraded.push("filter:incidents:partial".to_string());
                }
                data.incidents = Some(batch.issues);
            }
            TrackerHaul::Releases(versions) => data.versions.extend(versions),
        }
    }
    // An incidents filter that failed outright still counts as configured;
    // CFR/MTTR read as unavailable only when no filter exists at all.
    if incidents_configured && data.incidents.is_none() {
        data.incidents = Some(Vec::new());
    }
    data.versions.sort_by(|a, b| {
        a.release_date
            .cmp(&b.release_date)
            .then_with(|| a.name.cmp(&b.name))
    });

    debug!(
        team = %data.name,
        repos = data.repos.len(),
        persons = data.persons.len(),
        versions = data.versions.len(),
        failures = data.failures.len(),
        "team collected"
    );
    Ok(data)
}

async fn collect_person(
    github: &GithubCollector,
    jira: &JiraCollector,
    member: Member,
    window: &DateRange,
) -> CollectResult<PersonRecord> {
    let mut record = PersonRecord {
        member,
        activity: None,
        issues: Vec::new(),
        degraded: Vec::new(),
    };

    match github
        .collect_person_activity(&record.member.sc_login, window)
        .await
    {
        Ok(activity) => record.activity = Some(activity),
        Err(CollectError::Cancelled) => return Err(CollectError::Cancelled),
        Err(err) => {
            warn!(login = %record.member.sc_login, error = %err, "person activity failed");
            record.degraded.push("github:unavailable".to_string());
        }
    }

    match jira
        .person_query(&record.member.tracker_login, window)
        .await
    {
        Ok(person_issues) => {
            record.issues = person_issues.issues;
            if let Some(marker) = person_issues.degraded {
                record.degraded.push(marker);
            }
        }
        Err(CollectError::Cancelled) => return Err(CollectError::Cancelled),
        Err(err) => {
            warn!(login = %record.member.tracker_login, error = %err, "person tracker query failed");
            record.degraded.push("tracker:unavailable".to_string());
        }
    }

    Ok(record)
}

enum TrackerHaul {
    Filter(&'static str, IssueBatch),
    Incidents(IssueBatch),
    Releases(Vec<FixVersion>),
}

/// Join collected team data into the snapshot. Pure; the unit tests drive
/// the whole metrics stack through here.
pub fn assemble(
    config: &Config,
    teams_data: Vec<TeamData>,
    window: &DateRange,
    range_info: RangeInfo,
) -> Snapshot {
    let mut teams: BTreeMap<String, TeamMetrics> = BTreeMap::new();
    let mut persons: BTreeMap<String, PersonMetrics> = BTreeMap::new();
    let mut comparison: BTreeMap<String, TeamSummary> = BTreeMap::new();
    let mut diagnostics = RunDiagnostics::default();
    let mut team_inputs: Vec<(String, score::ScoreInputs)> = Vec::new();

    for mut data in teams_data {
        let Some(team_config) = config.teams.iter().find(|t| t.name == data.name) else {
            continue;
        };
        let sc_logins = team_config.sc_logins();

        // Team-level PRs: the deduplicated union of repository PRs whose
        // author is on the team.
        let mut team_prs: Vec<PullRequest> = data
            .repos
            .iter()
            .flat_map(|r| r.prs.iter())
            .filter(|pr| sc_logins.contains(&pr.author_login))
            .cloned()
            .collect();
        mapper::annotate_issue_keys(&mut team_prs);
        let releases: Vec<TagRelease> = data
            .repos
            .iter()
            .flat_map(|r| r.releases.iter())
            .cloned()
            .collect();

        let github = github_metrics::compute(&team_prs, &releases);
        let jira = jira_metrics::compute(&data.issues, window);

        let index = MappingIndex::build(std::mem::take(&mut data.versions));
        let mapping = mapper::map_merged_prs(&team_prs, &index);
        let versions = index.into_versions();
        let dora = dora::compute(&versions, &mapping, data.incidents.as_deref(), window);

        // Person rows, scored against teammates below
        let mut member_rows: Vec<PersonRow> = Vec::new();
        for person in &data.persons {
            let (person_github, reviews_given) = person.activity.as_ref().map_or_else(
                || (github_metrics::GithubMetrics::default(), 0),
                |activity| {
                    let mut prs = activity.prs.clone();
                    mapper::annotate_issue_keys(&mut prs);
                    (github_metrics::compute(&prs, &[]), activity.reviews_given)
                },
            );
            let completed = person
                .issues
                .iter()
                .filter(|i| i.resolved.is_some_and(|r| window.contains(r)))
                .count() as u64;
            member_rows.push(PersonRow {
                member: person.member.clone(),
                github: person_github,
                reviews_given,
                completed,
                degraded: person.degraded.clone(),
            });
        }

        let person_inputs: Vec<score::ScoreInputs> = member_rows
            .iter()
            .map(|row| score::ScoreInputs {
                prs: row.github.prs.pr_count as f64,
                reviews: row.reviews_given as f64,
                commits: row.github.commits.commit_count as f64,
                cycle_time_hours: row.github.prs.cycle_time_median_hours.unwrap_or(0.0),
                merge_rate: row.github.prs.merge_rate,
                jira_completed: row.completed as f64,
                deployments_per_week: dora.deployment_frequency.per_week,
                lead_time_hours: dora.lead_time.as_ref().map_or(0.0, |l| l.median_hours),
                change_failure_rate: dora.change_failure_rate.as_ref().map_or(0.0, |c| c.rate),
                mttr_hours: dora.mttr.as_ref().map_or(0.0, |m| m.median_hours),
            })
            .collect();
        let person_scores = score::compute_scores(&person_inputs, &config.performance_weights);

        for (row, person_score) in member_rows.into_iter().zip(person_scores) {
            persons.insert(
                row.member.sc_login.clone(),
                PersonMetrics {
                    display_name: row.member.name,
                    team: data.name.clone(),
                    github: row.github,
                    reviews_given: row.reviews_given,
                    jira_completed: row.completed,
                    performance_score: person_score,
                    degraded: row.degraded,
                },
            );
        }

        team_inputs.push((
            data.name.clone(),
            score::ScoreInputs {
                prs: github.prs.pr_count as f64,
                reviews: github.reviews.review_count as f64,
                commits: github.commits.commit_count as f64,
                cycle_time_hours: github.prs.cycle_time_median_hours.unwrap_or(0.0),
                merge_rate: github.prs.merge_rate,
                jira_completed: jira.throughput as f64,
                deployments_per_week: dora.deployment_frequency.per_week,
                lead_time_hours: dora.lead_time.as_ref().map_or(0.0, |l| l.median_hours),
                change_failure_rate: dora.change_failure_rate.as_ref().map_or(0.0, |c| c.rate),
                mttr_hours: dora.mttr.as_ref().map_or(0.0, |m| m.median_hours),
            }
            .per_member(team_config.members.len() as f64),
        ));

        // Person degradation markers roll up to the team
        let mut degraded = data.degraded.clone();
        for person in &data.persons {
            for marker in &person.degraded {
                degraded.push(format!("{}:{marker}", person.member.sc_login));
            }
        }

        // Tag failures with the team so the summary can attribute them
        diagnostics
            .errors
            .extend(data.failures.iter().cloned().map(|mut f| {
                f.task = format!("{}/{}", data.name, f.task);
                f
            }));
        diagnostics.partial_results += data.partial_results;

        teams.insert(
            data.name.clone(),
            TeamMetrics {
                github,
                jira,
                dora,
                performance_score: 0.0, // filled from the comparison below
                size: team_config.members.len(),
                date_range_info: range_info.clone(),
                degraded,
            },
        );
    }

    // Cross-team comparison: score teams against each other
    let inputs: Vec<score::ScoreInputs> = team_inputs.iter().map(|(_, i)| *i).collect();
    let team_scores = score::compute_scores(&inputs, &config.performance_weights);
    for ((name, _), team_score) in team_inputs.iter().zip(team_scores) {
        if let Some(metrics) = teams.get_mut(name) {
            metrics.performance_score = team_score;
            comparison.insert(
                name.clone(),
                TeamSummary {
                    performance_score: team_score,
                    overall_level: metrics.dora.overall,
                    pr_count: metrics.github.prs.pr_count,
                    throughput: metrics.jira.throughput,
                    deployments_per_week: metrics.dora.deployment_frequency.per_week,
                },
            );
        }
    }

    Snapshot {
        range_label: range_info.label.clone(),
        environment: String::new(),
        timestamp: Utc::now(),
        teams,
        persons,
        comparison,
        diagnostics,
    }
}

struct PersonRow {
    member: Member,
    github: github_metrics::GithubMetrics,
    reviews_given: u64,
    completed: u64,
    degraded: Vec<String>,
}

fn build_summary(
    snapshot: &Snapshot,
    snapshot_path: Utf8PathBuf,
    elapsed_seconds: f64,
) -> RunSummary {
    let pr_total = snapshot.teams.values().map(|t| t.github.prs.pr_count).sum();
    let commit_total = snapshot
        .teams
        .values()
        .map(|t| t.github.commits.commit_count)
        .sum();
    let issue_total = snapshot
        .teams
        .values()
        .map(|t| t.jira.throughput + t.jira.wip)
        .sum();
    let deployment_total = snapshot
        .teams
        .values()
        .map(|t| t.dora.deployment_frequency.total_deployments)
        .sum();

    let failures = snapshot
        .teams
        .iter()
        .filter_map(|(name, metrics)| {
            let reason = if metrics.source_records() == 0 {
                Some("0 source-control records".to_string())
            } else {
                snapshot
                    .diagnostics
                    .errors
                    .iter()
                    .find(|f| f.task.starts_with(&format!("{name}/")))
                    .map(|f| f.message.clone())
            };
            reason.map(|reason| TeamFailure {
                team: name.clone(),
                reason,
            })
        })
        .collect();

    let degraded = snapshot
        .teams
        .values()
        .flat_map(|t| t.degraded.iter().cloned())
        .collect();

    RunSummary {
        range_label: snapshot.range_label.clone(),
        environment: snapshot.environment.clone(),
        snapshot_path,
        teams: snapshot.teams.len(),
        pr_total,
        commit_total,
        issue_total,
        deployment_total,
        partial_results: snapshot.diagnostics.partial_results,
        failures,
        degraded,
        elapsed_seconds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Member, RepoSelector, SourceControlConfig, TrackerEnvironment};
    use crate::model::ReleaseEnvironment;
    use chrono::TimeZone;
    use std::collections::BTreeSet;

    fn at(m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, m, d, 12, 0, 0).unwrap()
    }

    fn test_config(team_names: &[&str]) -> Config {
        let mut config = Config {
            source_control: SourceControlConfig {
                token: "tok".into(),
                organization: "acme".into(),
                api_url: None,
            },
            ..Config::default()
        };
        config.tracker.environments.insert(
            "prod".into(),
            TrackerEnvironment {
                server: "https://tracker.acme.example".into(),
                username: "svc".into(),
                api_token: "secret".into(),
                time_offset_days: 0,
            },
        );
        for name in team_names {
            config.teams.push(TeamConfig {
                name: (*name).to_string(),
                members: vec![
                    Member {
                        name: "Alice".into(),
                        sc_login: format!("alice-{name}"),
                        tracker_login: format!("alice.{name}"),
                    },
                    Member {
                        name: "Bob".into(),
                        sc_login: format!("bob-{name}"),
                        tracker_login: format!("bob.{name}"),
                    },
                ],
                repo_selector: RepoSelector::default(),
                filter_ids: [("incidents".to_string(), 9u64)].into(),
                project_keys: vec!["PLAT".into()],
            });
        }
        config
    }

    fn window() -> DateRange {
        DateRange::parse("30d", at(11, 2)).unwrap()
    }

    fn range_info() -> RangeInfo {
        let w = window();
        RangeInfo {
            label: w.label().to_string(),
            start: w.start(),
            end: w.end(),
            days: w.days(),
            time_offset_days: 0,
        }
    }

    fn merged_pr(id: u64, author: &str, title: &str, merged: DateTime<Utc>) -> PullRequest {
        PullRequest {
            id,
            repo: "acme/api".into(),
            author_login: author.into(),
            title: title.into(),
            branch: format!("branch-{id}"),
            created_at: merged - chrono::Duration::days(1),
            merged_at: Some(merged),
            closed_at: Some(merged),
            additions: 50,
            deletions: 10,
            reviews: Vec::new(),
            commits: Vec::new(),
            issue_keys: BTreeSet::new(),
        }
    }

    fn fix_version(name: &str, env: ReleaseEnvironment, date: DateTime<Utc>, issues: &[&str]) -> FixVersion {
        FixVersion {
            project: "PLAT".into(),
            name: name.into(),
            release_date: date,
            released: true,
            environment: env,
            issues: issues.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    fn team_data(name: &str, prs: Vec<PullRequest>, versions: Vec<FixVersion>) -> TeamData {
        TeamData {
            name: name.into(),
            repos: vec![RepoData {
                repo: "acme/api".into(),
                prs,
                releases: Vec::new(),
                error: None,
            }],
            incidents: Some(Vec::new()),
            versions,
            ..TeamData::default()
        }
    }

    #[test]
    fn assemble_computes_team_dora_and_scores() {
        let config = test_config(&["Platform"]);
        let author = "alice-Platform";
        let prs = vec![
            merged_pr(1, author, "PLAT-1 checkout fix", at(10, 2)),
            merged_pr(2, author, "PLAT-2 cart fix", at(10, 15)),
        ];
        let versions = vec![
            fix_version("Live - 6/Oct/2025", ReleaseEnvironment::Production, at(10, 6), &["PLAT-1"]),
            fix_version("Beta - 7/Oct/2025", ReleaseEnvironment::Staging, at(10, 7), &["PLAT-1"]),
            fix_version("Live - 20/Oct/2025", ReleaseEnvironment::Production, at(10, 20), &["PLAT-2"]),
            fix_version("Live - 1/Nov/2025", ReleaseEnvironment::Production, at(11, 1), &["PLAT-2"]),
        ];

        let snapshot = assemble(
            &config,
            vec![team_data("Platform", prs, versions)],
            &window(),
            range_info(),
        );

        let team = &snapshot.teams["Platform"];
        assert_eq!(team.github.prs.pr_count, 2);
        // Production versions only, all three in window
        assert_eq!(team.dora.deployment_frequency.total_deployments, 3);
        let lead = team.dora.lead_time.as_ref().unwrap();
        // PR1 merged Oct 2 → Live Oct 6 (96h), PR2 merged Oct 15 → Live Oct 20 (120h)
        assert!((lead.median_hours - 108.0).abs() < 1e-6);
        assert!((lead.mapped_fraction.unwrap() - 1.0).abs() < 1e-9);
        // Incidents filter configured but empty: CFR present, MTTR unavailable
        assert!(team.dora.change_failure_rate.is_some());
        assert!(team.dora.mttr.is_none());
        assert_eq!(team.size, 2);

        // A single team scores 50 on every input (no spread)
        assert!((team.performance_score - 50.0).abs() < 1e-9);
        assert_eq!(snapshot.comparison.len(), 1);
    }

    #[test]
    fn assemble_excludes_foreign_authors_from_team_counts() {
        let config = test_config(&["Platform"]);
        let prs = vec![
            merged_pr(1, "alice-Platform", "PLAT-1 fix", at(10, 2)),
            merged_pr(2, "stranger", "PLAT-9 drive-by", at(10, 3)),
        ];
        let snapshot = assemble(
            &config,
            vec![team_data("Platform", prs, Vec::new())],
            &window(),
            range_info(),
        );
        assert_eq!(snapshot.teams["Platform"].github.prs.pr_count, 1);
    }

    #[test]
    fn assemble_scores_two_teams_against_each_other() {
        let config = test_config(&["Platform", "Web"]);
        let busy = (1..=6)
            .map(|i| merged_pr(i, "alice-Platform", "PLAT-1 work", at(10, i as u32)))
            .collect();
        let quiet = vec![merged_pr(10, "alice-Web", "WEB-1 work", at(10, 2))];

        let snapshot = assemble(
            &config,
            vec![
                team_data("Platform", busy, Vec::new()),
                team_data("Web", quiet, Vec::new()),
            ],
            &window(),
            range_info(),
        );

        let platform = snapshot.comparison["Platform"].performance_score;
        let web = snapshot.comparison["Web"].performance_score;
        assert!(platform > web, "busier team should outscore: {platform} vs {web}");
    }

    #[test]
    fn assemble_rolls_person_degradation_into_team() {
        let config = test_config(&["Platform"]);
        let mut data = team_data(
            "Platform",
            vec![merged_pr(1, "alice-Platform", "PLAT-1", at(10, 2))],
            Vec::new(),
        );
        data.persons.push(PersonRecord {
            member: config.teams[0].members[0].clone(),
            activity: None,
            issues: Vec::new(),
            degraded: vec!["fallback:30d".to_string()],
        });

        let snapshot = assemble(&config, vec![data], &window(), range_info());
        let team = &snapshot.teams["Platform"];
        assert!(
            team.degraded
                .iter()
                .any(|d| d.contains("fallback:30d"))
        );
        let person = &snapshot.persons["alice-Platform"];
        assert_eq!(person.degraded, vec!["fallback:30d".to_string()]);
    }

    #[test]
    fn summary_line_names_failed_teams() {
        let config = test_config(&["Platform"]);
        // No PRs at all: the team reads as 0 source-control records
        let snapshot = assemble(
            &config,
            vec![team_data("Platform", Vec::new(), Vec::new())],
            &window(),
            range_info(),
        );
        let summary = build_summary(&snapshot, Utf8PathBuf::from("/tmp/x.json"), 1.0);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].team, "Platform");
        assert!(summary.summary_line().contains("Platform: 0 source-control records"));
    }

    #[tokio::test]
    async fn run_collection_rejects_invalid_config() {
        let config = Config::default(); // empty credentials
        let bus = EventBus::new();
        let err = run_collection(
            &config,
            &CollectionOptions {
                range_spec: "90d".into(),
                environment: "prod".into(),
            },
            CancellationToken::new(),
            &bus,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[tokio::test]
    async fn run_collection_rejects_unknown_environment() {
        let config = test_config(&["Platform"]);
        let bus = EventBus::new();
        let err = run_collection(
            &config,
            &CollectionOptions {
                range_spec: "90d".into(),
                environment: "staging".into(),
            },
            CancellationToken::new(),
            &bus,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("unknown tracker environment"));
    }

    #[tokio::test]
    async fn run_collection_rejects_bad_range() {
        let config = test_config(&["Platform"]);
        let bus = EventBus::new();
        let err = run_collection(
            &config,
            &CollectionOptions {
                range_spec: "0d".into(),
                environment: "prod".into(),
            },
            CancellationToken::new(),
            &bus,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::Range(_)));
    }
}
