//! Source-control collector.
//!
//! Talks to the host's GraphQL API with a pooled keep-alive client — one
//! collector instance (and therefore one pool) per collection run. Each
//! repository is fetched with a single batched query per page that returns
//! pull requests (newest first, with nested reviews and commits) and
//! release tags side by side; two independent cursors advance until both
//! datasets fall out of the window.
//!
//! Transient failures (5xx, 403/429 secondary rate limits, transport)
//! retry with exponential backoff. When retries exhaust mid-repository the
//! collector returns what it has plus a per-repository error record; the
//! outer pipeline never aborts on a single repository.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::config::{SourceControlConfig, TeamConfig};
use crate::error::{CollectError, CollectResult};
use crate::model::{
    Commit, PullRequest, Repository, Review, ReviewState, TagRelease, parse_release_name,
};
use crate::range::DateRange;
use crate::scheduler::backoff_sleep;

/// Default GraphQL endpoint.
const DEFAULT_API_URL: &str = "https://api.github.com/graphql";

/// Minimum keep-alive pool size; shared by every worker in the run.
const POOL_SIZE: usize = 20;

/// PRs per page. Nested reviews/commits make large pages expensive.
const PR_PAGE_SIZE: u32 = 50;
/// Release tags per page.
const RELEASE_PAGE_SIZE: u32 = 50;
/// Repositories per discovery page.
const REPO_PAGE_SIZE: u32 = 100;
/// Nested reviews fetched per PR.
const REVIEW_PAGE_SIZE: u32 = 30;
/// Nested commits fetched per PR.
const COMMIT_PAGE_SIZE: u32 = 100;

/// First backoff delay; doubles per attempt.
const BACKOFF_BASE: Duration = Duration::from_secs(2);

/// Everything collected for one repository.
#[derive(Debug)]
pub struct RepoData {
    /// `owner/name`.
    pub repo: String,
    /// Pull requests created inside the window, newest first.
    pub prs: Vec<PullRequest>,
    /// Release tags published inside the window.
    pub releases: Vec<TagRelease>,
    /// Set when retries exhausted partway; the data above is partial.
    pub error: Option<String>,
}

/// A person's source-control activity for the window.
#[derive(Debug)]
pub struct PersonActivity {
    /// Source-control login.
    pub login: String,
    /// PRs authored in the window.
    pub prs: Vec<PullRequest>,
    /// Count of PRs the person reviewed in the window.
    pub reviews_given: u64,
}

/// GraphQL client for the source-control host.
#[derive(Debug, Clone)]
pub struct GithubCollector {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    organization: String,
    max_retries: u32,
    cancel: CancellationToken,
}

impl GithubCollector {
    /// Build the collector and its connection pool.
    pub fn new(
        config: &SourceControlConfig,
        timeout: Duration,
        max_retries: u32,
        cancel: CancellationToken,
    ) -> CollectResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(POOL_SIZE)
            .user_agent(concat!("teampulse/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CollectError::Transient {
                context: "client".to_string(),
                status: None,
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            endpoint: config
                .api_url
                .clone()
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            token: config.token.clone(),
            organization: config.organization.clone(),
            max_retries,
            cancel,
        })
    }

    /// Discover the organization's repositories and assign them to teams.
    ///
    /// Paginated by opaque cursor; repositories matching no team selector
    /// are dropped.
    #[instrument(skip(self, teams), fields(org = %self.organization))]
    pub async fn discover_team_repositories(
        &self,
        teams: &[TeamConfig],
    ) -> CollectResult<Vec<Repository>> {
        let mut repos = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let data = self
                .graphql(
                    "discover",
                    DISCOVER_QUERY,
                    json!({
                        "org": self.organization,
                        "cursor": cursor,
                        "pageSize": REPO_PAGE_SIZE,
                    }),
                )
                .await?;
            let page: DiscoverData =
                decode("discover", data)?;
            let connection = page.organization.repositories;

            for node in connection.nodes {
                let topics: Vec<String> = node
                    .repository_topics
                    .nodes
                    .into_iter()
                    .map(|t| t.topic.name)
                    .collect();
                for team in teams {
                    if team.repo_selector.matches(&node.name, &topics) {
                        repos.push(Repository {
                            owner: node.owner.login.clone(),
                            name: node.name.clone(),
                            team: team.name.clone(),
                        });
                    }
                }
            }

            if !connection.page_info.has_next_page {
                break;
            }
            cursor = connection.page_info.end_cursor;
        }

        debug!(count = repos.len(), "discovered repositories");
        Ok(repos)
    }

    /// Collect PRs (with reviews and commits) and release tags for one
    /// repository, windowed.
    ///
    /// One batched query per page; the PR cursor and the release cursor
    /// advance independently and each stops as soon as its dataset falls
    /// out of the window. Retry exhaustion mid-way yields partial data and
    /// an error record instead of a failure.
    #[instrument(skip(self, window))]
    pub async fn collect_repository_data(
        &self,
        owner: &str,
        name: &str,
        window: &DateRange,
    ) -> RepoData {
        let full_name = format!("{owner}/{name}");
        let mut data = RepoData {
            repo: full_name.clone(),
            prs: Vec::new(),
            releases: Vec::new(),
            error: None,
        };

        let mut pr_cursor: Option<String> = None;
        let mut rel_cursor: Option<String> = None;
        let mut pr_done = false;
        let mut rel_done = false;

        while !(pr_done && rel_done) {
            let variables = json!({
                "owner": owner,
                "name": name,
                "prCursor": pr_cursor,
                "relCursor": rel_cursor,
                // A finished cursor gets a zero page so the other side can
                // keep paging without refetching.
                "prPage": if pr_done { 0 } else { PR_PAGE_SIZE },
                "relPage": if rel_done { 0 } else { RELEASE_PAGE_SIZE },
                "reviewPage": REVIEW_PAGE_SIZE,
                "commitPage": COMMIT_PAGE_SIZE,
            });

            let page = match self.graphql("repository", REPO_QUERY, variables).await {
                Ok(value) => value,
                Err(CollectError::Cancelled) => {
                    data.error = Some("cancelled".to_string());
                    return data;
                }
                Err(err) => {
                    warn!(repo = %full_name, error = %err, "repository fetch failed, keeping partial data");
                    data.error = Some(err.to_string());
                    return data;
                }
            };

            let page: RepoDataPage = match decode("repository", page) {
                Ok(p) => p,
                Err(err) => {
                    data.error = Some(err.to_string());
                    return data;
                }
            };
            let repository = page.repository;

            if !pr_done {
                let connection = repository.pull_requests;
                let mut oldest: Option<DateTime<Utc>> = None;
                for node in connection.nodes {
                    oldest = Some(node.created_at);
                    if window.contains(node.created_at) {
                        data.prs.push(node.into_model(&full_name));
                    }
                }
                // PRs arrive newest-first: once a page bottoms out before
                // the window start there is nothing older worth fetching.
                let exhausted = oldest.is_some_and(|o| o < window.start());
                pr_done = exhausted || !connection.page_info.has_next_page;
                pr_cursor = connection.page_info.end_cursor;
            }

            if !rel_done {
                let connection = repository.releases;
                let mut oldest: Option<DateTime<Utc>> = None;
                for node in connection.nodes {
                    let Some(published) = node.published_at else {
                        continue; // drafts carry no publication time
                    };
                    oldest = Some(published);
                    if window.contains(published) {
                        let name = node.name.unwrap_or_default();
                        data.releases.push(TagRelease {
                            environment: parse_release_name(&name).map(|p| p.environment),
                            name,
                            published_at: published,
                        });
                    }
                }
                let exhausted = oldest.is_some_and(|o| o < window.start());
                rel_done = exhausted || !connection.page_info.has_next_page;
                rel_cursor = connection.page_info.end_cursor;
            }
        }

        debug!(
            repo = %full_name,
            prs = data.prs.len(),
            releases = data.releases.len(),
            "repository collected"
        );
        data
    }

    /// Collect one person's authored PRs and reviewed-PR count.
    #[instrument(skip(self, window))]
    pub async fn collect_person_activity(
        &self,
        login: &str,
        window: &DateRange,
    ) -> CollectResult<PersonActivity> {
        let created = format!(
            "{}..{}",
            window.start().format("%Y-%m-%d"),
            window.end().format("%Y-%m-%d")
        );
        let authored_query = format!(
            "is:pr org:{} author:{} created:{}",
            self.organization, login, created
        );
        let reviewed_query = format!(
            "is:pr org:{} reviewed-by:{} -author:{} created:{}",
            self.organization, login, login, created
        );

        let mut prs = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let data = self
                .graphql(
                    "person-prs",
                    PERSON_QUERY,
                    json!({
                        "query": authored_query,
                        "cursor": cursor,
                        "pageSize": PR_PAGE_SIZE,
                        "reviewPage": REVIEW_PAGE_SIZE,
                    }),
                )
                .await?;
            let page: SearchData = decode("person-prs", data)?;
            for node in page.search.nodes {
                let repo = node.repository.name_with_owner.clone();
                prs.push(node.into_model(&repo));
            }
            if !page.search.page_info.has_next_page {
                break;
            }
            cursor = page.search.page_info.end_cursor;
        }

        let data = self
            .graphql(
                "person-reviews",
                REVIEW_COUNT_QUERY,
                json!({ "query": reviewed_query }),
            )
            .await?;
        let counted: ReviewCountData = decode("person-reviews", data)?;

        Ok(PersonActivity {
            login: login.to_string(),
            prs,
            reviews_given: counted.search.issue_count,
        })
    }

    /// POST one GraphQL request with bounded exponential-backoff retries.
    ///
    /// Returns the `data` payload. Cancellation is checked before every
    /// attempt and during every backoff sleep.
    async fn graphql(
        &self,
        context: &str,
        query: &str,
        variables: serde_json::Value,
    ) -> CollectResult<serde_json::Value> {
        let mut attempt: u32 = 0;
        loop {
            if self.cancel.is_cancelled() {
                return Err(CollectError::Cancelled);
            }

            let outcome = self.post_once(context, query, &variables).await;
            match outcome {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    let delay = BACKOFF_BASE * 2u32.saturating_pow(attempt);
                    warn!(
                        context,
                        attempt = attempt + 1,
                        delay_secs = delay.as_secs(),
                        error = %err,
                        "transient source-control error, backing off"
                    );
                    backoff_sleep(&self.cancel, delay).await?;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn post_once(
        &self,
        context: &str,
        query: &str,
        variables: &serde_json::Value,
    ) -> CollectResult<serde_json::Value> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| CollectError::transport(context, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollectError::from_status(context, status.as_u16(), &body));
        }

        let envelope: GraphQlEnvelope = response
            .json()
            .await
            .map_err(|e| CollectError::transport(context, &e))?;

        if let Some(errors) = envelope.errors
            && !errors.is_empty()
        {
            let joined = errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(CollectError::Permanent {
                context: context.to_string(),
                status: None,
                message: joined,
            });
        }

        envelope.data.ok_or_else(|| CollectError::Decode {
            context: context.to_string(),
            message: "response had neither data nor errors".to_string(),
        })
    }
}

fn decode<T: serde::de::DeserializeOwned>(
    context: &str,
    value: serde_json::Value,
) -> CollectResult<T> {
    serde_json::from_value(value).map_err(|e| CollectError::Decode {
        context: context.to_string(),
        message: e.to_string(),
    })
}

// ──────────────────────────────────────────────
// Queries
// ──────────────────────────────────────────────

const DISCOVER_QUERY: &str = r"
query($org: String!, $cursor: String, $pageSize: Int!) {
  organization(login: $org) {
    repositories(first: $pageSize, after: $cursor, orderBy: {field: NAME, direction: ASC}) {
      pageInfo { hasNextPage endCursor }
      nodes {
        name
        owner { login }
        repositoryTopics(first: 20) { nodes { topic { name } } }
      }
    }
  }
}";

const REPO_QUERY: &str = r"
query($owner: String!, $name: String!, $prCursor: String, $relCursor: String,
      $prPage: Int!, $relPage: Int!, $reviewPage: Int!, $commitPage: Int!) {
  repository(owner: $owner, name: $name) {
    pullRequests(first: $prPage, after: $prCursor, orderBy: {field: CREATED_AT, direction: DESC}) {
      pageInfo { hasNextPage endCursor }
      nodes {
        number
        title
        headRefName
        createdAt
        mergedAt
        closedAt
        additions
        deletions
        author { login }
        reviews(first: $reviewPage) {
          nodes { author { login } submittedAt state }
        }
        commits(first: $commitPage) {
          nodes {
            commit {
              oid
              authoredDate
              additions
              deletions
              author { user { login } }
            }
          }
        }
      }
    }
    releases(first: $relPage, after: $relCursor, orderBy: {field: CREATED_AT, direction: DESC}) {
      pageInfo { hasNextPage endCursor }
      nodes { name publishedAt }
    }
  }
}";

const PERSON_QUERY: &str = r"
query($query: String!, $cursor: String, $pageSize: Int!, $reviewPage: Int!) {
  search(query: $query, type: ISSUE, first: $pageSize, after: $cursor) {
    pageInfo { hasNextPage endCursor }
    nodes {
      ... on PullRequest {
        number
        title
        headRefName
        createdAt
        mergedAt
        closedAt
        additions
        deletions
        author { login }
        repository { nameWithOwner }
        reviews(first: $reviewPage) {
          nodes { author { login } submittedAt state }
        }
      }
    }
  }
}";

const REVIEW_COUNT_QUERY: &str = r"
query($query: String!) {
  search(query: $query, type: ISSUE, first: 1) {
    issueCount
  }
}";

// ──────────────────────────────────────────────
// Wire types
// ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GraphQlEnvelope {
    data: Option<serde_json::Value>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct PageInfo {
    #[serde(rename = "hasNextPage")]
    has_next_page: bool,
    #[serde(rename = "endCursor")]
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DiscoverData {
    organization: DiscoverOrg,
}

#[derive(Debug, Deserialize)]
struct DiscoverOrg {
    repositories: RepoConnection,
}

#[derive(Debug, Deserialize)]
struct RepoConnection {
    #[serde(rename = "pageInfo")]
    page_info: PageInfo,
    nodes: Vec<RepoNode>,
}

#[derive(Debug, Deserialize)]
struct RepoNode {
    name: String,
    owner: LoginNode,
    #[serde(rename = "repositoryTopics")]
    repository_topics: TopicConnection,
}

#[derive(Debug, Deserialize)]
struct TopicConnection {
    nodes: Vec<TopicNode>,
}

#[derive(Debug, Deserialize)]
struct TopicNode {
    topic: TopicName,
}

#[derive(Debug, Deserialize)]
struct TopicName {
    name: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct LoginNode {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RepoDataPage {
    repository: RepositoryPage,
}

#[derive(Debug, Deserialize)]
struct RepositoryPage {
    #[serde(rename = "pullRequests")]
    pull_requests: PrConnection,
    releases: ReleaseConnection,
}

#[derive(Debug, Deserialize)]
struct PrConnection {
    #[serde(rename = "pageInfo")]
    page_info: PageInfo,
    nodes: Vec<PrNode>,
}

#[derive(Debug, Deserialize)]
struct PrNode {
    number: u64,
    title: String,
    #[serde(rename = "headRefName")]
    head_ref_name: String,
    #[serde(rename = "createdAt")]
    created_at: DateTime<Utc>,
    #[serde(rename = "mergedAt")]
    merged_at: Option<DateTime<Utc>>,
    #[serde(rename = "closedAt")]
    closed_at: Option<DateTime<Utc>>,
    additions: u64,
    deletions: u64,
    // Ghost authors (deleted accounts) come back null.
    author: Option<LoginNode>,
    #[serde(default)]
    reviews: ReviewConnection,
    #[serde(default)]
    commits: CommitConnection,
    #[serde(default)]
    repository: PrRepository,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PrRepository {
    #[serde(rename = "nameWithOwner")]
    name_with_owner: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ReviewConnection {
    nodes: Vec<ReviewNode>,
}

#[derive(Debug, Deserialize)]
struct ReviewNode {
    author: Option<LoginNode>,
    #[serde(rename = "submittedAt")]
    submitted_at: Option<DateTime<Utc>>,
    state: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CommitConnection {
    nodes: Vec<CommitWrapper>,
}

#[derive(Debug, Deserialize)]
struct CommitWrapper {
    commit: CommitNode,
}

#[derive(Debug, Deserialize)]
struct CommitNode {
    oid: String,
    #[serde(rename = "authoredDate")]
    authored_at: DateTime<Utc>,
    #[serde(default)]
    additions: u64,
    #[serde(default)]
    deletions: u64,
    author: Option<CommitAuthor>,
}

#[derive(Debug, Deserialize)]
struct CommitAuthor {
    user: Option<LoginNode>,
}

#[derive(Debug, Deserialize)]
struct ReleaseConnection {
    #[serde(rename = "pageInfo")]
    page_info: PageInfo,
    nodes: Vec<ReleaseNode>,
}

#[derive(Debug, Deserialize)]
struct ReleaseNode {
    name: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    search: PrConnection,
}

#[derive(Debug, Deserialize)]
struct ReviewCountData {
    search: IssueCount,
}

#[derive(Debug, Deserialize)]
struct IssueCount {
    #[serde(rename = "issueCount")]
    issue_count: u64,
}

impl PrNode {
    fn into_model(self, repo: &str) -> PullRequest {
        let pr_id = self.number;
        let reviews = self
            .reviews
            .nodes
            .into_iter()
            .filter_map(|r| {
                let submitted = r.submitted_at?;
                Some(Review {
                    pr_id,
                    author_login: r.author.map(|a| a.login).unwrap_or_default(),
                    created_at: submitted,
                    state: parse_review_state(&r.state),
                })
            })
            .collect();
        let commits = self
            .commits
            .nodes
            .into_iter()
            .map(|w| Commit {
                sha: w.commit.oid,
                author_login: w
                    .commit
                    .author
                    .and_then(|a| a.user)
                    .map(|u| u.login)
                    .unwrap_or_default(),
                authored_at: w.commit.authored_at,
                additions: w.commit.additions,
                deletions: w.commit.deletions,
            })
            .collect();

        PullRequest {
            id: pr_id,
            repo: repo.to_string(),
            author_login: self.author.map(|a| a.login).unwrap_or_default(),
            title: self.title,
            branch: self.head_ref_name,
            created_at: self.created_at,
            merged_at: self.merged_at,
            closed_at: self.closed_at,
            additions: self.additions,
            deletions: self.deletions,
            reviews,
            commits,
            issue_keys: BTreeSet::new(),
        }
    }
}

fn parse_review_state(state: &str) -> ReviewState {
    match state {
        "APPROVED" => ReviewState::Approved,
        "CHANGES_REQUESTED" => ReviewState::ChangesRequested,
        "DISMISSED" => ReviewState::Dismissed,
        _ => ReviewState::Commented,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window() -> DateRange {
        let now = Utc.with_ymd_and_hms(2025, 11, 1, 0, 0, 0).unwrap();
        DateRange::parse("30d", now).unwrap()
    }

    #[test]
    fn pr_node_maps_to_model() {
        let node: PrNode = serde_json::from_value(json!({
            "number": 42,
            "title": "PROJ-7 harden retry loop",
            "headRefName": "fix/PROJ-7-retries",
            "createdAt": "2025-10-10T08:00:00Z",
            "mergedAt": "2025-10-11T10:30:00Z",
            "closedAt": "2025-10-11T10:30:00Z",
            "additions": 120,
            "deletions": 30,
            "author": { "login": "alice" },
            "reviews": { "nodes": [
                { "author": { "login": "bob" }, "submittedAt": "2025-10-10T12:00:00Z", "state": "APPROVED" },
                { "author": null, "submittedAt": null, "state": "COMMENTED" }
            ]},
            "commits": { "nodes": [
                { "commit": {
                    "oid": "abc123",
                    "authoredDate": "2025-10-10T07:00:00Z",
                    "additions": 100,
                    "deletions": 20,
                    "author": { "user": { "login": "alice" } }
                }}
            ]}
        }))
        .unwrap();

        let pr = node.into_model("acme/api");
        assert_eq!(pr.id, 42);
        assert_eq!(pr.repo, "acme/api");
        assert_eq!(pr.author_login, "alice");
        // The review without a submission time is dropped
        assert_eq!(pr.reviews.len(), 1);
        assert_eq!(pr.reviews[0].state, ReviewState::Approved);
        assert_eq!(pr.reviews[0].pr_id, 42);
        assert_eq!(pr.commits.len(), 1);
        assert_eq!(pr.commits[0].author_login, "alice");
    }

    #[test]
    fn ghost_author_becomes_empty_login() {
        let node: PrNode = serde_json::from_value(json!({
            "number": 7,
            "title": "cleanup",
            "headRefName": "chore/cleanup",
            "createdAt": "2025-10-10T08:00:00Z",
            "mergedAt": null,
            "closedAt": null,
            "additions": 1,
            "deletions": 1,
            "author": null
        }))
        .unwrap();
        let pr = node.into_model("acme/api");
        assert_eq!(pr.author_login, "");
        assert!(pr.reviews.is_empty());
    }

    #[test]
    fn review_state_parsing_defaults_to_commented() {
        assert_eq!(parse_review_state("APPROVED"), ReviewState::Approved);
        assert_eq!(
            parse_review_state("CHANGES_REQUESTED"),
            ReviewState::ChangesRequested
        );
        assert_eq!(parse_review_state("DISMISSED"), ReviewState::Dismissed);
        assert_eq!(parse_review_state("PENDING"), ReviewState::Commented);
    }

    #[test]
    fn window_filter_applies_to_page_nodes() {
        let w = window();
        let inside = Utc.with_ymd_and_hms(2025, 10, 20, 0, 0, 0).unwrap();
        let outside = Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap();
        assert!(w.contains(inside));
        assert!(!w.contains(outside));
    }

    #[test]
    fn graphql_envelope_surfaces_errors() {
        let envelope: GraphQlEnvelope = serde_json::from_value(json!({
            "data": null,
            "errors": [{ "message": "Bad credentials" }]
        }))
        .unwrap();
        assert_eq!(envelope.errors.unwrap()[0].message, "Bad credentials");
    }

    #[tokio::test]
    async fn cancelled_collector_short_circuits() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let collector = GithubCollector::new(
            &SourceControlConfig {
                token: "t".into(),
                organization: "acme".into(),
                api_url: Some("http://127.0.0.1:1/graphql".into()),
            },
            Duration::from_secs(1),
            3,
            cancel,
        )
        .unwrap();
        let err = collector
            .graphql("test", REVIEW_COUNT_QUERY, json!({"query": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, CollectError::Cancelled));
    }

    #[test]
    fn release_nodes_without_publish_date_are_skipped() {
        let node: ReleaseNode = serde_json::from_value(json!({
            "name": "Live - 6/Oct/2025",
            "publishedAt": null
        }))
        .unwrap();
        assert!(node.published_at.is_none());
    }
}
