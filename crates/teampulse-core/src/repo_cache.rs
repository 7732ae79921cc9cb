//! Repository-list disk cache.
//!
//! Team→repository discovery is the slowest, least-changing upstream query,
//! so it is cached on disk for 24 hours. The key hashes the organization
//! and the sorted team list — changing either invalidates naturally. Cache
//! errors are never fatal: any read or decode problem degrades to a miss
//! and the caller falls through to the network.

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::model::Repository;

/// Cache entries older than this are stale.
const TTL_HOURS: f64 = 24.0;

/// A cache hit, with how old the entry is.
#[derive(Debug)]
pub struct CacheHit {
    /// The cached repositories.
    pub repos: Vec<Repository>,
    /// Entry age at read time.
    pub age_hours: f64,
}

/// On-disk blob format.
#[derive(Debug, Serialize, Deserialize)]
struct CachedRepoList {
    fetched_at: DateTime<Utc>,
    organization: String,
    repos: Vec<Repository>,
}

/// The cache itself: one JSON blob per (org, team-set) key.
#[derive(Debug, Clone)]
pub struct RepoListCache {
    dir: Utf8PathBuf,
}

impl RepoListCache {
    /// Cache rooted at an explicit directory.
    pub const fn new(dir: Utf8PathBuf) -> Self {
        Self { dir }
    }

    /// Cache rooted at the user cache directory, when one resolves.
    pub fn default_location() -> Option<Self> {
        crate::config::user_cache_dir().map(Self::new)
    }

    /// Stable key for an organization and team set.
    ///
    /// Team order in configuration must not matter, so the names are
    /// sorted before hashing.
    pub fn cache_key(organization: &str, team_names: &[String]) -> String {
        let mut sorted = team_names.to_vec();
        sorted.sort();
        let mut hasher = Sha256::new();
        hasher.update(organization.as_bytes());
        for name in &sorted {
            hasher.update(b"\n");
            hasher.update(name.as_bytes());
        }
        let digest = hasher.finalize();
        // 16 hex chars is plenty for a handful of cache files
        digest.iter().take(8).map(|b| format!("{b:02x}")).collect()
    }

    fn path(&self, organization: &str, team_names: &[String]) -> Utf8PathBuf {
        let key = Self::cache_key(organization, team_names);
        self.dir.join(format!("repos_{key}.json"))
    }

    /// Read a fresh entry, or `None` on miss, staleness, or any error.
    pub fn load(
        &self,
        organization: &str,
        team_names: &[String],
        now: DateTime<Utc>,
    ) -> Option<CacheHit> {
        let path = self.path(organization, team_names);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(%path, error = %err, "repo cache read failed, treating as miss");
                return None;
            }
        };
        let cached: CachedRepoList = match serde_json::from_slice(&bytes) {
            Ok(cached) => cached,
            Err(err) => {
                warn!(%path, error = %err, "repo cache decode failed, treating as miss");
                return None;
            }
        };

        let age_hours = (now - cached.fetched_at).num_seconds() as f64 / 3600.0;
        if !(0.0..TTL_HOURS).contains(&age_hours) {
            debug!(%path, age_hours, "repo cache stale");
            return None;
        }

        debug!(%path, age_hours, repos = cached.repos.len(), "repo cache hit");
        Some(CacheHit {
            repos: cached.repos,
            age_hours,
        })
    }

    /// Write an entry. Failures are logged and swallowed — the list was
    /// just fetched, so the run proceeds either way.
    pub fn store(
        &self,
        organization: &str,
        team_names: &[String],
        repos: &[Repository],
        now: DateTime<Utc>,
    ) {
        let path = self.path(organization, team_names);
        let blob = CachedRepoList {
            fetched_at: now,
            organization: organization.to_string(),
            repos: repos.to_vec(),
        };
        let result = std::fs::create_dir_all(&self.dir)
            .and_then(|()| {
                serde_json::to_vec_pretty(&blob)
                    .map_err(std::io::Error::other)
            })
            .and_then(|bytes| std::fs::write(&path, bytes));
        match result {
            Ok(()) => debug!(%path, repos = repos.len(), "repo cache written"),
            Err(err) => warn!(%path, error = %err, "repo cache write failed, continuing"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn cache(tmp: &TempDir) -> RepoListCache {
        RepoListCache::new(Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap())
    }

    fn repos() -> Vec<Repository> {
        vec![Repository {
            owner: "acme".into(),
            name: "api".into(),
            team: "Platform".into(),
        }]
    }

    fn teams() -> Vec<String> {
        vec!["Platform".to_string(), "Web".to_string()]
    }

    #[test]
    fn key_ignores_team_order() {
        let forward = RepoListCache::cache_key("acme", &teams());
        let reversed =
            RepoListCache::cache_key("acme", &["Web".to_string(), "Platform".to_string()]);
        assert_eq!(forward, reversed);
    }

    #[test]
    fn key_differs_by_org_and_teams() {
        let base = RepoListCache::cache_key("acme", &teams());
        assert_ne!(base, RepoListCache::cache_key("other", &teams()));
        assert_ne!(
            base,
            RepoListCache::cache_key("acme", &["Platform".to_string()])
        );
    }

    #[test]
    fn round_trip_within_ttl() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        let now = Utc::now();

        cache.store("acme", &teams(), &repos(), now);
        let hit = cache
            .load("acme", &teams(), now + Duration::hours(2))
            .unwrap();
        assert_eq!(hit.repos, repos());
        assert!((hit.age_hours - 2.0).abs() < 0.01);
    }

    #[test]
    fn stale_entry_misses() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        let now = Utc::now();

        cache.store("acme", &teams(), &repos(), now);
        assert!(cache.load("acme", &teams(), now + Duration::hours(25)).is_none());
    }

    #[test]
    fn missing_file_misses() {
        let tmp = TempDir::new().unwrap();
        assert!(cache(&tmp).load("acme", &teams(), Utc::now()).is_none());
    }

    #[test]
    fn corrupt_file_misses_instead_of_failing() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        let path = cache.path("acme", &teams());
        std::fs::write(&path, b"not json at all").unwrap();
        assert!(cache.load("acme", &teams(), Utc::now()).is_none());
    }

    #[test]
    fn future_dated_entry_misses() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        let now = Utc::now();
        cache.store("acme", &teams(), &repos(), now + Duration::hours(5));
        // A clock that went backwards should not produce negative ages
        assert!(cache.load("acme", &teams(), now).is_none());
    }
}
