use crate::util::identity_digest;
use serde::Serialize;

pub const SCHEMA_VERSION: u32 = 1;

/// A repository as reported by the current enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryDescriptor {
    pub owner: String,
    pub name: String,
    /// Commits on the default branch, `None` when there is no default branch.
    pub total_commit_count: Option<u64>,
}

impl RepositoryDescriptor {
    pub fn new(owner: impl Into<String>, name: impl Into<String>, total_commit_count: Option<u64>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            total_commit_count,
        }
    }

    /// Parse a `owner/name` pair as returned by `nameWithOwner`.
    pub fn from_name_with_owner(name_with_owner: &str, total_commit_count: Option<u64>) -> Option<Self> {
        let (owner, name) = name_with_owner.split_once('/')?;
        if owner.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(owner, name, total_commit_count))
    }

    pub fn identity(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    pub fn digest(&self) -> String {
        identity_digest(&self.identity())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineStats {
    pub lines_added: u64,
    pub lines_deleted: u64,
    pub my_commits: u64,
}

impl LineStats {
    pub fn add_commit(&mut self, additions: u64, deletions: u64) {
        self.lines_added = self.lines_added.saturating_add(additions);
        self.lines_deleted = self.lines_deleted.saturating_add(deletions);
        self.my_commits = self.my_commits.saturating_add(1);
    }
}

/// One line of the cache file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRecord {
    pub digest: String,
    pub commit_count_at_scan: u64,
    pub stats: LineStats,
}

impl CacheRecord {
    pub fn zeroed(digest: impl Into<String>) -> Self {
        Self {
            digest: digest.into(),
            commit_count_at_scan: 0,
            stats: LineStats::default(),
        }
    }

    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let digest = fields.next()?.to_string();
        let commit_count_at_scan = fields.next()?.parse().ok()?;
        let my_commits = fields.next()?.parse().ok()?;
        let lines_added = fields.next()?.parse().ok()?;
        let lines_deleted = fields.next()?.parse().ok()?;
        if fields.next().is_some() {
            return None;
        }
        Some(Self {
            digest,
            commit_count_at_scan,
            stats: LineStats {
                lines_added,
                lines_deleted,
                my_commits,
            },
        })
    }

    pub fn to_line(&self) -> String {
        format!(
            "{} {} {} {} {}",
            self.digest,
            self.commit_count_at_scan,
            self.stats.my_commits,
            self.stats.lines_added,
            self.stats.lines_deleted
        )
    }
}

/// Result of reconciling the live cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocTotals {
    pub added: u64,
    pub deleted: u64,
    pub net: i64,
    /// `false` when the cache had to be rebuilt this run.
    pub cached: bool,
}

impl LocTotals {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a CacheRecord>, cached: bool) -> Self {
        let (added, deleted) = records.into_iter().fold((0u64, 0u64), |(a, d), r| {
            (a.saturating_add(r.stats.lines_added), d.saturating_add(r.stats.lines_deleted))
        });
        Self {
            added,
            deleted,
            net: net_lines(added, deleted),
            cached,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveTotals {
    pub added: u64,
    pub deleted: u64,
    pub net: i64,
    pub extra_commits: u64,
    pub repo_count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregateTotals {
    pub lines_added: u64,
    pub lines_deleted: u64,
    pub net_lines: i64,
    pub total_commits: u64,
    pub repository_count: u64,
}

impl AggregateTotals {
    pub fn combine(live: &LocTotals, live_commits: u64, live_repos: u64, archive: &ArchiveTotals) -> Self {
        let lines_added = live.added.saturating_add(archive.added);
        let lines_deleted = live.deleted.saturating_add(archive.deleted);
        Self {
            lines_added,
            lines_deleted,
            net_lines: net_lines(lines_added, lines_deleted),
            total_commits: live_commits.saturating_add(archive.extra_commits),
            repository_count: live_repos.saturating_add(archive.repo_count),
        }
    }
}

/// Added minus deleted, clamped to the `i64` range.
pub fn net_lines(added: u64, deleted: u64) -> i64 {
    let net = i128::from(added) - i128::from(deleted);
    net.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Everything the presentation layer needs, possibly zeroed after a failure.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatsReport {
    pub version: u32,
    pub login: String,
    pub age: String,
    pub stars: u64,
    pub repos: u64,
    pub contributed_repos: u64,
    pub followers: u64,
    pub contributions: u64,
    pub loc: AggregateTotals,
    pub cached: bool,
    pub archived_repos: u64,
    pub error: Option<String>,
}
