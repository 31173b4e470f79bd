use super::client::{QueryClient, QueryName, Transport};
use super::queries::{self, RepositoryData};
use crate::error::Result;
use crate::model::{LineStats, RepositoryDescriptor};
use serde_json::json;

/// Something that can total up the tracked account's line changes in one repository.
pub trait HistorySource {
    fn line_stats(&mut self, repo: &RepositoryDescriptor) -> Result<LineStats>;
}

/// Pages through a repository's default-branch history via the query API.
pub struct HistoryWalker<'c, T: Transport> {
    client: &'c mut QueryClient<T>,
    owner_id: String,
}

impl<'c, T: Transport> HistoryWalker<'c, T> {
    pub fn new(client: &'c mut QueryClient<T>, owner_id: impl Into<String>) -> Self {
        Self {
            client,
            owner_id: owner_id.into(),
        }
    }

    pub fn compute(&mut self, owner: &str, name: &str) -> Result<LineStats> {
        let mut stats = LineStats::default();
        let mut cursor: Option<String> = None;

        loop {
            let variables = json!({ "repo_name": name, "owner": owner, "cursor": cursor });
            let data = self
                .client
                .execute(QueryName::CommitHistory, queries::COMMIT_HISTORY, variables)?;
            let page: RepositoryData = serde_json::from_value(data)?;

            let history = page
                .repository
                .and_then(|repo| repo.default_branch_ref)
                .and_then(|branch| branch.target)
                .and_then(|target| target.history);
            let Some(mut history) = history else {
                tracing::debug!(owner, name, "no default branch history");
                return Ok(LineStats::default());
            };

            let mut seen = 0usize;
            for commit in history.nodes() {
                seen += 1;
                if commit.authored_by(&self.owner_id) {
                    stats.add_commit(commit.additions, commit.deletions);
                }
            }

            match history.page_info.next_cursor() {
                Some(next) if seen > 0 => cursor = Some(next),
                _ => return Ok(stats),
            }
        }
    }
}

impl<T: Transport> HistorySource for HistoryWalker<'_, T> {
    fn line_stats(&mut self, repo: &RepositoryDescriptor) -> Result<LineStats> {
        self.compute(&repo.owner, &repo.name)
    }
}
