use super::client::{QueryClient, QueryName, Transport};
use super::queries::{self, RepoListNode, RepositoriesNode, StarNode, UserData};
use crate::error::{Result, StatsError};
use crate::model::RepositoryDescriptor;
use clap::ValueEnum;
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Affiliation {
    Owner,
    Collaborator,
    OrganizationMember,
}

impl Affiliation {
    pub const ALL: [Affiliation; 3] = [
        Affiliation::Owner,
        Affiliation::Collaborator,
        Affiliation::OrganizationMember,
    ];
}

/// Lazily walks the account's repository list one page at a time.
///
/// Each call to `next` issues one query; the cursor is the only state carried
/// between pages, so a fresh iterator always starts from the first page.
pub struct RepositoryPages<'c, T: Transport> {
    client: &'c mut QueryClient<T>,
    login: String,
    affiliations: Vec<Affiliation>,
    cursor: Option<String>,
    done: bool,
}

impl<'c, T: Transport> RepositoryPages<'c, T> {
    pub fn new(client: &'c mut QueryClient<T>, login: &str, affiliations: &[Affiliation]) -> Self {
        Self {
            client,
            login: login.to_string(),
            affiliations: affiliations.to_vec(),
            cursor: None,
            done: false,
        }
    }

    fn fetch_page(&mut self) -> Result<Vec<RepositoryDescriptor>> {
        let variables = json!({
            "owner_affiliation": self.affiliations,
            "login": self.login,
            "cursor": self.cursor,
        });
        let data = self.client.execute(QueryName::RepoList, queries::REPO_LIST, variables)?;
        let page: UserData<RepositoriesNode<RepoListNode>> = serde_json::from_value(data)?;
        let mut repositories = page
            .user
            .ok_or_else(|| StatsError::Parse(format!("user '{}' not found", self.login)))?
            .repositories;

        let descriptors = repositories
            .nodes()
            .filter_map(|node| {
                let total = node.history_total();
                RepositoryDescriptor::from_name_with_owner(&node.name_with_owner, total)
            })
            .collect();

        self.cursor = repositories.page_info.next_cursor();
        self.done = self.cursor.is_none();
        Ok(descriptors)
    }
}

impl<T: Transport> Iterator for RepositoryPages<'_, T> {
    type Item = Result<Vec<RepositoryDescriptor>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let page = self.fetch_page();
        if page.is_err() {
            self.done = true;
        }
        Some(page)
    }
}

/// All repositories in provider order.
pub fn list_repositories<T: Transport>(
    client: &mut QueryClient<T>,
    login: &str,
    affiliations: &[Affiliation],
) -> Result<Vec<RepositoryDescriptor>> {
    let mut repositories = Vec::new();
    for page in RepositoryPages::new(client, login, affiliations) {
        repositories.extend(page?);
    }
    tracing::debug!(count = repositories.len(), "enumerated repositories");
    Ok(repositories)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StarSummary {
    pub repos: u64,
    pub stars: u64,
}

/// Repository count and stargazers summed over every page.
pub fn star_summary<T: Transport>(
    client: &mut QueryClient<T>,
    login: &str,
    affiliations: &[Affiliation],
) -> Result<StarSummary> {
    let mut summary = StarSummary::default();
    let mut cursor: Option<String> = None;
    loop {
        let variables = json!({
            "owner_affiliation": affiliations,
            "login": login,
            "cursor": cursor,
        });
        let data = client.execute(QueryName::RepoStars, queries::REPO_STARS, variables)?;
        let page: UserData<RepositoriesNode<StarNode>> = serde_json::from_value(data)?;
        let mut repositories = page
            .user
            .ok_or_else(|| StatsError::Parse(format!("user '{login}' not found")))?
            .repositories;

        summary.repos = repositories.total_count;
        summary.stars += repositories.nodes().map(|node| node.stargazers.total_count).sum::<u64>();

        match repositories.page_info.next_cursor() {
            Some(next) => cursor = Some(next),
            None => return Ok(summary),
        }
    }
}
