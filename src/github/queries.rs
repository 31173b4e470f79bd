//! Query documents and the response shapes decoded from them.

use serde::Deserialize;

pub const USER: &str = r#"
query($login: String!) {
    user(login: $login) {
        id
        createdAt
    }
}"#;

pub const FOLLOWERS: &str = r#"
query($login: String!) {
    user(login: $login) {
        followers { totalCount }
    }
}"#;

pub const CONTRIBUTIONS: &str = r#"
query($start_date: DateTime!, $end_date: DateTime!, $login: String!) {
    user(login: $login) {
        contributionsCollection(from: $start_date, to: $end_date) {
            contributionCalendar { totalContributions }
        }
    }
}"#;

pub const REPO_STARS: &str = r#"
query($owner_affiliation: [RepositoryAffiliation], $login: String!, $cursor: String) {
    user(login: $login) {
        repositories(first: 100, after: $cursor, ownerAffiliations: $owner_affiliation) {
            totalCount
            edges {
                node {
                    nameWithOwner
                    stargazers { totalCount }
                }
            }
            pageInfo { endCursor hasNextPage }
        }
    }
}"#;

pub const REPO_LIST: &str = r#"
query($owner_affiliation: [RepositoryAffiliation], $login: String!, $cursor: String) {
    user(login: $login) {
        repositories(first: 60, after: $cursor, ownerAffiliations: $owner_affiliation) {
            edges {
                node {
                    nameWithOwner
                    defaultBranchRef {
                        target {
                            ... on Commit { history { totalCount } }
                        }
                    }
                }
            }
            pageInfo { endCursor hasNextPage }
        }
    }
}"#;

pub const COMMIT_HISTORY: &str = r#"
query($repo_name: String!, $owner: String!, $cursor: String) {
    repository(name: $repo_name, owner: $owner) {
        defaultBranchRef {
            target {
                ... on Commit {
                    history(first: 100, after: $cursor) {
                        totalCount
                        edges {
                            node {
                                committedDate
                                author { user { id } }
                                deletions
                                additions
                            }
                        }
                        pageInfo { endCursor hasNextPage }
                    }
                }
            }
        }
    }
}"#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

impl PageInfo {
    /// Cursor for the following page, if the provider says there is one.
    pub fn next_cursor(self) -> Option<String> {
        if self.has_next_page {
            self.end_cursor
        } else {
            None
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Edge<N> {
    pub node: N,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<N> {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default = "Vec::new")]
    pub edges: Vec<Option<Edge<N>>>,
    pub page_info: PageInfo,
}

impl<N> Connection<N> {
    pub fn nodes(&mut self) -> impl Iterator<Item = N> + '_ {
        self.edges.drain(..).flatten().map(|edge| edge.node)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalCount {
    pub total_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData<U> {
    pub user: Option<U>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserNode {
    pub id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
pub struct FollowersNode {
    pub followers: TotalCount,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionsNode {
    pub contributions_collection: ContributionsCollection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionsCollection {
    pub contribution_calendar: ContributionCalendar,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionCalendar {
    pub total_contributions: u64,
}

#[derive(Debug, Deserialize)]
pub struct RepositoriesNode<N> {
    pub repositories: Connection<N>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarNode {
    pub name_with_owner: String,
    pub stargazers: TotalCount,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoListNode {
    pub name_with_owner: String,
    pub default_branch_ref: Option<BranchRef<HistoryCount>>,
}

impl RepoListNode {
    pub fn history_total(&self) -> Option<u64> {
        self.default_branch_ref
            .as_ref()
            .and_then(|branch| branch.target.as_ref())
            .and_then(|target| target.history.as_ref())
            .map(|history| history.total_count)
    }
}

#[derive(Debug, Deserialize)]
pub struct BranchRef<T> {
    pub target: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryCount {
    pub history: Option<TotalCount>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryData {
    pub repository: Option<RepositoryHistory>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryHistory {
    pub default_branch_ref: Option<BranchRef<CommitTarget>>,
}

#[derive(Debug, Deserialize)]
pub struct CommitTarget {
    pub history: Option<Connection<CommitNode>>,
}

#[derive(Debug, Deserialize)]
pub struct CommitNode {
    pub author: Option<CommitAuthor>,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
}

impl CommitNode {
    pub fn authored_by(&self, user_id: &str) -> bool {
        self.author
            .as_ref()
            .and_then(|author| author.user.as_ref())
            .is_some_and(|user| user.id == user_id)
    }
}

#[derive(Debug, Deserialize)]
pub struct CommitAuthor {
    pub user: Option<UserId>,
}

#[derive(Debug, Deserialize)]
pub struct UserId {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn repo_list_node_without_default_branch_has_no_total() {
        let node: RepoListNode = serde_json::from_value(json!({
            "nameWithOwner": "octo/empty",
            "defaultBranchRef": null
        }))
        .unwrap();
        assert_eq!(node.history_total(), None);

        let node: RepoListNode = serde_json::from_value(json!({
            "nameWithOwner": "octo/full",
            "defaultBranchRef": { "target": { "history": { "totalCount": 42 } } }
        }))
        .unwrap();
        assert_eq!(node.history_total(), Some(42));
    }

    #[test]
    fn commit_authorship_requires_matching_user() {
        let node: CommitNode = serde_json::from_value(json!({
            "author": { "user": null },
            "additions": 3,
            "deletions": 1
        }))
        .unwrap();
        assert!(!node.authored_by("U1"));

        let node: CommitNode = serde_json::from_value(json!({
            "author": { "user": { "id": "U1" } },
            "additions": 3,
            "deletions": 1
        }))
        .unwrap();
        assert!(node.authored_by("U1"));
        assert!(!node.authored_by("U2"));
    }

    #[test]
    fn page_info_only_yields_cursor_when_more_pages() {
        let done = PageInfo { end_cursor: Some("c1".into()), has_next_page: false };
        assert_eq!(done.next_cursor(), None);
        let more = PageInfo { end_cursor: Some("c2".into()), has_next_page: true };
        assert_eq!(more.next_cursor().as_deref(), Some("c2"));
    }
}
