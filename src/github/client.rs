use crate::error::{Result, StatsError};
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;

pub const DEFAULT_ENDPOINT: &str = "https://api.github.com/graphql";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QueryName {
    User,
    Followers,
    RepoStars,
    RepoList,
    CommitHistory,
    Contributions,
}

impl QueryName {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryName::User => "user",
            QueryName::Followers => "followers",
            QueryName::RepoStars => "repo_stars",
            QueryName::RepoList => "repo_list",
            QueryName::CommitHistory => "commit_history",
            QueryName::Contributions => "contributions",
        }
    }
}

/// Number of requests issued per query kind during one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryCounter {
    counts: BTreeMap<QueryName, u32>,
}

impl QueryCounter {
    pub fn record(&mut self, name: QueryName) {
        *self.counts.entry(name).or_insert(0) += 1;
    }

    pub fn get(&self, name: QueryName) -> u32 {
        self.counts.get(&name).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }
}

impl fmt::Display for QueryCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, count) in &self.counts {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", name.as_str(), count)?;
            first = false;
        }
        if first {
            f.write_str("none")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Sends one GraphQL request body and hands back the raw HTTP outcome.
pub trait Transport {
    fn post(&self, body: &Value) -> Result<TransportResponse>;
}

pub struct HttpTransport {
    client: reqwest::blocking::Client,
    endpoint: String,
    token: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder().build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token: token.into(),
        })
    }
}

impl Transport for HttpTransport {
    fn post(&self, body: &Value) -> Result<TransportResponse> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("token {}", self.token))
            .header(USER_AGENT, concat!("statcard/", env!("CARGO_PKG_VERSION")))
            .json(body)
            .send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        Ok(TransportResponse { status, body })
    }
}

pub struct QueryClient<T: Transport> {
    transport: T,
    counter: QueryCounter,
}

impl<T: Transport> QueryClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            counter: QueryCounter::default(),
        }
    }

    pub fn counter(&self) -> &QueryCounter {
        &self.counter
    }

    /// Run one query and return its `data` object. Never retries.
    pub fn execute(&mut self, name: QueryName, document: &str, variables: Value) -> Result<Value> {
        self.counter.record(name);
        tracing::debug!(query = name.as_str(), "issuing query");

        let body = json!({ "query": document, "variables": variables });
        let response = self.transport.post(&body)?;

        match response.status {
            200 => {}
            403 => {
                return Err(StatsError::Throttled {
                    query: name.as_str(),
                    body: response.body,
                    counts: self.counter.clone(),
                })
            }
            status => {
                return Err(StatsError::Transport {
                    query: name.as_str(),
                    status,
                    body: response.body,
                    counts: self.counter.clone(),
                })
            }
        }

        let mut payload: Value = serde_json::from_str(&response.body)?;
        match payload.get_mut("data").map(Value::take) {
            Some(data) if data.is_object() => Ok(data),
            _ => {
                let message = payload
                    .pointer("/errors/0/message")
                    .and_then(Value::as_str)
                    .unwrap_or("response carried no data")
                    .to_string();
                Err(StatsError::Query {
                    query: name.as_str(),
                    message,
                })
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedTransport;
    use super::*;

    #[test]
    fn returns_data_and_counts_queries() {
        let transport = ScriptedTransport::default().with(200, json!({ "data": { "user": { "id": "U1" } } }));
        let mut client = QueryClient::new(transport);
        let data = client
            .execute(QueryName::User, "query { user }", json!({ "login": "octo" }))
            .unwrap();
        assert_eq!(data["user"]["id"], "U1");
        assert_eq!(client.counter().get(QueryName::User), 1);
        assert_eq!(client.counter().total(), 1);

        let sent = client.transport().requests.borrow();
        assert_eq!(sent[0]["variables"]["login"], "octo");
        assert_eq!(sent[0]["query"], "query { user }");
    }

    #[test]
    fn forbidden_is_reported_as_throttle() {
        let transport = ScriptedTransport::default().with(403, json!({ "message": "rate limited" }));
        let mut client = QueryClient::new(transport);
        let err = client
            .execute(QueryName::CommitHistory, "q", json!({}))
            .unwrap_err();
        match err {
            StatsError::Throttled { query, counts, .. } => {
                assert_eq!(query, "commit_history");
                assert_eq!(counts.get(QueryName::CommitHistory), 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn other_statuses_carry_status_and_body() {
        let transport = ScriptedTransport::default().with(502, json!("bad gateway"));
        let mut client = QueryClient::new(transport);
        let err = client.execute(QueryName::RepoList, "q", json!({})).unwrap_err();
        match err {
            StatsError::Transport { status, body, .. } => {
                assert_eq!(status, 502);
                assert!(body.contains("bad gateway"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_data_surfaces_graphql_message() {
        let transport = ScriptedTransport::default()
            .with(200, json!({ "data": null, "errors": [{ "message": "Could not resolve" }] }));
        let mut client = QueryClient::new(transport);
        let err = client.execute(QueryName::User, "q", json!({})).unwrap_err();
        assert!(err.to_string().contains("Could not resolve"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn counter_display_lists_each_query() {
        let mut counter = QueryCounter::default();
        assert_eq!(counter.to_string(), "none");
        counter.record(QueryName::RepoList);
        counter.record(QueryName::CommitHistory);
        counter.record(QueryName::CommitHistory);
        assert_eq!(counter.to_string(), "repo_list=1, commit_history=2");
    }
}
