use super::client::{QueryClient, QueryName, Transport};
use super::queries::{self, ContributionsNode, FollowersNode, UserData, UserNode};
use crate::error::{Result, StatsError};
use crate::model::UserProfile;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

fn user_field<U: DeserializeOwned>(data: Value, login: &str) -> Result<U> {
    let data: UserData<U> = serde_json::from_value(data)?;
    data.user
        .ok_or_else(|| StatsError::Parse(format!("user '{login}' not found")))
}

pub fn profile<T: Transport>(client: &mut QueryClient<T>, login: &str) -> Result<UserProfile> {
    let data = client.execute(QueryName::User, queries::USER, json!({ "login": login }))?;
    let user: UserNode = user_field(data, login)?;
    Ok(UserProfile {
        id: user.id,
        created_at: user.created_at,
    })
}

pub fn followers<T: Transport>(client: &mut QueryClient<T>, login: &str) -> Result<u64> {
    let data = client.execute(QueryName::Followers, queries::FOLLOWERS, json!({ "login": login }))?;
    let user: FollowersNode = user_field(data, login)?;
    Ok(user.followers.total_count)
}

/// Contribution calendar total between two instants.
pub fn contributions<T: Transport>(
    client: &mut QueryClient<T>,
    login: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<u64> {
    let variables = json!({
        "start_date": from.to_rfc3339_opts(SecondsFormat::Secs, true),
        "end_date": to.to_rfc3339_opts(SecondsFormat::Secs, true),
        "login": login,
    });
    let data = client.execute(QueryName::Contributions, queries::CONTRIBUTIONS, variables)?;
    let user: ContributionsNode = user_field(data, login)?;
    Ok(user.contributions_collection.contribution_calendar.total_contributions)
}
