use crate::age::age_string;
use crate::archive::{Archive, ArchiveLayout};
use crate::cache::LocCache;
use crate::error::Result;
use crate::github::{list_repositories, star_summary, user, Affiliation, HistoryWalker, QueryClient, Transport};
use crate::model::{AggregateTotals, LocTotals, StatsReport, SCHEMA_VERSION};
use crate::svg::Field;
use crate::util::format_thousands;
use chrono::{DateTime, NaiveDate, Utc};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct StatsConfig {
    pub login: String,
    pub cache_dir: PathBuf,
    pub comment_size: usize,
    pub archive_path: PathBuf,
    pub archive_layout: ArchiveLayout,
    pub affiliations: Vec<Affiliation>,
    /// Start date for the age string; the account creation date when unset.
    pub birthday: Option<NaiveDate>,
    pub force_rebuild: bool,
}

#[derive(Debug, Default)]
struct LiveTotals {
    loc: LocTotals,
    commits: u64,
    repos: u64,
}

/// Gather every statistic. Never fails: whatever could not be fetched stays
/// zero and the first error is recorded on the report.
pub fn collect<T: Transport>(client: &mut QueryClient<T>, config: &StatsConfig, now: DateTime<Utc>) -> StatsReport {
    let mut report = StatsReport {
        version: SCHEMA_VERSION,
        login: config.login.clone(),
        ..StatsReport::default()
    };
    let mut live = LiveTotals::default();

    if let Err(err) = gather(client, config, now, &mut report, &mut live) {
        tracing::error!(
            error = %err,
            throttled = err.is_throttle(),
            "statistics run stopped early, reporting partial totals"
        );
        report.error = Some(err.to_string());
    }

    let archive = Archive::new(&config.archive_path, config.archive_layout).load();
    report.loc = AggregateTotals::combine(&live.loc, live.commits, live.repos, &archive);
    report.archived_repos = archive.repo_count;
    tracing::info!(queries = %client.counter(), total = client.counter().total(), "query usage");
    report
}

fn gather<T: Transport>(
    client: &mut QueryClient<T>,
    config: &StatsConfig,
    now: DateTime<Utc>,
    report: &mut StatsReport,
    live: &mut LiveTotals,
) -> Result<()> {
    let login = config.login.as_str();

    let profile = timed("account data", || user::profile(client, login))?;
    let birthday = config.birthday.unwrap_or_else(|| profile.created_at.date_naive());
    report.age = age_string(birthday, now.date_naive());

    let repos = timed("repository list", || list_repositories(client, login, &config.affiliations))?;
    let mut cache = LocCache::open(&config.cache_dir, login, config.comment_size)?;
    let reconciled = timed("lines of code", || {
        let mut walker = HistoryWalker::new(client, profile.id.clone());
        cache.reconcile(&repos, &mut walker, config.force_rebuild)
    });
    live.loc = match &reconciled {
        Ok(totals) => *totals,
        Err(_) => cache.totals(!cache.rebuilt()),
    };
    live.commits = cache.commit_total();
    live.repos = repos.len() as u64;
    report.cached = live.loc.cached;
    reconciled?;

    let contributed = timed("stars", || star_summary(client, login, &config.affiliations))?;
    report.stars = contributed.stars;
    report.contributed_repos = contributed.repos;
    report.repos = timed("owned repositories", || star_summary(client, login, &[Affiliation::Owner]))?.repos;

    report.followers = timed("followers", || user::followers(client, login))?;
    report.contributions = timed("contributions", || {
        user::contributions(client, login, profile.created_at, now)
    })?;
    Ok(())
}

fn timed<R>(stage: &'static str, f: impl FnOnce() -> Result<R>) -> Result<R> {
    let start = Instant::now();
    let result = f();
    tracing::info!(
        stage,
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        ok = result.is_ok(),
        "stage finished"
    );
    result
}

/// The named values written into the card template.
pub fn template_fields(report: &StatsReport) -> Vec<Field> {
    let count = |n: u64| format_thousands(n as i64);
    vec![
        Field::new("age_data", report.age.clone(), 22),
        Field::new("commit_data", count(report.loc.total_commits), 22),
        Field::new("star_data", count(report.stars), 14),
        Field::new("repo_data", count(report.repos), 6),
        Field::new("contrib_data", count(report.contributed_repos), 0),
        Field::new("follower_data", count(report.followers), 10),
        Field::new("loc_data", format_thousands(report.loc.net_lines), 9),
        Field::new("loc_add", count(report.loc.lines_added), 0),
        Field::new("loc_del", count(report.loc.lines_deleted), 7),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fields_use_separators_and_widths() {
        let report = StatsReport {
            age: "1 year, 0 months, 2 days".into(),
            stars: 1200,
            loc: AggregateTotals {
                lines_added: 150_000,
                lines_deleted: 40_000,
                net_lines: 110_000,
                total_commits: 2345,
                repository_count: 3,
            },
            ..StatsReport::default()
        };
        let fields = template_fields(&report);
        let by_id = |id: &str| fields.iter().find(|f| f.id == id).unwrap().clone();

        assert_eq!(by_id("star_data"), Field::new("star_data", "1,200", 14));
        assert_eq!(by_id("commit_data").value, "2,345");
        assert_eq!(by_id("loc_data").value, "110,000");
        assert_eq!(by_id("loc_del").value, "40,000");
        assert_eq!(fields.len(), 9);
    }
}
