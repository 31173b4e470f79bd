use crate::archive::{Archive, ArchiveLayout, ARCHIVE_FILE};
use crate::cache::LocCache;
use crate::github::{Affiliation, HttpTransport, QueryClient, DEFAULT_ENDPOINT};
use crate::model::{AggregateTotals, LocTotals, StatsReport};
use crate::stats::{self, StatsConfig};
use crate::svg;
use crate::util::format_thousands;
use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use console::style;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "statcard")]
#[command(about = "GitHub profile statistics with an incremental lines-of-code cache")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone)]
pub struct CommonArgs {
    #[arg(long, env = "USER_NAME", help = "Account whose statistics are tracked")]
    pub user: String,

    #[arg(long, env = "STATCARD_CACHE_DIR", default_value = "cache", help = "Directory holding the cache files")]
    pub cache_dir: PathBuf,

    #[arg(long, env = "STATCARD_COMMENT_SIZE", default_value_t = 0, help = "Header lines kept at the top of the cache file")]
    pub comment_size: usize,

    #[arg(long, env = "STATCARD_ARCHIVE", help = "Archive of retired repositories [default: <cache-dir>/repository_archive.txt]")]
    pub archive: Option<PathBuf>,

    #[arg(long, default_value_t = 7, help = "Leading archive lines that are not records")]
    pub archive_header: usize,

    #[arg(long, default_value_t = 3, help = "Trailing archive lines that are not records")]
    pub archive_footer: usize,
}

impl CommonArgs {
    fn archive(&self) -> Archive {
        let path = self
            .archive
            .clone()
            .unwrap_or_else(|| self.cache_dir.join(ARCHIVE_FILE));
        Archive::new(path, self.layout())
    }

    fn layout(&self) -> ArchiveLayout {
        ArchiveLayout {
            header: self.archive_header,
            footer: self.archive_footer,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Query the API, refresh the cache and patch the card templates
    Update {
        #[arg(long, env = "ACCESS_TOKEN", hide_env_values = true, help = "API token")]
        token: String,

        #[arg(long, env = "STATCARD_ENDPOINT", default_value = DEFAULT_ENDPOINT, help = "GraphQL endpoint")]
        endpoint: String,

        #[arg(long = "svg", default_values = ["darkmode.svg", "lightmode.svg"], help = "Card templates to patch")]
        templates: Vec<PathBuf>,

        #[arg(long, env = "STATCARD_BIRTHDAY", help = "Start date for the age line (YYYY-MM-DD)")]
        birthday: Option<NaiveDate>,

        #[arg(long, value_enum, value_delimiter = ',', default_values = ["owner", "collaborator", "organization-member"], help = "Repository affiliations to include")]
        affiliation: Vec<Affiliation>,

        #[arg(long, help = "Discard the cache and walk every repository again")]
        force_rebuild: bool,

        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
    /// Print the totals held in the cache and archive without querying the API
    Totals {
        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn execute(self) -> Result<()> {
        match self.command {
            Commands::Update {
                token,
                endpoint,
                templates,
                birthday,
                affiliation,
                force_rebuild,
                json,
            } => {
                let transport = HttpTransport::new(endpoint, token).context("Failed to build HTTP client")?;
                let mut client = QueryClient::new(transport);
                let config = StatsConfig {
                    login: self.common.user.clone(),
                    cache_dir: self.common.cache_dir.clone(),
                    comment_size: self.common.comment_size,
                    archive_path: self.common.archive().path().to_path_buf(),
                    archive_layout: self.common.layout(),
                    affiliations: affiliation,
                    birthday,
                    force_rebuild,
                };
                let report = stats::collect(&mut client, &config, Utc::now());

                let fields = stats::template_fields(&report);
                for template in &templates {
                    if let Err(err) = svg::patch_file(template, &fields) {
                        tracing::error!(path = %template.display(), error = %err, "failed to update template");
                    }
                }

                if json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    output_report(&report);
                }
                Ok(())
            }
            Commands::Totals { json } => totals(&self.common, json),
        }
    }
}

#[derive(Serialize)]
struct OfflineTotals {
    login: String,
    cache_path: PathBuf,
    cached_repos: u64,
    totals: AggregateTotals,
}

fn totals(common: &CommonArgs, json: bool) -> Result<()> {
    let cache = LocCache::open_existing(&common.cache_dir, &common.user, common.comment_size)
        .context("Failed to read cache")?;
    let (live, commits, repos) = match &cache {
        Some(cache) => (cache.totals(true), cache.commit_total(), cache.records().len() as u64),
        None => (LocTotals::default(), 0, 0),
    };
    let archive = common.archive().load();
    let output = OfflineTotals {
        login: common.user.clone(),
        cache_path: LocCache::file_path(&common.cache_dir, &common.user),
        cached_repos: repos,
        totals: AggregateTotals::combine(&live, commits, repos, &archive),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", style("Cached Totals").bold());
    println!("{}", "─".repeat(50));
    println!("Cache file: {}", style(output.cache_path.display()).dim());
    println!("Repositories: {}", style(output.totals.repository_count).cyan());
    output_loc(&output.totals);
    Ok(())
}

fn output_loc(loc: &AggregateTotals) {
    println!("Commits: {}", style(format_thousands(loc.total_commits as i64)).cyan());
    println!("Lines added: {}", style(format_thousands(loc.lines_added as i64)).green());
    println!("Lines deleted: {}", style(format_thousands(loc.lines_deleted as i64)).red());
    println!("Net lines: {}", style(format_thousands(loc.net_lines)).yellow());
}

fn output_report(report: &StatsReport) {
    println!("{}", style("Final Totals").bold());
    println!("{}", "─".repeat(50));
    println!("Account: {}", style(&report.login).bold());
    println!("Age: {}", report.age);
    println!("Repos: {} ({} contributed)", style(report.repos).cyan(), report.contributed_repos);
    println!("Stars: {}", style(report.stars).cyan());
    println!("Followers: {}", style(report.followers).cyan());
    println!("Contributions: {}", style(report.contributions).cyan());
    output_loc(&report.loc);
    println!("Archived repos: {}", report.archived_repos);
    if !report.cached {
        println!("{}", style("Cache was rebuilt this run").dim());
    }
    if let Some(err) = &report.error {
        println!("{} {}", style("Incomplete:").red().bold(), err);
    }
}
