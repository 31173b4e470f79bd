use crate::error::Result;
use crate::github::HistorySource;
use crate::model::{CacheRecord, LocTotals, RepositoryDescriptor};
use crate::util::identity_digest;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{HashMap, VecDeque};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const PLACEHOLDER_HEADER: &str = "Comment line";

/// Per-account line-of-code cache.
///
/// The file holds `comment_size` opaque header lines followed by one record
/// per repository in the order of the last enumeration. Records are matched to
/// repositories by identity digest, never by position.
pub struct LocCache {
    path: PathBuf,
    comment_size: usize,
    header: Vec<String>,
    records: Vec<CacheRecord>,
    well_formed: bool,
    rebuilt: bool,
}

impl LocCache {
    pub fn file_path<P: AsRef<Path>>(cache_dir: P, login: &str) -> PathBuf {
        cache_dir.as_ref().join(format!("{}.txt", identity_digest(login)))
    }

    /// Load the account's cache, creating an empty one if there is none yet.
    pub fn open<P: AsRef<Path>>(cache_dir: P, login: &str, comment_size: usize) -> Result<Self> {
        fs::create_dir_all(cache_dir.as_ref())?;
        let mut cache = Self::empty(Self::file_path(cache_dir, login), comment_size);
        if cache.path.exists() {
            cache.load()?;
        } else {
            cache.persist()?;
        }
        Ok(cache)
    }

    /// Load the account's cache without touching the disk if it is missing.
    pub fn open_existing<P: AsRef<Path>>(cache_dir: P, login: &str, comment_size: usize) -> Result<Option<Self>> {
        let mut cache = Self::empty(Self::file_path(cache_dir, login), comment_size);
        if !cache.path.exists() {
            return Ok(None);
        }
        cache.load()?;
        Ok(Some(cache))
    }

    fn empty(path: PathBuf, comment_size: usize) -> Self {
        Self {
            path,
            comment_size,
            header: vec![PLACEHOLDER_HEADER.to_string(); comment_size],
            records: Vec::new(),
            well_formed: true,
            rebuilt: false,
        }
    }

    fn load(&mut self) -> Result<()> {
        let bytes = fs::read(&self.path)?;
        let contents = String::from_utf8_lossy(&bytes);
        let mut lines = contents.lines();

        self.header = lines.by_ref().take(self.comment_size).map(str::to_string).collect();
        self.header.resize(self.comment_size, PLACEHOLDER_HEADER.to_string());

        self.records.clear();
        self.well_formed = std::str::from_utf8(&bytes).is_ok();
        for line in lines {
            match CacheRecord::parse(line) {
                Some(record) => self.records.push(record),
                None => self.well_formed = false,
            }
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn records(&self) -> &[CacheRecord] {
        &self.records
    }

    /// Whether the last `reconcile` started by rebuilding every record.
    pub fn rebuilt(&self) -> bool {
        self.rebuilt
    }

    pub fn needs_rebuild(&self, repos: &[RepositoryDescriptor]) -> bool {
        !self.well_formed || self.records.len() != repos.len()
    }

    /// Replace every record with a zeroed one per repository, keeping the header.
    pub fn rebuild(&mut self, repos: &[RepositoryDescriptor]) -> Result<()> {
        self.records = repos.iter().map(|repo| CacheRecord::zeroed(repo.digest())).collect();
        self.well_formed = true;
        self.persist()
    }

    /// Bring every record up to date with the live commit counts and persist.
    ///
    /// Repositories whose stored count differs from the live one are walked
    /// again from scratch. A fatal walker error (transport failure, throttle)
    /// saves what has been updated so far before it is returned.
    pub fn reconcile<H: HistorySource + ?Sized>(
        &mut self,
        repos: &[RepositoryDescriptor],
        history: &mut H,
        force_rebuild: bool,
    ) -> Result<LocTotals> {
        self.rebuilt = false;
        if force_rebuild || self.needs_rebuild(repos) {
            tracing::info!(
                path = %self.path.display(),
                records = self.records.len(),
                repositories = repos.len(),
                forced = force_rebuild,
                "rebuilding line-of-code cache"
            );
            self.rebuilt = true;
            self.rebuild(repos)?;
        }
        let cached = !self.rebuilt;

        // A repository listed more than once claims its stored records in order.
        let mut by_digest: HashMap<String, VecDeque<CacheRecord>> = HashMap::new();
        for record in self.records.drain(..) {
            by_digest.entry(record.digest.clone()).or_default().push_back(record);
        }
        self.records = repos
            .iter()
            .map(|repo| {
                let digest = repo.digest();
                by_digest
                    .get_mut(&digest)
                    .and_then(VecDeque::pop_front)
                    .unwrap_or_else(|| CacheRecord::zeroed(digest))
            })
            .collect();

        let progress = ProgressBar::new(repos.len() as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let mut walked = 0usize;
        for (index, repo) in repos.iter().enumerate() {
            progress.set_message(repo.identity());
            let stored = &self.records[index];

            let updated = match repo.total_commit_count {
                None => {
                    tracing::debug!(repo = %repo.identity(), "live commit count unavailable, zeroing record");
                    Some(CacheRecord::zeroed(stored.digest.clone()))
                }
                Some(live) if live == stored.commit_count_at_scan => None,
                Some(live) => {
                    let digest = stored.digest.clone();
                    tracing::debug!(
                        repo = %repo.identity(),
                        cached = stored.commit_count_at_scan,
                        live,
                        "walking commit history"
                    );
                    match history.line_stats(repo) {
                        Ok(stats) => {
                            walked += 1;
                            Some(CacheRecord {
                                digest,
                                commit_count_at_scan: live,
                                stats,
                            })
                        }
                        Err(err) if err.is_fatal() => {
                            progress.abandon();
                            self.save_partial(index);
                            return Err(err);
                        }
                        Err(err) => {
                            tracing::warn!(repo = %repo.identity(), error = %err, "history unavailable, zeroing record");
                            Some(CacheRecord::zeroed(digest))
                        }
                    }
                }
            };

            if let Some(record) = updated {
                self.records[index] = record;
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        self.persist()?;
        tracing::info!(repositories = repos.len(), walked, cached, "line-of-code cache reconciled");
        Ok(self.totals(cached))
    }

    fn save_partial(&self, failed_at: usize) {
        match self.persist() {
            Ok(()) => tracing::warn!(
                path = %self.path.display(),
                completed = failed_at,
                "partial cache saved"
            ),
            Err(err) => tracing::error!(path = %self.path.display(), error = %err, "failed to save partial cache"),
        }
    }

    /// Write the header and records to a sibling file, then move it into place.
    pub fn persist(&self) -> Result<()> {
        let staging = self.path.with_extension("txt.tmp");
        {
            let mut writer = BufWriter::new(File::create(&staging)?);
            for line in &self.header {
                writeln!(writer, "{line}")?;
            }
            for record in &self.records {
                writeln!(writer, "{}", record.to_line())?;
            }
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }
        fs::rename(&staging, &self.path)?;
        Ok(())
    }

    pub fn totals(&self, cached: bool) -> LocTotals {
        LocTotals::from_records(&self.records, cached)
    }

    /// Commits authored by the tracked account across all cached repositories.
    pub fn commit_total(&self) -> u64 {
        self.records.iter().fold(0, |total: u64, r| total.saturating_add(r.stats.my_commits))
    }
}
