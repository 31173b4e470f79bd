use crate::model::{net_lines, ArchiveTotals};
use std::fs;
use std::path::{Path, PathBuf};

pub const ARCHIVE_FILE: &str = "repository_archive.txt";

/// Number of leading and trailing lines of the archive that are not records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveLayout {
    pub header: usize,
    pub footer: usize,
}

impl Default for ArchiveLayout {
    fn default() -> Self {
        Self { header: 7, footer: 3 }
    }
}

/// Frozen totals for repositories that can no longer be enumerated.
pub struct Archive {
    path: PathBuf,
    layout: ArchiveLayout,
}

impl Archive {
    pub fn new<P: AsRef<Path>>(path: P, layout: ArchiveLayout) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            layout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sum the archive. A missing or unreadable archive counts as empty.
    pub fn load(&self) -> ArchiveTotals {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) => {
                tracing::debug!(path = %self.path.display(), error = %err, "no archive");
                return ArchiveTotals::default();
            }
        };
        match parse(&contents, self.layout) {
            Some(totals) => totals,
            None => {
                tracing::warn!(path = %self.path.display(), "archive is malformed, ignoring it");
                ArchiveTotals::default()
            }
        }
    }
}

fn parse(contents: &str, layout: ArchiveLayout) -> Option<ArchiveTotals> {
    let lines: Vec<&str> = contents.lines().collect();
    let end = lines.len().saturating_sub(layout.footer);
    let body = lines.get(layout.header..end).unwrap_or_default();

    let mut totals = ArchiveTotals::default();
    for line in body {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [_digest, _total, my_commits, added, deleted, ..] = fields.as_slice() else {
            return None;
        };
        totals.added = totals.added.checked_add(added.parse().ok()?)?;
        totals.deleted = totals.deleted.checked_add(deleted.parse().ok()?)?;
        if let Ok(commits) = my_commits.parse::<u64>() {
            totals.extra_commits = totals.extra_commits.checked_add(commits)?;
        }
        totals.repo_count += 1;
    }
    let trailing = lines.last().map_or(0, |last| trailing_commit_count(last));
    totals.extra_commits = totals.extra_commits.checked_add(trailing)?;
    totals.net = net_lines(totals.added, totals.deleted);
    Some(totals)
}

/// The fifth field of the archive's last line, minus trailing punctuation.
fn trailing_commit_count(line: &str) -> u64 {
    line.split_whitespace()
        .nth(4)
        .map(|field| field.trim_end_matches(|c: char| !c.is_ascii_digit()))
        .and_then(|digits| digits.parse().ok())
        .unwrap_or(0)
}
