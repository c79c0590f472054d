//! # Archive Writer
//!
//! Durable storage for traffic snapshots. Layout under the archive root:
//!
//! ```text
//! <root>/summary.csv            one scalar row per (repository, date)
//! <root>/<repo>/views.json      [{ date, count, uniques }, ...]
//! <root>/<repo>/clones.json     [{ date, count, uniques }, ...]
//! <root>/<repo>/referrers.json  [{ date, referrers: [...] }, ...]
//! <root>/<repo>/paths.json      [{ date, paths: [...] }, ...]
//! ```
//!
//! The merge contract is read-modify-write per file: load the existing
//! history (missing file = empty), merge the snapshot's entry by date, write
//! the whole file back. Past dates are never touched unless the writer was
//! created with forced refresh. The writer performs no locking; it assumes a
//! single writer process at a time, which the sequential CI schedule
//! provides.

pub mod history;
pub mod summary;

use crate::metrics::TrafficSnapshot;
use history::{
    CountEntry,
    PathDayEntry,
    ReferrerDayEntry,
};
use std::{
    fmt,
    fs,
    path::{
        Path,
        PathBuf,
    },
};
use tracing::debug;

#[derive(thiserror::Error, Debug)]
pub enum ArchiveError {
    #[error("snapshot rejected: {0}")]
    Validation(String),
    #[error("storage failure on {path}: {message}")]
    Storage { path: PathBuf, message: String },
}

impl ArchiveError {
    pub(crate) fn storage(path: &Path, message: impl fmt::Display) -> Self {
        ArchiveError::Storage {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }
}

/// What a merge did, per file and folded across files for the run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// A new date was appended.
    Written,
    /// An existing date was overwritten under forced refresh.
    Replaced,
    /// The date was already stored and forced refresh was off.
    Skipped,
}

impl WriteOutcome {
    /// Fold two per-file outcomes into the more significant one
    /// (`Replaced` > `Written` > `Skipped`).
    fn fold(self, other: Self) -> Self {
        use WriteOutcome::*;
        match (self, other) {
            (Replaced, _) | (_, Replaced) => Replaced,
            (Written, _) | (_, Written) => Written,
            (Skipped, Skipped) => Skipped,
        }
    }
}

impl fmt::Display for WriteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WriteOutcome::Written => "written",
            WriteOutcome::Replaced => "replaced",
            WriteOutcome::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

pub struct ArchiveWriter {
    root: PathBuf,
    force_refresh: bool,
}

impl ArchiveWriter {
    pub fn new(root: impl Into<PathBuf>, force_refresh: bool) -> Self {
        Self {
            root: root.into(),
            force_refresh,
        }
    }

    /// Merge one snapshot into the four history files and the CSV summary.
    ///
    /// Returns the folded [`WriteOutcome`] so the caller can log what
    /// actually happened. All five files receive the same skip/replace/insert
    /// decision for the snapshot's date, so they cannot drift apart under the
    /// single-writer assumption.
    pub fn write(&self, snapshot: &TrafficSnapshot) -> Result<WriteOutcome, ArchiveError> {
        validate(snapshot)?;

        let repo_dir = self.root.join(&snapshot.repository);
        fs::create_dir_all(&repo_dir).map_err(|e| ArchiveError::storage(&repo_dir, e))?;

        let force = self.force_refresh;
        let date = snapshot.date;

        let mut outcome = history::merge_dated(
            &repo_dir.join(history::VIEWS_FILE),
            CountEntry {
                date,
                count: snapshot.views,
                uniques: snapshot.unique_views,
            },
            force,
        )?;
        outcome = outcome.fold(history::merge_dated(
            &repo_dir.join(history::CLONES_FILE),
            CountEntry {
                date,
                count: snapshot.clones,
                uniques: snapshot.unique_clones,
            },
            force,
        )?);
        outcome = outcome.fold(history::merge_dated(
            &repo_dir.join(history::REFERRERS_FILE),
            ReferrerDayEntry {
                date,
                referrers: snapshot.referrers.clone(),
            },
            force,
        )?);
        outcome = outcome.fold(history::merge_dated(
            &repo_dir.join(history::PATHS_FILE),
            PathDayEntry {
                date,
                paths: snapshot.popular_paths.clone(),
            },
            force,
        )?);
        outcome = outcome.fold(summary::merge_row(
            &self.root.join(summary::SUMMARY_FILE),
            snapshot,
            force,
        )?);

        debug!(repository = %snapshot.repository, date = %date, outcome = %outcome, "snapshot merged");
        Ok(outcome)
    }
}

/// The normalizer already guarantees these, but the writer is also reachable
/// from library callers, and a bad repository name would escape the archive
/// root as a path component.
fn validate(snapshot: &TrafficSnapshot) -> Result<(), ArchiveError> {
    let repo = &snapshot.repository;
    if repo.is_empty() {
        return Err(ArchiveError::Validation("empty repository name".into()));
    }
    if repo.contains(['/', '\\', ',']) || repo == "." || repo == ".." {
        return Err(ArchiveError::Validation(format!(
            "repository name '{repo}' is not usable as an archive directory"
        )));
    }
    if snapshot.unique_views > snapshot.views {
        return Err(ArchiveError::Validation(format!(
            "unique_views {} exceeds views {}",
            snapshot.unique_views, snapshot.views
        )));
    }
    if snapshot.unique_clones > snapshot.clones {
        return Err(ArchiveError::Validation(format!(
            "unique_clones {} exceeds clones {}",
            snapshot.unique_clones, snapshot.clones
        )));
    }
    for r in &snapshot.referrers {
        if r.uniques > r.count {
            return Err(ArchiveError::Validation(format!(
                "referrer '{}': uniques {} exceeds count {}",
                r.referrer, r.uniques, r.count
            )));
        }
    }
    for p in &snapshot.popular_paths {
        if p.uniques > p.count {
            return Err(ArchiveError::Validation(format!(
                "path '{}': uniques {} exceeds count {}",
                p.path, p.uniques, p.count
            )));
        }
    }
    Ok(())
}
