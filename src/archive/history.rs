//! JSON history files: one array per metric kind per repository, ordered
//! ascending by collection date, at most one entry per date.

use crate::{
    archive::{
        ArchiveError,
        WriteOutcome,
    },
    metrics::{
        PopularPathEntry,
        ReferrerEntry,
    },
};
use chrono::NaiveDate;
use serde::{
    de::DeserializeOwned,
    Deserialize,
    Serialize,
};
use std::{
    fs,
    io,
    path::Path,
};

pub const VIEWS_FILE: &str = "views.json";
pub const CLONES_FILE: &str = "clones.json";
pub const REFERRERS_FILE: &str = "referrers.json";
pub const PATHS_FILE: &str = "paths.json";

/// Aggregate views or clones stored for one collection date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountEntry {
    pub date: NaiveDate,
    pub count: u64,
    pub uniques: u64,
}

/// Referrer breakdown stored for one collection date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferrerDayEntry {
    pub date: NaiveDate,
    pub referrers: Vec<ReferrerEntry>,
}

/// Popular-path breakdown stored for one collection date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathDayEntry {
    pub date: NaiveDate,
    pub paths: Vec<PopularPathEntry>,
}

pub(crate) trait Dated {
    fn date(&self) -> NaiveDate;
}

impl Dated for CountEntry {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Dated for ReferrerDayEntry {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Dated for PathDayEntry {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

/// Merge one dated entry into the history file at `path`.
///
/// A missing file counts as an empty history. An entry for a new date is
/// inserted in date order; an entry for an already-stored date is skipped
/// unless `force` is set, in which case it replaces the stored one. The file
/// is only rewritten when something changed, so a skipped merge leaves the
/// bytes on disk untouched.
pub(crate) fn merge_dated<T>(path: &Path, entry: T, force: bool) -> Result<WriteOutcome, ArchiveError>
where
    T: Serialize + DeserializeOwned + Dated,
{
    let mut entries: Vec<T> = load_entries(path)?;
    let outcome = match entries.binary_search_by(|e| e.date().cmp(&entry.date())) {
        Ok(_) if !force => return Ok(WriteOutcome::Skipped),
        Ok(idx) => {
            entries[idx] = entry;
            WriteOutcome::Replaced
        }
        Err(idx) => {
            entries.insert(idx, entry);
            WriteOutcome::Written
        }
    };
    store_entries(path, &entries)?;
    Ok(outcome)
}

pub(crate) fn load_entries<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, ArchiveError> {
    match fs::read_to_string(path) {
        Ok(text) => serde_json::from_str(&text).map_err(|e| ArchiveError::storage(path, e)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(ArchiveError::storage(path, e)),
    }
}

fn store_entries<T: Serialize>(path: &Path, entries: &[T]) -> Result<(), ArchiveError> {
    let mut text = serde_json::to_string_pretty(entries).map_err(|e| ArchiveError::storage(path, e))?;
    text.push('\n');
    fs::write(path, text).map_err(|e| ArchiveError::storage(path, e))
}
