//! The CSV summary: one denormalized row per (repository, date), sorted by
//! repository then date, with a fixed header. Referrer and path detail stays
//! in the JSON history; this file exists for spreadsheet-level scanning.

use crate::{
    archive::{
        ArchiveError,
        WriteOutcome,
    },
    metrics::TrafficSnapshot,
};
use chrono::NaiveDate;
use std::{
    fs,
    io,
    path::Path,
};

pub const SUMMARY_FILE: &str = "summary.csv";

const HEADER: &str = "repository,date,views,unique_views,clones,unique_clones";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub repository: String,
    pub date: NaiveDate,
    pub views: u64,
    pub unique_views: u64,
    pub clones: u64,
    pub unique_clones: u64,
}

impl SummaryRow {
    pub fn from_snapshot(snapshot: &TrafficSnapshot) -> Self {
        Self {
            repository: snapshot.repository.clone(),
            date: snapshot.date,
            views: snapshot.views,
            unique_views: snapshot.unique_views,
            clones: snapshot.clones,
            unique_clones: snapshot.unique_clones,
        }
    }

    fn key(&self) -> (&str, NaiveDate) {
        (self.repository.as_str(), self.date)
    }

    fn to_line(&self) -> String {
        format!(
            "{},{},{},{},{},{}",
            self.repository, self.date, self.views, self.unique_views, self.clones, self.unique_clones
        )
    }

    fn parse(line: &str, path: &Path, line_no: usize) -> Result<Self, ArchiveError> {
        let fields: Vec<&str> = line.split(',').collect();
        let [repository, date, views, unique_views, clones, unique_clones] = fields.as_slice() else {
            return Err(ArchiveError::storage(
                path,
                format!("line {line_no}: expected 6 fields, got {}", fields.len()),
            ));
        };
        let parse_count = |name: &str, value: &str| {
            value
                .parse::<u64>()
                .map_err(|e| ArchiveError::storage(path, format!("line {line_no}: bad {name} '{value}': {e}")))
        };
        Ok(Self {
            repository: (*repository).to_string(),
            date: date
                .parse()
                .map_err(|e| ArchiveError::storage(path, format!("line {line_no}: bad date '{date}': {e}")))?,
            views: parse_count("views", views)?,
            unique_views: parse_count("unique_views", unique_views)?,
            clones: parse_count("clones", clones)?,
            unique_clones: parse_count("unique_clones", unique_clones)?,
        })
    }
}

/// Merge one snapshot's scalar projection into the summary at `path`, with
/// the same skip/replace/insert semantics as the JSON history merge.
pub(crate) fn merge_row(path: &Path, snapshot: &TrafficSnapshot, force: bool) -> Result<WriteOutcome, ArchiveError> {
    let row = SummaryRow::from_snapshot(snapshot);
    let mut rows = load_rows(path)?;

    let outcome = match rows.binary_search_by(|r| r.key().cmp(&row.key())) {
        Ok(_) if !force => return Ok(WriteOutcome::Skipped),
        Ok(idx) => {
            rows[idx] = row;
            WriteOutcome::Replaced
        }
        Err(idx) => {
            rows.insert(idx, row);
            WriteOutcome::Written
        }
    };
    store_rows(path, &rows)?;
    Ok(outcome)
}

pub(crate) fn load_rows(path: &Path) -> Result<Vec<SummaryRow>, ArchiveError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ArchiveError::storage(path, e)),
    };

    let mut lines = text.lines().enumerate();
    match lines.next() {
        Some((_, header)) if header == HEADER => {}
        Some((_, header)) => {
            return Err(ArchiveError::storage(path, format!("unrecognized header '{header}'")));
        }
        None => return Ok(Vec::new()),
    }

    lines
        .filter(|(_, line)| !line.is_empty())
        .map(|(i, line)| SummaryRow::parse(line, path, i + 1))
        .collect()
}

fn store_rows(path: &Path, rows: &[SummaryRow]) -> Result<(), ArchiveError> {
    let mut text = String::from(HEADER);
    text.push('\n');
    for row in rows {
        text.push_str(&row.to_line());
        text.push('\n');
    }
    fs::write(path, text).map_err(|e| ArchiveError::storage(path, e))
}
