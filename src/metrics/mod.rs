//! Data structures for per-repository traffic statistics.
//!
//! A [`TrafficSnapshot`] is one collection event: everything the API reported
//! for one repository, tagged with the UTC date the collection ran. It is the
//! unit handed to the archive writer.

pub mod normalize;

use chrono::NaiveDate;
use serde::{
    Deserialize,
    Serialize,
};

/// One traffic source (e.g. `github.com`, `news.ycombinator.com`) and how many
/// visits it referred over the reporting window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferrerEntry {
    pub referrer: String,
    pub count: u64,
    pub uniques: u64,
}

/// One popular content path within the repository over the reporting window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularPathEntry {
    pub path: String,
    pub title: String,
    pub count: u64,
    pub uniques: u64,
}

/// One day's aggregated traffic statistics for one repository.
///
/// All counts are window totals as reported by the API. The normalizer
/// guarantees `unique_views <= views` and `unique_clones <= clones` (and the
/// same per referrer/path entry); the archive writer re-checks before
/// persisting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficSnapshot {
    pub repository: String,
    pub date: NaiveDate,
    pub views: u64,
    pub unique_views: u64,
    pub clones: u64,
    pub unique_clones: u64,
    pub referrers: Vec<ReferrerEntry>,
    pub popular_paths: Vec<PopularPathEntry>,
}
