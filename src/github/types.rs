//! Wire types for the traffic endpoints, kept loose on purpose: counts come in
//! as `i64` and lists default to empty, so a sparse or slightly malformed
//! response still deserializes. The normalizer tightens everything afterwards.

use serde::Deserialize;

/// One day inside the reporting window of a views/clones response.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDailyCount {
    pub timestamp: String,
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub uniques: i64,
}

/// Aggregate views or clones over the API's reporting window.
///
/// The views endpoint nests its daily breakdown under `views`, the clones
/// endpoint under `clones`; both map onto `daily` here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTrafficWindow {
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub uniques: i64,
    #[serde(default, alias = "views", alias = "clones")]
    pub daily: Vec<RawDailyCount>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawReferrer {
    pub referrer: String,
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub uniques: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPopularPath {
    pub path: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub uniques: i64,
}

/// Everything the four traffic endpoints returned for one repository.
#[derive(Debug, Clone, Default)]
pub struct RawTraffic {
    pub views: RawTrafficWindow,
    pub clones: RawTrafficWindow,
    pub referrers: Vec<RawReferrer>,
    pub popular_paths: Vec<RawPopularPath>,
}

/// Subset of a repository listing entry needed for org enumeration.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRepo {
    pub name: String,
    #[serde(default)]
    pub archived: bool,
}
