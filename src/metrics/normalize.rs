//! Boundary between the API's loose wire shapes and the typed archive model.
//!
//! The transformation is pure: it never fails, it only clamps. Upstream
//! aggregates are occasionally inconsistent (a negative count, or more unique
//! visitors than visits, presumably from rounding on the provider side), and
//! a data-quality warning is worth more than an aborted collection run.

use crate::{
    github::types::{
        RawPopularPath,
        RawReferrer,
        RawTraffic,
    },
    metrics::{
        PopularPathEntry,
        ReferrerEntry,
        TrafficSnapshot,
    },
};
use chrono::NaiveDate;
use tracing::warn;

/// Convert one repository's raw traffic response into a [`TrafficSnapshot`]
/// tagged with the given collection date.
pub fn normalize(repository: &str, date: NaiveDate, raw: &RawTraffic) -> TrafficSnapshot {
    let views = clamp_count(repository, "views", raw.views.count);
    let unique_views = clamp_uniques(repository, "views", views, raw.views.uniques);
    let clones = clamp_count(repository, "clones", raw.clones.count);
    let unique_clones = clamp_uniques(repository, "clones", clones, raw.clones.uniques);

    TrafficSnapshot {
        repository: repository.to_string(),
        date,
        views,
        unique_views,
        clones,
        unique_clones,
        referrers: raw.referrers.iter().map(|r| normalize_referrer(repository, r)).collect(),
        popular_paths: raw
            .popular_paths
            .iter()
            .map(|p| normalize_path(repository, p))
            .collect(),
    }
}

fn normalize_referrer(repository: &str, raw: &RawReferrer) -> ReferrerEntry {
    let count = clamp_count(repository, "referrer", raw.count);
    ReferrerEntry {
        referrer: raw.referrer.clone(),
        count,
        uniques: clamp_uniques(repository, "referrer", count, raw.uniques),
    }
}

fn normalize_path(repository: &str, raw: &RawPopularPath) -> PopularPathEntry {
    let count = clamp_count(repository, "path", raw.count);
    PopularPathEntry {
        path: raw.path.clone(),
        title: raw.title.clone(),
        count,
        uniques: clamp_uniques(repository, "path", count, raw.uniques),
    }
}

fn clamp_count(repository: &str, field: &str, value: i64) -> u64 {
    if value < 0 {
        warn!(repository, field, value, "negative count reported by API, clamping to 0");
        return 0;
    }
    value as u64
}

fn clamp_uniques(repository: &str, field: &str, total: u64, uniques: i64) -> u64 {
    let uniques = if uniques < 0 {
        warn!(repository, field, uniques, "negative unique count reported by API, clamping to 0");
        0
    } else {
        uniques as u64
    };
    if uniques > total {
        warn!(
            repository,
            field, uniques, total, "unique count exceeds total, clamping to total"
        );
        return total;
    }
    uniques
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::github::types::RawTrafficWindow;
    use pretty_assertions::assert_eq;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn empty_response_normalizes_to_zeroed_snapshot() {
        let snapshot = normalize("soprano", date(), &RawTraffic::default());
        assert_eq!(
            snapshot,
            TrafficSnapshot {
                repository: "soprano".into(),
                date: date(),
                views: 0,
                unique_views: 0,
                clones: 0,
                unique_clones: 0,
                referrers: vec![],
                popular_paths: vec![],
            }
        );
    }

    #[test]
    fn aggregates_are_taken_from_window_totals() {
        let raw = RawTraffic {
            views: RawTrafficWindow {
                count: 42,
                uniques: 7,
                daily: vec![],
            },
            clones: RawTrafficWindow {
                count: 5,
                uniques: 3,
                daily: vec![],
            },
            ..Default::default()
        };
        let snapshot = normalize("soprano", date(), &raw);
        assert_eq!((snapshot.views, snapshot.unique_views), (42, 7));
        assert_eq!((snapshot.clones, snapshot.unique_clones), (5, 3));
    }

    #[test]
    fn negative_counts_clamp_to_zero() {
        let raw = RawTraffic {
            views: RawTrafficWindow {
                count: -3,
                uniques: -1,
                daily: vec![],
            },
            ..Default::default()
        };
        let snapshot = normalize("soprano", date(), &raw);
        assert_eq!(snapshot.views, 0);
        assert_eq!(snapshot.unique_views, 0);
    }

    #[test]
    fn uniques_clamp_to_totals() {
        let raw = RawTraffic {
            clones: RawTrafficWindow {
                count: 4,
                uniques: 9,
                daily: vec![],
            },
            referrers: vec![RawReferrer {
                referrer: "github.com".into(),
                count: 2,
                uniques: 5,
            }],
            ..Default::default()
        };
        let snapshot = normalize("soprano", date(), &raw);
        assert_eq!(snapshot.unique_clones, 4);
        assert_eq!(snapshot.referrers[0].uniques, 2);
    }

    #[test]
    fn referrers_and_paths_preserve_order() {
        let raw = RawTraffic {
            referrers: vec![
                RawReferrer {
                    referrer: "github.com".into(),
                    count: 10,
                    uniques: 4,
                },
                RawReferrer {
                    referrer: "duckduckgo.com".into(),
                    count: 3,
                    uniques: 2,
                },
            ],
            popular_paths: vec![RawPopularPath {
                path: "/CCP-NC/soprano".into(),
                title: "soprano".into(),
                count: 8,
                uniques: 6,
            }],
            ..Default::default()
        };
        let snapshot = normalize("soprano", date(), &raw);
        let names: Vec<_> = snapshot.referrers.iter().map(|r| r.referrer.as_str()).collect();
        assert_eq!(names, vec!["github.com", "duckduckgo.com"]);
        assert_eq!(snapshot.popular_paths[0].path, "/CCP-NC/soprano");
    }
}
