//! # Configuration Module
//!
//! Resolved runtime configuration for one collection run. The CLI layer (and
//! its environment fallbacks `GH_TOKEN`, `ORG_NAME`, `REPO_NAME`) feeds raw
//! values into [`Config::new`], which settles the target-selection rules:
//!
//! - an explicit repository wins, either as a bare name inside the
//!   configured organization or as `owner/name`;
//! - with no repository, the organization's active repositories are
//!   enumerated at run time;
//! - neither present is a configuration error, caught before any request is
//!   made.

use chrono::{
    NaiveDate,
    Utc,
};
use eyre::{
    bail,
    Result,
};
use std::path::PathBuf;
use url::Url;

/// Which repositories a run will process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Targets {
    /// A fixed list of repository names under one owner.
    Repos { owner: String, names: Vec<String> },
    /// Enumerate the organization's active repositories at run time.
    Org(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub archive_dir: PathBuf,
    pub force_refresh: bool,
    pub collection_date: NaiveDate,
    pub api_url: String,
    pub targets: Targets,
}

impl Config {
    pub fn new(
        token: String,
        org: Option<String>,
        repository: Option<String>,
        archive_dir: PathBuf,
        force_refresh: bool,
        date: Option<NaiveDate>,
        api_url: &Url,
    ) -> Result<Self> {
        if token.is_empty() {
            bail!("authentication token is empty");
        }

        let targets = resolve_targets(org, repository)?;

        Ok(Self {
            token,
            archive_dir,
            force_refresh,
            collection_date: date.unwrap_or_else(|| Utc::now().date_naive()),
            api_url: api_url.as_str().trim_end_matches('/').to_string(),
            targets,
        })
    }
}

fn resolve_targets(org: Option<String>, repository: Option<String>) -> Result<Targets> {
    match (repository, org) {
        (Some(repo), org) => {
            if let Some((owner, name)) = repo.split_once('/') {
                if owner.is_empty() || name.is_empty() {
                    bail!("repository '{repo}' is not a valid owner/name pair");
                }
                return Ok(Targets::Repos {
                    owner: owner.to_string(),
                    names: vec![name.to_string()],
                });
            }
            let Some(owner) = org else {
                bail!("repository '{repo}' has no owner: pass owner/name or set --org (ORG_NAME)");
            };
            Ok(Targets::Repos {
                owner,
                names: vec![repo],
            })
        }
        (None, Some(org)) => Ok(Targets::Org(org)),
        (None, None) => bail!("nothing to collect: name a repository or set --org (ORG_NAME)"),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn bare_repository_name_uses_the_org_as_owner() {
        let targets = resolve_targets(Some("ccp-nc".into()), Some("soprano".into())).unwrap();
        assert_eq!(targets, Targets::Repos {
            owner: "ccp-nc".into(),
            names: vec!["soprano".into()],
        });
    }

    #[test]
    fn owner_qualified_repository_needs_no_org() {
        let targets = resolve_targets(None, Some("ccp-nc/soprano".into())).unwrap();
        assert_eq!(targets, Targets::Repos {
            owner: "ccp-nc".into(),
            names: vec!["soprano".into()],
        });
    }

    #[test]
    fn org_alone_enumerates() {
        let targets = resolve_targets(Some("ccp-nc".into()), None).unwrap();
        assert_eq!(targets, Targets::Org("ccp-nc".into()));
    }

    #[test]
    fn missing_org_and_repository_is_an_error() {
        assert!(resolve_targets(None, None).is_err());
    }

    #[test]
    fn bare_name_without_org_is_an_error() {
        assert!(resolve_targets(None, Some("soprano".into())).is_err());
    }

    #[test]
    fn malformed_owner_name_pair_is_an_error() {
        assert!(resolve_targets(None, Some("/soprano".into())).is_err());
    }
}
