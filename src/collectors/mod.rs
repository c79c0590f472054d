pub mod orchestrator;

pub use orchestrator::{
    Orchestrator,
    RepoStatus,
    RunAborted,
    RunReport,
};

use crate::github::{
    FetchError,
    GithubClient,
    RawTraffic,
};
use std::{
    future::Future,
    pin::Pin,
};

/// Seam between the orchestrator and the hosting provider's API, so the
/// per-repository loop can be driven by a stub in tests.
pub trait TrafficSource {
    /// Fetch views, clones, referrers and popular paths for one repository.
    fn fetch_traffic<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<RawTraffic, FetchError>> + Send + 'a>>;

    /// Enumerate the organization's active repositories.
    fn list_org_repos<'a>(
        &'a self,
        org: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, FetchError>> + Send + 'a>>;
}

impl TrafficSource for GithubClient {
    fn fetch_traffic<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<RawTraffic, FetchError>> + Send + 'a>> {
        Box::pin(GithubClient::fetch_traffic(self, owner, repo))
    }

    fn list_org_repos<'a>(
        &'a self,
        org: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, FetchError>> + Send + 'a>> {
        Box::pin(GithubClient::list_org_repos(self, org))
    }
}
