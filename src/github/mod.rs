//! # GitHub API Client
//!
//! Thin authenticated client for the repository traffic endpoints:
//!
//! - `GET /repos/{owner}/{repo}/traffic/views`
//! - `GET /repos/{owner}/{repo}/traffic/clones`
//! - `GET /repos/{owner}/{repo}/traffic/popular/referrers`
//! - `GET /repos/{owner}/{repo}/traffic/popular/paths`
//! - `GET /orgs/{org}/repos` (paginated, for org-wide runs)
//!
//! Requests are issued sequentially; responses are deserialized into the
//! loose wire types from [`types`] and classified into [`FetchError`]
//! variants by HTTP status. Rate-limit responses carry a retry-after hint so
//! the orchestrator can back off.

pub mod error;
pub mod types;

use chrono::Utc;
pub use error::FetchError;
use reqwest::{
    header,
    Response,
    StatusCode,
};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
pub use types::*;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const REPOS_PER_PAGE: usize = 100;

pub struct GithubClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl GithubClient {
    /// `base_url` is normally [`DEFAULT_API_URL`]; tests point it at a local
    /// server. A trailing slash is tolerated.
    pub fn new(token: impl Into<String>, base_url: &str) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("repo-traffic-archiver/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Fetch all four traffic metrics for one repository.
    pub async fn fetch_traffic(&self, owner: &str, repo: &str) -> Result<RawTraffic, FetchError> {
        let views: RawTrafficWindow = self
            .get_json(&format!("/repos/{owner}/{repo}/traffic/views"), repo)
            .await?;
        let clones: RawTrafficWindow = self
            .get_json(&format!("/repos/{owner}/{repo}/traffic/clones"), repo)
            .await?;
        let referrers: Vec<RawReferrer> = self
            .get_json(&format!("/repos/{owner}/{repo}/traffic/popular/referrers"), repo)
            .await?;
        let popular_paths: Vec<RawPopularPath> = self
            .get_json(&format!("/repos/{owner}/{repo}/traffic/popular/paths"), repo)
            .await?;

        debug!(
            repository = repo,
            view_days = views.daily.len(),
            clone_days = clones.daily.len(),
            referrers = referrers.len(),
            paths = popular_paths.len(),
            "traffic endpoints fetched"
        );

        Ok(RawTraffic {
            views,
            clones,
            referrers,
            popular_paths,
        })
    }

    /// Enumerate the organization's active (non-archived) repositories.
    pub async fn list_org_repos(&self, org: &str) -> Result<Vec<String>, FetchError> {
        let mut names = Vec::new();
        let mut page = 1u32;
        loop {
            let batch: Vec<RawRepo> = self
                .get_json(&format!("/orgs/{org}/repos?per_page={REPOS_PER_PAGE}&page={page}"), org)
                .await?;
            let last_page = batch.len() < REPOS_PER_PAGE;
            names.extend(batch.into_iter().filter(|r| !r.archived).map(|r| r.name));
            if last_page {
                break;
            }
            page += 1;
        }
        debug!(org, repositories = names.len(), "organization enumerated");
        Ok(names)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, subject: &str) -> Result<T, FetchError> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("x-github-api-version", API_VERSION)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        match status {
            StatusCode::UNAUTHORIZED => Err(FetchError::Auth { status: status.as_u16() }),
            StatusCode::NOT_FOUND => Err(FetchError::NotFound {
                repo: subject.to_string(),
            }),
            StatusCode::TOO_MANY_REQUESTS => Err(FetchError::RateLimited {
                retry_after: retry_after_hint(&response),
            }),
            // 403 is ambiguous: an exhausted rate limit and a rejected
            // credential share the status code.
            StatusCode::FORBIDDEN if rate_limit_exhausted(&response) => Err(FetchError::RateLimited {
                retry_after: retry_after_hint(&response),
            }),
            StatusCode::FORBIDDEN => Err(FetchError::Auth { status: status.as_u16() }),
            _ => Err(FetchError::Unexpected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }
}

fn rate_limit_exhausted(response: &Response) -> bool {
    header_value(response, "x-ratelimit-remaining").is_some_and(|v| v == "0")
}

/// Prefer the explicit `retry-after` header; fall back to the time until the
/// advertised rate-limit window resets.
fn retry_after_hint(response: &Response) -> Option<Duration> {
    if let Some(seconds) = header_value(response, header::RETRY_AFTER.as_str()).and_then(|v| v.parse::<u64>().ok()) {
        return Some(Duration::from_secs(seconds));
    }
    let reset_epoch = header_value(response, "x-ratelimit-reset").and_then(|v| v.parse::<i64>().ok())?;
    let wait = reset_epoch - Utc::now().timestamp();
    (wait > 0).then(|| Duration::from_secs(wait as u64))
}

fn header_value<'r>(response: &'r Response, name: &str) -> Option<&'r str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn client_construction_is_fallible_and_normalizes_the_base_url() {
        let client = GithubClient::new("token", "https://api.github.com/").unwrap();
        assert_eq!(client.base_url, "https://api.github.com");
    }
}
