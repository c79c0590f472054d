use std::time::Duration;

/// Failure modes of the traffic API, split by how the caller should react:
/// `Auth` aborts the whole run, `RateLimited` is retried after a delay, and
/// the rest are per-repository failures the orchestrator logs and skips.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("API rejected the credential (status {status})")]
    Auth { status: u16 },
    #[error("repository not found or not accessible: {repo}")]
    NotFound { repo: String },
    #[error("API rate limit exhausted")]
    RateLimited { retry_after: Option<Duration> },
    #[error("transient network failure: {0}")]
    Transient(#[from] reqwest::Error),
    #[error("unexpected API response (status {status}): {body}")]
    Unexpected { status: u16, body: String },
}

impl FetchError {
    /// True when continuing with other repositories cannot help (no
    /// credential means no data for anyone).
    pub fn is_fatal(&self) -> bool {
        matches!(self, FetchError::Auth { .. })
    }
}
