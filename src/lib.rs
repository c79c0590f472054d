//! # Repo Traffic Archiver
//!
//! Collects per-repository traffic statistics (views, clones, referrers,
//! popular paths) from the GitHub API and archives them past the API's
//! ~14-day retention window.
//!
//! ## Architecture
//!
//! One sequential pass per invocation; scheduling lives in CI:
//!
//! - **`config`**: resolved runtime configuration and target selection
//! - **`github`**: authenticated client for the traffic endpoints
//! - **`metrics`**: the typed snapshot model and the normalizer that tightens
//!   the API's loose wire shapes into it
//! - **`archive`**: idempotent merge of snapshots into per-repository JSON
//!   history files and a CSV summary
//! - **`collectors`**: the per-repository orchestration loop and its run
//!   report
//!
//! ## Usage
//!
//! ```bash
//! # Archive every active repository of an organization
//! GH_TOKEN=... repo-traffic-archiver --org CCP-NC
//!
//! # Archive a single repository, replacing today's data if already stored
//! GH_TOKEN=... repo-traffic-archiver CCP-NC/soprano --force-refresh
//! ```

pub mod archive;
pub mod collectors;
pub mod config;
pub mod github;
pub mod metrics;

pub use archive::{
    ArchiveError,
    ArchiveWriter,
    WriteOutcome,
};
pub use collectors::{
    Orchestrator,
    RunReport,
    TrafficSource,
};
pub use config::{
    Config,
    Targets,
};
pub use github::{
    FetchError,
    GithubClient,
};
pub use metrics::TrafficSnapshot;
