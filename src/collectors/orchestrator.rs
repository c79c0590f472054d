//! Sequential per-repository collection loop.
//!
//! One repository at a time: fetch (with bounded backoff when rate limited),
//! normalize, merge into the archive. A failing repository is recorded and
//! skipped; only a rejected credential aborts the run, since nothing after it
//! could succeed. Each repository's write commits independently, so a killed
//! run keeps everything collected up to that point.

use crate::{
    archive::{
        ArchiveWriter,
        WriteOutcome,
    },
    collectors::TrafficSource,
    config::Targets,
    github::{
        FetchError,
        RawTraffic,
    },
    metrics::normalize::normalize,
};
use chrono::NaiveDate;
use std::{
    fmt::Write as _,
    time::Duration,
};
use tracing::{
    error,
    info,
    warn,
};

const MAX_FETCH_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF: Duration = Duration::from_secs(60);
const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Per-repository result: the merge outcome on success, the failure reason
/// otherwise.
#[derive(Debug)]
pub struct RepoStatus {
    pub repository: String,
    pub outcome: Result<WriteOutcome, String>,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub statuses: Vec<RepoStatus>,
}

/// A run-fatal condition. The statuses accumulated before the abort ride
/// along so the caller can still report the repositories that did commit.
#[derive(thiserror::Error, Debug)]
#[error("{reason}")]
pub struct RunAborted {
    pub reason: String,
    pub report: RunReport,
}

impl RunReport {
    pub fn failed(&self) -> usize {
        self.statuses.iter().filter(|s| s.outcome.is_err()).count()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Per-repository status list for the end of the run.
    pub fn format(&self) -> String {
        let ok = self.statuses.len() - self.failed();
        let mut report = format!("collection report: {} ok, {} failed\n", ok, self.failed());
        let width = self
            .statuses
            .iter()
            .map(|s| s.repository.len())
            .max()
            .unwrap_or(0);
        for status in &self.statuses {
            let line = match &status.outcome {
                Ok(outcome) => format!("ok ({outcome})"),
                Err(reason) => format!("failed: {reason}"),
            };
            let _ = writeln!(report, "  {:width$}  {}", status.repository, line);
        }
        report
    }
}

pub struct Orchestrator<S> {
    source: S,
    writer: ArchiveWriter,
    collection_date: NaiveDate,
}

impl<S: TrafficSource> Orchestrator<S> {
    pub fn new(source: S, writer: ArchiveWriter, collection_date: NaiveDate) -> Self {
        Self {
            source,
            writer,
            collection_date,
        }
    }

    /// Run the collection over the configured targets.
    ///
    /// Returns `Err` only for run-fatal conditions (rejected credential, or a
    /// failed org enumeration leaving nothing to do); per-repository failures
    /// land in the report instead.
    pub async fn run(&self, targets: &Targets) -> Result<RunReport, RunAborted> {
        let (owner, repositories) = match targets {
            Targets::Repos { owner, names } => (owner.clone(), names.clone()),
            Targets::Org(org) => {
                let names = self.source.list_org_repos(org).await.map_err(|e| RunAborted {
                    reason: format!("cannot enumerate organization {org}: {e}"),
                    report: RunReport::default(),
                })?;
                (org.clone(), names)
            }
        };

        info!(
            owner = %owner,
            repositories = repositories.len(),
            date = %self.collection_date,
            "starting collection run"
        );

        let mut report = RunReport::default();
        for repository in repositories {
            match self.process_repository(&owner, &repository).await {
                Ok(outcome) => {
                    info!(repository = %repository, outcome = %outcome, "repository collected");
                    report.statuses.push(RepoStatus {
                        repository,
                        outcome: Ok(outcome),
                    });
                }
                Err(e) if e.is_fatal() => {
                    error!(repository = %repository, error = %e, "aborting run");
                    let reason = e.to_string();
                    report.statuses.push(RepoStatus {
                        repository,
                        outcome: Err(reason.clone()),
                    });
                    return Err(RunAborted { reason, report });
                }
                Err(e) => {
                    error!(repository = %repository, error = %e, "repository failed, continuing");
                    report.statuses.push(RepoStatus {
                        repository,
                        outcome: Err(e.to_string()),
                    });
                }
            }
        }
        Ok(report)
    }

    async fn process_repository(&self, owner: &str, repository: &str) -> Result<WriteOutcome, RepoError> {
        let raw = self.fetch_with_retry(owner, repository).await?;
        let snapshot = normalize(repository, self.collection_date, &raw);
        Ok(self.writer.write(&snapshot)?)
    }

    /// Rate limits get a bounded backoff-and-retry before counting as a
    /// failure; every other error is returned as-is.
    async fn fetch_with_retry(&self, owner: &str, repository: &str) -> Result<RawTraffic, FetchError> {
        let mut attempt = 1;
        loop {
            match self.source.fetch_traffic(owner, repository).await {
                Err(FetchError::RateLimited { retry_after }) if attempt < MAX_FETCH_ATTEMPTS => {
                    let delay = retry_after.unwrap_or(DEFAULT_BACKOFF).min(MAX_BACKOFF);
                    warn!(
                        repository,
                        attempt,
                        delay_secs = delay.as_secs(),
                        "rate limited, backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

#[derive(thiserror::Error, Debug)]
enum RepoError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Archive(#[from] crate::archive::ArchiveError),
}

impl RepoError {
    fn is_fatal(&self) -> bool {
        matches!(self, RepoError::Fetch(e) if e.is_fatal())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::github::RawTrafficWindow;
    use std::{
        collections::HashMap,
        future::Future,
        pin::Pin,
        sync::Mutex,
    };
    use temp_dir::TempDir;

    /// Canned responses per repository; `rate_limit_once` fails the first
    /// fetch of every repository with a zero-delay rate limit.
    struct StubSource {
        repos: HashMap<String, Result<u64, StubFailure>>,
        rate_limit_once: bool,
        attempts: Mutex<HashMap<String, u32>>,
    }

    #[derive(Clone, Copy)]
    enum StubFailure {
        NotFound,
        Auth,
    }

    impl StubSource {
        fn new(repos: Vec<(&str, Result<u64, StubFailure>)>) -> Self {
            Self {
                repos: repos.into_iter().map(|(n, r)| (n.to_string(), r)).collect(),
                rate_limit_once: false,
                attempts: Mutex::new(HashMap::new()),
            }
        }

        fn traffic(views: u64) -> RawTraffic {
            RawTraffic {
                views: RawTrafficWindow {
                    count: views as i64,
                    uniques: 1,
                    daily: vec![],
                },
                ..Default::default()
            }
        }
    }

    impl TrafficSource for StubSource {
        fn fetch_traffic<'a>(
            &'a self,
            _owner: &'a str,
            repo: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<RawTraffic, FetchError>> + Send + 'a>> {
            Box::pin(async move {
                let attempt = {
                    let mut attempts = self.attempts.lock().unwrap();
                    let n = attempts.entry(repo.to_string()).or_insert(0);
                    *n += 1;
                    *n
                };
                if self.rate_limit_once && attempt == 1 {
                    return Err(FetchError::RateLimited {
                        retry_after: Some(Duration::ZERO),
                    });
                }
                match self.repos.get(repo) {
                    Some(Ok(views)) => Ok(Self::traffic(*views)),
                    Some(Err(StubFailure::NotFound)) | None => Err(FetchError::NotFound {
                        repo: repo.to_string(),
                    }),
                    Some(Err(StubFailure::Auth)) => Err(FetchError::Auth { status: 401 }),
                }
            })
        }

        fn list_org_repos<'a>(
            &'a self,
            _org: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, FetchError>> + Send + 'a>> {
            Box::pin(async move {
                let mut names: Vec<String> = self.repos.keys().cloned().collect();
                names.sort();
                Ok(names)
            })
        }
    }

    fn orchestrator(source: StubSource, dir: &TempDir) -> Orchestrator<StubSource> {
        Orchestrator::new(
            source,
            ArchiveWriter::new(dir.path(), false),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
    }

    fn targets(names: &[&str]) -> Targets {
        Targets::Repos {
            owner: "ccp-nc".into(),
            names: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn failing_repository_does_not_abort_the_run() {
        let dir = TempDir::new().unwrap();
        let source = StubSource::new(vec![
            ("a", Ok(1)),
            ("b", Err(StubFailure::NotFound)),
            ("c", Ok(3)),
        ]);
        let orch = orchestrator(source, &dir);

        let report = orch.run(&targets(&["a", "b", "c"])).await.unwrap();

        let outcomes: Vec<(String, bool)> = report
            .statuses
            .iter()
            .map(|s| (s.repository.clone(), s.outcome.is_ok()))
            .collect();
        assert_eq!(outcomes, vec![
            ("a".to_string(), true),
            ("b".to_string(), false),
            ("c".to_string(), true)
        ]);
        assert!(!report.is_success());
        assert_eq!(report.failed(), 1);

        assert!(dir.path().join("a").join("views.json").exists());
        assert!(!dir.path().join("b").exists());
        assert!(dir.path().join("c").join("views.json").exists());
    }

    #[tokio::test]
    async fn rejected_credential_aborts_but_keeps_earlier_statuses() {
        let dir = TempDir::new().unwrap();
        let source = StubSource::new(vec![
            ("a", Ok(1)),
            ("b", Err(StubFailure::Auth)),
            ("c", Ok(3)),
        ]);
        let orch = orchestrator(source, &dir);

        let aborted = orch.run(&targets(&["a", "b", "c"])).await.unwrap_err();
        assert!(aborted.reason.contains("credential"));

        let outcomes: Vec<(String, bool)> = aborted
            .report
            .statuses
            .iter()
            .map(|s| (s.repository.clone(), s.outcome.is_ok()))
            .collect();
        assert_eq!(outcomes, vec![("a".to_string(), true), ("b".to_string(), false)]);

        // "a" committed before the abort; "c" was never reached.
        assert!(dir.path().join("a").join("views.json").exists());
        assert!(!dir.path().join("c").exists());
    }

    #[tokio::test]
    async fn rate_limit_is_retried_and_then_succeeds() {
        let dir = TempDir::new().unwrap();
        let mut source = StubSource::new(vec![("a", Ok(5))]);
        source.rate_limit_once = true;
        let orch = orchestrator(source, &dir);

        let report = orch.run(&targets(&["a"])).await.unwrap();
        assert!(report.is_success());
        assert_eq!(*orch.source.attempts.lock().unwrap().get("a").unwrap(), 2);
    }

    #[tokio::test]
    async fn org_targets_enumerate_before_collecting() {
        let dir = TempDir::new().unwrap();
        let source = StubSource::new(vec![("a", Ok(1)), ("b", Ok(2))]);
        let orch = orchestrator(source, &dir);

        let report = orch.run(&Targets::Org("ccp-nc".into())).await.unwrap();
        assert_eq!(report.statuses.len(), 2);
        assert!(report.is_success());
    }

    #[test]
    fn report_lists_every_repository_with_its_status() {
        let report = RunReport {
            statuses: vec![
                RepoStatus {
                    repository: "soprano".into(),
                    outcome: Ok(WriteOutcome::Written),
                },
                RepoStatus {
                    repository: "metrics".into(),
                    outcome: Err("repository not found".into()),
                },
            ],
        };
        let text = report.format();
        assert!(text.contains("1 ok, 1 failed"));
        assert!(text.contains("soprano"));
        assert!(text.contains("ok (written)"));
        assert!(text.contains("failed: repository not found"));
    }
}
