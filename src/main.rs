//! CLI entry point: parse arguments, resolve configuration, run one
//! collection pass, print the per-repository report and gate the exit code on
//! it so CI can surface partial failures.

use chrono::NaiveDate;
use clap::Parser;
use color_eyre::Result;
use eyre::eyre;
use repo_traffic_archiver::{
    config::Config,
    github::{
        GithubClient,
        DEFAULT_API_URL,
    },
    ArchiveWriter,
    Orchestrator,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
    Layer,
};
use url::Url;

#[derive(Parser)]
#[command(name = "repo-traffic-archiver")]
#[command(about = "Archives GitHub repository traffic statistics beyond the API's retention window")]
#[command(version)]
struct Cli {
    /// Repository to collect: a bare name inside --org, or owner/name.
    /// When omitted, every active repository of --org is collected.
    #[arg(env = "REPO_NAME")]
    repository: Option<String>,

    /// API token used for authentication
    #[arg(long, env = "GH_TOKEN", hide_env_values = true)]
    token: String,

    /// Organization owning the repositories
    #[arg(long, env = "ORG_NAME")]
    org: Option<String>,

    /// Directory holding the JSON history files and the CSV summary
    #[arg(long, default_value = "traffic-stats")]
    archive_dir: PathBuf,

    /// Replace data already archived for the collection date instead of
    /// skipping it
    ///
    /// The falsey parser keeps an empty `FORCE_REFRESH` (what scheduled CI
    /// runs export when the dispatch input is absent) equivalent to false
    /// instead of a usage error.
    #[arg(long, env = "FORCE_REFRESH", value_parser = clap::builder::FalseyValueParser::new())]
    force_refresh: bool,

    /// Collection date override (YYYY-MM-DD); defaults to today, UTC
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Base URL of the GitHub API
    #[arg(long, default_value = DEFAULT_API_URL)]
    github_api_url: Url,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) -> Result<()> {
    color_eyre::install()?;
    let default_filter = if verbose {
        "repo_traffic_archiver=debug"
    } else {
        "repo_traffic_archiver=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(fmt::layer().with_filter(filter))
        .with(tracing_error::ErrorLayer::default())
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let config = Config::new(
        cli.token,
        cli.org,
        cli.repository,
        cli.archive_dir,
        cli.force_refresh,
        cli.date,
        &cli.github_api_url,
    )?;

    info!(
        archive_dir = %config.archive_dir.display(),
        date = %config.collection_date,
        force_refresh = config.force_refresh,
        "starting repo traffic archiver"
    );

    let client = GithubClient::new(config.token.clone(), &config.api_url)?;
    let writer = ArchiveWriter::new(&config.archive_dir, config.force_refresh);
    let orchestrator = Orchestrator::new(client, writer, config.collection_date);

    // On a fatal abort, still surface whatever committed before it.
    let report = orchestrator.run(&config.targets).await.map_err(|aborted| {
        if !aborted.report.statuses.is_empty() {
            print!("{}", aborted.report.format());
        }
        eyre!("{}", aborted.reason)
    })?;
    print!("{}", report.format());

    if !report.is_success() {
        std::process::exit(1);
    }
    info!("collection run completed");
    Ok(())
}
