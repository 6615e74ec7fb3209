mod config;
mod github;
mod mining;
mod report;
mod signature;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;

use github::{Credentials, GitHubClient};
use mining::{CommitWalker, FileChangePipeline, RetryingFetcher};
use signature::{JavaSignatureParser, SignatureDiffer};

/// Method Growth walks the first-parent history of a GitHub repository and
/// records every Java method whose parameter list grew between a commit and
/// its parent.
///
/// Results go to `<owner>_<repo>_methodAnalysis.csv`. The next commit to
/// process is kept in `<owner>_<repo>_lastCommitSha`, so an interrupted run
/// picks up where it stopped.
#[derive(Parser, Debug)]
#[command(name = "method-growth", version, about)]
struct Cli {
    /// Repository as owner/name or https://github.com/owner/name
    repo: String,

    /// HTTP basic auth credentials (otherwise GITHUB_TOKEN / config token is used)
    #[arg(short = 'u', long = "user", num_args = 2, value_names = ["USER", "PASS"])]
    user: Option<Vec<String>>,

    /// Stop after processing this many commits (0 = walk to the root)
    #[arg(short = 'p', long = "limit", default_value_t = 0)]
    commit_limit: u64,

    /// Number of files processed concurrently within a commit
    #[arg(short = 't', long = "threads", value_parser = clap::value_parser!(u32).range(1..))]
    threads: Option<u32>,

    /// Branch whose tip starts a fresh run
    #[arg(short, long)]
    branch: Option<String>,

    /// Directory for the report and checkpoint files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Config file path (defaults to .method-growth.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Hide per-commit progress
    #[arg(short, long)]
    quiet: bool,
}

/// `RUST_LOG` if set and valid, otherwise warnings and errors only.
fn log_filter(directives: Option<String>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok()))
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let _main_span = info_span!("method_growth", repo = %cli.repo).entered();

    info!("loading configuration");
    let mut config = match cli.config.as_deref() {
        Some(path) => config::Config::load_from(path)?,
        None => config::Config::load()?,
    };
    if let Some(threads) = cli.threads {
        config.analysis.threads = threads as usize;
    }
    if let Some(branch) = cli.branch {
        config.github.branch = branch;
    }
    if let Some(dir) = cli.output_dir {
        config.output.directory = dir;
    }
    config.validate()?;

    let repo = github::parse_repo_id(&cli.repo)?;
    debug!(owner = %repo.owner, name = %repo.repo, threads = config.analysis.threads, "parsed arguments");

    let credentials = match cli.user {
        Some(values) => match values.as_slice() {
            [username, password] => Credentials::Basic {
                username: username.clone(),
                password: password.clone(),
            },
            _ => return Err("-u expects exactly USER and PASS".into()),
        },
        None => config
            .github_token()
            .map(Credentials::Token)
            .unwrap_or_default(),
    };
    let client = Arc::new(GitHubClient::new(repo.clone(), &config.github, credentials)?);

    std::fs::create_dir_all(&config.output.directory)?;
    let paths = report::OutputPaths::for_repo(&config.output.directory, &repo);
    let checkpoint = report::CheckpointStore::new(&paths.checkpoint);
    let resume = checkpoint.load()?;
    debug!(checkpoint = %checkpoint.path().display(), resume = ?resume, "checkpoint loaded");

    let differ = Arc::new(SignatureDiffer::new(Arc::new(JavaSignatureParser::new())));
    let pipeline = FileChangePipeline::new(
        client.clone(),
        differ,
        RetryingFetcher::for_content(&config.retry),
        config.analysis.threads,
    );
    let walker = CommitWalker::new(
        client,
        pipeline,
        RetryingFetcher::for_api(&config.retry),
        config.analysis.extension.clone(),
    )
    .with_progress(!cli.quiet);

    info!(resume = resume.is_some(), "resolving start commit");
    let start = walker
        .resolve_start(resume.as_deref(), &config.github.branch)
        .await?;

    let mut sink = report::ResultSink::open(&paths.report, resume.as_deref())?;
    let summary = walker
        .run(start, cli.commit_limit, &checkpoint, &mut sink)
        .await?;

    report::print_summary(&repo, &summary, sink.path());
    Ok(())
}
