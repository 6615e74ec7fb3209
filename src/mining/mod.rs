pub mod pipeline;
pub mod retry;
pub mod walker;

pub use pipeline::FileChangePipeline;
pub use retry::{FetchError, RetryingFetcher};
pub use walker::{CommitWalker, RunSummary};

use thiserror::Error;

use crate::github::GitHubError;
use crate::report::ReportError;

/// Errors that abort a mining run.
///
/// The report and checkpoint written so far stay consistent, so the run can
/// be resumed after any of these.
#[derive(Debug, Error)]
pub enum MiningError {
    #[error(transparent)]
    Fetch(#[from] FetchError<GitHubError>),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("File worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
