use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, info_span, instrument, Instrument};

use super::pipeline::FileChangePipeline;
use super::retry::RetryingFetcher;
use super::MiningError;
use crate::github::{CommitRef, CommitSource};
use crate::report::{CheckpointStore, ReportRow, ResultSink};

/// Counters for a finished (or limit-stopped) run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Commits fully processed
    pub commits: u64,
    /// Files fetched and diffed
    pub files: u64,
    /// Files skipped because a revision failed to parse
    pub skipped_files: u64,
    /// Rows appended to the report
    pub changes: u64,
}

/// Walks first-parent history from a start commit towards the root.
///
/// Commits are strictly sequential: the next commit is only known once the
/// current one has been fetched. The checkpoint always names the next commit
/// to process, so an interrupted run reprocesses at most one commit.
pub struct CommitWalker {
    commits: Arc<dyn CommitSource>,
    pipeline: FileChangePipeline,
    fetcher: RetryingFetcher,
    extension: String,
    show_progress: bool,
}

impl CommitWalker {
    pub fn new(
        commits: Arc<dyn CommitSource>,
        pipeline: FileChangePipeline,
        fetcher: RetryingFetcher,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            commits,
            pipeline,
            fetcher,
            extension: extension.into(),
            show_progress: false,
        }
    }

    /// Render a per-commit progress bar on stderr.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Starting commit: the checkpointed one if present, else the branch tip.
    pub async fn resolve_start(
        &self,
        checkpoint: Option<&str>,
        branch: &str,
    ) -> Result<CommitRef, MiningError> {
        match checkpoint {
            Some(sha) => {
                info!(sha, "resuming from checkpoint");
                self.fetch_commit(sha).await
            }
            None => {
                info!(branch, "starting from branch tip");
                let tip = self
                    .fetcher
                    .fetch(&format!("fetch tip of {branch}"), || {
                        self.commits.branch_tip(branch)
                    })
                    .await?;
                Ok(tip)
            }
        }
    }

    /// Process commits from `start` until the history root or until `limit`
    /// commits are done (`limit == 0` means no limit).
    #[instrument(skip_all, fields(start = %start.sha, limit = limit))]
    pub async fn run(
        &self,
        start: CommitRef,
        limit: u64,
        checkpoint: &CheckpointStore,
        sink: &mut ResultSink,
    ) -> Result<RunSummary, MiningError> {
        let mut summary = RunSummary::default();
        let mut current = start;

        while let Some(parent_sha) = current.parent_sha.clone() {
            if limit != 0 && summary.commits >= limit {
                info!(limit, "commit limit reached");
                break;
            }

            checkpoint.save(&current.sha)?;

            let files = current.modified_files_with_extension(&self.extension);
            info!(commit = %current.sha, files = files.len(), "processing commit");

            let progress = self.progress_bar(&current.sha, files.len());
            let results = self
                .pipeline
                .process(&files, &current.sha, &parent_sha, &progress)
                .instrument(info_span!("commit", sha = %current.sha))
                .await?;
            progress.finish();

            for file in &results {
                summary.files += 1;
                if file.skipped {
                    summary.skipped_files += 1;
                }
                for change in &file.changes {
                    let row = ReportRow::from_change(&current.sha, &file.path, change);
                    if sink.append(&row)? {
                        summary.changes += 1;
                    }
                }
            }
            sink.flush()?;

            current = self.fetch_commit(&parent_sha).await?;
            summary.commits += 1;
            checkpoint.save(&current.sha)?;
        }

        if current.parent_sha.is_none() {
            info!(root = %current.sha, "reached history root");
        }
        info!(rows = sink.rows_written(), "report up to date");
        Ok(summary)
    }

    async fn fetch_commit(&self, sha: &str) -> Result<CommitRef, MiningError> {
        let commit = self
            .fetcher
            .fetch(&format!("fetch commit {sha}"), || self.commits.commit(sha))
            .await?;
        Ok(commit)
    }

    fn progress_bar(&self, sha: &str, files: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let style = ProgressStyle::with_template("{msg} : {percent}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        ProgressBar::new(files as u64)
            .with_style(style)
            .with_message(format!("Processing commit: {sha}"))
    }
}
