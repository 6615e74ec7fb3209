use std::sync::Arc;

use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use tracing::{debug, warn};

use super::retry::RetryingFetcher;
use super::MiningError;
use crate::github::{ContentSource, FileChange};
use crate::signature::{MethodChange, SignatureDiffer};

/// Method changes found in one file of one commit.
#[derive(Debug, Clone)]
pub struct FileChanges {
    pub path: String,
    pub changes: Vec<MethodChange>,
    /// True when either revision failed to parse and the file was skipped
    pub skipped: bool,
}

/// Fetches both revisions of every changed file and diffs them.
///
/// Up to `workers` files are in flight at once. For each file the two
/// revisions are fetched concurrently. Parsing runs on the blocking pool.
/// Results come back in input order regardless of completion order.
pub struct FileChangePipeline {
    content: Arc<dyn ContentSource>,
    differ: Arc<SignatureDiffer>,
    fetcher: RetryingFetcher,
    workers: usize,
}

impl FileChangePipeline {
    pub fn new(
        content: Arc<dyn ContentSource>,
        differ: Arc<SignatureDiffer>,
        fetcher: RetryingFetcher,
        workers: usize,
    ) -> Self {
        Self {
            content,
            differ,
            fetcher,
            workers: workers.max(1),
        }
    }

    /// Diff every file between `old_sha` and `new_sha`.
    ///
    /// A fetch that exhausts its retries aborts the whole batch. An
    /// unparseable revision only empties that file's result.
    pub async fn process(
        &self,
        files: &[FileChange],
        new_sha: &str,
        old_sha: &str,
        progress: &ProgressBar,
    ) -> Result<Vec<FileChanges>, MiningError> {
        let mut results = Vec::with_capacity(files.len());
        let mut outcomes = stream::iter(files)
            .map(|file| self.process_file(&file.path, new_sha, old_sha, progress))
            .buffered(self.workers);

        while let Some(outcome) = outcomes.next().await {
            results.push(outcome?);
            progress.inc(1);
        }

        Ok(results)
    }

    async fn process_file(
        &self,
        path: &str,
        new_sha: &str,
        old_sha: &str,
        progress: &ProgressBar,
    ) -> Result<FileChanges, MiningError> {
        let (new_text, old_text) = tokio::try_join!(
            self.fetch_revision(new_sha, path, progress),
            self.fetch_revision(old_sha, path, progress),
        )?;

        let differ = Arc::clone(&self.differ);
        let diffed = tokio::task::spawn_blocking(move || differ.diff(&new_text, &old_text)).await?;

        match diffed {
            Ok(changes) => {
                debug!(path, changes = changes.len(), "diffed file");
                Ok(FileChanges {
                    path: path.to_string(),
                    changes,
                    skipped: false,
                })
            }
            Err(err) => {
                progress.suspend(|| {
                    warn!(commit = new_sha, path, error = %err, "skipping file with unparseable source")
                });
                Ok(FileChanges {
                    path: path.to_string(),
                    changes: Vec::new(),
                    skipped: true,
                })
            }
        }
    }

    async fn fetch_revision(
        &self,
        sha: &str,
        path: &str,
        progress: &ProgressBar,
    ) -> Result<String, MiningError> {
        let text = self
            .fetcher
            .fetch_tracked(&format!("fetch {path} at {sha}"), progress, || {
                self.content.file_at(sha, path)
            })
            .await?;
        Ok(text)
    }
}
