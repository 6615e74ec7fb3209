use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::ReportError;

/// Single-line file holding the SHA of the next commit to process.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored SHA, or None if no checkpoint exists.
    ///
    /// A checkpoint file without a SHA on its first line is an error: the
    /// report beside it belongs to an earlier run and must not be replaced.
    pub fn load(&self) -> Result<Option<String>, ReportError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(self.error(source)),
        };
        match contents.lines().next().map(str::trim) {
            Some(sha) if !sha.is_empty() => Ok(Some(sha.to_string())),
            _ => Err(ReportError::EmptyCheckpoint {
                path: self.path.clone(),
            }),
        }
    }

    /// Replace the stored SHA.
    ///
    /// Written to a sibling temp file and renamed over the old one, so the
    /// checkpoint is never observed half-written.
    pub fn save(&self, sha: &str) -> Result<(), ReportError> {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, format!("{sha}\n")).map_err(|e| self.error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.error(e))?;
        debug!(sha, path = %self.path.display(), "checkpoint updated");
        Ok(())
    }

    fn error(&self, source: std::io::Error) -> ReportError {
        ReportError::Checkpoint {
            path: self.path.clone(),
            source,
        }
    }
}
