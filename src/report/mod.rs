pub mod checkpoint;
pub mod types;

pub use checkpoint::CheckpointStore;
pub use types::{ReportRow, CSV_HEADER};

use colored::Colorize;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::github::RepoId;
use crate::mining::RunSummary;

const REPORT_SUFFIX: &str = "_methodAnalysis.csv";
const CHECKPOINT_SUFFIX: &str = "_lastCommitSha";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),

    #[error("Failed to update checkpoint {}: {source}", .path.display())]
    Checkpoint {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Checkpoint {} holds no commit SHA; fix or delete it to start over", .path.display())]
    EmptyCheckpoint { path: PathBuf },
}

/// Locations of the report and checkpoint for one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub report: PathBuf,
    pub checkpoint: PathBuf,
}

impl OutputPaths {
    pub fn for_repo(directory: &Path, repo: &RepoId) -> Self {
        let prefix = repo.file_prefix();
        Self {
            report: directory.join(format!("{prefix}{REPORT_SUFFIX}")),
            checkpoint: directory.join(format!("{prefix}{CHECKPOINT_SUFFIX}")),
        }
    }
}

/// Append-only CSV report.
///
/// A fresh run truncates the file and writes the header. A resumed run
/// appends, and skips rows for the checkpointed commit that an interrupted
/// run already wrote.
pub struct ResultSink {
    path: PathBuf,
    writer: BufWriter<File>,
    already_written: HashMap<String, usize>,
    rows_written: u64,
}

impl ResultSink {
    #[instrument(skip(path), fields(path = %path.display()))]
    pub fn open(path: &Path, resume_sha: Option<&str>) -> Result<Self, ReportError> {
        let mut already_written = HashMap::new();

        let writer = match resume_sha {
            Some(sha) => {
                let prefix = format!("{sha},");
                let mut is_empty = true;
                let mut missing_newline = false;
                match File::open(path) {
                    Ok(file) => {
                        let mut reader = BufReader::new(file);
                        let mut line = String::new();
                        while reader.read_line(&mut line)? > 0 {
                            is_empty = false;
                            missing_newline = !line.ends_with('\n');
                            let row = line.trim_end_matches(['\r', '\n']);
                            if row.starts_with(&prefix) {
                                *already_written.entry(row.to_string()).or_insert(0) += 1;
                            }
                            line.clear();
                        }
                    }
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                    Err(err) => return Err(err.into()),
                }

                let file = OpenOptions::new().create(true).append(true).open(path)?;
                let mut writer = BufWriter::new(file);
                if is_empty {
                    writeln!(writer, "{CSV_HEADER}")?;
                } else if missing_newline {
                    writeln!(writer)?;
                }
                debug!(resume_sha = sha, existing_rows = already_written.len(), "appending to report");
                writer
            }
            None => {
                let mut writer = BufWriter::new(File::create(path)?);
                writeln!(writer, "{CSV_HEADER}")?;
                debug!("created report");
                writer
            }
        };
        // Header must hit the disk before any commit is processed.
        let mut sink = Self {
            path: path.to_path_buf(),
            writer,
            already_written,
            rows_written: 0,
        };
        sink.flush()?;
        Ok(sink)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows actually written by this sink (duplicates excluded).
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Append one row. Returns false if the row was already present from an
    /// interrupted run.
    pub fn append(&mut self, row: &ReportRow) -> Result<bool, ReportError> {
        let line = row.to_csv_line();
        if let Some(remaining) = self.already_written.get_mut(&line) {
            if *remaining > 0 {
                *remaining -= 1;
                debug!(commit = %row.commit_sha, path = %row.file_path, "row already in report");
                return Ok(false);
            }
        }
        writeln!(self.writer, "{line}")?;
        self.rows_written += 1;
        Ok(true)
    }

    pub fn flush(&mut self) -> Result<(), ReportError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Print the end-of-run summary to the terminal.
pub fn print_summary(repo: &RepoId, summary: &RunSummary, report_path: &Path) {
    info!(
        commits = summary.commits,
        files = summary.files,
        changes = summary.changes,
        "run complete"
    );
    println!();
    println!("{} {}", "Success!".green().bold(), repo);
    println!(
        "Commits processed: {} | Files diffed: {} | Skipped (unparseable): {}",
        summary.commits, summary.files, summary.skipped_files
    );
    let changes = summary.changes.to_string();
    let changes = if summary.changes > 0 {
        changes.yellow().bold()
    } else {
        changes.normal()
    };
    println!("Parameter additions recorded: {changes}");
    println!("Report: {}", report_path.display());
    println!();
}
