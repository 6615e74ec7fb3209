use serde::Deserialize;

/// A commit snapshot fetched from the GitHub API.
///
/// Only the first parent is kept; commits without a parent are history roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRef {
    /// Full commit SHA
    pub sha: String,
    /// First parent SHA (None for a root commit)
    pub parent_sha: Option<String>,
    /// Files touched by this commit, in API order
    pub changed_files: Vec<FileChange>,
}

impl CommitRef {
    /// Modified files whose path ends with `extension`, in original order.
    pub fn modified_files_with_extension(&self, extension: &str) -> Vec<FileChange> {
        self.changed_files
            .iter()
            .filter(|f| f.status == FileStatus::Modified && f.path.ends_with(extension))
            .cloned()
            .collect()
    }
}

/// A single entry in a commit's `files` array.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileChange {
    /// Repository-relative path (e.g. "src/main/java/App.java")
    #[serde(rename = "filename")]
    pub path: String,
    pub status: FileStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Removed,
    Modified,
    Renamed,
    #[serde(other)]
    Other,
}

/// Parsed form of the repository argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl RepoId {
    /// "owner/repo" with the slash replaced, used to name output files.
    pub fn file_prefix(&self) -> String {
        format!("{}_{}", self.owner, self.repo)
    }
}

impl std::fmt::Display for RepoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Wire shape of `GET /repos/{owner}/{repo}/commits/{ref}`.
#[derive(Debug, Deserialize)]
pub(crate) struct CommitResponse {
    pub sha: String,
    #[serde(default)]
    pub parents: Vec<ParentResponse>,
    #[serde(default)]
    pub files: Vec<FileChange>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ParentResponse {
    pub sha: String,
}

impl From<CommitResponse> for CommitRef {
    fn from(response: CommitResponse) -> Self {
        CommitRef {
            sha: response.sha,
            parent_sha: response.parents.into_iter().next().map(|p| p.sha),
            changed_files: response.files,
        }
    }
}
