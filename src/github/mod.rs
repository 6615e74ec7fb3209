pub mod types;

pub use types::{CommitRef, FileChange, FileStatus, RepoId};

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{StatusCode, Url};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::GitHubConfig;
use types::CommitResponse;

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid repository identifier: {0}")]
    InvalidRepo(String),

    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("GitHub returned {status} for {url}: {body}")]
    Status { status: u16, url: String, body: String },

    #[error("Failed to decode GitHub response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Repository metadata collaborator.
#[async_trait]
pub trait CommitSource: Send + Sync {
    /// Fetch a single commit with its first parent and changed files.
    async fn commit(&self, sha: &str) -> Result<CommitRef, GitHubError>;

    /// Fetch the commit at the tip of `branch`.
    async fn branch_tip(&self, branch: &str) -> Result<CommitRef, GitHubError>;
}

/// Raw file content collaborator.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch the text of `path` as of commit `sha`.
    async fn file_at(&self, sha: &str, path: &str) -> Result<String, GitHubError>;
}

/// Parse the repository argument into its owner and name.
///
/// Accepts `owner/repo` or `https://github.com/owner/repo` (optionally with a
/// trailing `.git`). Anything else is rejected with `GitHubError::InvalidRepo`.
pub fn parse_repo_id(input: &str) -> Result<RepoId, GitHubError> {
    let invalid = || GitHubError::InvalidRepo(input.to_string());

    let segments: Vec<String> = if input.contains("://") {
        let parsed = Url::parse(input).map_err(|_| invalid())?;
        if parsed.host_str() != Some("github.com") {
            return Err(invalid());
        }
        parsed
            .path_segments()
            .ok_or_else(invalid)?
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect()
    } else {
        input.split('/').map(str::to_string).collect()
    };

    if segments.len() != 2 || segments.iter().any(|s| s.is_empty() || s.contains(char::is_whitespace)) {
        return Err(invalid());
    }

    let repo = segments[1]
        .strip_suffix(".git")
        .unwrap_or(segments[1].as_str());
    if repo.is_empty() {
        return Err(invalid());
    }

    Ok(RepoId {
        owner: segments[0].clone(),
        repo: repo.to_string(),
    })
}

/// How requests authenticate against GitHub.
#[derive(Debug, Clone, Default)]
pub enum Credentials {
    #[default]
    Anonymous,
    Basic { username: String, password: String },
    Token(String),
}

/// Thin GitHub REST client covering the three calls the miner needs.
///
/// No retrying happens here; callers wrap calls in a `RetryingFetcher`.
pub struct GitHubClient {
    http: reqwest::Client,
    repo: RepoId,
    api_url: String,
    raw_url: Url,
    credentials: Credentials,
}

impl GitHubClient {
    pub fn new(
        repo: RepoId,
        config: &GitHubConfig,
        credentials: Credentials,
    ) -> Result<Self, GitHubError> {
        let raw_url = Url::parse(&config.raw_url)
            .map_err(|_| GitHubError::InvalidUrl(config.raw_url.clone()))?;
        if raw_url.cannot_be_a_base() {
            return Err(GitHubError::InvalidUrl(config.raw_url.clone()));
        }
        Url::parse(&config.api_url).map_err(|_| GitHubError::InvalidUrl(config.api_url.clone()))?;

        Ok(Self {
            http: reqwest::Client::new(),
            repo,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            raw_url,
            credentials,
        })
    }

    fn commit_url(&self, reference: &str) -> String {
        format!(
            "{}/repos/{}/{}/commits/{}",
            self.api_url, self.repo.owner, self.repo.repo, reference
        )
    }

    /// `{raw}/{owner}/{repo}/{sha}/{path}`, each path segment percent-encoded.
    fn raw_file_url(&self, sha: &str, path: &str) -> Result<Url, GitHubError> {
        let mut url = self.raw_url.clone();
        url.path_segments_mut()
            .map_err(|_| GitHubError::InvalidUrl(self.raw_url.to_string()))?
            .pop_if_empty()
            .push(&self.repo.owner)
            .push(&self.repo.repo)
            .push(sha)
            .extend(path.split('/'));
        Ok(url)
    }

    async fn get(&self, url: &str, accept: &str) -> Result<reqwest::Response, GitHubError> {
        let mut request = self
            .http
            .get(url)
            .header(USER_AGENT, "method-growth")
            .header(ACCEPT, accept);
        request = match &self.credentials {
            Credentials::Anonymous => request,
            Credentials::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
            Credentials::Token(token) => request.bearer_auth(token),
        };

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(GitHubError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GitHubError::Status {
                status: status.as_u16(),
                url: url.to_string(),
                body,
            });
        }
        Ok(response)
    }

    async fn fetch_commit(&self, reference: &str) -> Result<CommitRef, GitHubError> {
        let url = self.commit_url(reference);
        let body = self
            .get(&url, "application/vnd.github+json")
            .await?
            .text()
            .await?;
        let response: CommitResponse = serde_json::from_str(&body)?;
        debug!(sha = %response.sha, files = response.files.len(), "received commit");
        Ok(response.into())
    }
}

#[async_trait]
impl CommitSource for GitHubClient {
    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn commit(&self, sha: &str) -> Result<CommitRef, GitHubError> {
        self.fetch_commit(sha).await
    }

    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn branch_tip(&self, branch: &str) -> Result<CommitRef, GitHubError> {
        self.fetch_commit(branch).await
    }
}

#[async_trait]
impl ContentSource for GitHubClient {
    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn file_at(&self, sha: &str, path: &str) -> Result<String, GitHubError> {
        let url = self.raw_file_url(sha, path)?;
        let text = self.get(url.as_str(), "text/plain").await?.text().await?;
        debug!(bytes = text.len(), "received file content");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GitHubClient {
        let repo = parse_repo_id("octo/widgets").unwrap();
        GitHubClient::new(repo, &GitHubConfig::default(), Credentials::Anonymous).unwrap()
    }

    #[test]
    fn test_parse_short_repo_id() {
        let id = parse_repo_id("apache/commons-lang").unwrap();
        assert_eq!(id.owner, "apache");
        assert_eq!(id.repo, "commons-lang");
    }

    #[test]
    fn test_parse_repo_url() {
        let id = parse_repo_id("https://github.com/apache/commons-lang.git").unwrap();
        assert_eq!(id.owner, "apache");
        assert_eq!(id.repo, "commons-lang");

        let id = parse_repo_id("https://github.com/apache/commons-lang/").unwrap();
        assert_eq!(id.repo, "commons-lang");
    }

    #[test]
    fn test_parse_invalid_repo_id() {
        assert!(parse_repo_id("commons-lang").is_err());
        assert!(parse_repo_id("a/b/c").is_err());
        assert!(parse_repo_id("/repo").is_err());
        assert!(parse_repo_id("https://example.com/a/b").is_err());
        assert!(parse_repo_id("https://github.com/a/b/pull/1").is_err());
        assert!(parse_repo_id("owner/.git").is_err());
    }

    #[test]
    fn test_commit_url() {
        assert_eq!(
            client().commit_url("master"),
            "https://api.github.com/repos/octo/widgets/commits/master"
        );
    }

    #[test]
    fn test_raw_file_url_encodes_segments() {
        let url = client()
            .raw_file_url("abc123", "src/main/java/My File.java")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://raw.githubusercontent.com/octo/widgets/abc123/src/main/java/My%20File.java"
        );
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let repo = parse_repo_id("octo/widgets").unwrap();
        let config = GitHubConfig {
            raw_url: "not a url".to_string(),
            ..GitHubConfig::default()
        };
        assert!(matches!(
            GitHubClient::new(repo, &config, Credentials::Anonymous),
            Err(GitHubError::InvalidUrl(_))
        ));
    }
}
