//! GitHub API client
//!
//! Read-through collector for the tracked user's repositories and commits.
//! Handles token authentication, page-numbered pagination, and rate-limit
//! awareness. Transient failures are retried with jittered exponential
//! backoff; authentication failures and rate-limit exhaustion surface
//! immediately as distinct error kinds so the caller decides backoff policy.

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

const DEFAULT_API_BASE: &str = "https://api.github.com";
const ACCEPT_HEADER: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("DevTrack/", env!("CARGO_PKG_VERSION"));
const PER_PAGE: usize = 100;
const MAX_ATTEMPTS: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// GitHub client specific errors
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("rate limited by GitHub API{}", .retry_after.map(|s| format!(" (retry after {s}s)")).unwrap_or_default())]
    RateLimited { retry_after: Option<u64> },

    #[error("GitHub API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("network error talking to GitHub: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid GitHub API URL: {0}")]
    Url(#[from] url::ParseError),
}

impl GitHubError {
    /// Whether retrying the whole request is safe and potentially useful.
    /// Auth failures and rate limits are non-retriable by default.
    pub fn is_transient(&self) -> bool {
        match self {
            GitHubError::Network(_) => true,
            GitHubError::Api { status, .. } => (500..600).contains(status),
            _ => false,
        }
    }
}

/// A repository as collected from GitHub
#[derive(Debug, Clone)]
pub struct RepoDescriptor {
    pub name: String,
    pub url: String,
    pub language: Option<String>,
    pub full_name: String,
}

/// A commit as listed from a repository's commit endpoint
#[derive(Debug, Clone)]
pub struct CommitDescriptor {
    pub sha: String,
    pub message: String,
    pub author_date: DateTime<Utc>,
}

/// Per-commit statistics from the commit detail endpoint
#[derive(Debug, Clone, Copy, Default)]
pub struct CommitDetail {
    pub files_changed: i32,
    pub additions: i32,
    pub deletions: i32,
}

/// Client for GitHub's REST API, scoped to one authenticated user.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl GitHubClient {
    pub fn new(token: String, api_base: Option<String>) -> Self {
        let base_url = api_base
            .filter(|base| !base.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Fetch all repositories for the authenticated user, following
    /// pagination until the upstream returns a short or empty page.
    pub async fn list_repositories(&self) -> Result<Vec<RepoDescriptor>, GitHubError> {
        let url = format!("{}/user/repos", self.base_url);
        let pages: Vec<GitHubRepo> = self.get_paginated(&url, &[]).await?;

        Ok(pages
            .into_iter()
            .map(|repo| RepoDescriptor {
                name: repo.name,
                url: repo.html_url,
                language: repo.language,
                full_name: repo.full_name,
            })
            .collect())
    }

    /// Fetch commits for a repository, filtered by author and bounded below
    /// by the `since` watermark.
    pub async fn list_commits(
        &self,
        repo_full_name: &str,
        since: Option<DateTime<Utc>>,
        author: &str,
    ) -> Result<Vec<CommitDescriptor>, GitHubError> {
        let url = format!("{}/repos/{}/commits", self.base_url, repo_full_name);

        let mut params = vec![("author".to_string(), author.to_string())];
        if let Some(since) = since {
            params.push((
                "since".to_string(),
                since.to_rfc3339_opts(SecondsFormat::Secs, true),
            ));
        }

        let commits: Vec<GitHubCommit> = self.get_paginated(&url, &params).await?;

        Ok(commits
            .into_iter()
            .map(|item| CommitDescriptor {
                sha: item.sha,
                message: item.commit.message,
                author_date: item.commit.author.date,
            })
            .collect())
    }

    /// Fetch detailed statistics for a single commit.
    pub async fn commit_detail(
        &self,
        repo_full_name: &str,
        sha: &str,
    ) -> Result<CommitDetail, GitHubError> {
        let url = Url::parse(&format!(
            "{}/repos/{}/commits/{}",
            self.base_url, repo_full_name, sha
        ))?;
        let detail: GitHubCommitDetail = self.get_json(url).await?;

        Ok(CommitDetail {
            files_changed: detail.files.len() as i32,
            additions: detail.stats.additions,
            deletions: detail.stats.deletions,
        })
    }

    /// Fetch every page of a list endpoint. GitHub returns at most 100 items
    /// per page; a short or empty page marks the end of the sequence.
    async fn get_paginated<T: serde::de::DeserializeOwned>(
        &self,
        base: &str,
        params: &[(String, String)],
    ) -> Result<Vec<T>, GitHubError> {
        let mut items = Vec::new();
        let mut page = 1u32;

        loop {
            let mut url = Url::parse(base)?;
            {
                let mut pairs = url.query_pairs_mut();
                for (key, value) in params {
                    pairs.append_pair(key, value);
                }
                pairs.append_pair("per_page", &PER_PAGE.to_string());
                pairs.append_pair("page", &page.to_string());
            }

            let chunk: Vec<T> = self.get_json(url).await?;
            let len = chunk.len();
            items.extend(chunk);

            if len < PER_PAGE {
                break;
            }
            page += 1;
        }

        Ok(items)
    }

    /// Issue a GET with bounded retries for transient failures.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
    ) -> Result<T, GitHubError> {
        let mut delay = Duration::from_millis(500);
        let mut attempt = 1;

        loop {
            match self.try_get_json(url.clone()).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < MAX_ATTEMPTS => {
                    warn!(
                        attempt,
                        error = %err,
                        "transient GitHub failure, retrying after {:?}",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    // Exponential backoff with jitter to avoid lockstep retries.
                    let jitter = 0.75 + rand::random::<f64>() * 0.5;
                    delay = Duration::from_millis(
                        ((delay.as_millis() as f64) * 2.0 * jitter) as u64,
                    )
                    .min(Duration::from_secs(30));
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn try_get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
    ) -> Result<T, GitHubError> {
        debug!(%url, "GitHub API request");
        let response = self
            .http
            .get(url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", ACCEPT_HEADER)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        let response = Self::classify_response(response).await?;
        Ok(response.json().await?)
    }

    /// Map non-success statuses onto the structured error kinds.
    async fn classify_response(response: Response) -> Result<Response, GitHubError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS || is_rate_limit_403(&response) {
            let retry_after = retry_after_hint(&response);
            warn!(?retry_after, "rate limited by GitHub API");
            return Err(GitHubError::RateLimited { retry_after });
        }

        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED => Err(GitHubError::AuthenticationFailed(
                "token rejected by GitHub; it may be expired or revoked".to_string(),
            )),
            StatusCode::FORBIDDEN => Err(GitHubError::AuthenticationFailed(format!(
                "permission denied; check token scopes: {body}"
            ))),
            other => Err(GitHubError::Api {
                status: other.as_u16(),
                message: body,
            }),
        }
    }
}

/// GitHub signals primary rate-limit exhaustion as 403 with a zeroed
/// X-RateLimit-Remaining header rather than 429.
fn is_rate_limit_403(response: &Response) -> bool {
    response.status() == StatusCode::FORBIDDEN
        && response
            .headers()
            .get("X-RateLimit-Remaining")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "0")
}

/// Retry delay hint in seconds, from Retry-After or the rate-limit reset
/// timestamp when present.
fn retry_after_hint(response: &Response) -> Option<u64> {
    if let Some(seconds) = response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
    {
        return Some(seconds);
    }

    response
        .headers()
        .get("X-RateLimit-Reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i64>().ok())
        .and_then(|reset| {
            let now = Utc::now().timestamp();
            (reset > now).then_some((reset - now) as u64)
        })
}

// GitHub API response types

#[derive(Debug, Deserialize)]
struct GitHubRepo {
    name: String,
    html_url: String,
    language: Option<String>,
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct GitHubCommit {
    sha: String,
    commit: GitHubCommitInner,
}

#[derive(Debug, Deserialize)]
struct GitHubCommitInner {
    message: String,
    author: GitHubCommitAuthor,
}

#[derive(Debug, Deserialize)]
struct GitHubCommitAuthor {
    date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct GitHubCommitDetail {
    #[serde(default)]
    stats: GitHubCommitStats,
    #[serde(default)]
    files: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize, Default)]
struct GitHubCommitStats {
    #[serde(default)]
    additions: i32,
    #[serde(default)]
    deletions: i32,
}
