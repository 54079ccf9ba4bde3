//! AI summary generation
//!
//! Builds natural-language prompts from aggregated commit activity and
//! delegates to Anthropic's Messages API for completion. The
//! [`SummaryGenerator`] trait is the seam that lets the summary cache be
//! tested without external spend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::Timeframe;
use crate::repositories::CommitActivity;

const DEFAULT_API_BASE: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1000;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Commit messages shown per repository before eliding the rest.
const MESSAGES_PER_REPO: usize = 10;

/// Generation API errors
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation API authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("generation API rate limit exceeded{}", .retry_after.map(|s| format!(" (retry after {s}s)")).unwrap_or_default())]
    RateLimited { retry_after: Option<u64> },

    #[error("generation API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("network error talking to generation API: {0}")]
    Network(#[from] reqwest::Error),

    #[error("generation response contained no text content")]
    EmptyCompletion,
}

/// Single-shot prompt-completion service.
#[async_trait]
pub trait SummaryGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Generator backed by Anthropic's Messages API.
pub struct AnthropicGenerator {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicGenerator {
    pub fn new(api_key: String, api_base: Option<String>, model: Option<String>) -> Self {
        let base_url = api_base
            .filter(|base| !base.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        Self {
            http: reqwest::Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

#[async_trait]
impl SummaryGenerator for AnthropicGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("accept", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(GenerationError::AuthenticationFailed(
                    "API key rejected; check the configured credential".to_string(),
                ));
            }
            if status.as_u16() == 429 {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok());
                return Err(GenerationError::RateLimited { retry_after });
            }
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: MessagesResponse = response.json().await?;

        if let Some(usage) = &completion.usage {
            info!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                model = %self.model,
                "generation API tokens used"
            );
        }

        completion
            .content
            .into_iter()
            .find(|block| block.kind == "text" && !block.text.is_empty())
            .map(|block| block.text)
            .ok_or_else(|| {
                warn!("generation API returned a completion with no text blocks");
                GenerationError::EmptyCompletion
            })
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

/// Deterministic summary for a window with no activity. Produced without
/// any generation call.
pub fn no_activity_summary(timeframe: Timeframe) -> String {
    format!("No commits found in the last {timeframe}.")
}

/// Build the generation prompt from commit activity, grouped by repository
/// with aggregate statistics so the model receives organized context.
pub fn build_activity_prompt(commits: &[CommitActivity], timeframe: Timeframe) -> String {
    let mut lines = vec![format!("=== Commits from the last {timeframe} ===")];

    let mut by_repo: BTreeMap<&str, Vec<&CommitActivity>> = BTreeMap::new();
    for commit in commits {
        by_repo.entry(commit.repo_name.as_str()).or_default().push(commit);
    }

    for (repo_name, repo_commits) in &by_repo {
        let additions: i64 = repo_commits.iter().map(|c| c.additions as i64).sum();
        let deletions: i64 = repo_commits.iter().map(|c| c.deletions as i64).sum();
        let files: i64 = repo_commits.iter().map(|c| c.files_changed as i64).sum();

        lines.push(String::new());
        lines.push(format!("**{repo_name}** ({} commits):", repo_commits.len()));
        lines.push(format!(
            "  Total changes: +{additions}/-{deletions} lines, {files} files"
        ));
        lines.push("  Commits:".to_string());

        for commit in repo_commits.iter().take(MESSAGES_PER_REPO) {
            let date = commit.author_date.format("%b %d");
            let subject: String = commit
                .message
                .lines()
                .next()
                .unwrap_or_default()
                .chars()
                .take(80)
                .collect();
            lines.push(format!(
                "    - [{date}] {subject} (+{}/-{})",
                commit.additions, commit.deletions
            ));
        }

        if repo_commits.len() > MESSAGES_PER_REPO {
            lines.push(format!(
                "    ... and {} more commits",
                repo_commits.len() - MESSAGES_PER_REPO
            ));
        }
    }

    format!(
        "Analyze these Git commits from the last {timeframe} and provide a concise summary.\n\n\
         {}\n\n\
         Provide a summary that:\n\
         1. Groups work by repository/project\n\
         2. Highlights main focus areas and accomplishments\n\
         3. Notes any patterns (refactoring, bug fixes, new features)\n\
         4. Mentions productivity metrics (commit count, lines changed)\n\n\
         Keep it concise (3-4 sentences max). Write in second person (\"you worked on...\").\n\
         Do NOT use markdown formatting in the output - just plain text paragraphs.",
        lines.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn activity(repo: &str, sha: &str, message: &str) -> CommitActivity {
        CommitActivity {
            commit_sha: sha.to_string(),
            repo_name: repo.to_string(),
            message: message.to_string(),
            author_date: Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap(),
            files_changed: 2,
            additions: 15,
            deletions: 4,
        }
    }

    #[test]
    fn no_activity_summary_is_deterministic() {
        assert_eq!(
            no_activity_summary(Timeframe::Week),
            "No commits found in the last week."
        );
        assert_eq!(
            no_activity_summary(Timeframe::Month),
            "No commits found in the last month."
        );
    }

    #[test]
    fn prompt_groups_commits_by_repository() {
        let commits = vec![
            activity("devtrack", "aaa", "Add sync endpoint"),
            activity("devtrack", "bbb", "Fix watermark bug"),
            activity("widgets", "ccc", "Refactor parser"),
        ];

        let prompt = build_activity_prompt(&commits, Timeframe::Week);

        assert!(prompt.contains("**devtrack** (2 commits):"));
        assert!(prompt.contains("**widgets** (1 commits):"));
        assert!(prompt.contains("Total changes: +30/-8 lines, 4 files"));
        assert!(prompt.contains("Add sync endpoint"));
        assert!(prompt.contains("last week"));
    }

    #[test]
    fn prompt_elides_beyond_ten_messages_per_repo() {
        let commits: Vec<CommitActivity> = (0..13)
            .map(|i| activity("devtrack", &format!("sha{i}"), &format!("commit {i}")))
            .collect();

        let prompt = build_activity_prompt(&commits, Timeframe::Month);

        assert!(prompt.contains("... and 3 more commits"));
        assert!(!prompt.contains("commit 12"));
    }

    #[test]
    fn prompt_truncates_messages_to_first_line() {
        let commits = vec![activity(
            "devtrack",
            "aaa",
            "Short subject\n\nLong body that should not appear",
        )];

        let prompt = build_activity_prompt(&commits, Timeframe::Week);

        assert!(prompt.contains("Short subject"));
        assert!(!prompt.contains("Long body"));
    }

    #[tokio::test]
    async fn generator_extracts_text_from_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(header("x-api-key", "test_key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{ "type": "text", "text": "You shipped a busy week." }],
                "usage": { "input_tokens": 120, "output_tokens": 30 },
            })))
            .mount(&server)
            .await;

        let generator =
            AnthropicGenerator::new("test_key".to_string(), Some(server.uri()), None);
        let text = generator.generate("prompt").await.unwrap();
        assert_eq!(text, "You shipped a busy week.");
    }

    #[tokio::test]
    async fn generator_maps_auth_and_rate_limit_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(401))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "30"))
            .mount(&server)
            .await;

        let generator =
            AnthropicGenerator::new("test_key".to_string(), Some(server.uri()), None);

        let err = generator.generate("prompt").await.unwrap_err();
        assert!(matches!(err, GenerationError::AuthenticationFailed(_)));

        let err = generator.generate("prompt").await.unwrap_err();
        match err {
            GenerationError::RateLimited { retry_after } => {
                assert_eq!(retry_after, Some(30));
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn generator_rejects_empty_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [],
                "usage": { "input_tokens": 10, "output_tokens": 0 },
            })))
            .mount(&server)
            .await;

        let generator =
            AnthropicGenerator::new("test_key".to_string(), Some(server.uri()), None);
        let err = generator.generate("prompt").await.unwrap_err();
        assert!(matches!(err, GenerationError::EmptyCompletion));
    }
}
