//! # Commits Endpoint Handler
//!
//! Recent-commit listing with optional repository filtering.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;
use crate::repositories::{CommitRepository, UserRepository};
use crate::server::AppState;

const DEFAULT_LIMIT: u64 = 10;
const MAX_LIMIT: u64 = 50;

/// Query parameters for the commits endpoint
#[derive(Debug, Deserialize, IntoParams)]
pub struct CommitsQuery {
    /// Maximum number of commits to return (default: 10, max: 50)
    pub limit: Option<u64>,
    /// Filter by repository name
    pub repo: Option<String>,
}

/// A commit in the listing response
#[derive(Debug, Serialize, ToSchema)]
pub struct CommitInfo {
    /// Abbreviated commit SHA
    #[schema(example = "abc1234")]
    pub sha: String,
    /// Repository the commit belongs to
    #[schema(example = "devtrack")]
    pub repository: String,
    /// First line of the commit message
    pub message: String,
    /// When the commit was authored (RFC3339)
    #[schema(example = "2026-01-10T12:00:00Z")]
    pub date: String,
    pub files_changed: i32,
    pub additions: i32,
    pub deletions: i32,
}

/// Response payload for the commits endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct CommitsResponse {
    /// Commits, most recent author date first
    pub commits: Vec<CommitInfo>,
    /// Number of commits returned
    pub count: usize,
}

/// List recent commits for the tracked user
#[utoipa::path(
    get,
    path = "/commits",
    params(CommitsQuery),
    responses(
        (status = 200, description = "Commits listed", body = CommitsResponse),
        (status = 404, description = "User not synced yet", body = ApiError)
    ),
    tag = "analytics"
)]
pub async fn commits(
    State(state): State<AppState>,
    Query(query): Query<CommitsQuery>,
) -> Result<Json<CommitsResponse>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);

    let user = UserRepository::new(&state.db)
        .find_by_username(&state.github_username)
        .await?
        .ok_or_else(|| {
            ApiError::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "User not synced yet. Call POST /sync first to initialize.",
            )
        })?;

    let activity = CommitRepository::new(&state.db)
        .list_recent(user.id, limit, query.repo.as_deref())
        .await?;

    let commits: Vec<CommitInfo> = activity
        .into_iter()
        .map(|item| CommitInfo {
            sha: item.commit_sha.chars().take(7).collect(),
            repository: item.repo_name,
            message: item.message.lines().next().unwrap_or_default().to_string(),
            date: item.author_date.to_rfc3339(),
            files_changed: item.files_changed,
            additions: item.additions,
            deletions: item.deletions,
        })
        .collect();

    let count = commits.len();
    Ok(Json(CommitsResponse { commits, count }))
}
