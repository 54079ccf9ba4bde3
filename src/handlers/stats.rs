//! # Stats Endpoint Handler
//!
//! Read-only aggregation over stored commits and repositories.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::repositories::{CommitRepository, RepoRepository, UserRepository};
use crate::server::AppState;

/// Response payload for the stats endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    /// GitHub username the statistics belong to
    #[schema(example = "octocat")]
    pub username: String,
    /// Number of tracked repositories
    pub repositories: u64,
    /// Total stored commits
    pub total_commits: u64,
    /// Primary language -> repository count
    pub languages: BTreeMap<String, u64>,
    /// Total lines added across all commits
    pub total_lines_added: i64,
    /// Total lines deleted across all commits
    pub total_lines_deleted: i64,
    /// Total files changed across all commits
    pub total_files_changed: i64,
    /// Net contribution (added minus deleted)
    pub net_lines: i64,
    /// Last successful sync watermark (RFC3339), if any
    pub last_synced: Option<String>,
}

/// Get aggregate statistics for the tracked user
#[utoipa::path(
    get,
    path = "/stats",
    responses(
        (status = 200, description = "Statistics returned", body = StatsResponse),
        (status = 404, description = "User not synced yet", body = ApiError)
    ),
    tag = "analytics"
)]
pub async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
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

    let repos = RepoRepository::new(&state.db);
    let commits = CommitRepository::new(&state.db);

    let repositories = repos.count_for_user(user.id).await?;
    let languages = repos.language_breakdown(user.id).await?;
    let total_commits = commits.count_for_user(user.id).await?;
    let (total_lines_added, total_lines_deleted, total_files_changed) =
        commits.line_totals(user.id).await?;

    Ok(Json(StatsResponse {
        username: user.github_username,
        repositories,
        total_commits,
        languages,
        total_lines_added,
        total_lines_deleted,
        total_files_changed,
        net_lines: total_lines_added - total_lines_deleted,
        last_synced: user.last_synced_at.map(|dt| dt.to_rfc3339()),
    }))
}
