//! # Sync Endpoint Handler
//!
//! This module contains the handler for the POST /sync endpoint, which
//! triggers an incremental synchronization of the tracked user's GitHub
//! activity.

use axum::extract::State;
use axum::response::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::server::AppState;

/// Response payload for the sync endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct SyncResponse {
    /// GitHub username that was synced
    #[schema(example = "octocat")]
    pub username: String,
    /// Number of repositories newly added by this run
    #[schema(example = 2)]
    pub repositories_synced: u64,
    /// Number of commits newly added by this run
    #[schema(example = 17)]
    pub commits_synced: u64,
    /// Watermark recorded for this sync (RFC3339)
    #[schema(example = "2026-01-10T12:00:00Z")]
    pub last_synced: String,
}

/// Trigger an incremental GitHub sync
#[utoipa::path(
    post,
    path = "/sync",
    responses(
        (status = 200, description = "Sync completed", body = SyncResponse),
        (status = 429, description = "Upstream rate limit exhausted", body = ApiError),
        (status = 502, description = "Upstream provider failure", body = ApiError)
    ),
    tag = "sync"
)]
pub async fn sync(State(state): State<AppState>) -> Result<Json<SyncResponse>, ApiError> {
    let outcome = state.sync.sync().await?;

    Ok(Json(SyncResponse {
        username: outcome.username,
        repositories_synced: outcome.repositories_synced,
        commits_synced: outcome.commits_synced,
        last_synced: outcome.last_synced.to_rfc3339(),
    }))
}
