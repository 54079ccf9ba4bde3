//! # Summary Endpoint Handler
//!
//! This module contains the handler for the GET /summary endpoint, which
//! serves cached AI summaries of recent commit activity.

use axum::extract::{Query, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;
use crate::models::Timeframe;
use crate::server::AppState;

/// Query parameters for the summary endpoint
#[derive(Debug, Deserialize, IntoParams)]
pub struct SummaryQuery {
    /// Summary window: "week" (trailing 7 days) or "month" (trailing 30
    /// days). Defaults to "week".
    pub timeframe: Option<String>,
}

/// Response payload for the summary endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct SummaryResponse {
    /// Timeframe the summary covers
    #[schema(example = "week")]
    pub timeframe: Timeframe,
    /// Number of commits in the window
    #[schema(example = 12)]
    pub commit_count: u64,
    /// Generated summary text
    pub summary: String,
    /// When the summary was generated (RFC3339)
    #[schema(example = "2026-01-10T12:00:00Z")]
    pub generated_at: String,
    /// Whether the summary was served from cache
    pub cached: bool,
}

/// Get an AI-generated summary of recent commit activity
#[utoipa::path(
    get,
    path = "/summary",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Summary returned", body = SummaryResponse),
        (status = 400, description = "Invalid timeframe", body = ApiError),
        (status = 404, description = "User not synced yet", body = ApiError),
        (status = 502, description = "Generation API failure", body = ApiError)
    ),
    tag = "analytics"
)]
pub async fn summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let timeframe: Timeframe = query
        .timeframe
        .as_deref()
        .unwrap_or("week")
        .parse()
        .map_err(ApiError::from)?;

    let outcome = state
        .summaries
        .get_summary(&state.github_username, timeframe)
        .await?;

    Ok(Json(SummaryResponse {
        timeframe: outcome.timeframe,
        commit_count: outcome.commit_count,
        summary: outcome.summary,
        generated_at: outcome.generated_at.to_rfc3339(),
        cached: outcome.cached,
    }))
}
