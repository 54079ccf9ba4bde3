//! Cached AI activity summaries
//!
//! Resolves a timeframe into a concrete date window, serves stored
//! summaries on exact cache-key matches, and generates new ones on miss.
//! Concurrent misses for the same key collapse to a single in-flight
//! generation call so external spend is never duplicated.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use metrics::counter;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::ai::{self, GenerationError, SummaryGenerator};
use crate::models::Timeframe;
use crate::repositories::{CommitRepository, SummaryRepository, UserRepository};
use crate::sync::KeyedLocks;

/// Errors surfaced by a summary request
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("user '{0}' has not been synced yet")]
    UserNotSynced(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("database error during summary: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Result of a summary request
#[derive(Debug, Clone)]
pub struct SummaryOutcome {
    pub timeframe: Timeframe,
    pub commit_count: u64,
    pub summary: String,
    pub generated_at: DateTime<Utc>,
    pub cached: bool,
}

/// Concrete window a timeframe resolves to.
///
/// Policy: a trailing window anchored on the current instant (week = 7
/// days, month = 30 days). The cache key truncates the boundaries to
/// calendar dates, so repeated requests on the same day share an entry.
#[derive(Debug, Clone, Copy)]
pub struct SummaryWindow {
    pub start_at: DateTime<Utc>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl SummaryWindow {
    pub fn resolve(timeframe: Timeframe, now: DateTime<Utc>) -> Self {
        let start_at = now - Duration::days(timeframe.days());
        Self {
            start_at,
            start_date: start_at.date_naive(),
            end_date: now.date_naive(),
        }
    }
}

/// Cache-first summary service.
pub struct SummaryService {
    db: DatabaseConnection,
    generator: Arc<dyn SummaryGenerator>,
    inflight: KeyedLocks,
}

impl SummaryService {
    pub fn new(db: DatabaseConnection, generator: Arc<dyn SummaryGenerator>) -> Self {
        Self {
            db,
            generator,
            inflight: KeyedLocks::default(),
        }
    }

    /// Return the cached summary for (user, timeframe, current window), or
    /// generate, persist, and return a fresh one.
    #[instrument(skip(self), fields(user = %username, timeframe = %timeframe))]
    pub async fn get_summary(
        &self,
        username: &str,
        timeframe: Timeframe,
    ) -> Result<SummaryOutcome, SummaryError> {
        let user = UserRepository::new(&self.db)
            .find_by_username(username)
            .await?
            .ok_or_else(|| SummaryError::UserNotSynced(username.to_string()))?;

        let window = SummaryWindow::resolve(timeframe, Utc::now());
        let commits = CommitRepository::new(&self.db);
        let commit_count = commits.count_since(user.id, window.start_at).await?;

        if let Some(hit) = self.lookup(user.id, timeframe, &window).await? {
            counter!("devtrack_summary_cache_hits_total").increment(1);
            return Ok(SummaryOutcome {
                timeframe,
                commit_count,
                summary: hit.summary_text,
                generated_at: hit.generated_at.with_timezone(&Utc),
                cached: true,
            });
        }

        // Single-flight per cache key; the loser of the race re-checks the
        // cache instead of generating a duplicate.
        let key = format!(
            "{}:{}:{}:{}",
            user.id, timeframe, window.start_date, window.end_date
        );
        let _guard = self.inflight.acquire(&key).await;

        if let Some(hit) = self.lookup(user.id, timeframe, &window).await? {
            counter!("devtrack_summary_cache_hits_total").increment(1);
            return Ok(SummaryOutcome {
                timeframe,
                commit_count,
                summary: hit.summary_text,
                generated_at: hit.generated_at.with_timezone(&Utc),
                cached: true,
            });
        }

        counter!("devtrack_summary_cache_misses_total").increment(1);

        let activity = commits.activity_since(user.id, window.start_at).await?;
        let summary_text = if activity.is_empty() {
            // Zero-commit windows never spend a generation call; the fixed
            // text is still cached like any other entry.
            ai::no_activity_summary(timeframe)
        } else {
            let prompt = ai::build_activity_prompt(&activity, timeframe);
            counter!("devtrack_generation_calls_total").increment(1);
            self.generator.generate(&prompt).await?
        };

        let generated_at = Utc::now();
        if let Err(err) = SummaryRepository::new(&self.db)
            .insert(
                user.id,
                timeframe,
                window.start_date,
                window.end_date,
                &summary_text,
                generated_at,
            )
            .await
        {
            // The generation call already succeeded at the provider; a retry
            // will spend again for a response we are discarding here.
            error!(
                error = %err,
                "summary generated but cache insert failed; provider spend is lost"
            );
            return Err(err.into());
        }

        info!(
            commit_count = activity.len(),
            start = %window.start_date,
            end = %window.end_date,
            "generated and cached new summary"
        );

        Ok(SummaryOutcome {
            timeframe,
            commit_count: activity.len() as u64,
            summary: summary_text,
            generated_at,
            cached: false,
        })
    }

    async fn lookup(
        &self,
        user_id: uuid::Uuid,
        timeframe: Timeframe,
        window: &SummaryWindow,
    ) -> Result<Option<crate::models::summary::Model>, sea_orm::DbErr> {
        SummaryRepository::new(&self.db)
            .find_cached(user_id, timeframe, window.start_date, window.end_date)
            .await
    }
}
