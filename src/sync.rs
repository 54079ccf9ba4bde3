//! Incremental GitHub synchronization
//!
//! Reconciles collected repositories and commits into storage. Repeated
//! syncs are idempotent: repositories upsert on (user, name), commits
//! deduplicate on their SHA, and the per-user watermark only ever advances.
//! A failure while collecting aborts the run before anything is written, so
//! the next sync is a safe, fully-overlapping retry.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use sea_orm::{DatabaseConnection, TransactionTrait};
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::github::{CommitDescriptor, CommitDetail, GitHubClient, GitHubError};
use crate::repositories::{CommitRepository, NewCommit, RepoRepository, UserRepository};

/// Errors surfaced by a sync run
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error("database error during sync: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Result of one sync invocation. Counts reflect rows newly inserted, not
/// rows seen upstream.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub username: String,
    pub repositories_synced: u64,
    pub commits_synced: u64,
    pub last_synced: DateTime<Utc>,
}

/// Per-key advisory locks. Two concurrent syncs for the same user would
/// race on the watermark read/write; serializing them preserves the
/// idempotence invariant.
#[derive(Default)]
pub(crate) struct KeyedLocks {
    inner: tokio::sync::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyedLocks {
    pub(crate) async fn acquire(&self, key: &str) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(key.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

/// Mask a token for storage, keeping only the last 4 characters.
pub fn mask_token(token: &str) -> String {
    let char_count = token.chars().count();
    if char_count <= 4 {
        return "*".repeat(char_count);
    }
    let tail: String = token.chars().skip(char_count - 4).collect();
    format!("{}{}", "*".repeat(char_count - 4), tail)
}

/// Caller-triggered synchronizer for the tracked user.
pub struct SyncService {
    db: DatabaseConnection,
    github: GitHubClient,
    username: String,
    masked_token: String,
    locks: KeyedLocks,
}

/// One collected commit ready for the write phase.
struct PendingCommit {
    repo_name: String,
    descriptor: CommitDescriptor,
    detail: CommitDetail,
}

impl SyncService {
    pub fn new(db: DatabaseConnection, github: GitHubClient, username: String, token: &str) -> Self {
        Self {
            db,
            github,
            username,
            masked_token: mask_token(token),
            locks: KeyedLocks::default(),
        }
    }

    /// Run one incremental sync.
    ///
    /// The collect phase performs all upstream reads with no transaction
    /// open; the write phase applies repositories, commits, and the
    /// watermark atomically. A crash mid-run leaves `last_synced_at`
    /// untouched and the dedup key absorbs the overlap on retry.
    #[instrument(skip(self), fields(user = %self.username))]
    pub async fn sync(&self) -> Result<SyncOutcome, SyncError> {
        let _guard = self.locks.acquire(&self.username).await;
        let timer = std::time::Instant::now();

        let users = UserRepository::new(&self.db);
        let user = users.get_or_create(&self.username, &self.masked_token).await?;

        // The watermark advances to the sync start time, not the newest
        // commit timestamp, so commits fetched late with earlier authored
        // dates are not skipped on the next run.
        let started_at = Utc::now();
        let since = user.last_synced_at.map(|dt| dt.with_timezone(&Utc));

        let repos = self.github.list_repositories().await?;
        let pending = self.collect_commits(&repos, since).await?;

        let (repositories_synced, commits_synced, last_synced) =
            self.apply(user.id, &repos, pending, started_at).await?;

        counter!("devtrack_sync_runs_total").increment(1);
        counter!("devtrack_repositories_synced_total").increment(repositories_synced);
        counter!("devtrack_commits_synced_total").increment(commits_synced);
        histogram!("devtrack_sync_duration_seconds").record(timer.elapsed().as_secs_f64());

        info!(
            repositories_synced,
            commits_synced,
            since = ?since,
            "sync completed"
        );

        Ok(SyncOutcome {
            username: self.username.clone(),
            repositories_synced,
            commits_synced,
            last_synced,
        })
    }

    /// Collect phase: list commits per repository and fetch detail stats
    /// for SHAs not already stored. Read-only against storage.
    async fn collect_commits(
        &self,
        repos: &[crate::github::RepoDescriptor],
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<PendingCommit>, SyncError> {
        let commits = CommitRepository::new(&self.db);
        let mut pending = Vec::new();

        for repo in repos {
            let descriptors = self
                .github
                .list_commits(&repo.full_name, since, &self.username)
                .await?;

            for descriptor in descriptors {
                if commits.exists(&descriptor.sha).await? {
                    continue;
                }
                let detail = self
                    .github
                    .commit_detail(&repo.full_name, &descriptor.sha)
                    .await?;
                pending.push(PendingCommit {
                    repo_name: repo.name.clone(),
                    descriptor,
                    detail,
                });
            }
        }

        Ok(pending)
    }

    /// Write phase: one transaction covering repository upserts, commit
    /// inserts, and the watermark advancement.
    async fn apply(
        &self,
        user_id: Uuid,
        repos: &[crate::github::RepoDescriptor],
        pending: Vec<PendingCommit>,
        started_at: DateTime<Utc>,
    ) -> Result<(u64, u64, DateTime<Utc>), SyncError> {
        let txn = self.db.begin().await?;

        let repo_rows = RepoRepository::new(&txn);
        let mut repositories_synced = 0u64;
        for repo in repos {
            let was_new = repo_rows
                .insert_if_absent(user_id, &repo.name, &repo.url, repo.language.as_deref())
                .await?;
            if was_new {
                repositories_synced += 1;
            }
        }

        let repo_ids = repo_rows.ids_by_name(user_id).await?;
        let commit_rows = CommitRepository::new(&txn);
        let mut commits_synced = 0u64;
        for item in pending {
            let Some(&repository_id) = repo_ids.get(&item.repo_name) else {
                warn!(repo = %item.repo_name, "collected commit for unknown repository, skipping");
                continue;
            };
            let was_new = commit_rows
                .insert_if_new(NewCommit {
                    repository_id,
                    commit_sha: item.descriptor.sha,
                    message: item.descriptor.message,
                    author_date: item.descriptor.author_date,
                    files_changed: item.detail.files_changed,
                    additions: item.detail.additions,
                    deletions: item.detail.deletions,
                })
                .await?;
            if was_new {
                commits_synced += 1;
            }
        }

        let last_synced = UserRepository::new(&txn)
            .advance_watermark(user_id, started_at)
            .await?;

        txn.commit().await?;
        Ok((repositories_synced, commits_synced, last_synced))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_token_keeps_last_four_characters() {
        assert_eq!(mask_token("ghp_abcdefgh"), "********efgh");
    }

    #[test]
    fn mask_token_fully_masks_short_tokens() {
        assert_eq!(mask_token("abc"), "***");
        assert_eq!(mask_token(""), "");
    }

    #[tokio::test]
    async fn keyed_locks_serialize_same_key() {
        let locks = Arc::new(KeyedLocks::default());

        let guard = locks.acquire("octocat").await;
        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("octocat").await;
            })
        };

        // The second acquire must block while the first guard is held.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn keyed_locks_do_not_block_distinct_keys() {
        let locks = KeyedLocks::default();
        let _a = locks.acquire("octocat").await;
        // Must not deadlock.
        let _b = locks.acquire("hubot").await;
    }
}
