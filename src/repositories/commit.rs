//! # Commit Repository
//!
//! Data access for stored commits. The conditional insert on `commit_sha`
//! is what makes repeated syncs idempotent: a conflict means "already
//! synced" and is reported as `false`, never as an error.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, FromQueryResult, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use uuid::Uuid;

use crate::models::commit::{ActiveModel, Column, Entity as Commit, Relation};
use crate::models::repo;

/// A commit as collected from GitHub, ready for storage.
#[derive(Debug, Clone)]
pub struct NewCommit {
    pub repository_id: Uuid,
    pub commit_sha: String,
    pub message: String,
    pub author_date: DateTime<Utc>,
    pub files_changed: i32,
    pub additions: i32,
    pub deletions: i32,
}

/// A stored commit joined with its repository name, used for summary
/// prompts and the recent-commit listing.
#[derive(Debug, Clone, FromQueryResult)]
pub struct CommitActivity {
    pub commit_sha: String,
    pub repo_name: String,
    pub message: String,
    pub author_date: DateTime<Utc>,
    pub files_changed: i32,
    pub additions: i32,
    pub deletions: i32,
}

/// Repository for commit database operations
pub struct CommitRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> CommitRepository<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Whether a commit with the given SHA is already stored.
    pub async fn exists(&self, commit_sha: &str) -> Result<bool, DbErr> {
        let count = Commit::find()
            .filter(Column::CommitSha.eq(commit_sha))
            .count(self.conn)
            .await?;
        Ok(count > 0)
    }

    /// Conditionally insert a commit, deduplicating on `commit_sha`.
    ///
    /// Returns `true` when the row is new and `false` when the SHA was
    /// already stored.
    pub async fn insert_if_new(&self, commit: NewCommit) -> Result<bool, DbErr> {
        let active = ActiveModel {
            id: Set(Uuid::new_v4()),
            repository_id: Set(commit.repository_id),
            commit_sha: Set(commit.commit_sha),
            message: Set(commit.message),
            author_date: Set(commit.author_date.into()),
            files_changed: Set(commit.files_changed),
            additions: Set(commit.additions),
            deletions: Set(commit.deletions),
            created_at: Set(Utc::now().into()),
        };

        let inserted = Commit::insert(active)
            .on_conflict(
                OnConflict::column(Column::CommitSha)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.conn)
            .await?;

        Ok(inserted > 0)
    }

    /// Total stored commits across all of the user's repositories.
    pub async fn count_for_user(&self, user_id: Uuid) -> Result<u64, DbErr> {
        Commit::find()
            .join(JoinType::InnerJoin, Relation::Repo.def())
            .filter(repo::Column::UserId.eq(user_id))
            .count(self.conn)
            .await
    }

    /// Commits authored on or after `start_at` for the user.
    pub async fn count_since(
        &self,
        user_id: Uuid,
        start_at: DateTime<Utc>,
    ) -> Result<u64, DbErr> {
        Commit::find()
            .join(JoinType::InnerJoin, Relation::Repo.def())
            .filter(repo::Column::UserId.eq(user_id))
            .filter(Column::AuthorDate.gte(start_at))
            .count(self.conn)
            .await
    }

    /// Commit activity in the window, newest first, joined with repository
    /// names for prompt building.
    pub async fn activity_since(
        &self,
        user_id: Uuid,
        start_at: DateTime<Utc>,
    ) -> Result<Vec<CommitActivity>, DbErr> {
        Self::activity_query(user_id, Some(start_at), None, None)
            .into_model::<CommitActivity>()
            .all(self.conn)
            .await
    }

    /// Most recent commits for the user, optionally filtered by repository
    /// name.
    pub async fn list_recent(
        &self,
        user_id: Uuid,
        limit: u64,
        repo_name: Option<&str>,
    ) -> Result<Vec<CommitActivity>, DbErr> {
        Self::activity_query(user_id, None, repo_name, Some(limit))
            .into_model::<CommitActivity>()
            .all(self.conn)
            .await
    }

    /// Aggregate (additions, deletions, files_changed) across all of the
    /// user's commits.
    pub async fn line_totals(&self, user_id: Uuid) -> Result<(i64, i64, i64), DbErr> {
        let totals = Commit::find()
            .join(JoinType::InnerJoin, Relation::Repo.def())
            .filter(repo::Column::UserId.eq(user_id))
            .select_only()
            .column_as(Column::Additions.sum(), "additions")
            .column_as(Column::Deletions.sum(), "deletions")
            .column_as(Column::FilesChanged.sum(), "files_changed")
            .into_tuple::<(Option<i64>, Option<i64>, Option<i64>)>()
            .one(self.conn)
            .await?;

        let (additions, deletions, files) = totals.unwrap_or((None, None, None));
        Ok((
            additions.unwrap_or(0),
            deletions.unwrap_or(0),
            files.unwrap_or(0),
        ))
    }

    fn activity_query(
        user_id: Uuid,
        start_at: Option<DateTime<Utc>>,
        repo_name: Option<&str>,
        limit: Option<u64>,
    ) -> sea_orm::Select<Commit> {
        let mut query = Commit::find()
            .join(JoinType::InnerJoin, Relation::Repo.def())
            .filter(repo::Column::UserId.eq(user_id));

        if let Some(start_at) = start_at {
            query = query.filter(Column::AuthorDate.gte(start_at));
        }
        if let Some(name) = repo_name {
            query = query.filter(repo::Column::RepoName.eq(name));
        }

        query = query
            .select_only()
            .column(Column::CommitSha)
            .column_as(repo::Column::RepoName, "repo_name")
            .column(Column::Message)
            .column(Column::AuthorDate)
            .column(Column::FilesChanged)
            .column(Column::Additions)
            .column(Column::Deletions)
            .order_by_desc(Column::AuthorDate);

        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        query
    }
}
