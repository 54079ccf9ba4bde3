//! # Repository-entity Repository
//!
//! Data access for a user's GitHub repositories. Inserts are conditional on
//! the (user_id, repo_name) unique key so repeat syncs never duplicate rows;
//! metadata on existing rows is deliberately left untouched.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect,
    Set,
};
use uuid::Uuid;

use crate::models::repo::{ActiveModel, Column, Entity as Repo};

/// Repository for repository-row database operations
pub struct RepoRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> RepoRepository<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Conditionally insert a repository for the user.
    ///
    /// Returns `true` when a new row was created and `false` when the
    /// (user, name) pair already existed. The conflict is expected control
    /// flow, not an error.
    pub async fn insert_if_absent(
        &self,
        user_id: Uuid,
        repo_name: &str,
        repo_url: &str,
        language: Option<&str>,
    ) -> Result<bool, DbErr> {
        let active = ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            repo_name: Set(repo_name.to_string()),
            repo_url: Set(repo_url.to_string()),
            language: Set(language.map(str::to_string)),
            created_at: Set(Utc::now().into()),
        };

        let inserted = Repo::insert(active)
            .on_conflict(
                OnConflict::columns([Column::UserId, Column::RepoName])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.conn)
            .await?;

        Ok(inserted > 0)
    }

    /// Map of repo_name -> row id for all of the user's repositories.
    pub async fn ids_by_name(&self, user_id: Uuid) -> Result<HashMap<String, Uuid>, DbErr> {
        let rows = Repo::find()
            .filter(Column::UserId.eq(user_id))
            .select_only()
            .column(Column::RepoName)
            .column(Column::Id)
            .into_tuple::<(String, Uuid)>()
            .all(self.conn)
            .await?;

        Ok(rows.into_iter().collect())
    }

    pub async fn count_for_user(&self, user_id: Uuid) -> Result<u64, DbErr> {
        Repo::find()
            .filter(Column::UserId.eq(user_id))
            .count(self.conn)
            .await
    }

    /// Language -> repository count, ignoring repositories without a
    /// reported language.
    pub async fn language_breakdown(
        &self,
        user_id: Uuid,
    ) -> Result<BTreeMap<String, u64>, DbErr> {
        let languages = Repo::find()
            .filter(Column::UserId.eq(user_id))
            .select_only()
            .column(Column::Language)
            .into_tuple::<Option<String>>()
            .all(self.conn)
            .await?;

        let mut breakdown = BTreeMap::new();
        for language in languages.into_iter().flatten() {
            *breakdown.entry(language).or_insert(0) += 1;
        }
        Ok(breakdown)
    }
}
