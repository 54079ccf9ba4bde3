//! # User Repository
//!
//! Data access for tracked users, including watermark advancement. The
//! watermark is only ever moved forward; a stale value is kept in place.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::models::user::{ActiveModel, Column, Entity as User, Model};

/// Repository for user database operations
pub struct UserRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> UserRepository<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Look up a user by GitHub username.
    pub async fn find_by_username(&self, username: &str) -> Result<Option<Model>, DbErr> {
        User::find()
            .filter(Column::GithubUsername.eq(username))
            .one(self.conn)
            .await
    }

    /// Find the tracked user, creating the row on first run. The stored
    /// token reference is refreshed on every call in case it changed.
    pub async fn get_or_create(
        &self,
        username: &str,
        masked_token: &str,
    ) -> Result<Model, DbErr> {
        if let Some(existing) = self.find_by_username(username).await? {
            if existing.github_token != masked_token {
                let mut active: ActiveModel = existing.into();
                active.github_token = Set(masked_token.to_string());
                return active.update(self.conn).await;
            }
            return Ok(existing);
        }

        let user = ActiveModel {
            id: Set(Uuid::new_v4()),
            github_username: Set(username.to_string()),
            github_token: Set(masked_token.to_string()),
            created_at: Set(Utc::now().into()),
            last_synced_at: Set(None),
        };
        user.insert(self.conn).await
    }

    /// Advance the sync watermark, keeping it monotonically non-decreasing.
    ///
    /// Returns the watermark value actually stored.
    pub async fn advance_watermark(
        &self,
        user_id: Uuid,
        to: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, DbErr> {
        let user = User::find_by_id(user_id)
            .one(self.conn)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("user {user_id}")))?;

        let applied = match user.last_synced_at {
            Some(current) if current.with_timezone(&Utc) > to => current.with_timezone(&Utc),
            _ => to,
        };

        let mut active: ActiveModel = user.into();
        active.last_synced_at = Set(Some(applied.into()));
        active.update(self.conn).await?;

        Ok(applied)
    }
}
