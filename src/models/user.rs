//! User entity model
//!
//! This module contains the SeaORM entity model for the users table,
//! which tracks one GitHub account and its incremental-sync watermark.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// User entity representing a tracked GitHub account
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// GitHub account handle (unique)
    pub github_username: String,

    /// Masked GitHub token reference; only the last 4 characters are kept
    pub github_token: String,

    /// Timestamp when the user was first tracked
    pub created_at: DateTimeWithTimeZone,

    /// Incremental-sync watermark; activity before this instant is assumed
    /// already synchronized. Absent until the first successful sync.
    pub last_synced_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::repo::Entity")]
    Repo,
    #[sea_orm(has_many = "super::summary::Entity")]
    Summary,
}

impl Related<super::repo::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Repo.def()
    }
}

impl Related<super::summary::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Summary.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
