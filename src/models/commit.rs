//! Commit entity model
//!
//! Commits are append-only historical facts. The content-addressed hash
//! (`commit_sha`) is globally unique and serves as the dedup key for
//! incremental sync.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "commits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Repository the commit belongs to
    pub repository_id: Uuid,

    /// Git commit SHA (globally unique dedup key)
    pub commit_sha: String,

    /// Full commit message
    pub message: String,

    /// When the commit was authored
    pub author_date: DateTimeWithTimeZone,

    /// Number of files touched by the commit
    pub files_changed: i32,

    /// Lines added
    pub additions: i32,

    /// Lines deleted
    pub deletions: i32,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::repo::Entity",
        from = "Column::RepositoryId",
        to = "super::repo::Column::Id"
    )]
    Repo,
}

impl Related<super::repo::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Repo.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
