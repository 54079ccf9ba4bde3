//! Migration to create the repositories table.
//!
//! A repository belongs to exactly one user and is identified by the
//! (user_id, repo_name) pair; repeat syncs must never duplicate it.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Repositories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Repositories::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Repositories::UserId).uuid().not_null())
                    .col(ColumnDef::new(Repositories::RepoName).text().not_null())
                    .col(ColumnDef::new(Repositories::RepoUrl).text().not_null())
                    .col(ColumnDef::new(Repositories::Language).text().null())
                    .col(
                        ColumnDef::new(Repositories::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_repositories_user_id")
                            .from(Repositories::Table, Repositories::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // The upsert target for the synchronizer's insert-or-skip.
        manager
            .create_index(
                Index::create()
                    .name("idx_repositories_user_repo_name")
                    .table(Repositories::Table)
                    .col(Repositories::UserId)
                    .col(Repositories::RepoName)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_repositories_user_repo_name")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Repositories::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Repositories {
    Table,
    Id,
    UserId,
    RepoName,
    RepoUrl,
    Language,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
