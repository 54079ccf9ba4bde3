//! Migration to create the commits table.
//!
//! Commits are append-only historical facts deduplicated by their globally
//! unique content hash (`commit_sha`).

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Commits::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Commits::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Commits::RepositoryId).uuid().not_null())
                    .col(
                        ColumnDef::new(Commits::CommitSha)
                            .text()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Commits::Message).text().not_null())
                    .col(
                        ColumnDef::new(Commits::AuthorDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Commits::FilesChanged)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Commits::Additions)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Commits::Deletions)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Commits::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_commits_repository_id")
                            .from(Commits::Table, Commits::RepositoryId)
                            .to(Repositories::Table, Repositories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_commits_repository_id")
                    .table(Commits::Table)
                    .col(Commits::RepositoryId)
                    .to_owned(),
            )
            .await?;

        // Summary windows and recent-commit listings filter on author_date.
        manager
            .create_index(
                Index::create()
                    .name("idx_commits_author_date")
                    .table(Commits::Table)
                    .col(Commits::AuthorDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_commits_repository_id").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_commits_author_date").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Commits::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Commits {
    Table,
    Id,
    RepositoryId,
    CommitSha,
    Message,
    AuthorDate,
    FilesChanged,
    Additions,
    Deletions,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Repositories {
    Table,
    Id,
}
