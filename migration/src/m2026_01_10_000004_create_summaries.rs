//! Migration to create the summaries table.
//!
//! Summaries are cache entries keyed by (user, timeframe, start_date,
//! end_date); rows are inserted on cache miss and never mutated afterwards.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Summaries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Summaries::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Summaries::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(Summaries::Timeframe)
                            .text()
                            .not_null()
                            .check(
                                Expr::col(Summaries::Timeframe)
                                    .is_in(["week", "month"]),
                            ),
                    )
                    .col(ColumnDef::new(Summaries::StartDate).date().not_null())
                    .col(ColumnDef::new(Summaries::EndDate).date().not_null())
                    .col(ColumnDef::new(Summaries::SummaryText).text().not_null())
                    .col(
                        ColumnDef::new(Summaries::GeneratedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_summaries_user_id")
                            .from(Summaries::Table, Summaries::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Composite cache-key index; unique so concurrent misses cannot
        // produce duplicate rows for the same window.
        manager
            .create_index(
                Index::create()
                    .name("idx_summaries_cache_key")
                    .table(Summaries::Table)
                    .col(Summaries::UserId)
                    .col(Summaries::Timeframe)
                    .col(Summaries::StartDate)
                    .col(Summaries::EndDate)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_summaries_cache_key").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Summaries::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Summaries {
    Table,
    Id,
    UserId,
    Timeframe,
    StartDate,
    EndDate,
    SummaryText,
    GeneratedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
