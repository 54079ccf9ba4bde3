//! # Summary Repository
//!
//! Cache-table access for generated summaries. Lookups are exact matches on
//! the (user, timeframe, start_date, end_date) cache key; stale entries for
//! other windows are left in place rather than overwritten.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use uuid::Uuid;

use crate::models::summary::{ActiveModel, Column, Entity as Summary, Model, Timeframe};

/// Repository for summary-cache database operations
pub struct SummaryRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> SummaryRepository<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Exact-match cache lookup.
    pub async fn find_cached(
        &self,
        user_id: Uuid,
        timeframe: Timeframe,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Option<Model>, DbErr> {
        Summary::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::Timeframe.eq(timeframe.as_str()))
            .filter(Column::StartDate.eq(start_date))
            .filter(Column::EndDate.eq(end_date))
            .order_by_desc(Column::GeneratedAt)
            .one(self.conn)
            .await
    }

    /// Insert a freshly generated summary as a new cache row.
    pub async fn insert(
        &self,
        user_id: Uuid,
        timeframe: Timeframe,
        start_date: NaiveDate,
        end_date: NaiveDate,
        summary_text: &str,
        generated_at: DateTime<Utc>,
    ) -> Result<Model, DbErr> {
        let active = ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            timeframe: Set(timeframe.as_str().to_string()),
            start_date: Set(start_date),
            end_date: Set(end_date),
            summary_text: Set(summary_text.to_string()),
            generated_at: Set(generated_at.into()),
        };
        active.insert(self.conn).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::UserRepository;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{Database, DatabaseConnection};

    async fn setup_user() -> (DatabaseConnection, Uuid) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        let user = UserRepository::new(&db)
            .get_or_create("octocat", "****abcd")
            .await
            .unwrap();
        (db, user.id)
    }

    #[tokio::test]
    async fn cache_lookup_matches_exact_key_only() {
        let (db, user_id) = setup_user().await;
        let summaries = SummaryRepository::new(&db);

        let start = NaiveDate::from_ymd_opt(2026, 1, 3).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        summaries
            .insert(user_id, Timeframe::Week, start, end, "busy week", Utc::now())
            .await
            .unwrap();

        let hit = summaries
            .find_cached(user_id, Timeframe::Week, start, end)
            .await
            .unwrap();
        assert_eq!(hit.unwrap().summary_text, "busy week");

        // Same dates, different timeframe: distinct cache key.
        let miss = summaries
            .find_cached(user_id, Timeframe::Month, start, end)
            .await
            .unwrap();
        assert!(miss.is_none());

        // Shifted window: distinct cache key.
        let miss = summaries
            .find_cached(
                user_id,
                Timeframe::Week,
                start.succ_opt().unwrap(),
                end,
            )
            .await
            .unwrap();
        assert!(miss.is_none());
    }
}
