//! Database migrations for the DevTrack API.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2026_01_10_000001_create_users;
mod m2026_01_10_000002_create_repositories;
mod m2026_01_10_000003_create_commits;
mod m2026_01_10_000004_create_summaries;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_01_10_000001_create_users::Migration),
            Box::new(m2026_01_10_000002_create_repositories::Migration),
            Box::new(m2026_01_10_000003_create_commits::Migration),
            Box::new(m2026_01_10_000004_create_summaries::Migration),
        ]
    }
}
