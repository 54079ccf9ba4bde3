//! Test utilities for database and service testing.
//!
//! Provides in-memory SQLite databases with migrations applied, a GitHub
//! fixture server, and generator doubles that count external calls.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use devtrack::ai::{GenerationError, SummaryGenerator};
use devtrack::github::GitHubClient;
use devtrack::sync::SyncService;

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// A sync service wired against the given mock GitHub server.
#[allow(dead_code)]
pub fn sync_service_for(db: DatabaseConnection, server: &MockServer, username: &str) -> SyncService {
    let github = GitHubClient::new("test_token".to_string(), Some(server.uri()));
    SyncService::new(db, github, username.to_string(), "ghp_testtoken1234")
}

/// Generator double that records every call and returns a fixed response.
#[allow(dead_code)]
pub struct CountingGenerator {
    calls: AtomicUsize,
    response: String,
}

#[allow(dead_code)]
impl CountingGenerator {
    pub fn new(response: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            response: response.to_string(),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SummaryGenerator for CountingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }
}

/// Generator double that always fails, for cache-corruption tests.
#[allow(dead_code)]
pub struct FailingGenerator;

#[async_trait]
impl SummaryGenerator for FailingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        Err(GenerationError::Api {
            status: 500,
            message: "upstream exploded".to_string(),
        })
    }
}

/// Mount the standard GitHub fixture: one repository with three commits
/// authored by the tracked user. The author filter is asserted by the
/// matcher, mirroring the upstream contract that filtering happens
/// server-side.
#[allow(dead_code)]
pub async fn mount_github_fixture(server: &MockServer, username: &str) {
    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
            "name": "devtrack",
            "html_url": format!("https://github.com/{username}/devtrack"),
            "language": "Rust",
            "full_name": format!("{username}/devtrack"),
        }])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/repos/{username}/devtrack/commits")))
        .and(query_param("author", username))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            commit_json("aaaaaaa1111111", "Add incremental sync", "2024-06-05T10:00:00Z"),
            commit_json("bbbbbbb2222222", "Fix pagination bug", "2024-06-06T11:30:00Z"),
            commit_json("ccccccc3333333", "Refactor summary cache", "2024-06-07T09:15:00Z"),
        ])))
        .mount(server)
        .await;

    // The repository also holds two commits by other authors. Filtering is
    // server-side, so an unfiltered listing would return all five; a
    // collector that drops the author parameter gets the wrong count.
    Mock::given(method("GET"))
        .and(path(format!("/repos/{username}/devtrack/commits")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            commit_json("aaaaaaa1111111", "Add incremental sync", "2024-06-05T10:00:00Z"),
            commit_json("bbbbbbb2222222", "Fix pagination bug", "2024-06-06T11:30:00Z"),
            commit_json("ccccccc3333333", "Refactor summary cache", "2024-06-07T09:15:00Z"),
            commit_json("ddddddd4444444", "Drive-by typo fix", "2024-06-07T10:00:00Z"),
            commit_json("eeeeeee5555555", "Update dependency pin", "2024-06-07T11:00:00Z"),
        ])))
        .mount(server)
        .await;

    for sha in ["aaaaaaa1111111", "bbbbbbb2222222", "ccccccc3333333"] {
        Mock::given(method("GET"))
            .and(path(format!("/repos/{username}/devtrack/commits/{sha}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sha": sha,
                "stats": { "additions": 10, "deletions": 2 },
                "files": [{ "filename": "src/lib.rs" }],
            })))
            .mount(server)
            .await;
    }
}

#[allow(dead_code)]
pub fn commit_json(sha: &str, message: &str, date: &str) -> serde_json::Value {
    serde_json::json!({
        "sha": sha,
        "commit": {
            "message": message,
            "author": { "date": date }
        },
    })
}
