//! Integration tests for the incremental synchronizer: idempotence,
//! dedup, watermark advancement, and all-or-nothing failure semantics.

mod test_utils;

use chrono::Utc;
use sea_orm::EntityTrait;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use devtrack::models;
use devtrack::repositories::{CommitRepository, UserRepository};
use devtrack::sync::SyncError;

use test_utils::{mount_github_fixture, setup_test_db, sync_service_for};

#[tokio::test]
async fn first_sync_collects_one_repo_and_three_commits() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;
    mount_github_fixture(&server, "octocat").await;

    let service = sync_service_for(db.clone(), &server, "octocat");
    let outcome = service.sync().await.unwrap();

    assert_eq!(outcome.username, "octocat");
    assert_eq!(outcome.repositories_synced, 1);
    assert_eq!(outcome.commits_synced, 3);

    let user = UserRepository::new(&db)
        .find_by_username("octocat")
        .await
        .unwrap()
        .unwrap();
    assert!(user.last_synced_at.is_some());
    assert_eq!(
        CommitRepository::new(&db).count_for_user(user.id).await.unwrap(),
        3
    );
}

#[tokio::test]
async fn repeat_sync_with_no_upstream_changes_is_idempotent() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;
    mount_github_fixture(&server, "octocat").await;

    let service = sync_service_for(db.clone(), &server, "octocat");
    let first = service.sync().await.unwrap();
    let second = service.sync().await.unwrap();

    assert_eq!(first.commits_synced, 3);
    assert_eq!(second.repositories_synced, 0);
    assert_eq!(second.commits_synced, 0);

    // Total row count unchanged: the dedup key absorbed the overlap.
    let user = UserRepository::new(&db)
        .find_by_username("octocat")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        CommitRepository::new(&db).count_for_user(user.id).await.unwrap(),
        3
    );
}

#[tokio::test]
async fn watermark_is_monotonically_non_decreasing() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;
    mount_github_fixture(&server, "octocat").await;

    let service = sync_service_for(db.clone(), &server, "octocat");
    let first = service.sync().await.unwrap();
    let second = service.sync().await.unwrap();

    assert!(second.last_synced >= first.last_synced);

    let stored = UserRepository::new(&db)
        .find_by_username("octocat")
        .await
        .unwrap()
        .unwrap()
        .last_synced_at
        .unwrap();
    assert_eq!(stored.with_timezone(&Utc), second.last_synced);
}

#[tokio::test]
async fn watermark_reflects_sync_start_not_newest_commit() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;
    mount_github_fixture(&server, "octocat").await;

    let before = Utc::now();
    let outcome = sync_service_for(db.clone(), &server, "octocat")
        .sync()
        .await
        .unwrap();
    let after = Utc::now();

    // Fixture commits are authored far in the past; the watermark must be
    // the run's own start time instead.
    assert!(outcome.last_synced >= before);
    assert!(outcome.last_synced <= after);
}

#[tokio::test]
async fn failed_commit_fetch_aborts_without_advancing_watermark() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
            "name": "devtrack",
            "html_url": "https://github.com/octocat/devtrack",
            "language": "Rust",
            "full_name": "octocat/devtrack",
        }])))
        .mount(&server)
        .await;
    // Non-transient upstream failure on the commit listing.
    Mock::given(method("GET"))
        .and(path("/repos/octocat/devtrack/commits"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let service = sync_service_for(db.clone(), &server, "octocat");
    let err = service.sync().await.unwrap_err();
    assert!(matches!(err, SyncError::GitHub(_)));

    // Nothing was written: no repositories, no commits, watermark untouched.
    let user = UserRepository::new(&db)
        .find_by_username("octocat")
        .await
        .unwrap()
        .unwrap();
    assert!(user.last_synced_at.is_none());
    assert_eq!(
        CommitRepository::new(&db).count_for_user(user.id).await.unwrap(),
        0
    );
    assert!(models::Repo::find().all(&db).await.unwrap().is_empty());
}

#[tokio::test]
async fn second_sync_passes_watermark_as_since_filter() {
    let db = setup_test_db().await.unwrap();
    let server = MockServer::start().await;
    mount_github_fixture(&server, "octocat").await;

    let service = sync_service_for(db.clone(), &server, "octocat");
    service.sync().await.unwrap();
    service.sync().await.unwrap();

    // The first commit listing has no since parameter; the second must
    // carry the watermark from the first run.
    let requests = server.received_requests().await.unwrap();
    let listings: Vec<_> = requests
        .iter()
        .filter(|r| r.url.path() == "/repos/octocat/devtrack/commits")
        .collect();
    assert_eq!(listings.len(), 2);

    let has_since = |request: &&wiremock::Request| {
        request
            .url
            .query_pairs()
            .any(|(key, _)| key == "since")
    };
    assert!(!has_since(&listings[0]));
    assert!(has_since(&listings[1]));
}
