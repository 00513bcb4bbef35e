//! Codeforces `contest.list` contract tests.
//!
//! Verify request shape, envelope parsing, and that every upstream failure
//! leaves the cache serving its previous snapshot.

use contest_watch::WatchError;
use contest_watch::codeforces::{CodeforcesClient, ContestSource};
use contest_watch::config::UpstreamConfig;
use contest_watch::contests::ContestCache;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> CodeforcesClient {
    CodeforcesClient::new(&UpstreamConfig {
        base_url: format!("{}/", server.uri()),
        ..UpstreamConfig::default()
    })
}

fn future_secs(offset: i64) -> i64 {
    chrono::Utc::now().timestamp() + offset
}

fn ok_body() -> serde_json::Value {
    json!({
        "status": "OK",
        "result": [
            {"id": 2001, "name": "Round B", "type": "CF", "phase": "BEFORE",
             "durationSeconds": 9000, "startTimeSeconds": future_secs(7200)},
            {"id": 2000, "name": "Round A", "type": "CF", "phase": "BEFORE",
             "durationSeconds": 7200, "startTimeSeconds": future_secs(3600)},
            {"id": 1999, "name": "Finished", "type": "CF", "phase": "FINISHED",
             "durationSeconds": 7200, "startTimeSeconds": future_secs(-86_400)}
        ]
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Request and response format
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_parses_ok_envelope() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/contest.list"))
        .and(query_param("gym", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
        .expect(1)
        .mount(&server)
        .await;

    let contests = client_for(&server)
        .fetch_contests()
        .await
        .expect("fetch succeeds");

    assert_eq!(contests.len(), 3);
    assert_eq!(contests[0].id, 2001);
    assert_eq!(contests[0].name, "Round B");
    assert_eq!(contests[0].duration_secs, 9000);
    assert!(contests[0].start.is_some());
}

#[tokio::test]
async fn test_failed_status_is_fetch_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/contest.list"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "FAILED", "comment": "Call limit exceeded"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server).fetch_contests().await.unwrap_err();
    match err {
        WatchError::Fetch(msg) => assert!(msg.contains("Call limit exceeded"), "{msg}"),
        other => panic!("expected fetch error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_is_fetch_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/contest.list"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client_for(&server).fetch_contests().await.unwrap_err();
    assert!(matches!(err, WatchError::Fetch(_)));
}

#[tokio::test]
async fn test_malformed_body_is_fetch_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/contest.list"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server).fetch_contests().await.unwrap_err();
    assert!(matches!(err, WatchError::Fetch(_)));
}

// ────────────────────────────────────────────────────────────────────────────
// Cache integration
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_cache_publishes_sorted_future_contests() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/contest.list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
        .mount(&server)
        .await;

    let cache = ContestCache::new(Arc::new(client_for(&server)), Duration::from_secs(5));
    assert!(cache.refresh().await);

    let snapshot = cache.get().expect("snapshot published");
    let ids: Vec<i64> = snapshot.contests().iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![2000, 2001]);
    assert!(cache.get_by_id(1999).is_none());
}

#[tokio::test]
async fn test_cache_keeps_snapshot_when_upstream_breaks() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/contest.list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/contest.list"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let cache = ContestCache::new(Arc::new(client_for(&server)), Duration::from_secs(5));
    assert!(cache.refresh().await);
    let before = cache.get().expect("first snapshot");

    assert!(!cache.refresh().await);
    let after = cache.get().expect("still served");
    assert!(Arc::ptr_eq(&before, &after));
}

#[tokio::test]
async fn test_cache_gives_up_on_slow_upstream() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/contest.list"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ok_body())
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let cache = ContestCache::new(Arc::new(client_for(&server)), Duration::from_millis(200));
    assert!(!cache.refresh().await);
    assert!(cache.get().is_none());
}
