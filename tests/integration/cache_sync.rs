//! Integration tests for the client cache synchronizer against a live
//! server.
//!
//! Verifies that the cached page and stats stay consistent with the
//! server across filtered views, concurrent mutations and a second client
//! working on the same task list.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use taskdeck::api::{ConnectOptions, RemoteApi, TaskApi};
use taskdeck::sync::{SyncState, Synchronizer};
use taskdeck_proto::query::{FilterSpec, PriorityFilter, SortKey};
use taskdeck_proto::task::{NewTask, Priority, TaskPatch};
use taskdeck_server::auth::TokenAuthenticator;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn start_server() -> String {
    let auth = TokenAuthenticator::new([("alice-token", "alice")]);
    let (addr, _handle) = taskdeck_server::server::start_server("127.0.0.1:0", auth)
        .await
        .expect("server should start");
    format!("ws://{addr}/ws")
}

async fn synchronizer(url: &str, filter: FilterSpec) -> Synchronizer<RemoteApi> {
    let api = RemoteApi::connect(url, "alice-token", ConnectOptions::default())
        .await
        .expect("connect should succeed");
    Synchronizer::new(api, filter)
}

fn draft(title: &str, priority: Priority) -> NewTask {
    NewTask {
        priority,
        ..NewTask::titled(title)
    }
}

fn titles(sync: &Synchronizer<RemoteApi>) -> Vec<String> {
    sync.snapshot().tasks.into_iter().map(|t| t.title).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_on_filtered_second_page_only_bumps_stats() {
    let url = start_server().await;
    let high_only = FilterSpec {
        priority: PriorityFilter::Only(Priority::High),
        limit: 2,
        ..FilterSpec::default()
    };
    let sync = synchronizer(&url, high_only).await;
    for n in 0..3 {
        sync.create(draft(&format!("high {n}"), Priority::High))
            .await
            .unwrap();
    }
    sync.go_to_page(2).await.unwrap();
    let before = sync.snapshot();
    assert_eq!(titles(&sync), vec!["high 0"]);
    assert_eq!(before.stats.total, 3);

    sync.create(draft("chore", Priority::Low)).await.unwrap();

    let after = sync.snapshot();
    assert_eq!(after.tasks, before.tasks);
    assert_eq!(after.pagination, before.pagination);
    assert_eq!(after.stats.total, 4);
    assert_eq!(after.stats.low, 1);
    assert!(after.stats.is_consistent());
}

#[tokio::test]
async fn create_on_first_page_prepends_and_truncates() {
    let url = start_server().await;
    let sync = synchronizer(
        &url,
        FilterSpec {
            limit: 2,
            ..FilterSpec::default()
        },
    )
    .await;
    sync.create(draft("first", Priority::Low)).await.unwrap();
    sync.create(draft("second", Priority::Low)).await.unwrap();
    sync.refresh().await.unwrap();
    assert_eq!(titles(&sync), vec!["second", "first"]);

    sync.create(draft("third", Priority::Low)).await.unwrap();

    assert_eq!(titles(&sync), vec!["third", "second"]);
    // A fresh list agrees with the locally reconciled page.
    sync.refresh().await.unwrap();
    assert_eq!(titles(&sync), vec!["third", "second"]);
}

#[tokio::test]
async fn concurrent_mutations_all_land() {
    let url = start_server().await;
    let sync = synchronizer(
        &url,
        FilterSpec {
            limit: 20,
            ..FilterSpec::default()
        },
    )
    .await;
    sync.refresh().await.unwrap();

    let (a, b, c) = tokio::join!(
        sync.create(draft("a", Priority::High)),
        sync.create(draft("b", Priority::Medium)),
        sync.create(draft("c", Priority::Low)),
    );
    let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());
    // Each create was counted once, whichever snapshot landed last.
    let after_creates = sync.api().stats().await.unwrap();
    assert_eq!(after_creates.total, 3);
    assert_eq!(sync.snapshot().stats, after_creates);

    let (toggled, deleted) = tokio::join!(sync.toggle(&a.id), sync.delete(&b.id));
    assert!(toggled.unwrap().completed);
    deleted.unwrap();

    let snapshot = sync.snapshot();
    let mut ids: Vec<_> = snapshot.tasks.iter().map(|t| t.id.clone()).collect();
    ids.sort();
    let mut expected = vec![a.id.clone(), c.id.clone()];
    expected.sort();
    assert_eq!(ids, expected);

    let server_stats = sync.refresh_stats().await.unwrap();
    assert_eq!(server_stats.total, 2);
    assert_eq!(server_stats.completed, 1);
    assert!(server_stats.is_consistent());
}

#[tokio::test]
async fn update_keeps_position_until_refresh() {
    let url = start_server().await;
    let sync = synchronizer(
        &url,
        FilterSpec {
            sort: SortKey::Priority,
            ..FilterSpec::default()
        },
    )
    .await;
    sync.create(draft("high", Priority::High)).await.unwrap();
    let low = sync.create(draft("low", Priority::Low)).await.unwrap();
    sync.refresh().await.unwrap();
    assert_eq!(titles(&sync), vec!["high", "low"]);

    let patch = TaskPatch {
        priority: Some(Priority::High),
        title: Some("promoted".to_string()),
        ..TaskPatch::default()
    };
    sync.update(&low.id, patch).await.unwrap();

    // Replaced in place. On the next list the newer of the two high
    // priority tasks sorts first.
    assert_eq!(titles(&sync), vec!["high", "promoted"]);
    assert_eq!(sync.snapshot().stats.high, 2);
    sync.refresh().await.unwrap();
    assert_eq!(titles(&sync), vec!["promoted", "high"]);
}

#[tokio::test]
async fn second_client_sees_changes_after_refresh() {
    let url = start_server().await;
    let laptop = synchronizer(&url, FilterSpec::default()).await;
    let phone = synchronizer(&url, FilterSpec::default()).await;

    let task = laptop.create(draft("shared", Priority::Medium)).await.unwrap();
    phone.refresh().await.unwrap();
    assert_eq!(titles(&phone), vec!["shared"]);

    laptop.delete(&task.id).await.unwrap();
    assert!(titles(&laptop).is_empty());

    // The phone's cache is stale until it asks again.
    assert_eq!(titles(&phone), vec!["shared"]);
    phone.refresh().await.unwrap();
    assert!(titles(&phone).is_empty());
    assert_eq!(phone.refresh_stats().await.unwrap().total, 0);
    assert_eq!(phone.snapshot().state, SyncState::Ready);
}
