//! End-to-end tests of the task API over a real WebSocket connection.
//!
//! Each test starts an in-process server on an ephemeral port and talks to
//! it through `RemoteApi`, covering:
//! 1. Priority ordering and aggregate stats for a small task set.
//! 2. Pagination metadata for a partial last page.
//! 3. Owner isolation for reads and deletes.
//! 4. Server-side validation and partial updates.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::{TimeDelta, Utc};
use taskdeck::api::{ApiError, ConnectOptions, RemoteApi, TaskApi};
use taskdeck_proto::query::{CompletionFilter, FilterSpec, PriorityFilter, SortKey};
use taskdeck_proto::stats::StatsSnapshot;
use taskdeck_proto::task::{DueDateChange, NewTask, Priority, Task, TaskPatch};
use taskdeck_server::auth::TokenAuthenticator;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn start_server() -> String {
    let auth = TokenAuthenticator::new([("alice-token", "alice"), ("bob-token", "bob")]);
    let (addr, _handle) = taskdeck_server::server::start_server("127.0.0.1:0", auth)
        .await
        .expect("server should start");
    format!("ws://{addr}/ws")
}

async fn connect(url: &str, token: &str) -> RemoteApi {
    RemoteApi::connect(url, token, ConnectOptions::default())
        .await
        .expect("connect should succeed")
}

async fn create(api: &RemoteApi, title: &str, priority: Priority) -> Task {
    api.create(NewTask {
        priority,
        ..NewTask::titled(title)
    })
    .await
    .expect("create should succeed")
}

fn titles(tasks: &[Task]) -> Vec<&str> {
    tasks.iter().map(|t| t.title.as_str()).collect()
}

/// One high/completed, one medium/pending due yesterday, one low/pending
/// without a due date.
async fn seed_three(api: &RemoteApi) -> (Task, Task, Task) {
    let high = create(api, "high", Priority::High).await;
    let high = api
        .update(&high.id, TaskPatch::completed(true))
        .await
        .unwrap();

    let yesterday = Utc::now().date_naive() - TimeDelta::days(1);
    let medium = api
        .create(NewTask {
            priority: Priority::Medium,
            due_date: Some(yesterday),
            ..NewTask::titled("medium")
        })
        .await
        .unwrap();

    let low = create(api, "low", Priority::Low).await;
    (high, medium, low)
}

// ---------------------------------------------------------------------------
// Ordering and stats
// ---------------------------------------------------------------------------

#[tokio::test]
async fn priority_sort_and_stats_over_mixed_tasks() {
    let url = start_server().await;
    let api = connect(&url, "alice-token").await;
    seed_three(&api).await;

    let page = api
        .list(FilterSpec {
            sort: SortKey::Priority,
            ..FilterSpec::default()
        })
        .await
        .unwrap();
    assert_eq!(titles(&page.tasks), vec!["high", "medium", "low"]);

    let stats = api.stats().await.unwrap();
    assert_eq!(
        stats,
        StatsSnapshot {
            total: 3,
            completed: 1,
            pending: 2,
            high: 1,
            medium: 1,
            low: 1,
        }
    );
}

#[tokio::test]
async fn stats_ignore_the_list_filter() {
    let url = start_server().await;
    let api = connect(&url, "alice-token").await;
    seed_three(&api).await;

    let completed_only = api
        .list(FilterSpec {
            completed: CompletionFilter::Completed,
            ..FilterSpec::default()
        })
        .await
        .unwrap();
    assert_eq!(titles(&completed_only.tasks), vec!["high"]);
    assert_eq!(api.stats().await.unwrap().total, 3);
}

#[tokio::test]
async fn due_date_sort_puts_undated_last() {
    let url = start_server().await;
    let api = connect(&url, "alice-token").await;
    seed_three(&api).await;

    let page = api
        .list(FilterSpec {
            sort: SortKey::DueDate,
            ..FilterSpec::default()
        })
        .await
        .unwrap();
    // Only "medium" has a due date; the rest fall back to newest first.
    assert_eq!(titles(&page.tasks), vec!["medium", "low", "high"]);
}

#[tokio::test]
async fn toggling_twice_restores_stats() {
    let url = start_server().await;
    let api = connect(&url, "alice-token").await;
    let (_, medium, _) = seed_three(&api).await;
    let before = api.stats().await.unwrap();

    api.update(&medium.id, TaskPatch::completed(true))
        .await
        .unwrap();
    assert_eq!(api.stats().await.unwrap().completed, before.completed + 1);
    api.update(&medium.id, TaskPatch::completed(false))
        .await
        .unwrap();

    assert_eq!(api.stats().await.unwrap(), before);
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_page_of_two_holds_the_last_row() {
    let url = start_server().await;
    let api = connect(&url, "alice-token").await;
    for title in ["one", "two", "three"] {
        create(&api, title, Priority::Medium).await;
    }

    let page = api
        .list(FilterSpec {
            page: 2,
            limit: 2,
            ..FilterSpec::default()
        })
        .await
        .unwrap();

    assert_eq!(titles(&page.tasks), vec!["one"]);
    assert_eq!(page.pagination.page, 2);
    assert_eq!(page.pagination.limit, 2);
    assert_eq!(page.pagination.total, 3);
    assert_eq!(page.pagination.pages, 2);
}

#[tokio::test]
async fn page_zero_is_a_validation_error() {
    let url = start_server().await;
    let api = connect(&url, "alice-token").await;

    let result = api
        .list(FilterSpec {
            page: 0,
            ..FilterSpec::default()
        })
        .await;
    assert!(matches!(result, Err(ApiError::Validation(_))));
}

// ---------------------------------------------------------------------------
// Owner isolation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn deleting_another_owners_task_is_not_found() {
    let url = start_server().await;
    let alice = connect(&url, "alice-token").await;
    let bob = connect(&url, "bob-token").await;
    let (high, _, _) = seed_three(&alice).await;
    let before = alice.stats().await.unwrap();

    assert_eq!(bob.delete(&high.id).await, Err(ApiError::NotFound));
    assert_eq!(bob.get(&high.id).await, Err(ApiError::NotFound));
    assert_eq!(
        bob.update(&high.id, TaskPatch::completed(false)).await,
        Err(ApiError::NotFound)
    );

    assert_eq!(alice.stats().await.unwrap(), before);
    assert_eq!(alice.get(&high.id).await.unwrap(), high);
    assert_eq!(bob.stats().await.unwrap(), StatsSnapshot::default());
}

#[tokio::test]
async fn lists_are_scoped_to_the_caller() {
    let url = start_server().await;
    let alice = connect(&url, "alice-token").await;
    let bob = connect(&url, "bob-token").await;
    create(&alice, "alice's", Priority::High).await;
    create(&bob, "bob's", Priority::High).await;

    let page = bob
        .list(FilterSpec {
            priority: PriorityFilter::Only(Priority::High),
            ..FilterSpec::default()
        })
        .await
        .unwrap();
    assert_eq!(titles(&page.tasks), vec!["bob's"]);
    assert_eq!(page.pagination.total, 1);
}

// ---------------------------------------------------------------------------
// Validation and updates
// ---------------------------------------------------------------------------

#[tokio::test]
async fn blank_title_is_rejected_by_the_server() {
    let url = start_server().await;
    let api = connect(&url, "alice-token").await;

    let result = api.create(NewTask::titled("   ")).await;
    assert!(matches!(result, Err(ApiError::Validation(_))));
    assert_eq!(api.stats().await.unwrap().total, 0);
}

#[tokio::test]
async fn partial_update_touches_only_named_fields() {
    let url = start_server().await;
    let api = connect(&url, "alice-token").await;
    let (_, medium, _) = seed_three(&api).await;

    let updated = api
        .update(
            &medium.id,
            TaskPatch {
                title: Some("  renamed  ".to_string()),
                due_date: DueDateChange::Clear,
                ..TaskPatch::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.title, "renamed");
    assert_eq!(updated.due_date, None);
    assert_eq!(updated.priority, medium.priority);
    assert_eq!(updated.completed, medium.completed);
    assert_eq!(updated.created_at, medium.created_at);
    assert!(updated.updated_at > medium.updated_at);
}

#[tokio::test]
async fn deleted_task_is_gone() {
    let url = start_server().await;
    let api = connect(&url, "alice-token").await;
    let task = create(&api, "short-lived", Priority::Low).await;

    api.delete(&task.id).await.unwrap();

    assert_eq!(api.get(&task.id).await, Err(ApiError::NotFound));
    assert_eq!(api.delete(&task.id).await, Err(ApiError::NotFound));
    assert!(api.list(FilterSpec::default()).await.unwrap().tasks.is_empty());
}
