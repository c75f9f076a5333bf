//! Property tests for the query engine over `MemoryStore`.
//!
//! For arbitrary task sets and filter specs:
//! 1. Walking every page yields each matching row exactly once, in sort
//!    order, and the row count equals `pagination.total`.
//! 2. No page is longer than its limit, and `pages == ceil(total / limit)`.
//! 3. Repeating a query returns the same page.
//! 4. Stats partition the owner's tasks by completion and by priority.

use std::collections::HashSet;

use chrono::NaiveDate;
use proptest::prelude::*;
use taskdeck_proto::query::{CompletionFilter, FilterSpec, PriorityFilter, SortKey, TaskPage};
use taskdeck_proto::stats::StatsSnapshot;
use taskdeck_proto::task::{NewTask, OwnerId, Priority, Task, TaskPatch};
use taskdeck_server::query::{compare, compile};
use taskdeck_server::results::assemble;
use taskdeck_server::stats::aggregate;
use taskdeck_server::store::{MemoryStore, TaskStore};

const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone)]
struct Seed {
    completed: bool,
    priority: Priority,
    due_day: Option<u32>,
}

fn arb_seed() -> impl Strategy<Value = Seed> {
    (
        any::<bool>(),
        prop::sample::select(Priority::ALL.to_vec()),
        // Few distinct days so ties on the sort key are common.
        prop::option::of(1u32..=4),
    )
        .prop_map(|(completed, priority, due_day)| Seed {
            completed,
            priority,
            due_day,
        })
}

fn arb_spec() -> impl Strategy<Value = FilterSpec> {
    (
        prop::sample::select(vec![
            CompletionFilter::Any,
            CompletionFilter::Completed,
            CompletionFilter::Pending,
        ]),
        prop::option::of(prop::sample::select(Priority::ALL.to_vec())),
        prop::sample::select(vec![SortKey::CreatedAt, SortKey::DueDate, SortKey::Priority]),
        1u32..=7,
    )
        .prop_map(|(completed, priority, sort, limit)| FilterSpec {
            completed,
            priority: priority.map_or(PriorityFilter::Any, PriorityFilter::Only),
            sort,
            page: 1,
            limit,
        })
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime should build")
}

async fn seeded_store(alice: &OwnerId, mine: &[Seed], others: usize) -> MemoryStore {
    let store = MemoryStore::new();
    for (n, seed) in mine.iter().enumerate() {
        let draft = NewTask {
            due_date: seed
                .due_day
                .and_then(|d| NaiveDate::from_ymd_opt(2030, 1, d)),
            priority: seed.priority,
            ..NewTask::titled(format!("task {n}"))
        };
        let task = store.insert(alice, draft).await.expect("insert");
        if seed.completed {
            store
                .update_by_id(&task.id, alice, &TaskPatch::completed(true))
                .await
                .expect("complete");
        }
    }
    let bob = OwnerId::new("bob");
    for n in 0..others {
        store
            .insert(&bob, NewTask::titled(format!("other {n}")))
            .await
            .expect("insert other");
    }
    store
}

async fn all_pages(store: &MemoryStore, owner: &OwnerId, spec: FilterSpec) -> Vec<TaskPage> {
    let first = compile(&spec, owner.clone(), MAX_PAGE_SIZE).expect("compile");
    let first = assemble(store, &first).await.expect("assemble");
    let pages = first.pagination.pages;
    let mut out = vec![first];
    for page in 2..=pages {
        let page = u32::try_from(page).expect("page fits");
        let plan = compile(&spec.with_page(page), owner.clone(), MAX_PAGE_SIZE).expect("compile");
        out.push(assemble(store, &plan).await.expect("assemble"));
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn pages_partition_the_matching_rows(
        seeds in prop::collection::vec(arb_seed(), 0..25),
        others in 0usize..4,
        spec in arb_spec(),
    ) {
        let alice = OwnerId::new("alice");
        let (pages, expected) = runtime().block_on(async {
            let store = seeded_store(&alice, &seeds, others).await;
            let pages = all_pages(&store, &alice, spec).await;
            let expected = seeds
                .iter()
                .filter(|s| {
                    spec.completed.matches(s.completed) && spec.priority.matches(s.priority)
                })
                .count();
            (pages, expected)
        });

        let total = pages[0].pagination.total;
        prop_assert_eq!(total, expected as u64);
        prop_assert_eq!(pages[0].pagination.pages, total.div_ceil(u64::from(spec.limit)));

        let rows: Vec<&Task> = pages.iter().flat_map(|p| p.tasks.iter()).collect();
        prop_assert_eq!(rows.len() as u64, total);

        let ids: HashSet<_> = rows.iter().map(|t| t.id.clone()).collect();
        prop_assert_eq!(ids.len(), rows.len());

        for page in &pages {
            prop_assert!(page.tasks.len() <= spec.limit as usize);
            prop_assert_eq!(page.pagination.total, total);
        }
        for row in &rows {
            prop_assert_eq!(&row.owner, &alice);
            prop_assert!(spec.matches(row));
        }
        for pair in rows.windows(2) {
            prop_assert_eq!(
                compare(spec.sort, pair[0], pair[1]),
                std::cmp::Ordering::Less
            );
        }
    }

    #[test]
    fn repeated_query_returns_the_same_page(
        seeds in prop::collection::vec(arb_seed(), 0..25),
        spec in arb_spec(),
        page in 1u32..4,
    ) {
        let alice = OwnerId::new("alice");
        let (first, second) = runtime().block_on(async {
            let store = seeded_store(&alice, &seeds, 0).await;
            let plan = compile(&spec.with_page(page), alice.clone(), MAX_PAGE_SIZE)
                .expect("compile");
            let first = assemble(&store, &plan).await.expect("assemble");
            let second = assemble(&store, &plan).await.expect("assemble");
            (first, second)
        });
        prop_assert_eq!(first, second);
    }

    #[test]
    fn stats_partition_the_owner_tasks(
        seeds in prop::collection::vec(arb_seed(), 0..30),
        others in 0usize..5,
    ) {
        let alice = OwnerId::new("alice");
        let stats: StatsSnapshot = runtime().block_on(async {
            let store = seeded_store(&alice, &seeds, others).await;
            aggregate(&store, &alice).await.expect("aggregate")
        });

        prop_assert!(stats.is_consistent());
        prop_assert_eq!(stats.total, seeds.len() as u64);
        prop_assert_eq!(
            stats.completed,
            seeds.iter().filter(|s| s.completed).count() as u64
        );
        for priority in Priority::ALL {
            prop_assert_eq!(
                stats.priority_count(priority),
                seeds.iter().filter(|s| s.priority == priority).count() as u64
            );
        }
    }
}
