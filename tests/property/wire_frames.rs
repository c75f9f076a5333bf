//! Property tests for the WebSocket frame codec.
//!
//! 1. Arbitrary requests, including three-way due date changes, decode to
//!    exactly what was encoded.
//! 2. Random bytes never cause a panic in either decoder.
//! 3. Validation accepts exactly the titles that trim to 1..=100 chars.

use chrono::NaiveDate;
use proptest::prelude::*;
use taskdeck_proto::error::ValidationError;
use taskdeck_proto::query::{CompletionFilter, FilterSpec, PriorityFilter, SortKey};
use taskdeck_proto::rpc::{self, ClientFrame, TaskRequest};
use taskdeck_proto::task::{
    DueDateChange, MAX_TITLE_LENGTH, NewTask, Priority, TaskId, TaskPatch, validate_title,
};
use uuid::Uuid;

fn arb_task_id() -> impl Strategy<Value = TaskId> {
    any::<u128>().prop_map(|n| TaskId::from_uuid(Uuid::from_u128(n)))
}

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop::sample::select(Priority::ALL.to_vec())
}

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (2000i32..2100, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default())
}

fn arb_due_change() -> impl Strategy<Value = DueDateChange> {
    prop_oneof![
        Just(DueDateChange::Keep),
        Just(DueDateChange::Clear),
        arb_date().prop_map(DueDateChange::Set),
    ]
}

fn arb_filter() -> impl Strategy<Value = FilterSpec> {
    (
        prop::sample::select(vec![
            CompletionFilter::Any,
            CompletionFilter::Completed,
            CompletionFilter::Pending,
        ]),
        prop::option::of(arb_priority()),
        prop::sample::select(vec![SortKey::CreatedAt, SortKey::DueDate, SortKey::Priority]),
        any::<u32>(),
        any::<u32>(),
    )
        .prop_map(|(completed, priority, sort, page, limit)| FilterSpec {
            completed,
            priority: priority.map_or(PriorityFilter::Any, PriorityFilter::Only),
            sort,
            page,
            limit,
        })
}

fn arb_request() -> impl Strategy<Value = TaskRequest> {
    prop_oneof![
        arb_filter().prop_map(TaskRequest::List),
        arb_task_id().prop_map(TaskRequest::Get),
        (".{0,120}", ".{0,40}", arb_priority(), prop::option::of(arb_date())).prop_map(
            |(title, description, priority, due_date)| TaskRequest::Create(NewTask {
                title,
                description,
                priority,
                due_date,
            })
        ),
        (
            arb_task_id(),
            prop::option::of(".{0,40}"),
            prop::option::of(any::<bool>()),
            prop::option::of(arb_priority()),
            arb_due_change(),
        )
            .prop_map(|(id, title, completed, priority, due_date)| TaskRequest::Update {
                id,
                patch: TaskPatch {
                    title,
                    description: None,
                    completed,
                    priority,
                    due_date,
                },
            }),
        arb_task_id().prop_map(TaskRequest::Delete),
        Just(TaskRequest::Stats),
    ]
}

proptest! {
    /// Any request frame decodes to exactly what was encoded.
    #[test]
    fn request_frames_survive_the_wire(request_id in any::<u64>(), request in arb_request()) {
        let frame = ClientFrame::Request { request_id, request };
        let bytes = rpc::encode_client(&frame).expect("encode should succeed");
        let decoded = rpc::decode_client(&bytes).expect("decode should succeed");
        prop_assert_eq!(frame, decoded);
    }

    /// Random bytes never panic the client-frame decoder.
    #[test]
    fn random_bytes_decode_client_no_panic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = rpc::decode_client(&bytes);
    }

    /// Random bytes never panic the server-frame decoder.
    #[test]
    fn random_bytes_decode_server_no_panic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = rpc::decode_server(&bytes);
    }

    /// A title is accepted iff it has 1..=100 characters after trimming,
    /// and the accepted value is the trimmed one.
    #[test]
    fn title_validation_matches_trimmed_length(raw in "[ a-z]{0,110}") {
        let trimmed = raw.trim();
        match validate_title(&raw) {
            Ok(title) => {
                prop_assert_eq!(title.as_str(), trimmed);
                prop_assert!(!trimmed.is_empty());
                prop_assert!(trimmed.chars().count() <= MAX_TITLE_LENGTH);
            }
            Err(ValidationError::TitleEmpty) => prop_assert!(trimmed.is_empty()),
            Err(ValidationError::TitleTooLong { .. }) => {
                prop_assert!(trimmed.chars().count() > MAX_TITLE_LENGTH);
            }
            Err(other) => prop_assert!(false, "unexpected error {other:?}"),
        }
    }
}
