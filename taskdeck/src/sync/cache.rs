//! The cached view of one page of tasks plus the user's stats.
//!
//! [`TaskCache`] is a plain state machine: the synchronizer issues tickets
//! from it before each network call and feeds results back in. Nothing here
//! awaits or locks.
//!
//! Ordering rules:
//! - List and stats requests carry monotonic sequence numbers. Only the most
//!   recently issued List may replace the page, and a stats snapshot older
//!   than the last applied one is dropped.
//! - Every confirmed mutation is remembered together with the number of
//!   Lists issued at the time. A List response that was issued no later
//!   than the mutation may predate it, so the mutation is re-applied on top
//!   of that response.
//! - A create bumps the stats locally. The next applied server snapshot
//!   replaces the local numbers outright.

use taskdeck_proto::query::{FilterSpec, Pagination, SortKey, TaskPage};
use taskdeck_proto::stats::StatsSnapshot;
use taskdeck_proto::task::{Task, TaskId};

use crate::api::ApiError;

/// Lifecycle of the cached page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    /// Nothing requested yet.
    #[default]
    Idle,
    /// A List is in flight.
    Loading,
    /// The last List succeeded.
    Ready,
    /// The last List failed; the previous page is still shown.
    Error,
}

/// Handle for one issued List request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListTicket {
    pub seq: u64,
    pub spec: FilterSpec,
}

/// What became of a List response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOutcome {
    /// The response replaced the cached page.
    Applied,
    /// A newer List had been issued; the response was dropped.
    Superseded,
}

/// A mutation confirmed by the server.
#[derive(Debug, Clone)]
enum Change {
    Upserted(Task),
    Deleted(TaskId),
}

#[derive(Debug, Clone)]
struct Confirmed {
    /// Lists issued when the mutation was confirmed.
    epoch: u64,
    change: Change,
}

/// Cached page, filter, pagination and stats.
#[derive(Debug, Clone, Default)]
pub struct TaskCache {
    state: SyncState,
    filter: FilterSpec,
    tasks: Vec<Task>,
    pagination: Pagination,
    stats: StatsSnapshot,
    last_error: Option<ApiError>,
    list_issued: u64,
    stats_issued: u64,
    stats_applied: u64,
    confirmed: Vec<Confirmed>,
}

impl TaskCache {
    /// An idle cache that will list with `filter`.
    #[must_use]
    pub fn new(filter: FilterSpec) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn state(&self) -> SyncState {
        self.state
    }

    /// The filter the next List will use.
    #[must_use]
    pub const fn filter(&self) -> &FilterSpec {
        &self.filter
    }

    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Pagination of the last applied List. Not adjusted by local deletes.
    #[must_use]
    pub const fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    #[must_use]
    pub const fn stats(&self) -> &StatsSnapshot {
        &self.stats
    }

    /// Error from the last failed List, cleared by the next success.
    #[must_use]
    pub const fn last_error(&self) -> Option<&ApiError> {
        self.last_error.as_ref()
    }

    /// The cached copy of `id`, if it is on the current page.
    #[must_use]
    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    /// Issue a List, optionally switching filters first.
    pub fn begin_list(&mut self, filter: Option<FilterSpec>) -> ListTicket {
        if let Some(filter) = filter {
            self.filter = filter;
        }
        self.list_issued += 1;
        self.state = SyncState::Loading;
        ListTicket {
            seq: self.list_issued,
            spec: self.filter,
        }
    }

    /// Feed back the result of the List issued as `seq`.
    ///
    /// Only the most recently issued List is applied. A response to an
    /// earlier one is dropped even when the latest has not answered yet or
    /// later fails: it may have been issued under a filter or page the user
    /// has since left. A failure of the latest List moves to
    /// [`SyncState::Error`] and keeps the cached page.
    pub fn finish_list(&mut self, seq: u64, result: Result<TaskPage, ApiError>) -> ListOutcome {
        if seq != self.list_issued {
            tracing::debug!(seq, latest = self.list_issued, "dropping superseded list response");
            return ListOutcome::Superseded;
        }
        match result {
            Ok(page) => {
                self.tasks = page.tasks;
                self.pagination = page.pagination;
                self.replay_confirmed(seq);
                self.state = SyncState::Ready;
                self.last_error = None;
            }
            Err(err) => {
                self.state = SyncState::Error;
                self.last_error = Some(err);
            }
        }
        ListOutcome::Applied
    }

    /// Re-apply mutations the response for `seq` may not reflect, then forget
    /// the ones every later response will.
    fn replay_confirmed(&mut self, seq: u64) {
        for entry in self.confirmed.iter().filter(|c| c.epoch >= seq) {
            match &entry.change {
                Change::Deleted(id) => self.tasks.retain(|t| &t.id != id),
                Change::Upserted(task) => {
                    if let Some(slot) = self.tasks.iter_mut().find(|t| t.id == task.id)
                        && slot.updated_at < task.updated_at
                    {
                        slot.clone_from(task);
                    }
                }
            }
        }
        self.confirmed.retain(|c| c.epoch >= seq);
    }

    /// Record a server-confirmed create.
    ///
    /// Counts it into the stats at once. The record is shown only when the
    /// page is the first one, sorted newest first, and the record passes the
    /// active filter; otherwise it appears with the next List.
    pub fn apply_created(&mut self, task: Task) {
        self.stats.record_created(task.priority);

        let visible = self.filter.sort == SortKey::CreatedAt
            && self.filter.is_first_page()
            && self.filter.matches(&task)
            && self.task(&task.id).is_none();
        if visible {
            self.tasks.insert(0, task.clone());
            self.tasks.truncate(self.page_limit());
        }
        self.remember(Change::Upserted(task));
    }

    /// Record a server-confirmed update: replace the cached copy in place.
    ///
    /// Position is kept even if the sort key changed. An older copy never
    /// replaces a newer one.
    pub fn apply_updated(&mut self, task: Task) {
        if let Some(slot) = self.tasks.iter_mut().find(|t| t.id == task.id)
            && slot.updated_at <= task.updated_at
        {
            slot.clone_from(&task);
        }
        self.remember(Change::Upserted(task));
    }

    /// Record a server-confirmed delete. Pagination is left as it was.
    pub fn apply_deleted(&mut self, id: &TaskId) {
        self.tasks.retain(|t| &t.id != id);
        self.remember(Change::Deleted(id.clone()));
    }

    fn remember(&mut self, change: Change) {
        self.confirmed.push(Confirmed {
            epoch: self.list_issued,
            change,
        });
    }

    /// Issue a stats request.
    pub const fn begin_stats(&mut self) -> u64 {
        self.stats_issued += 1;
        self.stats_issued
    }

    /// Install the authoritative snapshot fetched as `seq`.
    ///
    /// Returns `false` if a newer snapshot was already applied. Otherwise
    /// the snapshot replaces the cached stats, including any optimistic
    /// create counts.
    pub fn finish_stats(&mut self, seq: u64, stats: StatsSnapshot) -> bool {
        if seq <= self.stats_applied {
            return false;
        }
        self.stats = stats;
        self.stats_applied = seq;
        true
    }

    fn page_limit(&self) -> usize {
        let limit = if self.pagination.limit > 0 {
            self.pagination.limit
        } else {
            self.filter.limit.max(1)
        };
        limit as usize
    }
}
