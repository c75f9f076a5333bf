//! Aggregate counters over an owner's full task set.

use serde::{Deserialize, Serialize};

use crate::task::{Priority, Task};

/// Counters by completion state and priority.
///
/// For any snapshot produced by [`StatsSnapshot::tally`],
/// `completed + pending == total` and `high + medium + low == total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total: u64,
    pub completed: u64,
    pub pending: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
}

impl StatsSnapshot {
    /// Count `tasks` in a single pass.
    pub fn tally<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        tasks.into_iter().fold(Self::default(), |mut stats, task| {
            stats.add(task.completed, task.priority);
            stats
        })
    }

    /// Count for one priority bucket.
    #[must_use]
    pub const fn priority_count(&self, priority: Priority) -> u64 {
        match priority {
            Priority::High => self.high,
            Priority::Medium => self.medium,
            Priority::Low => self.low,
        }
    }

    /// Whether both partition invariants hold.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.completed + self.pending == self.total
            && self.high + self.medium + self.low == self.total
    }

    /// Optimistically account for a freshly created (pending) task.
    pub const fn record_created(&mut self, priority: Priority) {
        self.add(false, priority);
    }

    const fn add(&mut self, completed: bool, priority: Priority) {
        self.total += 1;
        if completed {
            self.completed += 1;
        } else {
            self.pending += 1;
        }
        match priority {
            Priority::High => self.high += 1,
            Priority::Medium => self.medium += 1,
            Priority::Low => self.low += 1,
        }
    }
}
