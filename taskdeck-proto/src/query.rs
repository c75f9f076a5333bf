//! List request types: filters, sort keys, pagination and the page result.
//!
//! [`ListParams`] is the raw, caller-facing request (strings and integers as
//! they arrive from a query string). Converting it into a [`FilterSpec`]
//! checks every enumerated value; the server's query compiler then turns
//! the filter into an executable plan.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::task::{Priority, Task};

/// Page size used when the caller does not supply one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Upper bound for a page size; larger requests are clamped.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Values that mean "no constraint" for the enumerated filters.
const ANY_VALUES: [&str; 3] = ["", "all", "any"];

/// Completion-state filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompletionFilter {
    #[default]
    Any,
    Completed,
    Pending,
}

impl CompletionFilter {
    /// The required `completed` value, or `None` when unconstrained.
    #[must_use]
    pub const fn required(self) -> Option<bool> {
        match self {
            Self::Any => None,
            Self::Completed => Some(true),
            Self::Pending => Some(false),
        }
    }

    /// Whether a task with the given completion flag passes this filter.
    #[must_use]
    pub const fn matches(self, completed: bool) -> bool {
        match self.required() {
            None => true,
            Some(required) => required == completed,
        }
    }
}

impl FromStr for CompletionFilter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "true" => Ok(Self::Completed),
            "false" => Ok(Self::Pending),
            any if ANY_VALUES.contains(&any) => Ok(Self::Any),
            other => Err(ValidationError::InvalidFilter {
                field: "completed",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for CompletionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("all"),
            Self::Completed => f.write_str("true"),
            Self::Pending => f.write_str("false"),
        }
    }
}

/// Priority filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PriorityFilter {
    #[default]
    Any,
    Only(Priority),
}

impl PriorityFilter {
    /// The required priority, or `None` when unconstrained.
    #[must_use]
    pub const fn required(self) -> Option<Priority> {
        match self {
            Self::Any => None,
            Self::Only(priority) => Some(priority),
        }
    }

    /// Whether a task with the given priority passes this filter.
    #[must_use]
    pub fn matches(self, priority: Priority) -> bool {
        self.required().is_none_or(|required| required == priority)
    }
}

impl FromStr for PriorityFilter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if ANY_VALUES.contains(&s) {
            return Ok(Self::Any);
        }
        s.parse().map(Self::Only)
    }
}

impl fmt::Display for PriorityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("all"),
            Self::Only(priority) => write!(f, "{priority}"),
        }
    }
}

/// Sort order for task listings. Every order ends with `id` ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortKey {
    /// Newest first.
    #[default]
    CreatedAt,
    /// Earliest due date first, undated tasks last, then newest first.
    DueDate,
    /// High > medium > low, then newest first.
    Priority,
}

impl SortKey {
    /// Wire name (`createdAt`, `dueDate`, `priority`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreatedAt => "createdAt",
            Self::DueDate => "dueDate",
            Self::Priority => "priority",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "createdAt" => Ok(Self::CreatedAt),
            "dueDate" => Ok(Self::DueDate),
            "priority" => Ok(Self::Priority),
            other => Err(ValidationError::InvalidFilter {
                field: "sort",
                value: other.to_string(),
            }),
        }
    }
}

/// Typed filter, sort and pagination parameters for one list request.
///
/// `page` is 1-based. `limit` is clamped by the query compiler, so any value
/// is representable here; `page == 0` is rejected at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub completed: CompletionFilter,
    pub priority: PriorityFilter,
    pub sort: SortKey,
    pub page: u32,
    pub limit: u32,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            completed: CompletionFilter::Any,
            priority: PriorityFilter::Any,
            sort: SortKey::CreatedAt,
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl FilterSpec {
    /// Whether `task` satisfies the completion and priority constraints.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        self.completed.matches(task.completed) && self.priority.matches(task.priority)
    }

    /// Whether this spec addresses the first page.
    #[must_use]
    pub const fn is_first_page(&self) -> bool {
        self.page <= 1
    }

    /// Same filters and sort, different page.
    #[must_use]
    pub const fn with_page(self, page: u32) -> Self {
        Self { page, ..self }
    }
}

/// Raw list request as received from a caller (query string or CLI).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListParams {
    pub completed: Option<String>,
    pub priority: Option<String>,
    pub sort: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl TryFrom<ListParams> for FilterSpec {
    type Error = ValidationError;

    fn try_from(params: ListParams) -> Result<Self, Self::Error> {
        let completed = params.completed.as_deref().unwrap_or("").parse()?;
        let priority = params.priority.as_deref().unwrap_or("").parse()?;
        let sort = params.sort.as_deref().unwrap_or("").parse()?;

        let page = match params.page {
            None => 1,
            Some(page) if page < 1 => {
                return Err(ValidationError::InvalidPagination(format!(
                    "page must be at least 1, got {page}"
                )));
            }
            Some(page) => u32::try_from(page).map_err(|_| {
                ValidationError::InvalidPagination(format!("page {page} is out of range"))
            })?,
        };
        // Out-of-range sizes are clamped later rather than rejected.
        let limit = params.limit.map_or(DEFAULT_PAGE_SIZE, |limit| {
            u32::try_from(limit.max(0)).unwrap_or(u32::MAX)
        });

        Ok(Self {
            completed,
            priority,
            sort,
            page,
            limit,
        })
    }
}

/// Pagination metadata returned alongside a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    /// Rows matching the filter, ignoring offset and limit.
    pub total: u64,
    /// `ceil(total / limit)`, zero when `total` is zero.
    pub pages: u64,
}

impl Pagination {
    /// Build pagination metadata, deriving `pages` from `total` and `limit`.
    #[must_use]
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let pages = if limit == 0 {
            0
        } else {
            total.div_ceil(u64::from(limit))
        };
        Self {
            page,
            limit,
            total,
            pages,
        }
    }
}

/// One page of tasks plus its pagination metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub pagination: Pagination,
}
