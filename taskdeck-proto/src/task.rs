//! Task record types shared by the server and the client.
//!
//! A [`Task`] is owned by exactly one user and is only ever read or mutated
//! through an owner-scoped operation. Creation input is carried by
//! [`NewTask`], partial edits by [`TaskPatch`]; both are normalized through
//! [`validate_title`] and [`validate_description`] before they touch a record.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Maximum task title length in characters (after trimming).
pub const MAX_TITLE_LENGTH: usize = 100;

/// Maximum task description length in characters (after trimming).
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

/// Unique identifier for a task, based on UUID v7 for time-ordering.
///
/// Ordering is the UUID byte order; it is the final tie-break of every sort
/// so that pagination stays stable when rows share a sort value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Creates a new time-ordered task identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `TaskId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID value.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Identity of the authenticated user a task belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerId(String);

impl OwnerId {
    /// Create an owner identity from its string form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Return the string form of this owner identity.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task priority. Ranked `High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// All priorities, highest rank first.
    pub const ALL: [Self; 3] = [Self::High, Self::Medium, Self::Low];

    /// Numeric rank used by the priority sort (higher sorts first).
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }

    /// Lowercase wire name (`low`, `medium`, `high`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(ValidationError::InvalidFilter {
                field: "priority",
                value: other.to_string(),
            }),
        }
    }
}

/// A persisted task record.
///
/// `id`, `owner` and `created_at` never change after creation. The store
/// maintains `created_at` / `updated_at` and guarantees
/// `updated_at >= created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Store-assigned identifier, never reused.
    pub id: TaskId,
    /// The user this task belongs to.
    pub owner: OwnerId,
    /// Trimmed, non-empty, at most [`MAX_TITLE_LENGTH`] characters.
    pub title: String,
    /// Trimmed, at most [`MAX_DESCRIPTION_LENGTH`] characters.
    pub description: String,
    pub completed: bool,
    pub priority: Priority,
    /// Calendar day only; no time-of-day semantics.
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task. `owner` is never part of it: the server
/// takes it from the authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

impl NewTask {
    /// A new task with the given title and default fields.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            priority: Priority::default(),
            due_date: None,
        }
    }

    /// Trim and bounds-check the text fields.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TitleEmpty`], [`ValidationError::TitleTooLong`]
    /// or [`ValidationError::DescriptionTooLong`].
    pub fn validated(self) -> Result<Self, ValidationError> {
        Ok(Self {
            title: validate_title(&self.title)?,
            description: validate_description(&self.description)?,
            ..self
        })
    }
}

/// How an update treats the due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DueDateChange {
    /// Leave the current due date untouched.
    #[default]
    Keep,
    /// Remove the due date.
    Clear,
    /// Replace the due date.
    Set(NaiveDate),
}

/// A partial update. `None` fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub due_date: DueDateChange,
}

impl TaskPatch {
    /// A patch that only sets the completion flag.
    #[must_use]
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    /// Whether applying this patch would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.completed.is_none()
            && self.priority.is_none()
            && self.due_date == DueDateChange::Keep
    }

    /// Trim and bounds-check any text fields present.
    ///
    /// # Errors
    ///
    /// Same as [`NewTask::validated`], for the fields that are set.
    pub fn validated(self) -> Result<Self, ValidationError> {
        let title = self.title.as_deref().map(validate_title).transpose()?;
        let description = self
            .description
            .as_deref()
            .map(validate_description)
            .transpose()?;
        Ok(Self {
            title,
            description,
            ..self
        })
    }

    /// Apply the settable fields to `task`. Does not touch `id`, `owner`
    /// or timestamps.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            task.description.clone_from(description);
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        match self.due_date {
            DueDateChange::Keep => {}
            DueDateChange::Clear => task.due_date = None,
            DueDateChange::Set(date) => task.due_date = Some(date),
        }
    }
}

/// Parse a caller-supplied due date.
///
/// Accepts a calendar day (`2030-01-31`) or a full RFC 3339 timestamp, in
/// which case the UTC calendar day is kept.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidDueDate`].
pub fn parse_due_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| {
            DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc).date_naive())
        })
        .map_err(|_| ValidationError::InvalidDueDate(raw.to_string()))
}

/// Trim a title and check it is non-empty and within bounds.
///
/// # Errors
///
/// Returns [`ValidationError::TitleEmpty`] or [`ValidationError::TitleTooLong`].
pub fn validate_title(raw: &str) -> Result<String, ValidationError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(ValidationError::TitleEmpty);
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ValidationError::TitleTooLong {
            max: MAX_TITLE_LENGTH,
        });
    }
    Ok(title.to_string())
}

/// Trim a description and check it is within bounds.
///
/// # Errors
///
/// Returns [`ValidationError::DescriptionTooLong`].
pub fn validate_description(raw: &str) -> Result<String, ValidationError> {
    let description = raw.trim();
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(ValidationError::DescriptionTooLong {
            max: MAX_DESCRIPTION_LENGTH,
        });
    }
    Ok(description.to_string())
}
