//! Stored records. References point one way only: child records carry the ids
//! of the records they belong to, never the reverse.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::PatternError;
use crate::id::{CategoryId, EventId, RuleId, TaskId, UserId};
use crate::pattern::{RecurrencePattern, decode};

/// Registered user. Credentials are out of scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Identifier.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Registration time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl User {
    /// New user registered now.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            username: username.into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// User-defined grouping for rules, tasks and events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Identifier.
    pub id: CategoryId,
    /// Owner.
    pub user: UserId,
    /// Display name.
    pub name: String,
    /// Optional free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Recurrence rule; `rate_pattern` holds the canonical encoded pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Identifier.
    pub id: RuleId,
    /// Owner.
    pub user: UserId,
    /// Optional category.
    #[serde(default)]
    pub category: Option<CategoryId>,
    /// Display name, also the title of generated tasks and events.
    pub name: String,
    /// Optional free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Encoded recurrence pattern, e.g. `w#1,3T#09:00`.
    pub rate_pattern: String,
    /// Inactive rules are kept but never expanded into new rows.
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

const fn default_active() -> bool {
    true
}

impl Rule {
    /// Decode the stored pattern.
    ///
    /// # Errors
    /// Returns the decoder's error when the stored string is not a valid pattern.
    pub fn pattern(&self) -> Result<RecurrencePattern, PatternError> {
        decode(&self.rate_pattern)
    }
}

/// To-do item, optionally generated from a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Identifier.
    pub id: TaskId,
    /// Owner.
    pub user: UserId,
    /// Title.
    pub title: String,
    /// Optional free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Optional category.
    #[serde(default)]
    pub category: Option<CategoryId>,
    /// Rule this task was generated from, cleared when the rule is deleted.
    #[serde(default)]
    pub rule: Option<RuleId>,
    /// Completion flag.
    #[serde(default)]
    pub is_completed: bool,
    /// Optional due instant.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub due_date: Option<OffsetDateTime>,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Set while `is_completed` is true.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
}

impl Task {
    /// Mark the task done at `at`.
    pub const fn complete(&mut self, at: OffsetDateTime) {
        self.is_completed = true;
        self.completed_at = Some(at);
    }

    /// Mark the task not done and clear the completion time.
    pub const fn reopen(&mut self) {
        self.is_completed = false;
        self.completed_at = None;
    }
}

/// Calendar entry, optionally generated from a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Identifier.
    pub id: EventId,
    /// Owner.
    pub user: UserId,
    /// Title.
    pub title: String,
    /// Optional free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Optional category.
    #[serde(default)]
    pub category: Option<CategoryId>,
    /// Rule this event was generated from, cleared when the rule is deleted.
    #[serde(default)]
    pub rule: Option<RuleId>,
    /// Start instant.
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    /// Optional end instant.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_time: Option<OffsetDateTime>,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
