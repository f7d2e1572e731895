//! Service failures and their classification.

use std::fmt;

use dial_in_core::{InvalidRangeError, PatternError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Record tables addressable by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Account owning every other record.
    User,
    /// Grouping label.
    Category,
    /// Recurrence rule with a rate pattern.
    Rule,
    /// To-do item, optionally generated from a rule.
    Task,
    /// Calendar entry, optionally generated from a rule.
    Event,
}

impl RecordKind {
    /// Lowercase name used in messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Category => "category",
            Self::Rule => "rule",
            Self::Task => "task",
            Self::Event => "event",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures raised by [`PlannerService`](crate::PlannerService) and [`PatternApi`](crate::PatternApi).
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or invalid pattern, or an inverted window.
    #[error(transparent)]
    Pattern(#[from] PatternError),
    /// Window longer than `max_window_days`.
    #[error("window of {days} days exceeds the configured maximum of {max_days} days")]
    WindowTooLarge {
        /// Requested length, rounded up to whole days.
        days: i64,
        /// Configured bound.
        max_days: u32,
    },
    /// Generation would exceed `max_occurrences`; nothing was written.
    #[error("window produces more than {max} occurrences")]
    TooManyOccurrences {
        /// Configured bound.
        max: usize,
    },
    /// Unknown id, or a record owned by another user.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Table that was searched.
        kind: RecordKind,
        /// Id as given by the caller.
        id: String,
    },
    /// Another user registered the name first.
    #[error("username '{username}' is already taken")]
    UsernameTaken {
        /// Trimmed name that collided.
        username: String,
    },
    /// Required text input was blank after trimming.
    #[error("{field} must not be empty")]
    EmptyField {
        /// Offending input field.
        field: &'static str,
    },
    /// Generation was requested for a paused rule.
    #[error("rule {id} is inactive")]
    InactiveRule {
        /// Rule id.
        id: String,
    },
    /// Loading or saving the dataset failed.
    #[error(transparent)]
    Store(anyhow::Error),
}

impl From<InvalidRangeError> for ServiceError {
    fn from(err: InvalidRangeError) -> Self {
        Self::Pattern(err.into())
    }
}

impl ServiceError {
    pub(crate) fn store(err: impl Into<anyhow::Error>) -> Self {
        Self::Store(err.into())
    }

    pub(crate) fn not_found(kind: RecordKind, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Classification used by API surfaces.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Pattern(PatternError::Malformed(_)) => FailureKind::Malformed,
            Self::Pattern(PatternError::Validation(_)) => FailureKind::Invalid,
            Self::Pattern(PatternError::InvalidRange(_)) => FailureKind::InvalidRange,
            Self::WindowTooLarge { .. } | Self::TooManyOccurrences { .. } => FailureKind::LimitExceeded,
            Self::NotFound { .. } => FailureKind::NotFound,
            Self::UsernameTaken { .. } => FailureKind::Conflict,
            Self::EmptyField { .. } | Self::InactiveRule { .. } => FailureKind::BadRequest,
            Self::Store(_) => FailureKind::Internal,
        }
    }
}

/// Coarse failure category with an HTTP-style status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Pattern string does not follow the grammar.
    Malformed,
    /// Well-formed pattern with out-of-range values.
    Invalid,
    /// Window end not after its start.
    InvalidRange,
    /// Other rejected input.
    BadRequest,
    /// Configured expansion bound exceeded.
    LimitExceeded,
    /// Unknown or foreign record.
    NotFound,
    /// Duplicate username.
    Conflict,
    /// Storage failure.
    Internal,
}

impl FailureKind {
    /// Status code an HTTP front end would answer with.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::Malformed | Self::Invalid | Self::InvalidRange | Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::LimitExceeded => 422,
            Self::Internal => 500,
        }
    }
}
