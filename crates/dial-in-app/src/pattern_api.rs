//! Typed request/response layer over the pattern engine.
//!
//! Every operation returns a response enum instead of a `Result`, so callers
//! can serialize successes and failures the same way. Failures carry a
//! [`FailureKind`] whose status code follows the usual HTTP conventions.

use dial_in_core::{
    Frequency, Occurrence, PatternError, RecurrencePattern, TimeOfDay, decode, encode_validated,
    expand, validate,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::debug;

use crate::config::ExpansionConfig;
use crate::error::{FailureKind, ServiceError};
use crate::window::Window;

/// Failure payload shared by every response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternFailure {
    /// Failure category.
    pub kind: FailureKind,
    /// Status code derived from `kind`.
    pub code: u16,
    /// Human readable reason.
    pub message: String,
}

impl From<ServiceError> for PatternFailure {
    fn from(err: ServiceError) -> Self {
        let kind = err.kind();
        Self {
            kind,
            code: kind.status_code(),
            message: err.to_string(),
        }
    }
}

/// Structured view of a decoded pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternView {
    /// Repetition unit.
    pub frequency: Frequency,
    /// Ascending, de-duplicated points; empty for daily patterns.
    pub points: Vec<u32>,
    /// Time of day as `HH:MM`.
    pub time: String,
    /// Canonical encoding.
    pub canonical: String,
}

impl From<&RecurrencePattern> for PatternView {
    fn from(pattern: &RecurrencePattern) -> Self {
        Self {
            frequency: pattern.frequency,
            points: pattern.points.iter().copied().collect(),
            time: pattern.time_of_day.to_string(),
            canonical: pattern.to_string(),
        }
    }
}

/// Decode a pattern string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeRequest {
    /// Pattern to decode.
    pub pattern: String,
}

/// Answer to a [`DecodeRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DecodeResponse {
    /// Structured pattern.
    Ok(PatternView),
    /// Why decoding failed.
    Failed(PatternFailure),
}

/// Build a pattern string from its parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeRequest {
    /// Repetition unit.
    pub frequency: Frequency,
    /// Weekdays, month days or months; omitted for daily patterns.
    #[serde(default)]
    pub points: Vec<u32>,
    /// Hour, 0 to 23.
    pub hour: u8,
    /// Minute, 0 to 59.
    pub minute: u8,
}

/// Answer to an [`EncodeRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EncodeResponse {
    /// Canonical pattern string.
    Ok {
        /// Encoded pattern.
        pattern: String,
    },
    /// Why the parts were rejected.
    Failed(PatternFailure),
}

/// Check a pattern string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateRequest {
    /// Pattern to check.
    pub pattern: String,
}

/// Answer to a [`ValidateRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidateResponse {
    /// The pattern is valid.
    Ok {
        /// Canonical form of the input.
        canonical: String,
    },
    /// First problem found.
    Failed(PatternFailure),
}

/// List occurrences of a pattern in `[from, to)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandRequest {
    /// Pattern to expand.
    pub pattern: String,
    /// Inclusive start; its offset is the pattern's time zone.
    #[serde(with = "time::serde::rfc3339")]
    pub from: OffsetDateTime,
    /// Exclusive end.
    #[serde(with = "time::serde::rfc3339")]
    pub to: OffsetDateTime,
    /// Optional cap below the configured `max_occurrences`.
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Occurrences of one expansion, cut at the effective limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expansion {
    /// Occurrences in ascending order.
    pub occurrences: Vec<Occurrence>,
    /// More occurrences exist in the window than were returned.
    pub truncated: bool,
}

/// Answer to an [`ExpandRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExpandResponse {
    /// Occurrences found.
    Ok(Expansion),
    /// Bad pattern, inverted window or window over the bound.
    Failed(PatternFailure),
}

/// Stateless facade applying configured bounds to engine calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternApi {
    bounds: ExpansionConfig,
}

impl PatternApi {
    /// Facade enforcing `bounds` on every expansion.
    #[must_use]
    pub const fn new(bounds: ExpansionConfig) -> Self {
        Self { bounds }
    }

    /// Decode and validate `request.pattern`.
    #[must_use]
    pub fn decode(&self, request: &DecodeRequest) -> DecodeResponse {
        match decode(&request.pattern) {
            Ok(pattern) => DecodeResponse::Ok(PatternView::from(&pattern)),
            Err(err) => DecodeResponse::Failed(ServiceError::from(err).into()),
        }
    }

    /// Validate the parts and render them canonically.
    #[must_use]
    pub fn encode(&self, request: &EncodeRequest) -> EncodeResponse {
        let pattern = RecurrencePattern::new(
            request.frequency,
            request.points.iter().copied(),
            TimeOfDay::new(request.hour, request.minute),
        );
        match encode_validated(&pattern) {
            Ok(pattern) => EncodeResponse::Ok { pattern },
            Err(err) => EncodeResponse::Failed(ServiceError::from(PatternError::from(err)).into()),
        }
    }

    /// Decoding already validates, so this only differs from
    /// [`decode`](Self::decode) in its response shape.
    #[must_use]
    pub fn validate(&self, request: &ValidateRequest) -> ValidateResponse {
        let checked = decode(&request.pattern).and_then(|pattern| {
            validate(&pattern)?;
            Ok(pattern)
        });
        match checked {
            Ok(pattern) => ValidateResponse::Ok {
                canonical: pattern.to_string(),
            },
            Err(err) => ValidateResponse::Failed(ServiceError::from(err).into()),
        }
    }

    /// Expand within the configured window and occurrence bounds; extra
    /// occurrences set `truncated` instead of failing.
    #[must_use]
    pub fn expand(&self, request: &ExpandRequest) -> ExpandResponse {
        match self.try_expand(request) {
            Ok(expansion) => ExpandResponse::Ok(expansion),
            Err(err) => ExpandResponse::Failed(err.into()),
        }
    }

    fn try_expand(&self, request: &ExpandRequest) -> Result<Expansion, ServiceError> {
        let window = Window::new(request.from, request.to)?;
        check_window(&window, &self.bounds)?;
        let pattern = decode(&request.pattern)?;
        let limit = request
            .limit
            .map_or(self.bounds.max_occurrences, |limit| limit.min(self.bounds.max_occurrences));
        debug!(pattern = %pattern, from = %window.from, to = %window.to, limit, "expanding pattern");

        let mut occurrences = expand(&pattern, window.from, window.to)?;
        let collected: Vec<Occurrence> = occurrences.by_ref().take(limit).collect();
        let truncated = occurrences.next().is_some();
        Ok(Expansion {
            occurrences: collected,
            truncated,
        })
    }
}

/// Reject windows longer than the configured maximum.
pub(crate) fn check_window(window: &Window, bounds: &ExpansionConfig) -> Result<(), ServiceError> {
    if window.fits(bounds) {
        return Ok(());
    }
    Err(ServiceError::WindowTooLarge {
        days: window.days(),
        max_days: bounds.max_window_days,
    })
}
