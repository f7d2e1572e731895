//! Query windows and timestamp parsing.

use dial_in_core::InvalidRangeError;
use thiserror::Error;
use time::{Duration, OffsetDateTime, format_description::well_known::Rfc3339};

use crate::config::ExpansionConfig;

/// Error returned while turning user-facing strings into a [`Window`].
#[derive(Debug, Error)]
pub enum WindowError {
    /// A bound is not RFC3339.
    #[error("invalid {field} timestamp: {source}")]
    InvalidTimestamp {
        /// `from` or `to`.
        field: &'static str,
        /// Parser failure.
        #[source]
        source: time::error::Parse,
    },
    /// `to` is not after `from`.
    #[error(transparent)]
    InvalidRange(#[from] InvalidRangeError),
}

/// Half-open query window `[from, to)`.
///
/// Offsets are preserved: the offset of `from` decides how wall-clock pattern
/// times are read during expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Inclusive start.
    pub from: OffsetDateTime,
    /// Exclusive end.
    pub to: OffsetDateTime,
}

impl Window {
    /// Build a window, rejecting empty or inverted ranges.
    ///
    /// # Errors
    /// Returns [`InvalidRangeError`] when `to <= from`.
    pub fn new(from: OffsetDateTime, to: OffsetDateTime) -> Result<Self, InvalidRangeError> {
        if to <= from {
            return Err(InvalidRangeError { from, to });
        }
        Ok(Self { from, to })
    }

    /// Parse both bounds from RFC3339 strings.
    ///
    /// # Errors
    /// Returns an error if either timestamp fails to parse or the range is empty.
    pub fn parse(from: &str, to: &str) -> Result<Self, WindowError> {
        let from = parse_field("from", from)?;
        let to = parse_field("to", to)?;
        Ok(Self::new(from, to)?)
    }

    /// Length of the window.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.to - self.from
    }

    /// Whole days covered, rounded up.
    #[must_use]
    pub fn days(&self) -> i64 {
        let duration = self.duration();
        let whole = duration.whole_days();
        if duration > Duration::days(whole) { whole + 1 } else { whole }
    }

    /// Whether the window fits inside the configured bound.
    #[must_use]
    pub fn fits(&self, bounds: &ExpansionConfig) -> bool {
        self.duration() <= bounds.max_window()
    }
}

/// Parse an RFC3339 timestamp string.
///
/// # Errors
/// Returns an error if the string does not conform to RFC3339.
pub fn parse_timestamp(s: &str) -> Result<OffsetDateTime, time::error::Parse> {
    OffsetDateTime::parse(s.trim(), &Rfc3339)
}

fn parse_field(field: &'static str, raw: &str) -> Result<OffsetDateTime, WindowError> {
    parse_timestamp(raw).map_err(|source| WindowError::InvalidTimestamp { field, source })
}
