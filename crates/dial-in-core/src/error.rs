//! Error types for the rule pattern engine.

use thiserror::Error;
use time::OffsetDateTime;

use crate::pattern::Frequency;

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, PatternError>;

/// The encoded string does not follow the pattern grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedPatternError {
    /// The string does not split into exactly three `#`-delimited segments.
    #[error("expected 3 '#'-delimited segments, found {found}")]
    SegmentCount {
        /// Number of segments actually present.
        found: usize,
    },

    /// The first segment is not one of `d`, `w`, `m`, `y`.
    #[error("unknown frequency code '{token}'")]
    UnknownFrequency {
        /// Offending first segment.
        token: String,
    },

    /// The points segment is not terminated by the `T` marker.
    #[error("points segment '{token}' is missing the trailing 'T' marker")]
    MissingTimeMarker {
        /// Offending second segment.
        token: String,
    },

    /// A daily pattern carries a points list.
    #[error("daily patterns take no points, found '{token}'")]
    UnexpectedPoints {
        /// Offending points list.
        token: String,
    },

    /// A point token is not an unsigned integer.
    #[error("point '{token}' is not an integer")]
    InvalidPoint {
        /// Offending point token.
        token: String,
    },

    /// The time segment is not zero-padded `HH:MM`.
    #[error("time '{token}' is not in HH:MM form")]
    InvalidTime {
        /// Offending time segment.
        token: String,
    },
}

/// The pattern is well formed but carries out-of-range values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A point lies outside the range allowed for the frequency.
    #[error("point {point} is out of range {min}..={max} for {frequency} patterns")]
    PointOutOfRange {
        /// Frequency whose unit defines the range.
        frequency: Frequency,
        /// Offending point.
        point: u32,
        /// Smallest allowed value.
        min: u32,
        /// Largest allowed value.
        max: u32,
    },

    /// Weekly, monthly and yearly patterns need at least one point.
    #[error("{frequency} patterns need at least one point")]
    MissingPoints {
        /// Frequency lacking points.
        frequency: Frequency,
    },

    /// Daily patterns must not carry points.
    #[error("daily patterns take no points")]
    UnexpectedPoints,

    /// Hour outside 0..=23.
    #[error("hour {hour} is out of range 0..=23")]
    HourOutOfRange {
        /// Offending hour.
        hour: u8,
    },

    /// Minute outside 0..=59.
    #[error("minute {minute} is out of range 0..=59")]
    MinuteOutOfRange {
        /// Offending minute.
        minute: u8,
    },
}

/// The expansion window is empty or inverted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid window: end {to} is not after start {from}")]
pub struct InvalidRangeError {
    /// Inclusive start of the rejected window.
    pub from: OffsetDateTime,
    /// Exclusive end of the rejected window.
    pub to: OffsetDateTime,
}

/// Any failure reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// Grammar violation.
    #[error("malformed pattern: {0}")]
    Malformed(#[from] MalformedPatternError),

    /// Out-of-range value in an otherwise well-formed pattern.
    #[error("invalid pattern: {0}")]
    Validation(#[from] ValidationError),

    /// Malformed expansion window.
    #[error(transparent)]
    InvalidRange(#[from] InvalidRangeError),
}
