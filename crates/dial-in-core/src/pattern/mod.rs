//! Rule pattern engine: the `rate_pattern` grammar and its expansion.
//!
//! A rate pattern is a compact ASCII string such as `w#1,3T#09:00`
//! ("Mondays and Wednesdays at 09:00"). It has three `#`-delimited segments:
//! a frequency letter, a comma-separated point list terminated by `T`, and a
//! zero-padded 24-hour time.

mod decode;
mod encode;
mod expand;
mod validate;

pub use decode::decode;
pub use encode::{encode, encode_validated};
pub use expand::{Occurrence, Occurrences, expand};
pub use validate::validate;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::PatternError;

/// Recurrence unit selected by the first pattern segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    /// Every day; takes no points.
    Daily,
    /// Points are ISO weekdays, 1 = Monday through 7 = Sunday.
    Weekly,
    /// Points are days of the month, 1 through 31.
    Monthly,
    /// Points are months of the year, 1 through 12. Occurrences fall on day 1.
    Yearly,
}

impl Frequency {
    /// Single-letter wire code.
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::Daily => 'd',
            Self::Weekly => 'w',
            Self::Monthly => 'm',
            Self::Yearly => 'y',
        }
    }

    /// Parse a wire code. Codes are case-sensitive.
    #[must_use]
    pub const fn from_code(code: char) -> Option<Self> {
        match code {
            'd' => Some(Self::Daily),
            'w' => Some(Self::Weekly),
            'm' => Some(Self::Monthly),
            'y' => Some(Self::Yearly),
            _ => None,
        }
    }

    /// Inclusive range allowed for points, `None` when the unit takes no points.
    #[must_use]
    pub const fn point_range(self) -> Option<(u32, u32)> {
        match self {
            Self::Daily => None,
            Self::Weekly => Some((1, 7)),
            Self::Monthly => Some((1, 31)),
            Self::Yearly => Some((1, 12)),
        }
    }

    /// Lowercase name used in messages and configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wall-clock time of day an occurrence fires at.
///
/// Fields are public so out-of-range values can be represented and rejected by
/// [`validate`] instead of being unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeOfDay {
    /// Hour, 0 through 23.
    pub hour: u8,
    /// Minute, 0 through 59.
    pub minute: u8,
}

impl TimeOfDay {
    /// Build a time of day. Range checks happen in [`validate`].
    #[must_use]
    pub const fn new(hour: u8, minute: u8) -> Self {
        Self { hour, minute }
    }

    pub(crate) fn to_time(self) -> Result<time::Time, crate::error::ValidationError> {
        validate::check_time(self)?;
        time::Time::from_hms(self.hour, self.minute, 0)
            .map_err(|_| crate::error::ValidationError::HourOutOfRange { hour: self.hour })
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Decoded, structured form of a rate pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecurrencePattern {
    /// Recurrence unit.
    pub frequency: Frequency,
    /// Sorted, de-duplicated points; meaning depends on [`Frequency`].
    pub points: BTreeSet<u32>,
    /// Time every occurrence fires at.
    pub time_of_day: TimeOfDay,
}

impl RecurrencePattern {
    /// Build a pattern from parts. Duplicate points collapse.
    pub fn new(
        frequency: Frequency,
        points: impl IntoIterator<Item = u32>,
        time_of_day: TimeOfDay,
    ) -> Self {
        Self {
            frequency,
            points: points.into_iter().collect(),
            time_of_day,
        }
    }

    /// Every day at `time_of_day`.
    #[must_use]
    pub const fn daily(time_of_day: TimeOfDay) -> Self {
        Self {
            frequency: Frequency::Daily,
            points: BTreeSet::new(),
            time_of_day,
        }
    }

    /// On the given ISO weekdays (1 = Monday).
    pub fn weekly(weekdays: impl IntoIterator<Item = u32>, time_of_day: TimeOfDay) -> Self {
        Self::new(Frequency::Weekly, weekdays, time_of_day)
    }

    /// On the given days of the month.
    pub fn monthly(days: impl IntoIterator<Item = u32>, time_of_day: TimeOfDay) -> Self {
        Self::new(Frequency::Monthly, days, time_of_day)
    }

    /// On day 1 of the given months.
    pub fn yearly(months: impl IntoIterator<Item = u32>, time_of_day: TimeOfDay) -> Self {
        Self::new(Frequency::Yearly, months, time_of_day)
    }
}

impl fmt::Display for RecurrencePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        encode::write_canonical(self, f)
    }
}

impl FromStr for RecurrencePattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s)
    }
}

impl Serialize for RecurrencePattern {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RecurrencePattern {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
