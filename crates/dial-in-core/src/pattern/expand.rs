use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::iter::FusedIterator;
use time::{Date, Duration, Month, OffsetDateTime, Time, UtcOffset};

use super::{Frequency, RecurrencePattern, validate};
use crate::error::{InvalidRangeError, Result};

/// One concrete instant produced by expanding a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Occurrence {
    /// Instant of the occurrence, in the UTC offset of the query window.
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

impl Occurrence {
    /// Calendar date of the occurrence in its own offset.
    #[must_use]
    pub const fn date(&self) -> Date {
        self.at.date()
    }
}

/// Expand `pattern` into the occurrences that fall in `[from, to)`.
///
/// The pattern's wall-clock time is read in the UTC offset of `from`; `to` is
/// compared as an absolute instant. The returned iterator is lazy and holds no
/// shared state: cloning it, or calling `expand` again with the same
/// arguments, yields the same sequence. There is no internal cap on the window
/// size, so callers must bound very large windows themselves.
///
/// # Errors
/// Returns [`PatternError::InvalidRange`](crate::error::PatternError::InvalidRange)
/// when `to <= from`, and
/// [`PatternError::Validation`](crate::error::PatternError::Validation) when
/// the pattern is out of range.
pub fn expand(pattern: &RecurrencePattern, from: OffsetDateTime, to: OffsetDateTime) -> Result<Occurrences> {
    if to <= from {
        return Err(InvalidRangeError { from, to }.into());
    }
    validate(pattern)?;
    let time = pattern.time_of_day.to_time()?;
    Ok(Occurrences {
        frequency: pattern.frequency,
        points: pattern.points.clone(),
        time,
        offset: from.offset(),
        from,
        to,
        cursor: Some(from.date()),
    })
}

/// Lazy, ascending sequence of occurrences. See [`expand`].
#[derive(Debug, Clone)]
pub struct Occurrences {
    frequency: Frequency,
    points: BTreeSet<u32>,
    time: Time,
    offset: UtcOffset,
    from: OffsetDateTime,
    to: OffsetDateTime,
    /// Earliest date not yet examined; `None` once exhausted.
    cursor: Option<Date>,
}

impl Occurrences {
    /// Inclusive start of the window.
    #[must_use]
    pub const fn window_start(&self) -> OffsetDateTime {
        self.from
    }

    /// Exclusive end of the window.
    #[must_use]
    pub const fn window_end(&self) -> OffsetDateTime {
        self.to
    }

    /// First date on or after `cursor` matching the pattern.
    fn next_date(&self, cursor: Date) -> Option<Date> {
        match self.frequency {
            Frequency::Daily => Some(cursor),
            Frequency::Weekly => self.next_weekday(cursor),
            Frequency::Monthly => self.next_month_day(cursor),
            Frequency::Yearly => self.next_month_start(cursor),
        }
    }

    fn next_weekday(&self, cursor: Date) -> Option<Date> {
        (0..7)
            .map_while(|offset| cursor.checked_add(Duration::days(offset)))
            .find(|date| {
                self.points
                    .contains(&u32::from(date.weekday().number_from_monday()))
            })
    }

    fn next_month_day(&self, cursor: Date) -> Option<Date> {
        let (mut year, mut month, mut first_day) = (cursor.year(), cursor.month(), cursor.day());
        // A valid day-of-month point always exists within two consecutive
        // months, so one year of lookahead is plenty.
        for _ in 0..=12 {
            let found = self
                .points
                .range(u32::from(first_day)..)
                .filter_map(|&day| u8::try_from(day).ok())
                .find_map(|day| Date::from_calendar_date(year, month, day).ok());
            if found.is_some() {
                return found;
            }
            if month == Month::December {
                year = year.checked_add(1)?;
            }
            month = month.next();
            first_day = 1;
        }
        None
    }

    fn next_month_start(&self, cursor: Date) -> Option<Date> {
        let mut year = cursor.year();
        for _ in 0..2 {
            let found = self
                .points
                .iter()
                .filter_map(|&month| u8::try_from(month).ok())
                .filter_map(|month| Month::try_from(month).ok())
                .filter_map(|month| Date::from_calendar_date(year, month, 1).ok())
                .find(|date| *date >= cursor);
            if found.is_some() {
                return found;
            }
            year = year.checked_add(1)?;
        }
        None
    }
}

impl Iterator for Occurrences {
    type Item = Occurrence;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let cursor = self.cursor?;
            let Some(date) = self.next_date(cursor) else {
                self.cursor = None;
                return None;
            };
            let at = date.with_time(self.time).assume_offset(self.offset);
            if at >= self.to {
                self.cursor = None;
                return None;
            }
            self.cursor = date.next_day();
            if at >= self.from {
                return Some(Occurrence { at });
            }
        }
    }
}

impl FusedIterator for Occurrences {}
