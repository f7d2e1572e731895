use std::collections::BTreeSet;

use super::{Frequency, RecurrencePattern, TimeOfDay, validate};
use crate::error::{MalformedPatternError, Result};

const SEGMENT_DELIMITER: char = '#';
const POINT_DELIMITER: char = ',';
const TIME_MARKER: char = 'T';

/// Decode a rate pattern string and validate the result.
///
/// Points are de-duplicated and sorted ascending.
///
/// # Errors
/// Returns [`PatternError::Malformed`](crate::error::PatternError::Malformed) on
/// grammar violations and
/// [`PatternError::Validation`](crate::error::PatternError::Validation) when a
/// point, hour or minute is out of range.
pub fn decode(input: &str) -> Result<RecurrencePattern> {
    let segments: Vec<&str> = input.split(SEGMENT_DELIMITER).collect();
    let [freq, points, time] = segments.as_slice() else {
        return Err(MalformedPatternError::SegmentCount {
            found: segments.len(),
        }
        .into());
    };

    let frequency = parse_frequency(freq)?;
    let points_raw = points
        .strip_suffix(TIME_MARKER)
        .ok_or_else(|| MalformedPatternError::MissingTimeMarker {
            token: (*points).to_owned(),
        })?;
    let points = parse_points(frequency, points_raw)?;
    let time_of_day = parse_time(time)?;

    let pattern = RecurrencePattern {
        frequency,
        points,
        time_of_day,
    };
    validate(&pattern)?;
    Ok(pattern)
}

fn parse_frequency(segment: &str) -> std::result::Result<Frequency, MalformedPatternError> {
    let mut chars = segment.chars();
    let frequency = match (chars.next(), chars.next()) {
        (Some(code), None) => Frequency::from_code(code),
        _ => None,
    };
    frequency.ok_or_else(|| MalformedPatternError::UnknownFrequency {
        token: segment.to_owned(),
    })
}

fn parse_points(
    frequency: Frequency,
    raw: &str,
) -> std::result::Result<BTreeSet<u32>, MalformedPatternError> {
    if raw.is_empty() {
        return Ok(BTreeSet::new());
    }
    if frequency == Frequency::Daily {
        return Err(MalformedPatternError::UnexpectedPoints {
            token: raw.to_owned(),
        });
    }
    raw.split(POINT_DELIMITER).map(parse_point).collect()
}

fn parse_point(token: &str) -> std::result::Result<u32, MalformedPatternError> {
    // `u32::from_str` accepts a leading '+', which the wire format does not.
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MalformedPatternError::InvalidPoint {
            token: token.to_owned(),
        });
    }
    token.parse().map_err(|_| MalformedPatternError::InvalidPoint {
        token: token.to_owned(),
    })
}

fn parse_time(segment: &str) -> std::result::Result<TimeOfDay, MalformedPatternError> {
    let invalid = || MalformedPatternError::InvalidTime {
        token: segment.to_owned(),
    };
    let bytes = segment.as_bytes();
    let [h1, h2, b':', m1, m2] = bytes else {
        return Err(invalid());
    };
    let digit = |b: u8| b.is_ascii_digit().then(|| b - b'0');
    let hour = digit(*h1).zip(digit(*h2)).map(|(t, o)| t * 10 + o);
    let minute = digit(*m1).zip(digit(*m2)).map(|(t, o)| t * 10 + o);
    match (hour, minute) {
        (Some(hour), Some(minute)) => Ok(TimeOfDay { hour, minute }),
        _ => Err(invalid()),
    }
}
