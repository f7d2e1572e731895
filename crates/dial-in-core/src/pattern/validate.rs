use super::{Frequency, RecurrencePattern, TimeOfDay};
use crate::error::ValidationError;

/// Check that every value in `pattern` is in range for its unit.
///
/// # Errors
/// Returns the first [`ValidationError`] found: points are checked in
/// ascending order before the time of day.
pub fn validate(pattern: &RecurrencePattern) -> Result<(), ValidationError> {
    check_points(pattern)?;
    check_time(pattern.time_of_day)
}

fn check_points(pattern: &RecurrencePattern) -> Result<(), ValidationError> {
    let frequency = pattern.frequency;
    let Some((min, max)) = frequency.point_range() else {
        return if pattern.points.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::UnexpectedPoints)
        };
    };
    if pattern.points.is_empty() {
        return Err(ValidationError::MissingPoints { frequency });
    }
    match pattern
        .points
        .iter()
        .find(|point| !(min..=max).contains(*point))
    {
        Some(&point) => Err(ValidationError::PointOutOfRange {
            frequency,
            point,
            min,
            max,
        }),
        None => Ok(()),
    }
}

pub(super) const fn check_time(time: TimeOfDay) -> Result<(), ValidationError> {
    if time.hour > 23 {
        return Err(ValidationError::HourOutOfRange { hour: time.hour });
    }
    if time.minute > 59 {
        return Err(ValidationError::MinuteOutOfRange {
            minute: time.minute,
        });
    }
    Ok(())
}
