use std::fmt::{self, Write};

use super::{RecurrencePattern, validate};
use crate::error::ValidationError;

/// Canonical encoding: frequency letter, sorted unique points, zero-padded time.
///
/// No validation happens here; use [`encode_validated`] on edit paths so
/// invalid patterns never reach storage.
#[must_use]
pub fn encode(pattern: &RecurrencePattern) -> String {
    pattern.to_string()
}

/// Validate, then encode.
///
/// # Errors
/// Returns the [`ValidationError`] reported by [`validate`].
pub fn encode_validated(pattern: &RecurrencePattern) -> Result<String, ValidationError> {
    validate(pattern)?;
    Ok(encode(pattern))
}

pub(super) fn write_canonical(pattern: &RecurrencePattern, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_char(pattern.frequency.code())?;
    f.write_char('#')?;
    for (idx, point) in pattern.points.iter().enumerate() {
        if idx > 0 {
            f.write_char(',')?;
        }
        write!(f, "{point}")?;
    }
    write!(f, "T#{}", pattern.time_of_day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{Frequency, TimeOfDay, decode};

    fn canonical_samples() -> Vec<RecurrencePattern> {
        vec![
            RecurrencePattern::daily(TimeOfDay::new(0, 0)),
            RecurrencePattern::daily(TimeOfDay::new(9, 5)),
            RecurrencePattern::weekly([1, 3], TimeOfDay::new(9, 0)),
            RecurrencePattern::weekly(1..=7, TimeOfDay::new(18, 30)),
            RecurrencePattern::monthly([1, 15, 31], TimeOfDay::new(23, 59)),
            RecurrencePattern::yearly(1..=12, TimeOfDay::new(9, 0)),
        ]
    }

    #[test]
    fn encodes_with_zero_padded_time() {
        let pattern = RecurrencePattern::weekly([5, 1], TimeOfDay::new(7, 3));
        assert_eq!(encode(&pattern), "w#1,5T#07:03");
        assert_eq!(encode(&RecurrencePattern::daily(TimeOfDay::new(21, 0))), "d#T#21:00");
        assert_eq!(
            encode(&RecurrencePattern::yearly(1..=12, TimeOfDay::new(9, 0))),
            "y#1,2,3,4,5,6,7,8,9,10,11,12T#09:00"
        );
    }

    #[test]
    fn decode_inverts_encode() {
        for pattern in canonical_samples() {
            let encoded = encode(&pattern);
            let decoded = decode(&encoded).unwrap_or_else(|err| panic!("{encoded}: {err}"));
            assert_eq!(decoded, pattern);
        }
    }

    #[test]
    fn reencoding_is_idempotent() {
        for pattern in canonical_samples() {
            let once = encode(&pattern);
            let twice = encode(&decode(&once).unwrap_or_else(|err| panic!("{once}: {err}")));
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn non_canonical_input_normalizes() {
        let decoded = decode("m#20,5,5T#08:00").unwrap_or_else(|err| panic!("decode: {err}"));
        assert_eq!(encode(&decoded), "m#5,20T#08:00");
    }

    #[test]
    fn encode_validated_rejects_invalid_patterns() {
        let pattern = RecurrencePattern::new(Frequency::Monthly, [32], TimeOfDay::new(9, 0));
        assert!(encode_validated(&pattern).is_err());
        let ok = RecurrencePattern::monthly([31], TimeOfDay::new(9, 0));
        assert_eq!(encode_validated(&ok).as_deref(), Ok("m#31T#09:00"));
    }
}
