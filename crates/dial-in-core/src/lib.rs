//! Domain types and the recurrence rule engine for dial-in.
//!
//! The engine lives in [`pattern`]: [`decode`], [`validate`], [`encode`] and
//! [`expand`] are pure functions over [`RecurrencePattern`] with no shared
//! state, so they can be called concurrently from any number of threads.

/// Engine error types.
pub mod error;
/// Identifier types.
pub mod id;
pub mod pattern;
pub mod record;

pub use error::{InvalidRangeError, MalformedPatternError, PatternError, ValidationError};
pub use pattern::{
    Frequency, Occurrence, Occurrences, RecurrencePattern, TimeOfDay, decode, encode,
    encode_validated, expand, validate,
};
pub use record::{Category, Event, Rule, Task, User};

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn engine_types_are_thread_safe() {
        assert_send_sync::<RecurrencePattern>();
        assert_send_sync::<Occurrences>();
        assert_send_sync::<PatternError>();
    }

    #[test]
    fn concurrent_expansion_is_deterministic() {
        let pattern = decode("w#1,3,5T#09:00").unwrap_or_else(|err| panic!("decode: {err}"));
        let from = datetime!(2024-01-01 0:00 UTC);
        let to = datetime!(2024-07-01 0:00 UTC);
        let expected: Vec<_> = expand(&pattern, from, to)
            .unwrap_or_else(|err| panic!("expand: {err}"))
            .collect();

        let pattern = &pattern;
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(move || {
                        expand(pattern, from, to)
                            .unwrap_or_else(|err| panic!("expand: {err}"))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            for handle in handles {
                let got = handle.join().unwrap_or_else(|_| panic!("worker panicked"));
                assert_eq!(got, expected);
            }
        });
    }
}
