//! Memoized pattern decoding per rule.

use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

use dial_in_core::id::RuleId;
use dial_in_core::{PatternError, RecurrencePattern, Rule};
use lru::LruCache;
use tracing::debug;

const PATTERN_CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(256) {
    Some(capacity) => capacity,
    None => NonZeroUsize::MIN,
};

/// Decoded patterns keyed by rule. Entries are checked against the rule's
/// current `rate_pattern`, so an edited rule is re-decoded on next use.
#[derive(Debug)]
pub struct PatternCache {
    entries: Mutex<LruCache<RuleId, (String, RecurrencePattern)>>,
}

impl Default for PatternCache {
    fn default() -> Self {
        Self::new(PATTERN_CACHE_CAPACITY)
    }
}

impl PatternCache {
    /// Empty cache holding at most `capacity` rules.
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Decoded pattern of `rule`, decoding and caching on a miss.
    ///
    /// # Errors
    /// Returns the decoder's error when the stored string is not a valid pattern.
    pub fn pattern(&self, rule: &Rule) -> Result<RecurrencePattern, PatternError> {
        {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some((raw, pattern)) = entries.get(&rule.id)
                && *raw == rule.rate_pattern
            {
                debug!(rule = %rule.id, "pattern cache hit");
                return Ok(pattern.clone());
            }
        }

        debug!(rule = %rule.id, rate_pattern = %rule.rate_pattern, "pattern cache miss");
        let pattern = rule.pattern()?;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(rule.id, (rule.rate_pattern.clone(), pattern.clone()));
        Ok(pattern)
    }

    /// Drop the cached entry for `rule`.
    pub fn forget(&self, rule: RuleId) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop(&rule);
    }

    /// Number of cached rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
