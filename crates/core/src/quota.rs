//! Daily free-question quota gate.
//!
//! The counter resets to the configured limit on day rollover and otherwise
//! only decreases, floored at zero. Day comparison uses a coarse calendar-day
//! key from the device-local clock, so a reset happens at most once per
//! distinct day value.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::store::{KeyValueStore, load_quota_state, save_quota_state};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaState {
    pub remaining_questions: u32,
    /// Day on which the counter was last reset to the limit.
    pub last_question_day: NaiveDate,
}

impl QuotaState {
    pub fn fresh(limit: u32, today: NaiveDate) -> Self {
        Self {
            remaining_questions: limit,
            last_question_day: today,
        }
    }
}

/// Reset the counter to `limit` when the stored day differs from `today`,
/// otherwise return the state unchanged. Idempotent.
pub fn normalize(state: QuotaState, today: NaiveDate, limit: u32) -> QuotaState {
    if state.last_question_day != today {
        QuotaState::fresh(limit, today)
    } else {
        state
    }
}

/// Decide whether a question may proceed and return the next state.
///
/// Exempt callers are always allowed and never decrement the counter. The
/// returned state is always normalized against `today`.
pub fn try_consume(
    state: QuotaState,
    today: NaiveDate,
    limit: u32,
    exempt: bool,
) -> (bool, QuotaState) {
    let normalized = normalize(state, today, limit);
    if exempt {
        return (true, normalized);
    }
    if normalized.remaining_questions == 0 {
        return (false, normalized);
    }
    (
        true,
        QuotaState {
            remaining_questions: normalized.remaining_questions - 1,
            last_question_day: normalized.last_question_day,
        },
    )
}

/// Stateful quota ledger over a key-value store.
///
/// Store failures never propagate: reads fall back to a fresh state and
/// writes are fire-and-forget. Quota state is read-modify-write per call and
/// must be accessed by a single writer.
pub struct DailyQuota {
    store: Arc<dyn KeyValueStore>,
    limit: u32,
}

impl DailyQuota {
    pub fn new(store: Arc<dyn KeyValueStore>, limit: u32) -> Self {
        Self { store, limit }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Remaining free questions for `today`, persisting the rollover reset
    /// when normalization changed the stored state.
    pub fn remaining(&self, today: NaiveDate) -> u32 {
        let state = load_quota_state(self.store.as_ref(), self.limit, today);
        let normalized = normalize(state, today, self.limit);
        if normalized != state {
            save_quota_state(self.store.as_ref(), &normalized);
        }
        normalized.remaining_questions
    }

    /// Consume one question for `today` unless the caller is exempt.
    pub fn try_consume(&self, today: NaiveDate, exempt: bool) -> bool {
        let state = load_quota_state(self.store.as_ref(), self.limit, today);
        let (allowed, next) = try_consume(state, today, self.limit, exempt);
        if next != state {
            save_quota_state(self.store.as_ref(), &next);
        }
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError, load_quota_state};

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_normalize_same_day_is_identity() {
        let state = QuotaState {
            remaining_questions: 1,
            last_question_day: day("2026-08-27"),
        };
        assert_eq!(normalize(state, day("2026-08-27"), 3), state);
    }

    #[test]
    fn test_normalize_rollover_resets_to_limit() {
        let state = QuotaState {
            remaining_questions: 0,
            last_question_day: day("2026-08-26"),
        };
        let normalized = normalize(state, day("2026-08-27"), 3);
        assert_eq!(normalized, QuotaState::fresh(3, day("2026-08-27")));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let state = QuotaState {
            remaining_questions: 2,
            last_question_day: day("2026-08-20"),
        };
        let today = day("2026-08-27");
        let once = normalize(state, today, 3);
        assert_eq!(normalize(once, today, 3), once);
    }

    #[test]
    fn test_try_consume_decrements_until_exhausted() {
        let today = day("2026-08-27");
        let mut state = QuotaState::fresh(3, today);
        let mut allowed_sequence = Vec::new();
        for _ in 0..4 {
            let (allowed, next) = try_consume(state, today, 3, false);
            allowed_sequence.push(allowed);
            state = next;
        }
        assert_eq!(allowed_sequence, [true, true, true, false]);
        assert_eq!(state.remaining_questions, 0);
    }

    #[test]
    fn test_try_consume_exempt_never_decrements() {
        let today = day("2026-08-27");
        let state = QuotaState {
            remaining_questions: 0,
            last_question_day: today,
        };
        let (allowed, next) = try_consume(state, today, 3, true);
        assert!(allowed);
        assert_eq!(next, state);
    }

    #[test]
    fn test_try_consume_resets_exhausted_state_on_new_day() {
        let state = QuotaState {
            remaining_questions: 0,
            last_question_day: day("2026-08-26"),
        };
        let (allowed, next) = try_consume(state, day("2026-08-27"), 3, false);
        assert!(allowed);
        assert_eq!(next.remaining_questions, 2);
        assert_eq!(next.last_question_day, day("2026-08-27"));
    }

    #[test]
    fn test_ledger_persists_consumption() {
        let store = Arc::new(MemoryStore::new());
        let quota = DailyQuota::new(store.clone(), 3);
        let today = day("2026-08-27");

        assert_eq!(quota.remaining(today), 3);
        assert!(quota.try_consume(today, false));
        assert_eq!(quota.remaining(today), 2);

        let stored = load_quota_state(store.as_ref(), 3, today);
        assert_eq!(stored.remaining_questions, 2);
    }

    #[test]
    fn test_ledger_persists_rollover_on_read() {
        let store = Arc::new(MemoryStore::new());
        let quota = DailyQuota::new(store.clone(), 3);
        assert!(quota.try_consume(day("2026-08-26"), false));

        assert_eq!(quota.remaining(day("2026-08-27")), 3);
        let stored = load_quota_state(store.as_ref(), 3, day("2026-08-28"));
        assert_eq!(stored.last_question_day, day("2026-08-27"));
    }

    #[test]
    fn test_ledger_exempt_leaves_store_untouched() {
        let store = Arc::new(MemoryStore::new());
        let quota = DailyQuota::new(store.clone(), 3);
        let today = day("2026-08-27");
        quota.try_consume(today, false);

        assert!(quota.try_consume(today, true));
        assert_eq!(quota.remaining(today), 2);
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::IO(std::io::Error::other("disk on fire")))
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::IO(std::io::Error::other("disk on fire")))
        }
        fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::IO(std::io::Error::other("disk on fire")))
        }
    }

    #[test]
    fn test_ledger_recovers_from_store_failures() {
        let quota = DailyQuota::new(Arc::new(FailingStore), 3);
        let today = day("2026-08-27");

        // Reads fall back to a fresh state, writes are swallowed.
        assert_eq!(quota.remaining(today), 3);
        assert!(quota.try_consume(today, false));
        assert_eq!(quota.remaining(today), 3);
    }
}
