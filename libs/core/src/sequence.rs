use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier carried in `echo.seq` to match a reply with its call.
pub type CorrelationId = u64;

/// Exclusive upper bound for generated identifiers. Keeps every id inside
/// the signed 64-bit range so any peer can decode it as a JSON integer.
pub const DEFAULT_WRAP_BOUND: CorrelationId = i64::MAX as CorrelationId;

/// Hands out increasing correlation ids, starting at 1 and wrapping back to 1
/// (never 0) once the bound is reached.
#[derive(Debug)]
pub struct SequenceGenerator {
    next: AtomicU64,
    bound: CorrelationId,
}

impl SequenceGenerator {
    pub fn new() -> Self {
        Self::with_bound(DEFAULT_WRAP_BOUND)
    }

    /// Generator wrapping at `bound`. Bounds below 2 are raised to 2.
    pub fn with_bound(bound: CorrelationId) -> Self {
        Self::starting_at(1, bound)
    }

    pub fn starting_at(first: CorrelationId, bound: CorrelationId) -> Self {
        let bound = bound.max(2);
        let first = if first == 0 || first >= bound { 1 } else { first };
        Self {
            next: AtomicU64::new(first),
            bound,
        }
    }

    /// Returns the current value and advances the counter.
    pub fn next(&self) -> CorrelationId {
        let bound = self.bound;
        // fetch_update hands back the previous value, which is the one we issue.
        self.next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                Some(if current + 1 >= bound { 1 } else { current + 1 })
            })
            .unwrap_or_else(|current| current)
    }
}

impl Default for SequenceGenerator {
    fn default() -> Self {
        Self::new()
    }
}
