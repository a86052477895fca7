//! Fibonacci table
//!
//! The sequence used throughout Motif starts at `F[0] = F[1] = 1` (there is no
//! zero term), so every value is a usable positive weight.
//!
//! A process-wide table backs [`fibonacci_at`] and [`fibonacci_range`]. It is
//! seeded from a literal prefix and grows on demand; it never shrinks.

use std::sync::{Mutex, OnceLock, PoisonError};

/// Values known at compile time
const PREFIX: [u64; 24] = [
    1, 1, 2, 3, 5, 8, 13, 21, 34, 55, 89, 144, 233, 377, 610, 987, 1597, 2584, 4181, 6765, 10946,
    17711, 28657, 46368,
];

/// Largest index whose value fits in a `u64`
///
/// Lookups past this index return `u64::MAX`.
pub const MAX_EXACT_INDEX: usize = 92;

/// An index-addressable, lazily extended Fibonacci sequence
#[derive(Clone, Debug)]
pub struct FibonacciTable {
    values: Vec<u64>,
}

impl FibonacciTable {
    /// Create a table seeded with the literal prefix
    pub fn new() -> Self {
        Self {
            values: PREFIX.to_vec(),
        }
    }

    /// Number of values currently materialized
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `index`, extending the table if needed
    pub fn get(&mut self, index: usize) -> u64 {
        if index > MAX_EXACT_INDEX {
            return u64::MAX;
        }
        self.extend_to(index);
        self.values[index]
    }

    /// Value at `index` if it is already materialized
    pub fn peek(&self, index: usize) -> Option<u64> {
        self.values.get(index).copied()
    }

    /// Values for `[start, end)`; empty when `end <= start`
    pub fn range(&mut self, start: usize, end: usize) -> Vec<u64> {
        if end <= start {
            return Vec::new();
        }
        (start..end).map(|index| self.get(index)).collect()
    }

    fn extend_to(&mut self, index: usize) {
        let before = self.values.len();
        while self.values.len() <= index {
            let n = self.values.len();
            let next = self.values[n - 1].saturating_add(self.values[n - 2]);
            self.values.push(next);
        }
        if self.values.len() > before {
            tracing::trace!(
                "FibonacciTable: extended from {} to {} entries",
                before,
                self.values.len()
            );
        }
    }
}

impl Default for FibonacciTable {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Global Table
// ============================================================================

static GLOBAL_TABLE: OnceLock<Mutex<FibonacciTable>> = OnceLock::new();

fn with_table<R>(f: impl FnOnce(&mut FibonacciTable) -> R) -> R {
    let table = GLOBAL_TABLE.get_or_init(|| Mutex::new(FibonacciTable::new()));
    // The table is append-only, so a poisoned lock still holds valid values
    let mut guard = table.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard)
}

fn clamp_index(index: i64) -> usize {
    usize::try_from(index).unwrap_or(0)
}

/// Fibonacci value at a zero-based index
///
/// Negative indices clamp to 0 rather than failing.
pub fn fibonacci_at(index: i64) -> u64 {
    with_table(|table| table.get(clamp_index(index)))
}

/// Fibonacci values for `[start, end)`
///
/// Negative bounds clamp to 0; `end <= start` yields an empty sequence.
pub fn fibonacci_range(start: i64, end: i64) -> Vec<u64> {
    with_table(|table| table.range(clamp_index(start), clamp_index(end)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_values() {
        assert_eq!(fibonacci_at(0), 1);
        assert_eq!(fibonacci_at(1), 1);
        assert_eq!(fibonacci_at(2), 2);
        assert_eq!(fibonacci_at(6), 13);
        assert_eq!(fibonacci_at(23), 46368);
    }

    #[test]
    fn test_negative_index_clamps_to_zero() {
        assert_eq!(fibonacci_at(-1), 1);
        assert_eq!(fibonacci_at(i64::MIN), 1);
    }

    #[test]
    fn test_recurrence_holds_past_prefix() {
        for i in 1..MAX_EXACT_INDEX as i64 {
            assert_eq!(
                fibonacci_at(i + 1),
                fibonacci_at(i) + fibonacci_at(i - 1),
                "recurrence broken at {}",
                i
            );
        }
    }

    #[test]
    fn test_table_extends_and_caches() {
        let mut table = FibonacciTable::new();
        assert_eq!(table.len(), PREFIX.len());
        assert_eq!(table.peek(40), None);

        // F[40] in this indexing is the 41st classic Fibonacci number
        assert_eq!(table.get(40), 165_580_141);
        assert_eq!(table.len(), 41);
        assert_eq!(table.peek(40), Some(165_580_141));

        // Earlier lookups never shrink the table
        table.get(3);
        assert_eq!(table.len(), 41);
    }

    #[test]
    fn test_saturates_past_u64() {
        let mut table = FibonacciTable::new();
        assert_eq!(table.get(MAX_EXACT_INDEX), 12_200_160_415_121_876_738);
        assert_eq!(table.get(MAX_EXACT_INDEX + 1), u64::MAX);
        assert_eq!(table.get(10_000), u64::MAX);
        assert_eq!(table.len(), MAX_EXACT_INDEX + 1);
    }

    #[test]
    fn test_range() {
        assert_eq!(fibonacci_range(2, 7), vec![2, 3, 5, 8, 13]);
        assert_eq!(fibonacci_range(-3, 2), vec![1, 1]);
        assert!(fibonacci_range(5, 5).is_empty());
        assert!(fibonacci_range(7, 2).is_empty());

        let far = fibonacci_range(30, 33);
        assert_eq!(far[2], far[1] + far[0]);
    }
}
