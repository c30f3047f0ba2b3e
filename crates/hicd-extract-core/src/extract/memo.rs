//! Single-entry memoization.

use std::sync::{Arc, Mutex};

struct Entry<T> {
    input: String,
    context: String,
    value: T,
}

/// Remembers the last `(input, context)` pair and its result.
///
/// The entry is replaced as a whole, so a reader sees either the previous
/// entry or the new one. Two callers racing on the same instance both compute;
/// the last writer wins. A poisoned lock is treated as a miss.
pub struct Memo<T> {
    slot: Mutex<Option<Arc<Entry<T>>>>,
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Memo<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    fn current(&self) -> Option<Arc<Entry<T>>> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }

    /// Whether the cached entry is for exactly this pair.
    pub fn contains(&self, input: &str, context: &str) -> bool {
        self.current()
            .is_some_and(|e| e.context == context && e.input == input)
    }

    /// Drop the cached entry.
    pub fn clear(&self) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
    }
}

impl<T: Clone> Memo<T> {
    /// Return the cached value for `(input, context)` or compute and cache it.
    pub fn get_or_compute<F>(&self, input: &str, context: &str, compute: F) -> T
    where
        F: FnOnce() -> T,
    {
        if let Some(entry) = self.current() {
            if entry.context == context && entry.input == input {
                return entry.value.clone();
            }
        }

        let value = compute();
        let entry = Arc::new(Entry {
            input: input.to_string(),
            context: context.to_string(),
            value: value.clone(),
        });
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(entry);
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_hit_skips_compute() {
        let memo = Memo::new();
        let calls = Cell::new(0);
        let run = || {
            calls.set(calls.get() + 1);
            vec![1, 2, 3]
        };
        assert_eq!(memo.get_or_compute("<html>", "ctx", run), vec![1, 2, 3]);
        assert_eq!(memo.get_or_compute("<html>", "ctx", run), vec![1, 2, 3]);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_context_is_part_of_key() {
        let memo = Memo::new();
        memo.get_or_compute("same", "001", || 1);
        assert!(memo.contains("same", "001"));
        assert!(!memo.contains("same", "002"));
        assert_eq!(memo.get_or_compute("same", "002", || 2), 2);
    }

    #[test]
    fn test_holds_one_entry() {
        let memo = Memo::new();
        memo.get_or_compute("a", "", || 1);
        memo.get_or_compute("b", "", || 2);
        assert!(!memo.contains("a", ""));
        assert!(memo.contains("b", ""));
        memo.clear();
        assert!(!memo.contains("b", ""));
    }

    #[test]
    fn test_shared_across_threads() {
        let memo = Arc::new(Memo::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let memo = Arc::clone(&memo);
                std::thread::spawn(move || memo.get_or_compute("x", "", || 7))
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), 7);
        }
    }
}
