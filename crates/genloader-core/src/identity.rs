use std::sync::atomic::{AtomicI32, Ordering};

/// Source of `empno` values shared by every loader in the process.
///
/// Starts at zero and hands out `1, 2, 3, ...`. Callers share one instance
/// through an `Arc`; it is never reset.
#[derive(Debug, Default)]
pub struct IdentitySequence {
    current: AtomicI32,
}

impl IdentitySequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment and return the new value, or `None` once `i32::MAX` has
    /// been handed out. An exhausted sequence stays exhausted.
    pub fn next(&self) -> Option<i32> {
        self.current
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |value| {
                value.checked_add(1)
            })
            .ok()
            .map(|previous| previous + 1)
    }

    #[cfg(test)]
    pub(crate) fn starting_after(value: i32) -> Self {
        Self {
            current: AtomicI32::new(value),
        }
    }

    /// Last value handed out, `0` if none yet.
    pub fn current(&self) -> i32 {
        self.current.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn starts_at_one_and_steps_by_one() {
        let seq = IdentitySequence::new();
        assert_eq!(seq.current(), 0);
        assert_eq!(seq.next(), Some(1));
        assert_eq!(seq.next(), Some(2));
        assert_eq!(seq.current(), 2);
    }

    #[test]
    fn concurrent_increments_never_repeat() {
        let seq = Arc::new(IdentitySequence::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let seq = Arc::clone(&seq);
                thread::spawn(move || (0..1_000).filter_map(|_| seq.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for value in handle.join().expect("worker thread panicked") {
                assert!(seen.insert(value), "duplicate identity {value}");
            }
        }
        assert_eq!(seen.len(), 8_000);
        assert_eq!(seq.current(), 8_000);
    }

    #[test]
    fn exhausts_at_i32_max_without_wrapping() {
        let seq = IdentitySequence::starting_after(i32::MAX - 1);
        assert_eq!(seq.next(), Some(i32::MAX));
        assert_eq!(seq.next(), None);
        assert_eq!(seq.next(), None);
        assert_eq!(seq.current(), i32::MAX);
    }
}
