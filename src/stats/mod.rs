//! Result accumulation
//!
//! [`PrimeSet`] is the single shared mutable resource of a run. Workers append
//! one prime at a time under its lock; everything else a worker touches is
//! owned by that worker alone.

use std::sync::{Mutex, MutexGuard};

/// Unordered collection of primes discovered during one run
///
/// Owned by whoever drives the run (the coordinator, or a service session).
/// Workers borrow it and call [`PrimeSet::append`] for each prime found. A
/// worker that panics cannot poison it: the lock is recovered on next access,
/// and a `Vec::push` never leaves the vector half-updated.
#[derive(Debug, Default)]
pub struct PrimeSet {
    primes: Mutex<Vec<i32>>,
}

impl PrimeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single prime; the only critical section in a scan
    #[inline]
    pub fn append(&self, prime: i32) {
        self.lock().push(prime);
    }

    /// Append a batch of primes (used when merging a peer's results)
    ///
    /// The two halves of a run are disjoint, so this does not deduplicate.
    pub fn extend<I: IntoIterator<Item = i32>>(&self, primes: I) {
        self.lock().extend(primes);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the current contents, ascending
    pub fn to_sorted_vec(&self) -> Vec<i32> {
        let mut primes = self.lock().clone();
        primes.sort_unstable();
        primes
    }

    /// Consume the set, returning primes in discovery order
    pub fn into_vec(self) -> Vec<i32> {
        self.primes
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<i32>> {
        self.primes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_append_and_extend() {
        let set = PrimeSet::new();
        assert!(set.is_empty());
        set.append(7);
        set.append(2);
        set.extend([17, 19]);
        assert_eq!(set.len(), 4);
        assert_eq!(set.to_sorted_vec(), vec![2, 7, 17, 19]);
        assert_eq!(set.into_vec(), vec![7, 2, 17, 19]);
    }

    #[test]
    fn test_concurrent_appends_are_not_lost() {
        let set = Arc::new(PrimeSet::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let set = set.clone();
                std::thread::spawn(move || {
                    for i in 0..1_000 {
                        set.append(t * 1_000 + i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let all = set.to_sorted_vec();
        assert_eq!(all.len(), 8_000);
        assert_eq!(all, (0..8_000).collect::<Vec<_>>());
    }

    #[test]
    fn test_survives_poisoned_lock() {
        let set = Arc::new(PrimeSet::new());
        set.append(3);
        let poisoner = set.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.primes.lock().unwrap();
            panic!("poison the lock");
        })
        .join();
        set.append(5);
        assert_eq!(set.to_sorted_vec(), vec![3, 5]);
    }
}
