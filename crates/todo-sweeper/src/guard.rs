//! Single-flight guard
//!
//! At most one holder at a time; a second `try_acquire` fails instead of
//! waiting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Non-blocking mutual exclusion for sweep runs
#[derive(Debug, Clone, Default)]
pub struct SingleFlight {
    busy: Arc<AtomicBool>,
}

/// Proof of holding the guard; released on drop
#[derive(Debug)]
pub struct FlightPermit {
    busy: Arc<AtomicBool>,
}

impl SingleFlight {
    /// Create an idle guard
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the guard if nobody holds it
    pub fn try_acquire(&self) -> Option<FlightPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightPermit {
                busy: Arc::clone(&self.busy),
            })
    }

    /// Whether a permit is currently outstanding
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for FlightPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_while_held() {
        let guard = SingleFlight::new();
        let permit = guard.try_acquire();
        assert!(permit.is_some());
        assert!(guard.is_busy());
        assert!(guard.try_acquire().is_none());

        drop(permit);
        assert!(!guard.is_busy());
        assert!(guard.try_acquire().is_some());
    }

    #[test]
    fn test_clones_share_state() {
        let guard = SingleFlight::new();
        let other = guard.clone();

        let _permit = guard.try_acquire().unwrap();
        assert!(other.try_acquire().is_none());
    }

    #[test]
    fn test_only_one_thread_wins() {
        let guard = SingleFlight::new();
        let barrier = Arc::new(std::sync::Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = guard.clone();
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    guard.try_acquire()
                })
            })
            .collect();

        let permits: Vec<_> = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(permits.len(), 1);
    }
}
