//! Admission token for the training protocol.
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Single-writer admission token for optimization passes.
///
/// The flag is a mutual-exclusion token, not an informational flag: the
/// transition into training happens through a compare-and-swap, so only
/// one of any number of concurrently polling agents is admitted. Request
/// handlers read [`TrainingBarrier::is_training`] without taking the state
/// lock, which is what lets them answer "unavailable, retry" instead of
/// queueing behind a long optimization pass.
///
/// ```mermaid
/// stateDiagram-v2
///     RUNNING --> ALL_PAUSED_IDLE: last session pauses
///     ALL_PAUSED_IDLE --> TRAINING: try_admit (one winner)
///     TRAINING --> RUNNING: permit dropped, sessions unpaused
/// ```
#[derive(Debug, Default)]
pub struct TrainingBarrier {
    is_training: AtomicBool,
}

impl TrainingBarrier {
    /// Creates a barrier in the released state.
    pub fn new() -> Self {
        Self::default()
    }

    /// True while an optimization pass holds the permit.
    pub fn is_training(&self) -> bool {
        self.is_training.load(Ordering::Acquire)
    }

    /// Attempts the transition into training.
    ///
    /// At most one concurrent caller receives a permit; the flag is held
    /// until the permit is dropped, including on panic or error inside the
    /// pass, so the barrier can never stay latched.
    pub fn try_admit(&self) -> Option<TrainingPermit<'_>> {
        self.is_training
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TrainingPermit { barrier: self })
    }
}

/// Exclusive right to run one optimization pass. Releases on drop.
#[derive(Debug)]
pub struct TrainingPermit<'a> {
    barrier: &'a TrainingBarrier,
}

impl Drop for TrainingPermit<'_> {
    fn drop(&mut self) {
        self.barrier.is_training.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_single_admission() {
        let barrier = TrainingBarrier::new();
        let permit = barrier.try_admit();
        assert!(permit.is_some());
        assert!(barrier.is_training());
        assert!(barrier.try_admit().is_none());

        drop(permit);
        assert!(!barrier.is_training());
        assert!(barrier.try_admit().is_some());
    }

    #[test]
    fn test_concurrent_admission_has_one_winner() {
        let barrier = Arc::new(TrainingBarrier::new());
        let start = Arc::new(std::sync::Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let barrier = barrier.clone();
                let start = start.clone();
                std::thread::spawn(move || {
                    start.wait();
                    match barrier.try_admit() {
                        Some(permit) => {
                            // Hold the permit long enough for the other
                            // threads to observe the latched flag.
                            std::thread::sleep(std::time::Duration::from_millis(50));
                            drop(permit);
                            1usize
                        }
                        None => 0usize,
                    }
                })
            })
            .collect();

        let winners: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(winners, 1);
        assert!(!barrier.is_training());
    }
}
