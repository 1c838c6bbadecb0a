//! Component H: `Job`.
//!
//! The source's `Job` struct pairs a routine with a scheduled time and
//! compares by time for the timed list's insertion sort
//! (`original_source/ABE/object/Looper.cpp`). The source's further trick
//! of a `Job` that itself owns a nested `JobDispatcher` is flattened away
//! here: `Looper` (component I) owns the dispatcher state directly, and a
//! `Job` is just a routine plus an optional deadline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A unit of work posted to a `Looper`: a closure plus, for delayed
/// jobs, the instant it becomes eligible to run.
///
/// Carries an atomic `ticks` counter, incremented once after each
/// execution of the routine — the same counter `DispatchQueue::sync`
/// polls to learn a posted job actually ran.
pub struct Job {
    pub(crate) routine: Box<dyn FnOnce() + Send>,
    pub(crate) due: Option<Instant>,
    pub(crate) queue_id: Option<u64>,
    ticks: Arc<AtomicU64>,
}

/// A handle onto a `Job`'s `ticks` counter, cheaply cloned and kept by
/// the poster after the `Job` itself has been handed off to a `Looper`.
#[derive(Clone)]
pub struct Ticks(Arc<AtomicU64>);

impl Ticks {
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }
}

impl Job {
    pub fn immediate<F>(routine: F) -> Job
    where
        F: FnOnce() + Send + 'static,
    {
        Job {
            routine: Box::new(routine),
            due: None,
            queue_id: None,
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn delayed<F>(routine: F, due: Instant) -> Job
    where
        F: FnOnce() + Send + 'static,
    {
        Job {
            routine: Box::new(routine),
            due: Some(due),
            queue_id: None,
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_queue_id(mut self, queue_id: u64) -> Job {
        self.queue_id = Some(queue_id);
        self
    }

    /// A handle to this job's tick counter, independent of the `Job`
    /// itself so a caller can keep observing it after posting.
    pub fn ticks(&self) -> Ticks {
        Ticks(self.ticks.clone())
    }

    pub fn run(self) {
        (self.routine)();
        self.ticks.fetch_add(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_advances_exactly_once_per_run() {
        let job = Job::immediate(|| {});
        let ticks = job.ticks();
        assert_eq!(ticks.get(), 0);
        job.run();
        assert_eq!(ticks.get(), 1);
    }
}
