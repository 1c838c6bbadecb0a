//! # abe-queue
//!
//! Component G: a lock-free MPMC queue. `crossbeam_queue::SegQueue`
//! already gives wait-free push and lock-free pop over an unbounded,
//! segmented backing store — the same crate the production worker pool
//! this repo is built from reaches for (`ksvc-module/src/fixed_pool.rs`
//! uses its bounded sibling, `ArrayQueue`, for a fixed-capacity variant
//! of the same pattern). `LockFreeQueue` adds the one thing `SegQueue`
//! doesn't track itself: an approximate length, needed by callers (the
//! Looper's immediate-job queue among them) that want a cheap "roughly
//! how much work is pending" without walking the queue.
//!
//! The length is monotonic-consistent but not atomic with the push/pop
//! it accompanies — a concurrent reader can observe a length that is
//! momentarily stale by one push or pop. That's the guarantee the spec
//! asks for ("approximate but monotonic"), not linearizable accounting.

#![allow(dead_code)]

use crossbeam_queue::SegQueue;
use std::sync::atomic::{AtomicUsize, Ordering};

/// An unbounded, lock-free MPMC queue with an approximate length.
pub struct LockFreeQueue<T> {
    queue: SegQueue<T>,
    len: AtomicUsize,
}

impl<T> LockFreeQueue<T> {
    pub fn new() -> Self {
        LockFreeQueue {
            queue: SegQueue::new(),
            len: AtomicUsize::new(0),
        }
    }

    pub fn push(&self, value: T) {
        self.queue.push(value);
        self.len.fetch_add(1, Ordering::AcqRel);
    }

    pub fn pop(&self) -> Option<T> {
        let value = self.queue.pop();
        if value.is_some() {
            self.len.fetch_sub(1, Ordering::AcqRel);
        }
        value
    }

    /// An approximate count of pending items. May be stale by one push or
    /// pop under concurrent access; never drifts permanently.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for LockFreeQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn fifo_within_single_producer() {
        let q = LockFreeQueue::new();
        for i in 0..100 {
            q.push(i);
        }
        for i in 0..100 {
            assert_eq!(q.pop(), Some(i));
        }
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn len_tracks_push_pop() {
        let q = LockFreeQueue::new();
        assert_eq!(q.len(), 0);
        q.push(1);
        q.push(2);
        assert_eq!(q.len(), 2);
        q.pop();
        assert_eq!(q.len(), 1);
    }

    /// Seed scenario: 3 producers x 10,000 ints each, 1 consumer; each
    /// producer's own subsequence must come out in order.
    #[test]
    fn concurrent_producers_preserve_per_producer_order() {
        let q = Arc::new(LockFreeQueue::new());
        const PER_PRODUCER: usize = 10_000;
        let mut handles = Vec::new();
        for producer in 0..3u64 {
            let q = q.clone();
            handles.push(thread::spawn(move || {
                for i in 0..PER_PRODUCER as u64 {
                    q.push(producer * 1_000_000 + i);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        let mut last_seen = [None::<u64>; 3];
        let mut total = 0;
        while let Some(v) = q.pop() {
            let producer = (v / 1_000_000) as usize;
            let seq = v % 1_000_000;
            if let Some(last) = last_seen[producer] {
                assert!(seq > last, "producer {producer} out of order");
            }
            last_seen[producer] = Some(seq);
            total += 1;
        }
        assert_eq!(total, 3 * PER_PRODUCER);
        assert_eq!(q.len(), 0);
    }
}
