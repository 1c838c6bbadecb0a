//! Stress test: many producers posting through a shared lock-free queue
//! and a `Looper`, many retained/released shared objects.

use abe::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

struct Counted(Arc<AtomicU64>);

impl SharedObject for Counted {
    fn on_last_retain(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

fn main() {
    println!("=== abe stress test ===\n");

    let job_count: usize = std::env::args().nth(1).and_then(|s| s.parse().ok()).unwrap_or(20_000);

    println!("posting {job_count} jobs through a Looper...");
    let looper = Arc::new(Looper::new("stress"));
    let completed = Arc::new(AtomicU64::new(0));
    let start = Instant::now();
    for _ in 0..job_count {
        let completed = completed.clone();
        looper.post(Job::immediate(move || {
            completed.fetch_add(1, Ordering::Relaxed);
        }));
    }
    looper.terminate(true);
    let worker = looper.clone().spawn(ThreadType::Normal);
    worker.join();
    println!(
        "looper: {}/{job_count} jobs ran in {:?}",
        completed.load(Ordering::Relaxed),
        start.elapsed()
    );

    println!("\npushing through a LockFreeQueue from 4 producers...");
    let queue = Arc::new(LockFreeQueue::new());
    let per_producer = job_count / 4;
    let start = Instant::now();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let queue = queue.clone();
            std::thread::spawn(move || {
                for i in 0..per_producer {
                    queue.push(i);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    let mut drained = 0;
    while queue.pop().is_some() {
        drained += 1;
    }
    println!("queue: drained {drained} items in {:?}", start.elapsed());

    println!("\nretaining and releasing shared objects...");
    let destroyed = Arc::new(AtomicU64::new(0));
    for _ in 0..job_count {
        let o = Shared::new(Counted(destroyed.clone()));
        let _clones: Vec<_> = (0..4).map(|_| o.retain()).collect();
    }
    println!("objects: {} destroyed", destroyed.load(Ordering::Relaxed));

    println!("\n=== done ===");
}
