//! Looper/DispatchQueue example.
//!
//! Demonstrates posting immediate and delayed jobs to a `Looper`, and
//! canceling a task through a `DispatchQueue`.

use abe::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn main() {
    println!("=== Looper demo ===\n");

    let looper = Arc::new(Looper::new("demo"));
    let queue = DispatchQueue::new(looper.clone());

    looper.post(Job::immediate(|| println!("[immediate] ran first")));
    looper.post_delayed(Job::immediate(|| println!("[delayed 30ms] ran third")), Duration::from_millis(30));
    looper.post_delayed(Job::immediate(|| println!("[delayed 5ms] ran second")), Duration::from_millis(5));

    let cancel_me = queue.dispatch_after(|| println!("[cancelled] should never print"), Duration::from_millis(50));
    println!("cancelling pending task: {}", queue.remove(cancel_me));

    let worker = looper.clone().spawn(ThreadType::Normal);
    std::thread::sleep(Duration::from_millis(100));
    looper.terminate(true);
    worker.join();

    println!("\ndone");
}
