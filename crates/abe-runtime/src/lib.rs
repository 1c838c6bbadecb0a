//! # abe-runtime
//!
//! Cooperative job scheduling on top of real OS threads (components
//! F, H, I, J, K, L): blocking `Mutex`/`Condition`, `Job`, the `Looper`
//! dispatch loop, tagged `DispatchQueue`s, scheduling-aware `Thread`
//! spawning, and a `MainLooper` bound to the process main thread.

#![allow(dead_code)]

pub mod dispatch_queue;
pub mod job;
pub mod looper;
pub mod main_looper;
pub mod sync;
pub mod thread;

pub use dispatch_queue::{DispatchQueue, TaskToken};
pub use job::Job;
pub use looper::{JobToken, Looper, LooperState};
pub use main_looper::MainLooper;
pub use sync::{Condition, Mutex, MutexGuard, Time};
pub use thread::{Thread, ThreadType};
