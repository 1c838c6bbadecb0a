//! Component I: `Looper`.
//!
//! Grounded directly on `original_source/ABE/object/Looper.cpp`'s
//! `JobDispatcher`/`NormalJobDispatcher`: an immediate lock-free queue
//! fused with a sorted timed list under a mutex+condvar. The source's
//! `Job`-that-owns-a-nested-`JobDispatcher` trick is flattened away —
//! `Looper` owns the dispatch state directly, and `Job` (component H) is
//! just a routine plus an optional deadline.
//!
//! `remove`/`exists` reuse the source's own workaround for the immediate
//! queue not being scannable: drain it into the timed list (as
//! already-due entries) before scanning, so every pending job ends up in
//! one place.

use crate::job::{Job, Ticks};
use crate::sync::{Condition, Mutex};
use crate::thread::{Thread, ThreadType};
use abe_queue::LockFreeQueue;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LooperState {
    New = 0,
    Ready = 1,
    ReadyToRun = 2,
    Running = 3,
    Terminating = 4,
    Terminated = 5,
}

impl LooperState {
    fn from_u8(v: u8) -> LooperState {
        match v {
            0 => LooperState::New,
            1 => LooperState::Ready,
            2 => LooperState::ReadyToRun,
            3 => LooperState::Running,
            4 => LooperState::Terminating,
            _ => LooperState::Terminated,
        }
    }
}

struct TimedJob {
    id: u64,
    due: Instant,
    job: Option<Job>,
}

/// A single-threaded cooperative event loop: an immediate MPMC queue for
/// as-soon-as-possible work, and a sorted list for delayed work.
pub struct Looper {
    name: String,
    next_id: AtomicU64,
    immediate: LockFreeQueue<(u64, Job)>,
    timed: Mutex<Vec<TimedJob>>,
    run_lock: Mutex<()>,
    cond: Condition,
    state: AtomicU8,
    request_exit: AtomicBool,
    wait_for_finish: AtomicBool,
}

/// A handle to a posted job, usable with `remove`/`exists`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobToken(u64);

const READY_JITTER: Duration = Duration::from_millis(1);

impl Looper {
    pub fn new(name: impl Into<String>) -> Looper {
        let looper = Looper {
            name: name.into(),
            next_id: AtomicU64::new(1),
            immediate: LockFreeQueue::new(),
            timed: Mutex::new(Vec::new()),
            run_lock: Mutex::new(()),
            cond: Condition::new(),
            state: AtomicU8::new(LooperState::New as u8),
            request_exit: AtomicBool::new(false),
            wait_for_finish: AtomicBool::new(false),
        };
        looper.state.store(LooperState::Ready as u8, Ordering::Release);
        looper
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> LooperState {
        LooperState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Post a job to run as soon as a worker is free.
    pub fn post(&self, job: Job) -> JobToken {
        let id = self.next_id();
        self.immediate.push((id, job));
        // Hold `run_lock` across the signal so it can't land in the gap
        // between the consumer's check (`pop()`) and its wait — the same
        // lock the consumer holds across that sequence in `run_loop`.
        let guard = self.run_lock.lock();
        self.cond.signal();
        drop(guard);
        JobToken(id)
    }

    /// Post a job to run no earlier than `delay` from now.
    pub fn post_delayed(&self, job: Job, delay: Duration) -> JobToken {
        let id = self.next_id();
        let due = Instant::now() + delay;
        let mut timed = self.timed.lock();
        let insert_at = timed.partition_point(|t| t.due <= due);
        let became_head = insert_at == 0;
        timed.insert(
            insert_at,
            TimedJob {
                id,
                due,
                job: Some(job),
            },
        );
        drop(timed);
        if became_head {
            let guard = self.run_lock.lock();
            self.cond.signal();
            drop(guard);
        }
        JobToken(id)
    }

    /// Drains the immediate queue into the timed list as already-due
    /// entries, so both can be scanned as one collection. Mirrors the
    /// source's own technique for making a lock-free queue scannable.
    fn drain_immediate_into_timed(&self) {
        let mut timed = self.timed.lock();
        while let Some((id, job)) = self.immediate.pop() {
            timed.push(TimedJob {
                id,
                due: Instant::now(),
                job: Some(job),
            });
        }
        timed.sort_by_key(|t| t.due);
    }

    /// Cancel a not-yet-run job. Returns `true` if found and removed.
    pub fn remove(&self, token: JobToken) -> bool {
        self.drain_immediate_into_timed();
        let mut timed = self.timed.lock();
        if let Some(pos) = timed.iter().position(|t| t.id == token.0) {
            timed.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn exists(&self, token: JobToken) -> bool {
        self.drain_immediate_into_timed();
        let timed = self.timed.lock();
        timed.iter().any(|t| t.id == token.0)
    }

    pub fn clear(&self) {
        while self.immediate.pop().is_some() {}
        self.timed.lock().clear();
    }

    fn pending(&self) -> bool {
        !self.immediate.is_empty() || !self.timed.lock().is_empty()
    }

    /// Pop the next ready job, or report how long to wait for one.
    /// `None` for the wait duration means "wait indefinitely" (no timed
    /// job pending); `Some(Duration::ZERO)` means a job was returned.
    fn pop(&self) -> (Option<Job>, Option<Duration>) {
        {
            let mut timed = self.timed.lock();
            if let Some(head) = timed.first() {
                if head.due <= Instant::now() + READY_JITTER {
                    let mut entry = timed.remove(0);
                    return (entry.job.take(), Some(Duration::ZERO));
                }
            }
        }
        if let Some((_, job)) = self.immediate.pop() {
            return (Some(job), Some(Duration::ZERO));
        }
        let timed = self.timed.lock();
        let next = timed.first().map(|t| t.due.saturating_duration_since(Instant::now()));
        (None, next)
    }

    /// The dispatch loop. Runs until `terminate()` has been called and
    /// (not waiting for a graceful finish, or no jobs remain).
    fn run_loop(&self) {
        self.state.store(LooperState::Running as u8, Ordering::Release);
        loop {
            let (job, next) = self.pop();
            if let Some(job) = job {
                job.run();
                continue;
            }
            if self.request_exit.load(Ordering::Acquire) {
                if !self.wait_for_finish.load(Ordering::Acquire) || !self.pending() {
                    break;
                }
            }
            let guard = self.run_lock.lock();
            match next {
                Some(d) if d > Duration::ZERO => {
                    let _ = self.cond.wait_relative(guard, d);
                }
                Some(_) => {}
                None => {
                    let _ = self.cond.wait(guard);
                }
            }
        }
        self.state.store(LooperState::Terminated as u8, Ordering::Release);
    }

    /// Run the dispatch loop on a dedicated OS thread.
    pub fn spawn(self: std::sync::Arc<Self>, thread_type: ThreadType) -> Thread {
        self.state.store(LooperState::ReadyToRun as u8, Ordering::Release);
        let looper = self.clone();
        let name = self.name.clone();
        Thread::spawn(&name, thread_type, move || looper.run_loop())
    }

    /// Run the dispatch loop on the calling thread until terminated.
    pub fn run_in_place(&self) {
        self.run_loop();
    }

    pub fn terminate(&self, wait_for_finish: bool) {
        self.wait_for_finish.store(wait_for_finish, Ordering::Release);
        self.request_exit.store(true, Ordering::Release);
        self.state.store(LooperState::Terminating as u8, Ordering::Release);
        self.cond.broadcast();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn immediate_jobs_run_fifo_ish() {
        let looper = Arc::new(Looper::new("test"));
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..5 {
            let order = order.clone();
            looper.post(Job::immediate(move || order.lock().push(i)));
        }
        looper.terminate(true);
        looper.run_in_place();
        assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
    }

    /// Seed scenario: timed ordering. J1@50ms, J2@10ms, J3@10ms (posted
    /// in that order) must come out J2, J3, J1.
    #[test]
    fn timed_jobs_run_in_due_order() {
        let looper = Arc::new(Looper::new("timed"));
        let order = Arc::new(Mutex::new(Vec::new()));

        let o1 = order.clone();
        looper.post_delayed(Job::immediate(move || o1.lock().push("J1")), Duration::from_millis(50));
        let o2 = order.clone();
        looper.post_delayed(Job::immediate(move || o2.lock().push("J2")), Duration::from_millis(10));
        let o3 = order.clone();
        looper.post_delayed(Job::immediate(move || o3.lock().push("J3")), Duration::from_millis(10));

        looper.terminate(true);
        looper.run_in_place();
        assert_eq!(*order.lock(), vec!["J2", "J3", "J1"]);
    }

    #[test]
    fn remove_cancels_pending_job() {
        let looper = Arc::new(Looper::new("cancel"));
        let ran = Arc::new(AtomicUsize::new(0));
        let ran2 = ran.clone();
        let token = looper.post_delayed(Job::immediate(move || { ran2.fetch_add(1, Ordering::SeqCst); }), Duration::from_secs(10));
        assert!(looper.exists(token));
        assert!(looper.remove(token));
        assert!(!looper.exists(token));
        looper.terminate(true);
        looper.run_in_place();
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    /// Seed scenario: `remove(J)` before `J` fires leaves `J.ticks == 0`
    /// after the looper subsequently drains.
    #[test]
    fn removed_job_never_ticks() {
        let looper = Arc::new(Looper::new("ticks"));
        let job = Job::immediate(|| {});
        let ticks = job.ticks();
        let token = looper.post_delayed(job, Duration::from_secs(10));
        assert!(looper.remove(token));
        looper.terminate(true);
        looper.run_in_place();
        assert_eq!(ticks.get(), 0);
    }

    #[test]
    fn terminate_without_wait_drops_pending_jobs() {
        let looper = Arc::new(Looper::new("drop-pending"));
        let ran = Arc::new(AtomicUsize::new(0));
        let ran2 = ran.clone();
        looper.post_delayed(Job::immediate(move || { ran2.fetch_add(1, Ordering::SeqCst); }), Duration::from_secs(10));
        looper.terminate(false);
        looper.run_in_place();
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(looper.state(), LooperState::Terminated);
    }
}
