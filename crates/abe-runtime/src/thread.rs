//! Component K: `Thread`.
//!
//! An OS thread wrapper that takes a plain `FnOnce() + Send` closure
//! instead of the source's `sp<Runnable>` — the flattening the redesign
//! notes call for once there's no intrusive refcounting to interoperate
//! with. Scheduling intent is expressed as the spec's 8-level
//! `ThreadType`, mapped to the two policy bands it names: everyday
//! levels (`Lowest..=Foreground`) get a `nice(2)` value interpolated
//! across the usual `[-5, 19]` range; `System`/`Kernel` get `SCHED_FIFO`
//! and `Realtime`/`Highest` get `SCHED_RR`, both with a priority
//! interpolated across their band. Applying the policy is best-effort —
//! a sandboxed or unprivileged process can't raise its own realtime
//! priority, and that failure is logged, not fatal.

use abe_core::abe_warn;
use std::thread::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ThreadType {
    Lowest = 0,
    Background = 1,
    Normal = 2,
    Foreground = 3,
    System = 4,
    Kernel = 5,
    Realtime = 6,
    Highest = 7,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Band {
    /// OS default/CFS policy, tuned by `nice(2)`.
    Normal,
    /// `SCHED_FIFO`.
    Fifo,
    /// `SCHED_RR`.
    RoundRobin,
}

impl ThreadType {
    fn band(self) -> Band {
        match self {
            ThreadType::Lowest | ThreadType::Background | ThreadType::Normal | ThreadType::Foreground => Band::Normal,
            ThreadType::System | ThreadType::Kernel => Band::Fifo,
            ThreadType::Realtime | ThreadType::Highest => Band::RoundRobin,
        }
    }

    /// `nice(2)` value for the everyday band: spans `[-5, 19]` across
    /// `Lowest..=Foreground`, interpolated linearly.
    fn nice_value(self) -> i32 {
        let level = self as i32;
        let top = ThreadType::Foreground as i32;
        19 - (level * 24 / top)
    }

    /// Real-time priority within a two-level band, interpolated
    /// linearly between a conservative floor and ceiling — well below
    /// the range reserved for kernel-critical threads.
    fn rt_priority(self) -> i32 {
        const FLOOR: i32 = 10;
        const CEIL: i32 = 40;
        match self.band() {
            Band::Fifo => {
                if self == ThreadType::System {
                    FLOOR
                } else {
                    CEIL
                }
            }
            Band::RoundRobin => {
                if self == ThreadType::Realtime {
                    FLOOR
                } else {
                    CEIL
                }
            }
            Band::Normal => FLOOR,
        }
    }

    /// Apply this scheduling intent to the calling thread. Best-effort:
    /// logs and continues on failure rather than aborting.
    pub fn apply_to_current_thread(self) {
        match self.band() {
            Band::Fifo | Band::RoundRobin => {
                let policy = if self.band() == Band::Fifo { libc::SCHED_FIFO } else { libc::SCHED_RR };
                let param = libc::sched_param {
                    sched_priority: self.rt_priority(),
                };
                let rc = unsafe { libc::pthread_setschedparam(libc::pthread_self(), policy, &param) };
                if rc != 0 {
                    abe_warn!("ThreadType: failed to set realtime priority (rc={})", rc);
                }
            }
            Band::Normal => {
                let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS as u32, 0, self.nice_value()) };
                if rc != 0 {
                    abe_warn!("ThreadType: failed to set nice value");
                }
            }
        }
    }
}

/// A named OS thread running a single closure, with the requested
/// scheduling intent applied from inside the thread itself before the
/// closure runs.
pub struct Thread {
    name: String,
    handle: Option<JoinHandle<()>>,
}

impl Thread {
    pub fn spawn<F>(name: &str, thread_type: ThreadType, f: F) -> Thread
    where
        F: FnOnce() + Send + 'static,
    {
        let name_owned = name.to_string();
        let handle = std::thread::Builder::new()
            .name(name_owned.clone())
            .spawn(move || {
                thread_type.apply_to_current_thread();
                f();
            })
            .expect("Thread::spawn: failed to spawn OS thread");
        Thread {
            name: name_owned,
            handle: Some(handle),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map(|h| h.is_finished()).unwrap_or(true)
    }

    pub fn join(mut self) {
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn spawn_runs_closure() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran2 = ran.clone();
        let t = Thread::spawn("test-thread", ThreadType::Normal, move || {
            ran2.store(true, Ordering::SeqCst);
        });
        t.join();
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn nice_value_spans_expected_range() {
        assert_eq!(ThreadType::Foreground.nice_value(), -5);
        assert_eq!(ThreadType::Lowest.nice_value(), 19);
    }

    #[test]
    fn scheduling_band_mapping() {
        assert_eq!(ThreadType::Normal.band(), Band::Normal);
        assert_eq!(ThreadType::System.band(), Band::Fifo);
        assert_eq!(ThreadType::Kernel.band(), Band::Fifo);
        assert_eq!(ThreadType::Realtime.band(), Band::RoundRobin);
        assert_eq!(ThreadType::Highest.band(), Band::RoundRobin);
    }
}
