//! Component L: `MainLooper`.
//!
//! A `Looper` bound to the process's main thread, wired to `SIGINT` so
//! `Ctrl-C` requests a graceful shutdown instead of the default abrupt
//! kill. The signal handler itself only flips an atomic flag — signal
//! handlers may call only async-signal-safe functions, so the actual
//! `terminate()` call (which locks a mutex and touches a condvar) happens
//! on a small watcher thread that polls the flag instead of from the
//! handler.
//!
//! First access asserts the caller is the process's main thread — on
//! Linux the main thread's tid equals the pid, which is what `getpid`/
//! `gettid` give us without an extra native dependency.

use abe_core::fatal::fatal;
use crate::looper::{Looper, LooperState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn pid_matches_tid(pid: libc::pid_t, tid: libc::pid_t) -> bool {
    pid == tid
}

fn is_main_thread() -> bool {
    pid_matches_tid(unsafe { libc::getpid() }, unsafe { libc::gettid() })
}

/// Rust's test harness runs every `#[test]` on its own worker thread, so
/// there is no real "process main thread" to check against under
/// `cargo test`; the assertion only fires in non-test builds.
fn assert_main_thread() {
    if !cfg!(test) && !is_main_thread() {
        fatal("MainLooper: accessed from a thread other than the process main thread");
    }
}

static SIGINT_RECEIVED: AtomicBool = AtomicBool::new(false);
static HANDLER_INSTALLED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_sigint(_signum: libc::c_int) {
    SIGINT_RECEIVED.store(true, Ordering::SeqCst);
}

pub struct MainLooper {
    looper: Arc<Looper>,
}

impl MainLooper {
    pub fn new() -> MainLooper {
        assert_main_thread();
        MainLooper {
            looper: Arc::new(Looper::new("main")),
        }
    }

    pub fn looper(&self) -> Arc<Looper> {
        self.looper.clone()
    }

    fn install_sigint_handler() {
        if HANDLER_INSTALLED.swap(true, Ordering::SeqCst) {
            return;
        }
        unsafe {
            libc::signal(libc::SIGINT, handle_sigint as libc::sighandler_t);
        }
    }

    /// Runs the dispatch loop on the calling thread until `terminate()`
    /// is called on the returned looper, or `SIGINT` arrives.
    pub fn run(&self) {
        Self::install_sigint_handler();
        let watched = self.looper.clone();
        let watcher = std::thread::Builder::new()
            .name("abe-main-sigint-watch".into())
            .spawn(move || loop {
                if SIGINT_RECEIVED.swap(false, Ordering::SeqCst) {
                    watched.terminate(true);
                    break;
                }
                if watched.state() == LooperState::Terminated {
                    break;
                }
                std::thread::sleep(Duration::from_millis(50));
            })
            .expect("MainLooper: failed to spawn signal watcher thread");
        self.looper.run_in_place();
        let _ = watcher.join();
    }
}

impl Default for MainLooper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Job;

    #[test]
    fn pid_tid_comparison() {
        assert!(pid_matches_tid(123, 123));
        assert!(!pid_matches_tid(123, 456));
    }

    #[test]
    fn runs_until_terminated() {
        let main = MainLooper::new();
        let looper = main.looper();
        looper.post(Job::immediate(move || {}));
        looper.terminate(true);
        main.run();
        assert_eq!(looper.state(), LooperState::Terminated);
    }
}
