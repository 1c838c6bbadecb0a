//! Component F: `Mutex`, `Condition`, `Time`.
//!
//! Grounded on `original_source/ABE/core/Mutex.{h,cpp}`: a thin wrapper
//! around the platform's real pthread mutex/condvar, not a
//! cooperative-yield primitive. The Looper (component I) genuinely
//! blocks an OS thread waiting for the next job, so this wraps raw
//! `libc::pthread_mutex_t`/`pthread_cond_t` directly rather than the
//! workspace's scheduler-aware spin-yield mutex — that type solves a
//! different problem (a GVThread yielding to a cooperative scheduler
//! under contention), not this one (a real thread parked on a condition
//! variable).
//!
//! The source's `Mutex(bool recursive = false)` constructor selects
//! between `PTHREAD_MUTEX_RECURSIVE` and `PTHREAD_MUTEX_ERRORCHECK` —
//! there is no plain "fast" mutex type in the source, only these two —
//! so `MutexMode` mirrors that choice exactly, made once at
//! construction. A thread relocking an `ErrorChecking` mutex it already
//! holds, or unlocking one it doesn't, is a programming error and goes
//! through `fatal()` rather than a silent deadlock.

use abe_core::fatal::fatal;
use std::cell::UnsafeCell;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};

/// The pthread mutex type selected at construction. There is no plain
/// non-checking mode: a `Mutex` is always one of these two, matching
/// the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutexMode {
    /// `PTHREAD_MUTEX_ERRORCHECK`: a second lock attempt from the
    /// thread already holding it fails fast instead of deadlocking.
    ErrorChecking,
    /// `PTHREAD_MUTEX_RECURSIVE`: the owning thread may lock repeatedly;
    /// it must unlock the same number of times before another thread
    /// can acquire it.
    Recursive,
}

/// A blocking mutex backed by a real pthread mutex, in either
/// error-checking or recursive mode (selected at construction; see
/// `MutexMode`). `AutoLock` in the source; here just RAII via the
/// guard's `Drop`.
pub struct Mutex<T> {
    raw: UnsafeCell<libc::pthread_mutex_t>,
    data: UnsafeCell<T>,
}

unsafe impl<T: Send> Send for Mutex<T> {}
unsafe impl<T: Send> Sync for Mutex<T> {}

impl<T> Mutex<T> {
    /// Defaults to `ErrorChecking`, matching the source's
    /// `Mutex(recursive = false)` default.
    pub fn new(value: T) -> Self {
        Self::with_mode(value, MutexMode::ErrorChecking)
    }

    pub fn new_recursive(value: T) -> Self {
        Self::with_mode(value, MutexMode::Recursive)
    }

    pub fn with_mode(value: T, mode: MutexMode) -> Self {
        let kind = match mode {
            MutexMode::ErrorChecking => libc::PTHREAD_MUTEX_ERRORCHECK,
            MutexMode::Recursive => libc::PTHREAD_MUTEX_RECURSIVE,
        };
        let raw = unsafe {
            let mut attr: libc::pthread_mutexattr_t = std::mem::zeroed();
            if libc::pthread_mutexattr_init(&mut attr) != 0 {
                fatal("Mutex: pthread_mutexattr_init failed");
            }
            if libc::pthread_mutexattr_settype(&mut attr, kind) != 0 {
                fatal("Mutex: pthread_mutexattr_settype failed");
            }
            let mut raw: libc::pthread_mutex_t = std::mem::zeroed();
            if libc::pthread_mutex_init(&mut raw, &attr) != 0 {
                fatal("Mutex: pthread_mutex_init failed");
            }
            libc::pthread_mutexattr_destroy(&mut attr);
            raw
        };
        Mutex {
            raw: UnsafeCell::new(raw),
            data: UnsafeCell::new(value),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, T> {
        let rc = unsafe { libc::pthread_mutex_lock(self.raw.get()) };
        if rc != 0 {
            fatal("Mutex: lock failed (relocking an ErrorChecking mutex already held by this thread?)");
        }
        MutexGuard {
            mutex: self,
            _not_send: PhantomData,
        }
    }

    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        let rc = unsafe { libc::pthread_mutex_trylock(self.raw.get()) };
        if rc == 0 {
            Some(MutexGuard {
                mutex: self,
                _not_send: PhantomData,
            })
        } else {
            None
        }
    }
}

impl<T> Drop for Mutex<T> {
    fn drop(&mut self) {
        unsafe {
            libc::pthread_mutex_destroy(self.raw.get());
        }
    }
}

pub struct MutexGuard<'a, T> {
    mutex: &'a Mutex<T>,
    // pthread mutexes in these modes must be unlocked by the thread that
    // locked them; keep the guard from crossing threads.
    _not_send: PhantomData<*mut ()>,
}

impl<'a, T> Deref for MutexGuard<'a, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.mutex.data.get() }
    }
}

impl<'a, T> DerefMut for MutexGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<'a, T> Drop for MutexGuard<'a, T> {
    fn drop(&mut self) {
        unsafe {
            libc::pthread_mutex_unlock(self.mutex.raw.get());
        }
    }
}

/// A condition variable paired with a `Mutex`. `wait`/`wait_relative`
/// take the guard by value and hand back a fresh one, matching
/// `std::sync::Condvar`'s own API (the source's `Condition::wait` takes
/// the already-locked mutex by reference instead, since C++ has no
/// equivalent of consuming-and-returning a guard); underneath, both call
/// straight through to `pthread_cond_wait`/`pthread_cond_timedwait`
/// against the paired mutex's raw pthread handle, exactly as the source
/// does.
pub struct Condition {
    raw: UnsafeCell<libc::pthread_cond_t>,
}

unsafe impl Send for Condition {}
unsafe impl Sync for Condition {}

impl Condition {
    pub fn new() -> Self {
        let raw = unsafe {
            let mut attr: libc::pthread_condattr_t = std::mem::zeroed();
            if libc::pthread_condattr_init(&mut attr) != 0 {
                fatal("Condition: pthread_condattr_init failed");
            }
            #[cfg(target_os = "linux")]
            {
                if libc::pthread_condattr_setclock(&mut attr, libc::CLOCK_MONOTONIC) != 0 {
                    fatal("Condition: pthread_condattr_setclock failed");
                }
            }
            let mut raw: libc::pthread_cond_t = std::mem::zeroed();
            if libc::pthread_cond_init(&mut raw, &attr) != 0 {
                fatal("Condition: pthread_cond_init failed");
            }
            libc::pthread_condattr_destroy(&mut attr);
            raw
        };
        Condition { raw: UnsafeCell::new(raw) }
    }

    pub fn wait<'a, T>(&self, guard: MutexGuard<'a, T>) -> MutexGuard<'a, T> {
        let rc = unsafe { libc::pthread_cond_wait(self.raw.get(), guard.mutex.raw.get()) };
        if rc != 0 {
            fatal("Condition: wait failed");
        }
        guard
    }

    /// Waits up to `timeout`. Returns `(guard, timed_out)`.
    pub fn wait_relative<'a, T>(&self, guard: MutexGuard<'a, T>, timeout: Duration) -> (MutexGuard<'a, T>, bool) {
        let deadline = unsafe {
            let mut now: libc::timespec = std::mem::zeroed();
            libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut now);
            let mut secs = now.tv_sec + timeout.as_secs() as libc::time_t;
            let mut nanos = now.tv_nsec + timeout.subsec_nanos() as i64;
            if nanos >= 1_000_000_000 {
                secs += 1;
                nanos -= 1_000_000_000;
            }
            libc::timespec {
                tv_sec: secs,
                tv_nsec: nanos,
            }
        };
        let rc = unsafe { libc::pthread_cond_timedwait(self.raw.get(), guard.mutex.raw.get(), &deadline) };
        let timed_out = rc == libc::ETIMEDOUT;
        if rc != 0 && !timed_out {
            fatal("Condition: wait_relative failed");
        }
        (guard, timed_out)
    }

    pub fn signal(&self) {
        unsafe {
            libc::pthread_cond_signal(self.raw.get());
        }
    }

    pub fn broadcast(&self) {
        unsafe {
            libc::pthread_cond_broadcast(self.raw.get());
        }
    }
}

impl Drop for Condition {
    fn drop(&mut self) {
        unsafe {
            libc::pthread_cond_destroy(self.raw.get());
        }
    }
}

/// Monotonic time helpers. The source's `Time` class wraps
/// `CLOCK_MONOTONIC`; `std::time::Instant` already guarantees a
/// monotonic, non-wall-clock source on every platform Rust supports, so
/// this is a thin naming layer rather than a reimplementation.
pub struct Time;

impl Time {
    pub fn now() -> Instant {
        Instant::now()
    }

    pub fn monotonic_us() -> u64 {
        static EPOCH: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
        let epoch = EPOCH.get_or_init(Instant::now);
        epoch.elapsed().as_micros() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn mutex_round_trip() {
        let m = Mutex::new(0);
        *m.lock() = 42;
        assert_eq!(*m.lock(), 42);
    }

    #[test]
    fn recursive_mutex_allows_same_thread_relock() {
        let m = Mutex::new_recursive(0);
        let outer = m.lock();
        let inner = m.lock();
        assert_eq!(*inner, 0);
        drop(inner);
        drop(outer);
    }

    #[test]
    fn condition_signals_waiter() {
        let pair = Arc::new((Mutex::new(false), Condition::new()));
        let pair2 = pair.clone();

        let handle = thread::spawn(move || {
            let (lock, cvar) = &*pair2;
            let mut guard = lock.lock();
            while !*guard {
                guard = cvar.wait(guard);
            }
        });

        thread::sleep(Duration::from_millis(20));
        {
            let (lock, cvar) = &*pair;
            *lock.lock() = true;
            cvar.signal();
        }
        handle.join().unwrap();
    }

    #[test]
    fn wait_relative_times_out() {
        let m = Mutex::new(());
        let c = Condition::new();
        let guard = m.lock();
        let (_, timed_out) = c.wait_relative(guard, Duration::from_millis(10));
        assert!(timed_out);
    }
}
