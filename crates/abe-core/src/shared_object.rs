//! Components A/B: `Refs` and `SharedObject`.
//!
//! The source's `Refs` is an intrusive strong/weak counter pair with an
//! `INITIAL` sentinel distinguishing "never retained" from "dropped to
//! zero", plus `onFirstRetain`/`onLastRetain` hooks. Per the redesign
//! guidance this is language-native shared ownership: `Shared<T>` /
//! `WeakShared<T>` wrap `std::sync::{Arc, Weak}`, whose own strong/weak
//! bookkeeping already implements the four-case lifecycle (strong-only,
//! mixed, weak-only-after-strong, bare) — the allocation backing an `Arc`
//! is exactly the source's `Refs` side-table, kept alive by the weak count
//! independently of the value it wraps.
//!
//! `on_first_retain` fires once, synchronously, at the end of `Shared::new`
//! (the 0→1 transition an intrusive counter would observe happens entirely
//! inside construction once a language-native `Arc` is used — there is no
//! window during which a `Shared<T>` exists with zero strong refs).
//! `on_last_retain` fires from `Drop`, immediately before the wrapped value
//! is actually destroyed, which is the natural place for it: Rust's drop
//! glue deallocates only after `drop()` returns.
//!
//! The source's `ReleaseObject(keep: bool)` — "decrement but do not
//! destroy, caller takes responsibility" — exists only so subclasses with
//! magic-guarded embedded buffers can run extra validation during
//! destruction. That validation is folded directly into `on_last_retain`
//! here, so there is no `keep` flag to carry forward; see `DESIGN.md`.

use std::ops::Deref;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

static NEXT_OBJECT_ID: AtomicU32 = AtomicU32::new(1);

/// Implemented by every refcounted entity. `kind` is a FourCC, diagnostic
/// only — it never affects behavior.
pub trait SharedObject: Sized {
    /// Diagnostic kind tag. Default is an unknown-kind FourCC.
    fn kind(&self) -> u32 {
        crate::fourcc::fourcc(b"?obj")
    }

    /// Fires once, at the 0→1 strong-count transition.
    fn on_first_retain(&self) {}

    /// Fires once, at the 1→0 strong-count transition, before the value
    /// itself is dropped.
    fn on_last_retain(&self) {}
}

struct Boxed<T: SharedObject> {
    id: u32,
    value: T,
}

impl<T: SharedObject> Drop for Boxed<T> {
    fn drop(&mut self) {
        self.value.on_last_retain();
    }
}

/// A strong reference to a `SharedObject`. Cloning is `RetainObject`;
/// dropping the last clone is `ReleaseObject` with destruction.
pub struct Shared<T: SharedObject>(Arc<Boxed<T>>);

/// A weak reference. `try_promote` is the source's weak-to-strong
/// promotion attempt, returning `None` once the object is gone.
pub struct WeakShared<T: SharedObject>(Weak<Boxed<T>>);

impl<T: SharedObject> Shared<T> {
    /// Construct a new shared object. Fires `on_first_retain` once,
    /// before returning.
    pub fn new(value: T) -> Self {
        let id = NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed);
        let inner = Arc::new(Boxed { id, value });
        inner.value.on_first_retain();
        Shared(inner)
    }

    /// `RetainObject`: another strong reference to the same object.
    pub fn retain(&self) -> Self {
        Shared(Arc::clone(&self.0))
    }

    /// A weak reference that does not keep the object alive.
    pub fn downgrade(&self) -> WeakShared<T> {
        WeakShared(Arc::downgrade(&self.0))
    }

    /// `GetRetainCount`: current strong count. Racy under concurrent
    /// retain/release, as the spec allows — diagnostic only.
    pub fn retain_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// `GetObjectID`: a process-wide monotonic id assigned at construction,
    /// distinct from `kind` (the FourCC type tag).
    pub fn object_id(&self) -> u32 {
        self.0.id
    }

    pub fn kind(&self) -> u32 {
        self.0.value.kind()
    }

    /// Whether `self` and `other` point at the same allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: SharedObject> Clone for Shared<T> {
    fn clone(&self) -> Self {
        self.retain()
    }
}

impl<T: SharedObject> Deref for Shared<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.0.value
    }
}

impl<T: SharedObject> WeakShared<T> {
    /// Attempt to promote to a strong reference. Returns `None` if the
    /// object has already been destroyed.
    pub fn try_promote(&self) -> Option<Shared<T>> {
        self.0.upgrade().map(Shared)
    }
}

impl<T: SharedObject> Clone for WeakShared<T> {
    fn clone(&self) -> Self {
        WeakShared(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct Probe {
        first: Arc<AtomicUsize>,
        last: Arc<AtomicUsize>,
    }

    impl SharedObject for Probe {
        fn on_first_retain(&self) {
            self.first.fetch_add(1, Ordering::SeqCst);
        }
        fn on_last_retain(&self) {
            self.last.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn first_and_last_retain_fire_exactly_once() {
        let first = Arc::new(AtomicUsize::new(0));
        let last = Arc::new(AtomicUsize::new(0));
        let o = Shared::new(Probe {
            first: first.clone(),
            last: last.clone(),
        });
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(last.load(Ordering::SeqCst), 0);

        let s2 = o.retain();
        assert_eq!(first.load(Ordering::SeqCst), 1);
        drop(s2);
        assert_eq!(last.load(Ordering::SeqCst), 0);

        drop(o);
        assert_eq!(last.load(Ordering::SeqCst), 1);
    }

    /// Seed scenario: refcount case 2 (strong and weak both drop to zero).
    #[test]
    fn weak_promote_fails_after_last_strong_drops() {
        let first = Arc::new(AtomicUsize::new(0));
        let last = Arc::new(AtomicUsize::new(0));
        let o = Shared::new(Probe {
            first: first.clone(),
            last: last.clone(),
        });
        let w1 = o.downgrade();
        drop(o);

        assert_eq!(last.load(Ordering::SeqCst), 1);
        assert!(w1.try_promote().is_none());
        drop(w1); // Refs allocation destroyed here; nothing to observe but no leak/crash.
    }

    #[test]
    fn object_ids_are_distinct() {
        let a = Shared::new(Probe {
            first: Arc::new(AtomicUsize::new(0)),
            last: Arc::new(AtomicUsize::new(0)),
        });
        let b = Shared::new(Probe {
            first: Arc::new(AtomicUsize::new(0)),
            last: Arc::new(AtomicUsize::new(0)),
        });
        assert_ne!(a.object_id(), b.object_id());
    }

    #[test]
    fn retain_count_tracks_clones() {
        let o = Shared::new(Probe {
            first: Arc::new(AtomicUsize::new(0)),
            last: Arc::new(AtomicUsize::new(0)),
        });
        assert_eq!(o.retain_count(), 1);
        let s2 = o.clone();
        assert_eq!(o.retain_count(), 2);
        drop(s2);
        assert_eq!(o.retain_count(), 1);
    }
}
