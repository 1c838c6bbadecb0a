//! Component C: `SharedBuffer`.
//!
//! A refcounted COW byte block, bracketed by two magic guard words so that
//! out-of-bounds writes from elsewhere in the process are caught on the
//! next touch rather than silently corrupting the heap. Guard values and
//! placement are taken directly from
//! `original_source/ABE/core/SharedObject.cpp`.
//!
//! The strong count here is a plain `Arc` count — per the spec, a
//! `SharedBuffer` has no weak references, so `Arc` (without ever handing
//! out a `Weak`) already is the "own strong count, no weak" the spec
//! describes. Guard-checked COW `edit()` is the part genuinely specific to
//! this type, layered on top.

use crate::allocator::AllocatorHandle;
use abe_core::fatal::fatal;
use abe_core::fourcc::fourcc;
use std::ptr::NonNull;
use std::sync::Arc;

const GUARD_START: u32 = fourcc(b"sbf0");
const GUARD_END: u32 = fourcc(b"sbf1");
const GUARD_BYTES: usize = 4;

struct SharedBufferInner {
    allocator: AllocatorHandle,
    /// Payload size in bytes (excludes guards).
    size: usize,
    /// Total allocated length: guard + payload + guard.
    block_len: usize,
    block: NonNull<u8>,
}

impl SharedBufferInner {
    fn payload_ptr(&self) -> *mut u8 {
        unsafe { self.block.as_ptr().add(GUARD_BYTES) }
    }

    fn check_guards(&self) {
        unsafe {
            let start = (self.block.as_ptr() as *const u32).read_unaligned();
            let end_ptr = self.block.as_ptr().add(GUARD_BYTES + self.size) as *const u32;
            let end = end_ptr.read_unaligned();
            if start != GUARD_START {
                fatal("SharedBuffer: start guard corrupted");
            }
            if end != GUARD_END {
                fatal("SharedBuffer: end guard corrupted");
            }
        }
    }
}

impl Drop for SharedBufferInner {
    fn drop(&mut self) {
        self.check_guards();
        self.allocator.deallocate(self.block.as_ptr(), self.block_len);
    }
}

/// A refcounted, guard-bracketed, copy-on-write byte block.
#[derive(Clone)]
pub struct SharedBuffer(Arc<SharedBufferInner>);

// SharedBuffer's payload is not thread-safe (the spec's own concurrency
// model: a caller sharing a Buffer across threads must keep it read-only
// or serialize externally). The handle itself is safe to move.
unsafe impl Send for SharedBuffer {}

impl SharedBuffer {
    /// `SharedBuffer::Create(allocator, size)`: one allocation holds the
    /// leading guard, the payload, and the trailing guard.
    pub fn create(allocator: AllocatorHandle, size: usize) -> SharedBuffer {
        let block_len = size + 2 * GUARD_BYTES;
        let raw = allocator.allocate(block_len);
        let block = NonNull::new(raw).unwrap_or_else(|| fatal("SharedBuffer: allocate returned null"));
        unsafe {
            (block.as_ptr() as *mut u32).write_unaligned(GUARD_START);
            (block.as_ptr().add(GUARD_BYTES + size) as *mut u32).write_unaligned(GUARD_END);
        }
        SharedBuffer(Arc::new(SharedBufferInner {
            allocator,
            size,
            block_len,
            block,
        }))
    }

    /// `RetainBuffer`.
    pub fn retain_buffer(&self) -> SharedBuffer {
        self.0.check_guards();
        SharedBuffer(self.0.clone())
    }

    pub fn size(&self) -> usize {
        self.0.size
    }

    /// Mutable access to the payload. Caller must already hold exclusive
    /// logical ownership (i.e. have gone through `edit()`); this does not
    /// itself check uniqueness.
    pub fn data(&self) -> *mut u8 {
        self.0.check_guards();
        self.0.payload_ptr()
    }

    /// Whether this is the only strong reference to the backing block.
    pub fn is_not_shared(&self) -> bool {
        Arc::strong_count(&self.0) == 1
    }

    /// `edit()`: returns an equivalent-content buffer that is uniquely
    /// owned. Identity if already unique; otherwise allocates a same-size
    /// buffer, copies the payload, and lets the original's refcount drop.
    pub fn edit(&self) -> SharedBuffer {
        if self.is_not_shared() {
            return self.retain_buffer();
        }
        let new = SharedBuffer::create(self.0.allocator.clone(), self.0.size);
        unsafe {
            std::ptr::copy_nonoverlapping(self.data(), new.data(), self.0.size);
        }
        new
    }

    /// `edit(new_size)`: always returns a buffer of exactly `new_size`
    /// bytes. Unique + shrink-or-equal is a no-op (never shrinks the
    /// backing allocation); unique + grow reallocates in place via the
    /// allocator; shared always allocates fresh.
    pub fn edit_resized(&mut self, new_size: usize) -> SharedBuffer {
        if self.is_not_shared() && new_size <= self.0.size {
            return self.retain_buffer();
        }
        if self.is_not_shared() {
            self.0.check_guards();
            // Nothing else holds this Arc (strong count is 1), so
            // `get_mut` on `self.0` directly succeeds — no clone needed,
            // and cloning first would only defeat the uniqueness check.
            let inner = Arc::get_mut(&mut self.0).expect("unique SharedBuffer");
            let new_block_len = new_size + 2 * GUARD_BYTES;
            let new_raw = inner
                .allocator
                .reallocate(inner.block.as_ptr(), inner.block_len, new_block_len);
            inner.block = NonNull::new(new_raw).unwrap_or_else(|| fatal("SharedBuffer: reallocate returned null"));
            inner.block_len = new_block_len;
            inner.size = new_size;
            unsafe {
                (inner.block.as_ptr() as *mut u32).write_unaligned(GUARD_START);
                (inner.block.as_ptr().add(GUARD_BYTES + new_size) as *mut u32).write_unaligned(GUARD_END);
            }
            return self.retain_buffer();
        }
        let new = SharedBuffer::create(self.0.allocator.clone(), new_size);
        let copy_len = self.0.size.min(new_size);
        unsafe {
            std::ptr::copy_nonoverlapping(self.data(), new.data(), copy_len);
        }
        new
    }
}
