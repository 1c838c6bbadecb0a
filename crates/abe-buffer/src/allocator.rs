//! Component D: `Allocator`.
//!
//! A polymorphic byte allocator, itself shared (callers hold an
//! `Arc<dyn Allocator>`, handed to every `SharedBuffer` it backs so
//! deallocation always returns to the allocator that produced the block).
//! Two concrete providers, matching `original_source/ABE/core/Allocator.cpp`:
//! a default heap allocator, and an aligned-heap allocator whose alignment
//! is rounded up to the next power of two with a floor of 32.
//!
//! Resource exhaustion (the underlying allocation call returning null) is a
//! fatal condition here, per the spec's error taxonomy: an allocator that
//! can fail must be isolated behind this abstraction, and the core asserts
//! success rather than propagating an `Err`.

use abe_core::fatal::fatal;
use std::alloc::{self, Layout};
use std::fmt;
use std::sync::Arc;

/// A byte allocator. `reallocate` must preserve the shared prefix
/// `min(old_size, new_size)`.
pub trait Allocator: Send + Sync + fmt::Debug {
    fn allocate(&self, n: usize) -> *mut u8;
    fn reallocate(&self, ptr: *mut u8, old_size: usize, new_size: usize) -> *mut u8;
    fn deallocate(&self, ptr: *mut u8, size: usize);
    /// Alignment this allocator guarantees for every block it hands out.
    fn alignment(&self) -> usize;
}

pub type AllocatorHandle = Arc<dyn Allocator>;

fn layout_for(size: usize, align: usize) -> Layout {
    Layout::from_size_align(size.max(1), align).unwrap_or_else(|e| fatal(&format!("bad layout: {e}")))
}

#[derive(Debug, Default)]
pub struct DefaultAllocator;

impl DefaultAllocator {
    pub fn shared() -> AllocatorHandle {
        Arc::new(DefaultAllocator)
    }
}

impl Allocator for DefaultAllocator {
    fn allocate(&self, n: usize) -> *mut u8 {
        let layout = layout_for(n, self.alignment());
        let ptr = unsafe { alloc::alloc(layout) };
        if ptr.is_null() {
            fatal("allocate: out of memory");
        }
        ptr
    }

    fn reallocate(&self, ptr: *mut u8, old_size: usize, new_size: usize) -> *mut u8 {
        let old_layout = layout_for(old_size, self.alignment());
        let new_ptr = unsafe { alloc::realloc(ptr, old_layout, new_size.max(1)) };
        if new_ptr.is_null() {
            fatal("reallocate: out of memory");
        }
        new_ptr
    }

    fn deallocate(&self, ptr: *mut u8, size: usize) {
        let layout = layout_for(size, self.alignment());
        unsafe { alloc::dealloc(ptr, layout) };
    }

    fn alignment(&self) -> usize {
        1
    }
}

/// Rounds `n` up to the next power of two, floored at 32 — the source's
/// `POW_2`/`ALIGN` macros in `core/Allocator.cpp`.
fn pow2_floor32(n: usize) -> usize {
    let n = n.max(32);
    n.next_power_of_two()
}

#[derive(Debug)]
pub struct AlignedAllocator {
    alignment: usize,
}

impl AlignedAllocator {
    pub fn shared(alignment: usize) -> AllocatorHandle {
        Arc::new(AlignedAllocator {
            alignment: pow2_floor32(alignment),
        })
    }
}

impl Allocator for AlignedAllocator {
    fn allocate(&self, n: usize) -> *mut u8 {
        let layout = layout_for(n, self.alignment);
        let ptr = unsafe { alloc::alloc(layout) };
        if ptr.is_null() {
            fatal("allocate: out of memory");
        }
        ptr
    }

    // posix_memalign's own man page warns that memory it returns is not
    // guaranteed to keep its alignment if handed to a generic realloc, so
    // unlike `DefaultAllocator` this always allocates a fresh aligned
    // block and copies the shared prefix rather than calling realloc.
    fn reallocate(&self, ptr: *mut u8, old_size: usize, new_size: usize) -> *mut u8 {
        let new_ptr = self.allocate(new_size);
        let copy_len = old_size.min(new_size);
        unsafe { std::ptr::copy_nonoverlapping(ptr, new_ptr, copy_len) };
        self.deallocate(ptr, old_size);
        new_ptr
    }

    fn deallocate(&self, ptr: *mut u8, size: usize) {
        let layout = layout_for(size, self.alignment);
        unsafe { alloc::dealloc(ptr, layout) };
    }

    fn alignment(&self) -> usize {
        self.alignment
    }
}

/// `Allocator::Default()` / `kAllocatorDefault`.
pub fn default_allocator() -> AllocatorHandle {
    DefaultAllocator::shared()
}

/// `Allocator::Create(alignment)` / `GetAllocator(n)`.
pub fn aligned_allocator(alignment: usize) -> AllocatorHandle {
    AlignedAllocator::shared(alignment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_allocate_deallocate_round_trip() {
        let a = default_allocator();
        let p = a.allocate(64);
        assert!(!p.is_null());
        unsafe { std::ptr::write_bytes(p, 0xAB, 64) };
        a.deallocate(p, 64);
    }

    #[test]
    fn aligned_rounds_up_with_floor() {
        assert_eq!(pow2_floor32(1), 32);
        assert_eq!(pow2_floor32(32), 32);
        assert_eq!(pow2_floor32(33), 64);
        assert_eq!(pow2_floor32(1024), 1024);
    }

    #[test]
    fn aligned_allocate_preserves_prefix_on_reallocate() {
        let a = aligned_allocator(64);
        assert_eq!(a.alignment(), 64);
        let p = a.allocate(16);
        unsafe { std::ptr::write_bytes(p, 0x42, 16) };
        let p2 = a.reallocate(p, 16, 128);
        let slice = unsafe { std::slice::from_raw_parts(p2, 16) };
        assert!(slice.iter().all(|&b| b == 0x42));
        a.deallocate(p2, 128);
    }
}
