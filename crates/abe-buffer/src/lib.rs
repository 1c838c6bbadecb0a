//! # abe-buffer
//!
//! Copy-on-write shared byte buffers (components C/D/E): a pluggable
//! `Allocator`, guard-bracketed refcounted `SharedBuffer`, and the
//! `Buffer`/`ABuffer` bit/byte stream built on top of it.

#![allow(dead_code)]

pub mod allocator;
pub mod buffer;
pub mod shared_buffer;

pub use allocator::{aligned_allocator, default_allocator, AlignedAllocator, Allocator, AllocatorHandle, DefaultAllocator};
pub use buffer::{ABuffer, Buffer, BufferType, ByteOrder};
pub use shared_buffer::SharedBuffer;
