//! # abe
//!
//! Facade crate re-exporting the workspace: shared-ownership core
//! (`abe-core`), copy-on-write buffers (`abe-buffer`), a lock-free queue
//! (`abe-queue`), and cooperative scheduling (`abe-runtime`).

pub use abe_buffer as buffer;
pub use abe_core as core;
pub use abe_queue as queue;
pub use abe_runtime as runtime;

/// Common imports for consumers of this crate.
pub mod prelude {
    pub use abe_buffer::{ABuffer, Buffer, BufferType, ByteOrder};
    pub use abe_core::{CoreError, CoreResult, Shared, SharedObject, WeakShared};
    pub use abe_queue::LockFreeQueue;
    pub use abe_runtime::{DispatchQueue, Job, Looper, MainLooper, Thread, ThreadType};
}
