//! Unrecoverable-error path.
//!
//! Programming errors — magic-guard corruption, double-destroy, an
//! invariant the type system can't express — are not `Result`s here. The
//! core's error design (see `SPEC_FULL.md` §4.2/§8) treats them as fatal:
//! log with context, then abort the process. A caller must never be able
//! to catch and continue past a corrupted guard.

/// Log `message` at `Error` level and abort the process.
///
/// Never returns. Use for conditions the spec defines as programming
/// errors: guard mismatch, double-destroy, calling `MainLooper` from a
/// non-main thread, allocator returning null.
#[inline]
#[cold]
pub fn fatal(message: &str) -> ! {
    crate::abe_error!("fatal: {}", message);
    std::process::abort()
}

/// Abort unless `cond` holds, logging `message` first.
#[inline]
pub fn check(cond: bool, message: &str) {
    if !cond {
        fatal(message);
    }
}

/// Abort unless `a == b`, logging both values.
#[inline]
pub fn check_eq<T: PartialEq + std::fmt::Debug>(a: &T, b: &T, context: &str) {
    if a != b {
        fatal(&format!("{context}: {a:?} != {b:?}"));
    }
}
