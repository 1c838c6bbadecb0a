//! Recoverable-error taxonomy.
//!
//! This covers exactly the failure modes the core defines as recoverable
//! (a defined `Result`, not an abort): contended enqueue after termination,
//! `sync` timeout, `waitRelative` timeout, empty pop, and not-found on
//! `remove`/`exists`. Programming errors and allocator exhaustion are not
//! representable here — see `crate::fatal`.

use core::fmt;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreError {
    /// `waitRelative`/`sync` exceeded its deadline.
    Timeout,
    /// The operation was cancelled before it ran.
    Cancelled,
    /// The Looper/DispatchQueue is terminated; the job was dropped.
    QueueClosed,
    /// `remove`/`exists` found no matching job.
    NotFound,
    /// The call is not valid for the object's current lifecycle state.
    InvalidState,
    /// The underlying allocator reported failure (only reachable through
    /// fallible allocator paths; the default allocators abort instead).
    AllocationFailed,
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::Timeout => write!(f, "operation timed out"),
            CoreError::Cancelled => write!(f, "operation cancelled"),
            CoreError::QueueClosed => write!(f, "queue closed"),
            CoreError::NotFound => write!(f, "no matching job"),
            CoreError::InvalidState => write!(f, "invalid state for this operation"),
            CoreError::AllocationFailed => write!(f, "allocation failed"),
        }
    }
}

impl std::error::Error for CoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_text() {
        assert_eq!(format!("{}", CoreError::Timeout), "operation timed out");
        assert_eq!(format!("{}", CoreError::NotFound), "no matching job");
    }
}
