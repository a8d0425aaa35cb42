//! Loader Error Taxonomy
//!
//! Every failure before the kernel is handed control is fatal: the
//! binary logs it and halts. The one locally recovered case is
//! [`BootError::StaleMemoryMap`], which [`crate::exit`] retries exactly
//! once with a refreshed map key.

/// Errors the loader can encounter before control transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootError {
    /// A caller-provided buffer was missing or too small for the data
    /// the firmware wanted to return.
    BufferTooSmall,
    /// A required protocol, handle, or file was absent.
    ResourceNotFound,
    /// Fixed-address page allocation failed (range occupied or out of
    /// memory).
    AllocationFailure,
    /// A read returned fewer bytes than required.
    ShortRead { expected: usize, actual: usize },
    /// `ExitBootServices` rejected the map key as stale.
    StaleMemoryMap,
    /// No defined recovery; the loader can only halt.
    Unrecoverable,
}

pub type BootResult<T> = Result<T, BootError>;
