//! The journal's error taxonomy.
//!
//! One variant per failure class the engine can report, plus a `Device(E)` variant that
//! forwards the underlying block device's own error type untouched.

use core::fmt::{self, Debug, Display};

/// Errors returned by the journal engine.
///
/// `E` is the underlying [`BlockDevice`](jrnl_block::BlockDevice)'s own error type; it is
/// forwarded verbatim in [`Error::Device`] and never inspected or retried.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error<E> {
    /// A null/empty buffer, an out-of-range sector, or an out-of-range handle.
    InvalidArgument,
    /// The operation is not legal in the journal's current state.
    InvalidState,
    /// The handle does not identify a mounted instance.
    NotFound,
    /// The instance registry is full, or the store cannot fit the requested operation.
    NoMemory,
    /// Replay found a corrupted header or payload (a torn write before commit completed).
    InvalidChecksum,
    /// A persisted master exists but disagrees with the caller's configuration.
    InconsistentState,
    /// Forwarded verbatim from the underlying block device.
    Device(E),
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::Device(e)
    }
}

impl<E: Display> Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument => write!(f, "invalid argument"),
            Error::InvalidState => write!(f, "operation not legal in the journal's current state"),
            Error::NotFound => write!(f, "handle does not identify a mounted instance"),
            Error::NoMemory => write!(f, "registry full or store out of space"),
            Error::InvalidChecksum => write!(f, "checksum mismatch during replay"),
            Error::InconsistentState => write!(f, "persisted master disagrees with configuration"),
            Error::Device(e) => write!(f, "device error: {e}"),
        }
    }
}

impl<E: Debug + Display> core::error::Error for Error<E> {}

/// Convenience alias for the journal's `Result` type.
pub type Result<T, E> = core::result::Result<T, Error<E>>;
