//! Error taxonomy for the caller side of the boundary.

use crate::ffi::ClibLayout;
use thiserror::Error;

/// Errors raised while loading or calling into the native library.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// The shared library could not be found or loaded.
    #[error("failed to load library '{library}': {reason}")]
    LibraryLoad { library: String, reason: String },

    /// A required symbol is missing from the loaded library.
    #[error("symbol '{symbol}' not found in '{library}': {reason}")]
    SymbolNotFound {
        library: String,
        symbol: String,
        reason: String,
    },

    /// The native allocator returned null.
    #[error("native allocator failed in {function}")]
    AllocationFailure { function: &'static str },

    /// A struct declaration disagrees with what the library reports.
    #[error("layout mismatch for {type_name}: expected {expected:?}, library reports {actual:?}")]
    LayoutMismatch {
        type_name: &'static str,
        expected: ClibLayout,
        actual: ClibLayout,
    },

    /// A handle was released or read after release, or was never allocated
    /// by this context.
    #[error("ownership contract violated: {0}")]
    ContractViolation(String),

    /// A mutable string buffer has no NUL terminator.
    #[error("buffer of {len} bytes has no NUL terminator")]
    MissingNul { len: usize },

    /// Native bytes are not valid UTF-8.
    #[error("invalid UTF-8 in native string")]
    InvalidUtf8,
}

/// Result alias used across the bridge.
pub type Result<T> = std::result::Result<T, BridgeError>;
