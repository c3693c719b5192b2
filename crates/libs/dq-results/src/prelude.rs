//! Common types and utilities.

/// Result tracking error type.
pub use crate::error::Error;

/// Result tracking result type.
pub type Result<T> = core::result::Result<T, Error>;
