//! Common types and utilities.

/// Task output error type.
pub use crate::error::Error;

/// Task output result type.
pub type Result<T> = core::result::Result<T, Error>;
