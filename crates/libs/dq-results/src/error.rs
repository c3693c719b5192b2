//! Result tracking error types.

use crate::hash::ContentHash;

/// Result tracking errors.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// An update or delete referenced content that is not live.
    #[error("No live result with content hash {0}")]
    UnknownRecord(ContentHash),

    /// An add or update would make two live slots share one content hash.
    #[error("A live result with content hash {0} already exists")]
    DuplicateRecord(ContentHash),

    /// The watch stream did not start with a JSON array.
    #[error("Watch stream must be a JSON array, found {0:?}")]
    NotAnArray(char),

    /// A watch stream element was not a JSON object.
    #[error("Watch stream elements must be JSON objects, found {0:?}")]
    NotABatch(char),

    /// Data followed the closing bracket of the watch stream.
    #[error("Unexpected data after the end of the watch stream {0:?}")]
    TrailingData(char),

    /// The watch stream ended before its array was closed.
    #[error("Watch stream ended before the result array was closed")]
    UnterminatedStream,

    /// The result view loop panicked or was cancelled.
    #[error("Result view loop aborted {0}")]
    LoopAborted(String),

    /// I/O operation failed.
    #[error(transparent)]
    IO(#[from] std::io::Error),

    /// JSON deserialization failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
