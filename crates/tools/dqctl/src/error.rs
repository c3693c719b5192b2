//! Command errors.

/// Errors surfaced by a command.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Output(#[from] dq_output::error::Error),

    #[error(transparent)]
    Results(#[from] dq_results::error::Error),

    #[error(transparent)]
    Requests(#[from] dq_requests::error::Error),

    #[error(transparent)]
    Config(#[from] dq_config::error::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    IO(#[from] std::io::Error),

    /// The watch task panicked or was cancelled.
    #[error("Watch task failed {0}")]
    WatchAborted(String),
}

pub type Result<T> = core::result::Result<T, Error>;
