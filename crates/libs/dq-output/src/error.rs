//! Task output error types.

/// Task output errors.
///
/// Every variant except [`Error::Render`] is a producer bug: the events sent
/// to the render loop contradict the tree it has built so far.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A fail/succeed/info event named a task that was never added.
    #[error("Unknown task {0}")]
    UnknownTask(String),

    /// A task was added under a parent that was never added.
    #[error("Task {name} added under unknown parent {parent}")]
    UnknownParent { name: String, parent: String },

    /// Drawing to the terminal failed.
    #[error("Render Error {0}")]
    Render(String),

    /// The render loop panicked or was cancelled.
    #[error("Task output loop aborted {0}")]
    LoopAborted(String),
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Render(value.to_string())
    }
}
