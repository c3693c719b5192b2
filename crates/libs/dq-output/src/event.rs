//! Messages carried by the task output queue.

/// Events sent from producers to the render loop.
///
/// Events are immutable once sent. `parent` is the name of the scope the
/// producer reported through, `None` for the root scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    /// A new busy task.
    Added {
        name: String,
        message: String,
        parent: Option<String>,
    },
    /// An existing task failed.
    Failed {
        name: String,
        message: String,
        parent: Option<String>,
    },
    /// An existing task completed.
    Succeeded {
        name: String,
        message: String,
        parent: Option<String>,
    },
    /// An existing task turned into an informational line.
    Info {
        name: String,
        message: String,
        parent: Option<String>,
    },
    /// A free-standing informational line.
    InfoMessage {
        message: String,
        parent: Option<String>,
    },
    /// A free-standing error line.
    Error {
        message: String,
        parent: Option<String>,
    },
    /// Stop the render loop.
    Close,
}
