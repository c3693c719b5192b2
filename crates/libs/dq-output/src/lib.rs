//! Task-tree progress reporting for the dq control tool.
//!
//! Long running commands (apply, delete, wait, install) report progress as a
//! tree of named tasks. Any number of producers may report concurrently; all
//! events are funnelled through one bounded queue and applied in FIFO order by
//! a single render loop that owns the task tree.
//!
//! When standard output is not a terminal the same [`TaskOutput`] handle prints
//! one line per call instead of queuing.
//!
//! # Usage
//!
//! ```rust,no_run
//! use dq_output::TaskOutput;
//!
//! # async fn example() -> dq_output::prelude::Result<()> {
//! let output = TaskOutput::for_stdout();
//! output.add_task("Apply: Source/orders", "Applying Source/orders").await;
//!
//! let children = output.children("Apply: Source/orders");
//! children.add_task("Wait: Source/orders", "Waiting for Source/orders").await;
//! children.succeed_task("Wait: Source/orders", "Source/orders online").await;
//!
//! output.succeed_task("Apply: Source/orders", "Apply: Source/orders: complete").await;
//! output.close().await
//! # }
//! ```

pub mod error;
pub mod event;
pub mod output;
pub mod plain;
pub mod prelude;
pub mod render;
pub mod task;

pub use event::TaskEvent;
pub use output::{QUEUE_CAPACITY, TaskOutput, TaskOutputLoop};
pub use plain::PlainOutput;
pub use render::{NullRenderer, TaskRenderer, TermRenderer, Theme};
pub use task::{Task, TaskStatus, TaskTree};
