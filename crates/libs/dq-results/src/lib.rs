//! Live continuous query results for the dq control tool.
//!
//! A continuous query watch delivers batches of added, updated and deleted
//! result records. Records carry no primary key; a record is identified by
//! the SHA-256 of its content, computed independently of field order. The
//! [`ResultContainer`] keeps every record in a stable slot so a table can be
//! updated in place: updates overwrite their slot and deletes leave a hole.
//!
//! # Usage
//!
//! ```rust
//! use dq_results::{ChangeMsg, ResultContainer};
//!
//! let change: ChangeMsg = serde_json::from_str(
//!     r#"{"addedResults": [{"id": 1, "name": "Alice"}, {"id": 2, "name": "Bob"}]}"#,
//! )
//! .unwrap();
//!
//! let mut container = ResultContainer::new();
//! assert!(container.apply(change).is_empty());
//! assert_eq!(container.rows().count(), 2);
//! ```

pub mod change;
pub mod columns;
pub mod container;
pub mod error;
pub mod hash;
pub mod prelude;
pub mod terminal;
pub mod view;
pub mod watch;

pub use change::{ChangeMsg, Record, UpdatedResult};
pub use columns::{Columns, TableView};
pub use container::ResultContainer;
pub use hash::{ContentHash, content_hash};
pub use terminal::TerminalTable;
pub use view::{
    NullTable, PlainTable, QUEUE_CAPACITY, QueryResults, QueryResultsLoop, Scroll, TableRenderer,
    ViewEvent, ViewStatus,
};
pub use watch::WatchDecoder;
