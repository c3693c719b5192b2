//! Management API client for the dq control tool.
//!
//! Applies, deletes and waits on resources described by manifests, reporting
//! progress through a [`dq_output::TaskOutput`], and streams continuous query
//! watches into change batches.
//!
//! # Usage
//!
//! ```rust,no_run
//! use dq_output::TaskOutput;
//! use dq_requests::{ApiClient, load_manifests};
//!
//! # async fn example() -> dq_requests::prelude::Result<()> {
//! let client = ApiClient::new("http://localhost:8080");
//! let manifests = load_manifests(&["people.toml"])?;
//!
//! let output = TaskOutput::for_stdout();
//! let applied = client.apply(&manifests, &output).await;
//! let _ = output.close().await;
//! applied
//! # }
//! ```

pub mod client;
pub mod error;
pub mod manifest;
pub mod prelude;

pub use client::ApiClient;
pub use manifest::{Manifest, Resource, kind_route, load_manifests};
