//! Environment registry for the dq control tool.
//!
//! Stores the management API endpoints the tool can talk to and which one is
//! current, in a TOML file under the user configuration directory.
//!
//! # Usage
//!
//! ```rust
//! use dq_config::{DqConfig, Environment, EnvironmentKind};
//!
//! let mut config = DqConfig::default();
//! config.upsert(Environment {
//!     name: "local".to_string(),
//!     kind: EnvironmentKind::Docker,
//!     api_url: "http://localhost:8080".to_string(),
//!     namespace: None,
//! });
//! config.set_current("local").unwrap();
//! assert_eq!(config.current_environment().unwrap().api_url, "http://localhost:8080");
//! ```

pub mod config;
pub mod error;
pub mod prelude;

pub use config::{CONFIG_ENV, DqConfig, Environment, EnvironmentKind, default_path};
